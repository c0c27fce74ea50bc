//! Batched HTTP requests recorded against the current iteration.
use crate::context;
use crate::request::record_request;
use futures_util::future::join_all;
use ramp_core::RequestResult;
use reqwest::{Client, Method};
use tokio::time::Instant;
use url::Url;

/// One request of a [`batch`].
#[derive(Clone, Debug)]
pub struct BatchRequest {
    method: Method,
    url: String,
    name: Option<String>,
}

impl BatchRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            name: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Tag used to group this request in the summary. Defaults to the URL.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Issue all `requests` concurrently and wait for every one of them.
///
/// Relative URLs are resolved against the run's base URL. A response with a status in
/// `200..400` is a success; any other status, a transport error or an unresolvable URL is a
/// failed request. Results come back in request order and are also recorded in the current
/// iteration.
pub async fn batch(
    client: &Client,
    requests: impl IntoIterator<Item = BatchRequest>,
) -> Vec<RequestResult> {
    let base_url = context::base_url();
    let results = join_all(
        requests
            .into_iter()
            .map(|request| send(client, base_url.as_ref(), request)),
    )
    .await;

    for result in &results {
        record_request(result.clone());
    }
    results
}

async fn send(client: &Client, base_url: Option<&Url>, request: BatchRequest) -> RequestResult {
    let name = request.name.unwrap_or_else(|| request.url.clone());
    let start = Instant::now();

    let url = match resolve(base_url, &request.url) {
        Ok(url) => url,
        Err(reason) => return RequestResult::failure(name, None, reason, start.elapsed()),
    };

    match client.request(request.method, url).send().await {
        Ok(response) => {
            let status = response.status();
            // Latency covers the full body, not only the headers.
            let body = response.bytes().await;
            let latency = start.elapsed();

            match body {
                Err(err) => RequestResult::failure(name, Some(status.as_u16()), err.to_string(), latency),
                Ok(_) if status.is_success() || status.is_redirection() => {
                    RequestResult::success(name, Some(status.as_u16()), latency)
                }
                Ok(_) => RequestResult::failure(
                    name,
                    Some(status.as_u16()),
                    format!("unexpected status {status}"),
                    latency,
                ),
            }
        }
        Err(err) => RequestResult::failure(
            name,
            err.status().map(|s| s.as_u16()),
            err.to_string(),
            start.elapsed(),
        ),
    }
}

fn resolve(base_url: Option<&Url>, raw: &str) -> Result<Url, String> {
    match Url::parse(raw) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => match base_url {
            Some(base) => base.join(raw).map_err(|err| err.to_string()),
            None => Err(format!("relative URL {raw:?} used outside of a virtual user")),
        },
        Err(err) => Err(err.to_string()),
    }
}
