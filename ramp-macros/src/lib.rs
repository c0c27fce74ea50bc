use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{Ident, ItemFn};

/// Proc macro to denote a Request
///
/// Times the function body and records it as one request of the current iteration, tagged with
/// the function name. The function must return a `Result<T, E>` where `E: Display`; an `Err` is
/// recorded as a failed request and returned unchanged.
///
/// # Example
/// ```ignore
/// use ramp::prelude::*;
///
/// #[request]
/// async fn get_user(client: &Client, id: u32) -> Result<(), reqwest::Error> {
///     client.get(format!("http://localhost:3000/users/{id}")).send().await?;
///     Ok(())
/// }
/// ```
#[proc_macro_attribute]
pub fn request(attr: TokenStream, item: TokenStream) -> TokenStream {
    request_internal(attr, item).into()
}

fn request_internal(_attr: TokenStream, item: TokenStream) -> TokenStream2 {
    let input = match syn::parse::<ItemFn>(item) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error(),
    };

    if input.sig.asyncness.is_none() {
        return syn::Error::new_spanned(&input.sig, "#[request] only works on async functions")
            .to_compile_error();
    }

    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = input;
    let stmts = &block.stmts;
    let name = sig.ident.to_string();

    quote! {
        #(#attrs)* #vis #sig {
            ::ramp::request::request_hook(#name, async move {
                #(#stmts)*
            }).await
        }
    }
}

/// Proc macro to denote a Scenario
///
/// NOTE: Currently this macro only works on async functions which take no arguments. The body
/// is one workload iteration; it may return `()` or a `Result<(), E>` with `E: Display`.
///
/// The annotated function becomes a constructor for a `Scenario`, which is configured with
/// chained methods and run by awaiting it.
///
/// # Example
/// ```ignore
/// use ramp::prelude::*;
///
/// #[scenario]
/// async fn my_scenario() {
/// }
/// ```
#[proc_macro_attribute]
pub fn scenario(attr: TokenStream, item: TokenStream) -> TokenStream {
    scenario_internal(attr, item).into()
}

fn scenario_internal(_attr: TokenStream, item: TokenStream) -> TokenStream2 {
    let input = match syn::parse::<ItemFn>(item) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error(),
    };

    if input.sig.asyncness.is_none() || !input.sig.inputs.is_empty() {
        return syn::Error::new_spanned(
            &input.sig,
            "#[scenario] only works on async functions without arguments",
        )
        .to_compile_error();
    }

    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = input;
    let stmts = &block.stmts;

    let new_name = Ident::new(&format!("__ramp_{}", sig.ident), Span::call_site());
    let mut new_sig = sig.clone();
    new_sig.ident = new_name.clone();

    let mut scen_sig = sig.clone();
    let scen_name = sig.ident.clone();
    scen_sig.asyncness = None;
    scen_sig.output = match syn::parse(
        quote! {
            -> impl ::ramp::scenario::ConfigurableScenario
        }
        .into(),
    ) {
        Ok(output) => output,
        Err(err) => return err.to_compile_error(),
    };

    quote! {
        #(#attrs)* #vis #scen_sig {
            ::ramp::scenario::Scenario::new(stringify!(#scen_name), #new_name)
        }

        #(#attrs)* #vis #new_sig {
            #(#stmts)*
        }
    }
}
