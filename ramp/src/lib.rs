#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

// Lets the proc macros' `::ramp::` paths resolve inside this crate's own tests.
extern crate self as ramp;

pub mod collector;
pub mod context;
#[cfg(feature = "http")]
#[cfg_attr(docsrs, doc(cfg(feature = "http")))]
pub mod http;
pub mod orchestrator;
#[doc(hidden)]
pub mod request;
pub mod runner;
pub mod scenario;

pub(crate) mod clock;
pub(crate) mod scheduler;

pub use orchestrator::{main, report, run};
pub use ramp_core::*;
pub use ramp_macros::{request, scenario};
pub use scenario::{ConfigurableScenario, Scenario, StopHandle};
pub use scheduler::VuState;

pub mod prelude {
    pub use crate::scenario::{ConfigurableScenario, StopHandle};
    pub use ramp_core::{RampError, RunConfig, Stage, StageSpec, Summary};
    pub use ramp_macros::{request, scenario};

    #[cfg(feature = "http")]
    pub use crate::http::{batch, BatchRequest};
}
