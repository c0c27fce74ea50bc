mod config;
mod constants;
mod data;
mod error;
mod profile;
mod stats;

pub use config::*;
pub use constants::*;
pub use data::*;
pub use error::*;
pub use profile::*;
pub use stats::*;
