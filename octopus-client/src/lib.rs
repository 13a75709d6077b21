//! Client for the Octopus Energy consumption API.
//!
//! The crate owns the domain types shared with the exporter and the single
//! upstream call it needs: fetching the newest consumption interval for a
//! meter.

pub mod api;
pub mod domain;
pub mod error;

pub use api::{ConsumptionSource, OctopusClient};
pub use error::ClientError;
