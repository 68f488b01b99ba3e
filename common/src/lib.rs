//! Shared primitives for the cadbridge workspace.
//!
//! ## Architecture
//!
//! - **common** (this crate): error-location plumbing used by every layer
//! - **models**: wire data exchanged between the controller and the host
//! - **bridge-core**: channel, dispatcher, engines and backend selection
//! - **cadbridge**: CLI wiring everything together

pub mod error;

#[cfg(test)]
mod tests;

pub use error::error_location::ErrorLocation;
