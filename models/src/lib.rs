//! Wire-level data exchanged between the controller and the host.
//!
//! Models carry no I/O and no business logic. Encoding lives in
//! `bridge-core::codec`; these are the values it encodes.

pub mod backend_kind;
pub mod error;
pub mod params;
pub mod request;
pub mod response;

#[cfg(test)]
mod tests;

pub use backend_kind::BackendKind;
pub use error::model_error::ModelError;
pub use params::{ParamValue, Params};
pub use request::{Request, RequestBuilder, RequestId};
pub use response::{ErrorKind, Outcome, Response};
