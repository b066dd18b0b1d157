//! Application layer: services and use cases
//!
//! This layer owns the stateful interview engine and orchestrates domain logic
//! through I/O boundary traits.

pub mod error;
pub mod error_ext;
pub mod services;

pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::IoResultExt;
