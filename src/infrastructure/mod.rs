//! Infrastructure layer: I/O implementations and DI container
//!
//! This layer implements the data source boundary and wires up services.

pub mod di;
pub mod error;
pub mod http;
pub mod traits;
pub mod wire;

pub use error::{InfraError, InfraResult};
pub use http::HttpRegionSource;
pub use traits::{RegionSource, SourceError, SourceResult};
