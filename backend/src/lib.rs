//! Serverless STAC ingestion and pgstac database operations.
//!
//! The crate is split the hexagonal way:
//! - [`domain`]: records, policies and services, written against ports.
//! - [`inbound`]: Lambda event decoding and response encoding.
//! - [`outbound`]: Diesel, AWS SDK, process and HTTP adapters.
//! - [`settings`]: OrthoConfig settings resolved at cold start.
//!
//! Binaries under `src/bin` wire these together, one per Lambda.

pub mod domain;
pub mod inbound;
pub mod outbound;
pub mod settings;
pub mod telemetry;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
