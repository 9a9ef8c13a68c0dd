//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: pgstac catalogue writes and bootstrap SQL over Diesel
//! - **aws**: S3, SNS, Secrets Manager and Systems Manager clients
//! - **process**: `uvx` item generation and `pypgstac` migrations
//! - **cloudformation**: custom-resource status delivery over HTTP
//!
//! Adapters are thin translators between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod aws;
pub mod cloudformation;
pub mod persistence;
pub mod process;
