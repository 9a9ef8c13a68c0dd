//! Custom-resource response delivery.

mod http_status_reporter;

pub use http_status_reporter::HttpDeploymentStatusReporter;
