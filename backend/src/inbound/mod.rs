//! Inbound adapters that translate Lambda events into domain service calls
//! while keeping runtime details at the edge.
//!
//! Queue-driven functions live in [`lambda::sqs_batch`]; deployment-time
//! custom resources live in [`lambda::custom_resource`].

pub mod lambda;
