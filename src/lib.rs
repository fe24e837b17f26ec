#![deny(missing_docs)]

//! Core library for the Rusty Classify document classification server.

/// Client for the remote classification model.
pub mod anthropic;
/// HTTP routing and upload handlers.
pub mod api;
/// Batch classification pipeline.
pub mod classification;
/// Environment-driven configuration management.
pub mod config;
/// Structured logging and tracing setup.
pub mod logging;
/// Classification metrics helpers.
pub mod metrics;
