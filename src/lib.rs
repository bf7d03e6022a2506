//! Blueprint estimate extraction service.
//!
//! Wraps the Blueprint-to-Estimate pipeline (text extraction, analysis,
//! line item generation, coverage enhancement, validation) in a thin HTTP
//! API. Persistence, auth and pricing roll-ups live in the surrounding
//! platform; this service takes a blueprint upload and returns a scored
//! estimate.

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod pipeline;
pub mod routes;
pub mod services;
