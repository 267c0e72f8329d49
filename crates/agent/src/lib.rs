//! Forecast service: configuration and the HTTP surface over the pipeline

pub mod api;
pub mod config;
