pub mod analytics;
pub mod cache;
pub mod config;
pub mod error;
pub mod import;
pub mod mock_api;
pub mod pipeline;
pub mod seed;
pub mod service;
pub mod store;
pub mod telemetry;
