pub mod aggregate;
pub mod api;
pub mod config;
pub mod error;
pub mod market_data;
pub mod metrics;
pub mod model;
pub mod predictor;
pub mod refresh;
pub mod store;
pub mod window;
