pub mod config;
pub mod gate;
pub mod http;
pub mod metrics;
pub mod operation;
pub mod service;
