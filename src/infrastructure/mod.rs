pub mod config;
pub mod device;
pub mod http;
pub mod model;
pub mod repositories;
