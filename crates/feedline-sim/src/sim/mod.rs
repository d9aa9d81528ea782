pub mod config;
pub mod driver;
pub mod feed;
pub mod status;
pub mod telemetry;
