pub mod app;
pub mod config;
pub mod gateway;
pub mod identity;
pub mod markers;
pub mod progress;
pub mod session;
pub mod telemetry;
pub mod ui;

#[cfg(test)]
pub mod test_helpers;
