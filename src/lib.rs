pub mod client;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod model;
pub mod store;
pub mod window;

#[cfg(test)]
mod test_support;

pub use client::ApiClient;
pub use config::ClientConfig;
pub use dashboard::{Dashboard, FetchOutcome};
pub use error::ClientError;
pub use model::{DataPoint, Reading, SensorData, SensorReading};
pub use store::{DashboardSnapshot, DashboardStore};
pub use window::QueryWindow;
