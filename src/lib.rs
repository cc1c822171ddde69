//! Geo Energy Forwarder Library
//!
//! Polls a geo home energy account for live power draw and cumulative meter
//! totals, and forwards the readings to Datadog and the log stream.

pub mod claims;
pub mod config;
pub mod error;
pub mod geo_api;
pub mod observability;
pub mod reader;
pub mod reading;
pub mod scheduler;
pub mod session;
pub mod writers;

// Re-export commonly used types for easier access
pub use config::AppConfig;
pub use error::EnergyError;
pub use geo_api::GeoApi;
pub use reader::{EnergyReader, GeoEnergyReader};
pub use reading::{Commodity, Reading, ReadingType};
pub use scheduler::{FailurePolicy, PollMode, Scheduler};
pub use session::SessionCache;
pub use writers::{DatadogWriter, LogWriter, ReadingWriter, StdoutWriter};
