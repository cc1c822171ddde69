pub mod datadog;
pub mod log;

pub use datadog::DatadogWriter;
pub use log::{LogWriter, StdoutWriter};

use crate::error::EnergyError;
use crate::reading::Reading;
use async_trait::async_trait;

/// Destination for a batch of readings
#[async_trait]
pub trait ReadingWriter: Send + Sync {
    /// Short label used when reporting failures
    fn name(&self) -> &str;

    async fn write_readings(&self, readings: &[Reading]) -> Result<(), EnergyError>;
}
