use super::ReadingWriter;
use crate::error::EnergyError;
use crate::reading::Reading;
use async_trait::async_trait;
use std::io::Write;

/// Emits each reading as an `info` event on the tracing subscriber
#[derive(Debug, Default, Clone)]
pub struct LogWriter;

#[async_trait]
impl ReadingWriter for LogWriter {
    fn name(&self) -> &str {
        "log"
    }

    async fn write_readings(&self, readings: &[Reading]) -> Result<(), EnergyError> {
        for reading in readings {
            tracing::info!(
                commodity = %reading.commodity,
                reading_type = %reading.reading_type,
                "{reading}"
            );
        }
        Ok(())
    }
}

/// Prints each reading as a plain line on stdout
#[derive(Debug, Default, Clone)]
pub struct StdoutWriter;

#[async_trait]
impl ReadingWriter for StdoutWriter {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn write_readings(&self, readings: &[Reading]) -> Result<(), EnergyError> {
        write_lines(&mut std::io::stdout().lock(), readings)
            .map_err(|e| EnergyError::writer(self.name(), e))
    }
}

fn write_lines<W: Write>(out: &mut W, readings: &[Reading]) -> std::io::Result<()> {
    for reading in readings {
        writeln!(out, "{reading}")?;
    }
    out.flush()
}
