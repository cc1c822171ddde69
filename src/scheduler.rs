use crate::error::EnergyError;
use crate::reader::EnergyReader;
use crate::reading::Reading;
use crate::writers::ReadingWriter;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

pub const DEFAULT_LIVE_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_METER_INTERVAL: Duration = Duration::from_secs(300);

/// Which reader paths a single poll queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollMode {
    Live,
    Meter,
    Both,
}

impl PollMode {
    fn includes_live(self) -> bool {
        matches!(self, PollMode::Live | PollMode::Both)
    }

    fn includes_meter(self) -> bool {
        matches!(self, PollMode::Meter | PollMode::Both)
    }
}

/// What to do when a writer rejects a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the failure and keep delivering to the remaining writers
    #[default]
    Continue,
    /// Stop the fan-out and end the scheduler with the writer's error
    Abort,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" => Ok(FailurePolicy::Continue),
            "abort" => Ok(FailurePolicy::Abort),
            other => Err(format!(
                "unknown writer failure policy `{other}`, expected `continue` or `abort`"
            )),
        }
    }
}

/// Drives the live and meter polls and hands each batch to every writer.
///
/// A single loop serves both timers, so at most one poll and its fan-out is
/// in flight at any time.
pub struct Scheduler {
    reader: Arc<dyn EnergyReader>,
    writers: Vec<Box<dyn ReadingWriter>>,
    live_interval: Duration,
    meter_interval: Duration,
    failure_policy: FailurePolicy,
}

impl Scheduler {
    pub fn new(
        reader: Arc<dyn EnergyReader>,
        writers: Vec<Box<dyn ReadingWriter>>,
        live_interval: Duration,
        meter_interval: Duration,
    ) -> Self {
        Self {
            reader,
            writers,
            live_interval,
            meter_interval,
            failure_policy: FailurePolicy::default(),
        }
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    /// Spawns the polling loop onto the runtime
    pub fn spawn(self) -> JoinHandle<Result<(), EnergyError>> {
        tokio::spawn(async move { self.run().await })
    }

    /// Polls both paths once, then serves timer ticks until the task is
    /// dropped. Only returns early when a writer fails under
    /// [`FailurePolicy::Abort`].
    pub async fn run(self) -> Result<(), EnergyError> {
        tracing::info!(
            live_interval = ?self.live_interval,
            meter_interval = ?self.meter_interval,
            writers = self.writers.len(),
            "starting scheduler"
        );

        self.poll_and_report(PollMode::Both).await?;

        let start = Instant::now();
        let mut live_ticker = interval_at(start + self.live_interval, self.live_interval);
        live_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut meter_ticker = interval_at(start + self.meter_interval, self.meter_interval);
        meter_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let mode = tokio::select! {
                _ = live_ticker.tick() => PollMode::Live,
                _ = meter_ticker.tick() => PollMode::Meter,
            };
            self.poll_and_report(mode).await?;
        }
    }

    /// Fetches the readings for `mode` and delivers them to every writer.
    ///
    /// Live readings come first when both paths are polled. A reader error
    /// fails the poll before any writer is called.
    pub async fn poll(&self, mode: PollMode) -> Result<(), EnergyError> {
        let mut batch: Vec<Reading> = Vec::new();
        if mode.includes_live() {
            batch.extend(self.reader.live_readings().await?);
        }
        if mode.includes_meter() {
            batch.extend(self.reader.meter_readings().await?);
        }

        tracing::debug!(?mode, readings = batch.len(), "poll complete");
        self.fan_out(&batch).await
    }

    async fn fan_out(&self, batch: &[Reading]) -> Result<(), EnergyError> {
        for writer in &self.writers {
            if let Err(e) = writer.write_readings(batch).await {
                match self.failure_policy {
                    FailurePolicy::Continue => {
                        tracing::error!(
                            writer = writer.name(),
                            error = %e,
                            "writer failed, continuing with remaining writers"
                        );
                    }
                    FailurePolicy::Abort => return Err(e),
                }
            }
        }
        Ok(())
    }

    async fn poll_and_report(&self, mode: PollMode) -> Result<(), EnergyError> {
        match self.poll(mode).await {
            Ok(()) => Ok(()),
            Err(e @ EnergyError::Writer { .. }) => {
                tracing::error!(?mode, error = %e, "writer failed, stopping scheduler");
                Err(e)
            }
            Err(e) => {
                tracing::error!(?mode, error = %e, "poll failed, waiting for next tick");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::{Commodity, ReadingType};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockReader {
        live_calls: AtomicU32,
        meter_calls: AtomicU32,
        fail_live: AtomicBool,
    }

    impl MockReader {
        fn live_calls(&self) -> u32 {
            self.live_calls.load(Ordering::Relaxed)
        }

        fn meter_calls(&self) -> u32 {
            self.meter_calls.load(Ordering::Relaxed)
        }
    }

    #[async_trait]
    impl EnergyReader for MockReader {
        async fn live_readings(&self) -> Result<Vec<Reading>, EnergyError> {
            self.live_calls.fetch_add(1, Ordering::Relaxed);
            if self.fail_live.load(Ordering::Relaxed) {
                return Err(EnergyError::NoSystems);
            }
            Ok(vec![Reading::new(Commodity::Electricity, ReadingType::Live, 100.0)])
        }

        async fn meter_readings(&self) -> Result<Vec<Reading>, EnergyError> {
            self.meter_calls.fetch_add(1, Ordering::Relaxed);
            Ok(vec![Reading::new(Commodity::Gas, ReadingType::Meter, 5.0)])
        }
    }

    #[derive(Clone, Default)]
    struct RecordingWriter {
        batches: Arc<Mutex<Vec<Vec<Reading>>>>,
        should_fail: bool,
    }

    impl RecordingWriter {
        fn failing() -> Self {
            Self {
                should_fail: true,
                ..Self::default()
            }
        }

        fn batches(&self) -> Vec<Vec<Reading>> {
            self.batches.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ReadingWriter for RecordingWriter {
        fn name(&self) -> &str {
            "recording"
        }

        async fn write_readings(&self, readings: &[Reading]) -> Result<(), EnergyError> {
            self.batches.lock().unwrap().push(readings.to_vec());
            if self.should_fail {
                return Err(EnergyError::writer(self.name(), anyhow::anyhow!("sink offline")));
            }
            Ok(())
        }
    }

    fn scheduler(reader: Arc<MockReader>, writers: Vec<RecordingWriter>) -> Scheduler {
        let writers = writers
            .into_iter()
            .map(|w| Box::new(w) as Box<dyn ReadingWriter>)
            .collect();
        Scheduler::new(reader, writers, DEFAULT_LIVE_INTERVAL, DEFAULT_METER_INTERVAL)
    }

    #[test]
    fn test_failure_policy_from_str() {
        assert_eq!("continue".parse::<FailurePolicy>(), Ok(FailurePolicy::Continue));
        assert_eq!(" ABORT ".parse::<FailurePolicy>(), Ok(FailurePolicy::Abort));
        assert!("explode".parse::<FailurePolicy>().is_err());
        assert_eq!(FailurePolicy::default(), FailurePolicy::Continue);
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_polls_both_paths() {
        let reader = Arc::new(MockReader::default());
        let writer = RecordingWriter::default();
        let handle = scheduler(reader.clone(), vec![writer.clone()]).spawn();

        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(reader.live_calls(), 1);
        assert_eq!(reader.meter_calls(), 1);
        assert_eq!(
            writer.batches(),
            vec![vec![
                Reading::new(Commodity::Electricity, ReadingType::Live, 100.0),
                Reading::new(Commodity::Gas, ReadingType::Meter, 5.0),
            ]]
        );

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_only_poll_their_own_path() {
        let reader = Arc::new(MockReader::default());
        let writer = RecordingWriter::default();
        let handle = scheduler(reader.clone(), vec![writer.clone()]).spawn();

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(reader.live_calls(), 3);
        assert_eq!(reader.meter_calls(), 1);

        tokio::time::sleep(Duration::from_secs(280)).await;
        assert_eq!(reader.live_calls(), 31);
        assert_eq!(reader.meter_calls(), 2);

        // Everything after the startup batch holds a single reading type
        let batches = writer.batches();
        assert_eq!(batches.len(), 32);
        for batch in &batches[1..] {
            assert_eq!(batch.len(), 1);
        }
        let meter_batches = batches[1..]
            .iter()
            .filter(|b| b[0].reading_type == ReadingType::Meter)
            .count();
        assert_eq!(meter_batches, 1);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_reader_failure_skips_fan_out_and_keeps_running() {
        let reader = Arc::new(MockReader::default());
        reader.fail_live.store(true, Ordering::Relaxed);
        let writer = RecordingWriter::default();
        let handle = scheduler(reader.clone(), vec![writer.clone()]).spawn();

        tokio::time::sleep(Duration::from_secs(25)).await;

        assert_eq!(reader.live_calls(), 3);
        // The startup poll gave up after the live path failed
        assert_eq!(reader.meter_calls(), 0);
        assert!(writer.batches().is_empty());
        assert!(!handle.is_finished());

        reader.fail_live.store(false, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(writer.batches().len(), 1);

        handle.abort();
    }

    #[tokio::test]
    async fn test_continue_policy_isolates_writers() {
        let reader = Arc::new(MockReader::default());
        let broken = RecordingWriter::failing();
        let healthy = RecordingWriter::default();
        let scheduler = scheduler(reader, vec![broken.clone(), healthy.clone()]);

        scheduler.poll(PollMode::Live).await.unwrap();

        assert_eq!(broken.batches(), healthy.batches());
        assert_eq!(healthy.batches().len(), 1);
    }

    #[tokio::test]
    async fn test_abort_policy_stops_fan_out() {
        let reader = Arc::new(MockReader::default());
        let broken = RecordingWriter::failing();
        let healthy = RecordingWriter::default();
        let scheduler = scheduler(reader, vec![broken.clone(), healthy.clone()])
            .with_failure_policy(FailurePolicy::Abort);

        let result = scheduler.poll(PollMode::Meter).await;

        assert!(matches!(result, Err(EnergyError::Writer { .. })));
        assert_eq!(broken.batches().len(), 1);
        assert!(healthy.batches().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_policy_ends_run() {
        let reader = Arc::new(MockReader::default());
        let scheduler = scheduler(reader, vec![RecordingWriter::failing()])
            .with_failure_policy(FailurePolicy::Abort);

        let result = scheduler.run().await;
        assert!(matches!(result, Err(EnergyError::Writer { .. })));
    }

    #[tokio::test]
    async fn test_poll_modes() {
        let reader = Arc::new(MockReader::default());
        let writer = RecordingWriter::default();
        let scheduler = scheduler(reader.clone(), vec![writer.clone()]);

        scheduler.poll(PollMode::Live).await.unwrap();
        assert_eq!((reader.live_calls(), reader.meter_calls()), (1, 0));

        scheduler.poll(PollMode::Meter).await.unwrap();
        assert_eq!((reader.live_calls(), reader.meter_calls()), (1, 1));

        scheduler.poll(PollMode::Both).await.unwrap();
        assert_eq!((reader.live_calls(), reader.meter_calls()), (2, 2));
        assert_eq!(writer.batches()[2].len(), 2);
    }
}
