use anyhow::Context;
use geo_energy_forwarder::{
    observability, AppConfig, DatadogWriter, EnergyError, GeoApi, GeoEnergyReader, LogWriter,
    ReadingWriter, Scheduler, SessionCache, StdoutWriter,
};
use std::future::Future;
use std::sync::Arc;
use tokio::signal;
use tokio::task::JoinHandle;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init_tracing();

    tracing::info!("Starting geo energy forwarder");
    let cfg = AppConfig::from_env()?;

    let api = GeoApi::new(&cfg.geo.api_url);
    let session = Arc::new(SessionCache::new(
        api.clone(),
        &cfg.geo.username,
        &cfg.geo.password,
    ));
    let reader = Arc::new(GeoEnergyReader::new(api, session));

    let scheduler = Scheduler::new(
        reader,
        build_writers(&cfg),
        cfg.live_interval,
        cfg.meter_interval,
    )
    .with_failure_policy(cfg.failure_policy);

    run_until_shutdown(scheduler.spawn(), shutdown_signal()).await
}

/// Waits for the poller to fail or for `shutdown` to resolve. A failure to
/// listen for signals is returned rather than treated as a shutdown.
async fn run_until_shutdown<F>(
    mut polling: JoinHandle<Result<(), EnergyError>>,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = anyhow::Result<()>>,
{
    tokio::select! {
        result = &mut polling => {
            // Only reachable when a writer fails under the abort policy
            result??;
        }
        signal = shutdown => {
            polling.abort();
            signal.context("failed to listen for shutdown signals")?;
            tracing::info!("Shutdown signal received, stopping");
        }
    }

    Ok(())
}

fn build_writers(cfg: &AppConfig) -> Vec<Box<dyn ReadingWriter>> {
    let mut writers: Vec<Box<dyn ReadingWriter>> = vec![Box::new(LogWriter)];

    match &cfg.datadog {
        Some(dd) => {
            tracing::info!(hostname = %dd.hostname, url = %dd.base_url, "Datadog sink enabled");
            writers.push(Box::new(DatadogWriter::with_base_url(
                &dd.api_key,
                &dd.base_url,
                &dd.hostname,
            )));
        }
        None => tracing::info!("DD_API_KEY not set, Datadog sink disabled"),
    }

    if cfg.readings_to_stdout {
        writers.push(Box::new(StdoutWriter));
    }

    writers
}

async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = signal::ctrl_c() => result?,
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    signal::ctrl_c().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn idle_poller() -> JoinHandle<Result<(), EnergyError>> {
        tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        })
    }

    #[tokio::test]
    async fn test_signal_setup_failure_is_an_error() {
        let result = run_until_shutdown(idle_poller(), async {
            Err(anyhow::anyhow!("signal handler unavailable"))
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "failed to listen for shutdown signals");
    }

    #[tokio::test]
    async fn test_shutdown_signal_stops_cleanly() {
        let result = run_until_shutdown(idle_poller(), async { Ok(()) }).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_writer_abort_is_returned() {
        let polling = tokio::spawn(async {
            Err(EnergyError::writer("datadog", anyhow::anyhow!("sink offline")))
        });
        let result = run_until_shutdown(polling, std::future::pending()).await;

        assert!(result.unwrap_err().to_string().contains("datadog"));
    }
}
