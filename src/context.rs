// Application context
//
// Owns the keep-alive task for the lifetime of the server. `start` runs once
// the listener is bound and `shutdown` runs after the server future resolves.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use crate::config::KeepAliveConfig;
use crate::keep_alive::{HealthPinger, HttpPinger, KeepAliveError, KeepAliveTask, PingError};
use crate::metrics::Metrics;

pub struct AppContext {
    config: KeepAliveConfig,
    pinger: Arc<dyn HealthPinger>,
    metrics: Metrics,
    keep_alive: Option<KeepAliveTask>,
}

impl AppContext {
    /// Context pinging over HTTP with the configured timeout
    pub fn new(config: KeepAliveConfig, metrics: Metrics) -> Result<Self, PingError> {
        let pinger = HttpPinger::new(config.ping_timeout())?;
        Ok(Self::with_pinger(config, Arc::new(pinger), metrics))
    }

    pub fn with_pinger(
        config: KeepAliveConfig,
        pinger: Arc<dyn HealthPinger>,
        metrics: Metrics,
    ) -> Self {
        Self {
            config,
            pinger,
            metrics,
            keep_alive: None,
        }
    }

    /// Spawn the keep-alive task unless it is disabled or already running
    pub fn start(&mut self) {
        if !self.config.enabled {
            info!("Keep-alive task disabled by configuration");
            return;
        }

        if let Some(task) = &self.keep_alive {
            warn!(
                "Keep-alive task already running for {}, not starting another",
                task.target_url()
            );
            return;
        }

        self.keep_alive = Some(KeepAliveTask::spawn(
            self.config.health_url(),
            self.config.policy(),
            self.pinger.clone(),
            self.metrics.clone(),
        ));
    }

    pub fn keep_alive(&self) -> Option<&KeepAliveTask> {
        self.keep_alive.as_ref()
    }

    /// Cancel the keep-alive task and wait for it with the configured grace
    pub async fn shutdown(&mut self) -> Result<(), KeepAliveError> {
        self.shutdown_within(self.config.shutdown_grace()).await
    }

    pub async fn shutdown_within(&mut self, grace: Duration) -> Result<(), KeepAliveError> {
        match self.keep_alive.take() {
            Some(task) => task.shutdown(grace).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::create_null_exporter;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingPinger {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HealthPinger for CountingPinger {
        async fn ping(&self, _url: &str) -> Result<u16, PingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(200)
        }
    }

    fn config(enabled: bool) -> KeepAliveConfig {
        KeepAliveConfig {
            enabled,
            base_url: "http://localhost:8000".to_string(),
            min_interval_secs: 420,
            max_interval_secs: 720,
            failure_backoff_secs: 300,
            ping_timeout_secs: 30,
            shutdown_grace_secs: 10,
        }
    }

    fn context(enabled: bool, pinger: Arc<CountingPinger>) -> AppContext {
        AppContext::with_pinger(config(enabled), pinger, Metrics::new(create_null_exporter()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_then_shutdown() {
        let pinger = Arc::new(CountingPinger::default());
        let mut ctx = context(true, pinger.clone());

        ctx.start();
        let task = ctx.keep_alive().expect("task should be running");
        assert_eq!(task.target_url(), "http://localhost:8000/health");

        tokio::time::sleep(Duration::from_secs(721)).await;
        assert_eq!(pinger.calls.load(Ordering::SeqCst), 1);

        ctx.shutdown().await.unwrap();
        assert!(ctx.keep_alive().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_start_is_ignored() {
        let pinger = Arc::new(CountingPinger::default());
        let mut ctx = context(true, pinger.clone());

        ctx.start();
        ctx.start();

        // a second loop would double the ping count
        tokio::time::sleep(Duration::from_secs(721)).await;
        assert_eq!(pinger.calls.load(Ordering::SeqCst), 1);

        ctx.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_disabled_context_never_spawns() {
        let pinger = Arc::new(CountingPinger::default());
        let mut ctx = context(false, pinger);

        ctx.start();
        assert!(ctx.keep_alive().is_none());
        ctx.shutdown().await.unwrap();
    }
}
