//! Self keep-alive task
//!
//! Hosting platforms such as Render suspend services that receive no traffic
//! for a while. This module runs one background loop that periodically sends a
//! GET to the service's own `/health` endpoint:
//!
//! ```text
//! WAITING (jittered 420..=720s) -> PINGING -> WAITING -> ...
//!                                     | failure
//!                                     v
//!                              BACKOFF (300s) -> WAITING
//! ```
//!
//! The loop stops only when its `CancellationToken` fires. Cancellation is
//! observed before every sleep, during every sleep and during an in-flight
//! ping, so a cancelled task never starts another ping.

use async_trait::async_trait;
use log::{debug, info, warn};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::metrics::Metrics;

/// Lower bound of the jittered wait, in seconds
pub const DEFAULT_MIN_INTERVAL_SECS: u64 = 420;
/// Upper bound of the jittered wait, in seconds
pub const DEFAULT_MAX_INTERVAL_SECS: u64 = 720;
/// Pause after a failed ping, in seconds
pub const DEFAULT_FAILURE_BACKOFF_SECS: u64 = 300;

/// A ping that did not get an HTTP response back
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PingError {
    #[error("ping timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for PingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PingError::Timeout
        } else {
            PingError::Network(err.to_string())
        }
    }
}

/// Errors reported when stopping the task
#[derive(Error, Debug)]
pub enum KeepAliveError {
    #[error("keep-alive task did not stop within {0:?}")]
    ShutdownTimeout(Duration),

    #[error("keep-alive task failed: {0}")]
    Join(String),
}

/// Wait-time policy of the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitterPolicy {
    min_interval: Duration,
    max_interval: Duration,
    failure_backoff: Duration,
}

impl Default for JitterPolicy {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(DEFAULT_MIN_INTERVAL_SECS),
            max_interval: Duration::from_secs(DEFAULT_MAX_INTERVAL_SECS),
            failure_backoff: Duration::from_secs(DEFAULT_FAILURE_BACKOFF_SECS),
        }
    }
}

impl JitterPolicy {
    /// Build a policy from raw (possibly misconfigured) second values.
    ///
    /// Zero or negative bounds fall back to the defaults and an upper bound
    /// below the lower one is raised to it, so the loop can never spin.
    pub fn from_secs(min_secs: i64, max_secs: i64, failure_backoff_secs: i64) -> Self {
        let min = positive_or(min_secs, DEFAULT_MIN_INTERVAL_SECS);
        let max = positive_or(max_secs, DEFAULT_MAX_INTERVAL_SECS).max(min);
        let backoff = positive_or(failure_backoff_secs, DEFAULT_FAILURE_BACKOFF_SECS);

        Self {
            min_interval: Duration::from_secs(min),
            max_interval: Duration::from_secs(max),
            failure_backoff: Duration::from_secs(backoff),
        }
    }

    /// Draw the next wait uniformly from `[min, max]` whole seconds
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let secs = rng.gen_range(self.min_interval.as_secs()..=self.max_interval.as_secs());
        Duration::from_secs(secs)
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn max_interval(&self) -> Duration {
        self.max_interval
    }

    pub fn failure_backoff(&self) -> Duration {
        self.failure_backoff
    }
}

fn positive_or(value: i64, default: u64) -> u64 {
    if value > 0 {
        value as u64
    } else {
        default
    }
}

/// Issues one health request
#[async_trait]
pub trait HealthPinger: Send + Sync {
    /// GET `url`; any HTTP status counts as a response
    async fn ping(&self, url: &str) -> Result<u16, PingError>;
}

/// reqwest-backed pinger
pub struct HttpPinger {
    client: reqwest::Client,
}

impl HttpPinger {
    pub fn new(timeout: Duration) -> Result<Self, PingError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PingError::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HealthPinger for HttpPinger {
    async fn ping(&self, url: &str) -> Result<u16, PingError> {
        let response = self.client.get(url).send().await?;
        Ok(response.status().as_u16())
    }
}

/// `<base_url>/health`
pub fn health_url(base_url: &str) -> String {
    format!("{}/health", base_url.trim_end_matches('/'))
}

/// Handle of the running keep-alive loop
pub struct KeepAliveTask {
    target_url: String,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl KeepAliveTask {
    /// Spawn the loop on the current runtime
    pub fn spawn(
        target_url: String,
        policy: JitterPolicy,
        pinger: Arc<dyn HealthPinger>,
        metrics: Metrics,
    ) -> Self {
        let token = CancellationToken::new();

        info!(
            "Starting keep-alive task: target {}, interval {}-{}s, failure backoff {}s",
            target_url,
            policy.min_interval().as_secs(),
            policy.max_interval().as_secs(),
            policy.failure_backoff().as_secs()
        );

        let handle = tokio::spawn(run_loop(
            target_url.clone(),
            policy,
            pinger,
            metrics,
            token.clone(),
        ));

        Self {
            target_url,
            token,
            handle,
        }
    }

    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the loop has exited
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel the loop and wait up to `grace` for it to exit.
    ///
    /// On timeout the task is aborted and `ShutdownTimeout` is returned.
    pub async fn shutdown(self, grace: Duration) -> Result<(), KeepAliveError> {
        debug!("Requesting keep-alive task cancellation");
        self.token.cancel();

        let abort = self.handle.abort_handle();
        match tokio::time::timeout(grace, self.handle).await {
            Ok(Ok(())) => {
                info!("Keep-alive task stopped cleanly");
                Ok(())
            }
            Ok(Err(e)) => Err(KeepAliveError::Join(e.to_string())),
            Err(_) => {
                abort.abort();
                Err(KeepAliveError::ShutdownTimeout(grace))
            }
        }
    }
}

/// Returns false when cancelled before or during the sleep
async fn sleep_unless_cancelled(token: &CancellationToken, duration: Duration) -> bool {
    if token.is_cancelled() {
        return false;
    }

    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(duration) => !token.is_cancelled(),
    }
}

async fn run_loop(
    url: String,
    policy: JitterPolicy,
    pinger: Arc<dyn HealthPinger>,
    metrics: Metrics,
    token: CancellationToken,
) {
    loop {
        let wait = policy.sample(&mut rand::thread_rng());
        debug!("Next keep-alive ping in {}s", wait.as_secs());

        if !sleep_unless_cancelled(&token, wait).await {
            break;
        }

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            result = pinger.ping(&url) => result,
        };

        match result {
            Ok(status) => {
                info!("Keep-alive ping to {} returned HTTP {}", url, status);
                metrics.record_keep_alive_ping("success").await;
            }
            Err(e) => {
                warn!(
                    "Keep-alive ping to {} failed: {}. Pausing {}s",
                    url,
                    e,
                    policy.failure_backoff().as_secs()
                );
                metrics.record_keep_alive_ping("failure").await;

                if !sleep_unless_cancelled(&token, policy.failure_backoff()).await {
                    break;
                }
            }
        }
    }

    debug!("Keep-alive loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::create_null_exporter;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Pinger that replays scripted outcomes and records when it was called
    struct ScriptedPinger {
        outcomes: Mutex<VecDeque<Result<u16, PingError>>>,
        calls: Mutex<Vec<Instant>>,
    }

    impl ScriptedPinger {
        fn new(outcomes: Vec<Result<u16, PingError>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HealthPinger for ScriptedPinger {
        async fn ping(&self, _url: &str) -> Result<u16, PingError> {
            self.calls.lock().unwrap().push(Instant::now());
            self.outcomes.lock().unwrap().pop_front().unwrap_or(Ok(200))
        }
    }

    /// Pinger whose request never completes
    struct HangingPinger;

    #[async_trait]
    impl HealthPinger for HangingPinger {
        async fn ping(&self, _url: &str) -> Result<u16, PingError> {
            std::future::pending::<()>().await;
            Ok(200)
        }
    }

    fn metrics() -> Metrics {
        Metrics::new(create_null_exporter())
    }

    fn secs(d: Duration) -> u64 {
        d.as_secs()
    }

    #[test]
    fn test_sampled_intervals_stay_in_bounds() {
        let policy = JitterPolicy::default();
        let mut rng = StdRng::seed_from_u64(7);

        let samples: Vec<u64> = (0..1000).map(|_| policy.sample(&mut rng).as_secs()).collect();

        assert!(samples.iter().all(|s| (420..=720).contains(s)));
        // jitter actually varies
        assert!(samples.iter().any(|s| *s != samples[0]));
    }

    #[test]
    fn test_misconfigured_bounds_are_normalised() {
        let policy = JitterPolicy::from_secs(0, -5, -1);
        assert_eq!(policy, JitterPolicy::default());

        let policy = JitterPolicy::from_secs(600, 500, 60);
        assert_eq!(secs(policy.min_interval()), 600);
        assert_eq!(secs(policy.max_interval()), 600);
        assert_eq!(secs(policy.failure_backoff()), 60);

        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(secs(policy.sample(&mut rng)), 600);
    }

    #[test]
    fn test_health_url() {
        assert_eq!(health_url("https://svc.onrender.com/"), "https://svc.onrender.com/health");
        assert_eq!(health_url("http://localhost:8000"), "http://localhost:8000/health");
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_pings_follow_jittered_schedule() {
        let start = Instant::now();
        let pinger = ScriptedPinger::new(vec![Ok(200), Ok(503), Ok(200)]);
        let task = KeepAliveTask::spawn(
            "http://localhost:8000/health".to_string(),
            JitterPolicy::default(),
            pinger.clone(),
            metrics(),
        );

        tokio::time::sleep(Duration::from_secs(3 * 720 + 1)).await;
        task.shutdown(Duration::from_secs(5)).await.unwrap();

        let calls = pinger.calls();
        assert!(calls.len() >= 3, "expected at least 3 pings, got {}", calls.len());
        assert!((420..=720).contains(&secs(calls[0] - start)));
        for pair in calls.windows(2) {
            // a non-2xx status is still a response, so no backoff
            assert!((420..=720).contains(&secs(pair[1] - pair[0])));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_ping_pauses_once_then_resumes_jitter() {
        let start = Instant::now();
        let pinger = ScriptedPinger::new(vec![
            Err(PingError::Network("connection refused".to_string())),
            Ok(200),
            Ok(200),
        ]);
        let task = KeepAliveTask::spawn(
            "http://localhost:8000/health".to_string(),
            JitterPolicy::default(),
            pinger.clone(),
            metrics(),
        );

        tokio::time::sleep(Duration::from_secs(720 + 300 + 720 + 720 + 1)).await;
        task.shutdown(Duration::from_secs(5)).await.unwrap();

        let calls = pinger.calls();
        assert!(calls.len() >= 3);
        assert!((420..=720).contains(&secs(calls[0] - start)));
        // exactly one 300s pause plus a fresh jittered wait
        assert!((720..=1020).contains(&secs(calls[1] - calls[0])));
        // back to plain jitter afterwards
        assert!((420..=720).contains(&secs(calls[2] - calls[1])));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_sleep_exits_without_pinging() {
        let pinger = ScriptedPinger::new(vec![]);
        let task = KeepAliveTask::spawn(
            "http://localhost:8000/health".to_string(),
            JitterPolicy::default(),
            pinger.clone(),
            metrics(),
        );
        assert!(!task.is_cancelled());

        tokio::time::sleep(Duration::from_secs(100)).await;

        let stopped = tokio::time::timeout(
            Duration::from_secs(1),
            task.shutdown(Duration::from_secs(5)),
        )
        .await;
        assert!(matches!(stopped, Ok(Ok(()))));

        tokio::time::sleep(Duration::from_secs(2000)).await;
        assert!(pinger.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_failure_backoff() {
        let pinger = ScriptedPinger::new(vec![Err(PingError::Timeout)]);
        let task = KeepAliveTask::spawn(
            "http://localhost:8000/health".to_string(),
            JitterPolicy::default(),
            pinger.clone(),
            metrics(),
        );

        // first ping lands by 720s; a second one cannot happen before 1140s
        tokio::time::sleep(Duration::from_secs(721)).await;
        assert_eq!(pinger.calls().len(), 1);

        task.shutdown(Duration::from_secs(5)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(5000)).await;
        assert_eq!(pinger.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_in_flight_ping() {
        let task = KeepAliveTask::spawn(
            "http://localhost:8000/health".to_string(),
            JitterPolicy::from_secs(1, 1, 1),
            Arc::new(HangingPinger),
            metrics(),
        );

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!task.is_finished());

        task.shutdown(Duration::from_secs(1)).await.unwrap();
    }
}
