//! Polling coordinator for asynchronous server-side jobs
//!
//! Import and export jobs are short-lived batch conversions, so the loop
//! polls at a fixed short interval with a hard iteration ceiling instead of
//! backing off. Worst-case wait is bounded at `limit` polls.

use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::error::Result;

/// Wait between successive status polls
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Poll ceiling for XLSForm import jobs
pub const IMPORT_POLL_LIMIT: usize = 60;
/// Poll ceiling for submission export jobs
pub const EXPORT_POLL_LIMIT: usize = 30;

/// Classification of a single job-status payload
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    /// No terminal state reported yet
    Pending,
    /// Job finished; carries the full status payload
    Complete(Value),
    /// Job failed; carries the server's message payload
    Failed(Value),
}

/// Terminal outcome of a polling loop
///
/// `TimedOut` is a distinct outcome rather than an error: the job may still
/// finish on the server, and the caller is expected to surface a
/// "check again later" payload instead of failing.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Complete(Value),
    Failed(Value),
    TimedOut,
}

/// Map a raw job-status payload to a lifecycle state.
///
/// KoboToolbox reports `created` and `processing` before a job settles, so
/// anything other than an explicit `complete` or `error` counts as pending.
pub fn classify_status(payload: &Value) -> JobStatus {
    match payload.get("status").and_then(Value::as_str) {
        Some("complete") => JobStatus::Complete(payload.clone()),
        Some("error") => JobStatus::Failed(
            payload
                .get("messages")
                .cloned()
                .unwrap_or_else(|| Value::Object(Default::default())),
        ),
        _ => JobStatus::Pending,
    }
}

/// Poll `fetch_status` at a fixed `interval` until `classify` reports a
/// terminal state or `limit` polls have been spent.
///
/// Single-flow and blocking: one job, no backoff, no jitter. Terminal states
/// short-circuit immediately without consuming the remaining ceiling, and no
/// further polls are issued after `TimedOut`. Transport errors from
/// `fetch_status` propagate as hard failures.
pub async fn poll_job<F, Fut, C>(
    mut fetch_status: F,
    classify: C,
    limit: usize,
    interval: Duration,
) -> Result<JobOutcome>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Value>>,
    C: Fn(&Value) -> JobStatus,
{
    for attempt in 1..=limit {
        let payload = fetch_status().await?;

        match classify(&payload) {
            JobStatus::Complete(result) => {
                debug!(attempt, "job complete");
                return Ok(JobOutcome::Complete(result));
            }
            JobStatus::Failed(messages) => {
                debug!(attempt, "job reported error");
                return Ok(JobOutcome::Failed(messages));
            }
            JobStatus::Pending => {}
        }

        // No sleep after the final poll; the ceiling is already spent.
        if attempt < limit {
            tokio::time::sleep(interval).await;
        }
    }

    debug!(limit, "job still pending after poll ceiling");
    Ok(JobOutcome::TimedOut)
}
