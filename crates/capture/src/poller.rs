//! Completion polling for asynchronous device commands

use crate::clock::Clock;
use crate::error::{CaptureError, Stage};
use osc_protocol::{endpoint, CommandHandle, CommandState, CommandStatus, DeviceChannel};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fixed wait between status queries
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Fixed ceiling for a command to complete
pub const DEFAULT_POLL_CEILING: Duration = Duration::from_secs(60);

/// Shortest wait between status queries, whatever the policy asks for
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Bounded polling policy
///
/// Not adaptive: on-device stitching finishes in a predictable few seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub ceiling: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            ceiling: DEFAULT_POLL_CEILING,
        }
    }
}

/// A command that reached `done`
#[derive(Debug, Clone)]
pub struct CompletedCommand {
    /// Id of the consumed command handle
    pub id: String,
    /// Final status record
    pub status: CommandStatus,
    /// Status queries issued
    pub polls: u32,
    /// Time spent polling
    pub elapsed: Duration,
}

impl CompletedCommand {
    pub fn results(&self) -> Option<&Value> {
        self.status.results.as_ref()
    }
}

/// Polls `commands/status` until a command is done or the ceiling is reached
pub struct CompletionPoller<'a> {
    channel: &'a dyn DeviceChannel,
    clock: &'a dyn Clock,
    policy: PollPolicy,
}

impl<'a> CompletionPoller<'a> {
    pub fn new(channel: &'a dyn DeviceChannel, clock: &'a dyn Clock, policy: PollPolicy) -> Self {
        Self {
            channel,
            clock,
            policy,
        }
    }

    /// Wait for `handle` to reach `done`
    ///
    /// Every wait is clamped to the remaining budget and no query is issued
    /// once the ceiling has been reached. A timeout is fatal to the capture:
    /// the shutter has already fired, so nothing is re-dispatched.
    pub async fn wait(&self, handle: CommandHandle) -> Result<CompletedCommand, CaptureError> {
        let started = self.clock.now();
        let interval = self.policy.interval.max(MIN_POLL_INTERVAL);
        let mut polls: u32 = 0;

        loop {
            let elapsed = self.clock.now().saturating_duration_since(started);
            let remaining = self.policy.ceiling.saturating_sub(elapsed);
            if remaining.is_zero() {
                return Err(self.timed_out(handle, elapsed));
            }

            self.clock.sleep(interval.min(remaining)).await;

            let elapsed = self.clock.now().saturating_duration_since(started);
            if elapsed >= self.policy.ceiling {
                return Err(self.timed_out(handle, elapsed));
            }

            let raw = self
                .channel
                .post(endpoint::STATUS, Some(handle.to_status_request()))
                .await
                .map_err(CaptureError::device(Stage::Poll))?;
            polls += 1;

            let status = CommandStatus::from_value(raw);
            if status.is_done() {
                info!(
                    "Command {} done after {} polls ({:?})",
                    handle, polls, elapsed
                );
                metrics::histogram!("capture_poll_count").record(polls as f64);
                return Ok(CompletedCommand {
                    id: handle.into_id(),
                    status,
                    polls,
                    elapsed,
                });
            }

            if status.state == CommandState::Error {
                warn!("Command {} reports error state: {:?}", handle, status.error);
            } else {
                debug!("Command {} still {:?} after {:?}", handle, status.state, elapsed);
            }
        }
    }

    fn timed_out(&self, handle: CommandHandle, elapsed: Duration) -> CaptureError {
        warn!(
            "Command {} not done within {:?}, giving up",
            handle, self.policy.ceiling
        );
        CaptureError::Timeout {
            id: handle.into_id(),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }
}
