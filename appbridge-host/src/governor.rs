//! Deadline-bounded execution of one capability call.
//!
//! A call runs on the blocking pool while the governor waits on a timer.
//! When the timer wins, the instance's interrupt is raised and the governor
//! waits (up to the cancel grace) for the engine to unwind before reporting
//! `Timeout`. A result produced after the deadline is always discarded.

use crate::config::ExecutionLimits;
use crate::engine::{ComponentInstance, InterruptHandle, InvokeError};
use crate::error::{BridgeError, Phase};
use crate::translate;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{Instrument, debug, info_span, warn};
use uuid::Uuid;

/// A component instance behind the per-handle serialization lock.
pub(crate) type SharedInstance = Arc<Mutex<Box<dyn ComponentInstance>>>;

#[derive(Debug, Clone, Copy)]
pub struct ExecutionGovernor {
    timeout: Duration,
    cancel_grace: Duration,
}

impl ExecutionGovernor {
    pub fn new(limits: &ExecutionLimits) -> Self {
        Self {
            timeout: limits.timeout,
            cancel_grace: limits.cancel_grace,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `call` against the instance under the configured deadline.
    ///
    /// The deadline starts once the instance lock is held, so time spent
    /// queued behind another call on the same handle does not count.
    pub(crate) async fn invoke<R, F>(
        &self,
        phase: Phase,
        capability: &str,
        instance: &SharedInstance,
        interrupt: &InterruptHandle,
        call: F,
    ) -> Result<R, BridgeError>
    where
        F: FnOnce(&mut dyn ComponentInstance, Instant) -> Result<R, InvokeError> + Send + 'static,
        R: Send + 'static,
    {
        let span = info_span!(
            "invoke",
            invocation = %Uuid::now_v7(),
            phase = %phase,
            capability = %capability,
        );
        self.invoke_inner(phase, capability, instance, interrupt, call)
            .instrument(span)
            .await
    }

    async fn invoke_inner<R, F>(
        &self,
        phase: Phase,
        capability: &str,
        instance: &SharedInstance,
        interrupt: &InterruptHandle,
        call: F,
    ) -> Result<R, BridgeError>
    where
        F: FnOnce(&mut dyn ComponentInstance, Instant) -> Result<R, InvokeError> + Send + 'static,
        R: Send + 'static,
    {
        let mut guard = Arc::clone(instance).lock_owned().await;
        interrupt.reset();

        let started = Instant::now();
        let deadline = started + self.timeout;
        let mut cancel_on_drop = CancelOnDrop(Some(interrupt.clone()));

        let mut task = tokio::task::spawn_blocking(move || call(&mut **guard, deadline));

        let outcome = tokio::time::timeout(self.timeout, &mut task).await;
        cancel_on_drop.disarm();

        match outcome {
            Ok(Ok(result)) => {
                debug!(elapsed_ms = started.elapsed().as_millis(), "Invocation finished");
                result.map_err(translate::translate)
            }
            Ok(Err(join_error)) => Err(BridgeError::Crashed {
                message: format!("invocation panicked: {join_error}"),
            }),
            Err(_elapsed) => {
                interrupt.interrupt();
                warn!(
                    deadline_ms = self.timeout.as_millis(),
                    "Deadline exceeded, interrupting component"
                );
                match tokio::time::timeout(self.cancel_grace, &mut task).await {
                    Ok(_) => {
                        // Unwound and unlocked; later calls must not see a stale interrupt.
                        interrupt.reset();
                        debug!("Component unwound after interrupt");
                    }
                    Err(_) => warn!(
                        grace_ms = self.cancel_grace.as_millis(),
                        "Component did not yield within cancel grace; handle stays locked until it returns"
                    ),
                }
                Err(BridgeError::Timeout {
                    phase,
                    capability: capability.to_string(),
                    deadline: self.timeout,
                })
            }
        }
    }
}

/// Raises the interrupt if the caller drops the invocation future mid-call.
struct CancelOnDrop(Option<InterruptHandle>);

impl CancelOnDrop {
    fn disarm(&mut self) {
        self.0 = None;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(interrupt) = self.0.take() {
            interrupt.interrupt();
        }
    }
}
