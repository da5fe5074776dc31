//! Cleanup coordination.
//!
//! The signal driver is acquired once per session and must be released
//! exactly once whatever happens: normal completion, a driver or source
//! fault, user cancellation, or a panic unwinding through the session.
//! [`HardwareGuard`] enforces the "exactly once" part; [`CleanupCoordinator`]
//! is the single exit path that decides what happens before release.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::{DriftWarning, Timings};
use crate::driver::{Button, ButtonEvent, SignalDriver};
use crate::error::{DriverError, SessionError};
use crate::progress::ProgressSink;
use crate::session::{Session, SessionController};
use crate::source::{PlaybackState, PlaylistSource};

/// Exit status for a session stopped on request
pub const CANCELLED_EXIT_CODE: u8 = 130;

/// Upper bound for each best-effort stop call
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// How a session ended when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed,
    Cancelled,
}

impl SessionOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            SessionOutcome::Completed => 0,
            SessionOutcome::Cancelled => CANCELLED_EXIT_CODE,
        }
    }
}

/// Owns the signal driver and shuts it down exactly once.
pub struct HardwareGuard {
    driver: Box<dyn SignalDriver>,
    released: bool,
}

impl HardwareGuard {
    pub fn new(driver: Box<dyn SignalDriver>) -> Self {
        Self {
            driver,
            released: false,
        }
    }

    pub fn driver_mut(&mut self) -> &mut dyn SignalDriver {
        self.driver.as_mut()
    }

    /// Shut the driver down. Later calls are no-ops.
    pub fn release(&mut self) -> Result<(), DriverError> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        tracing::debug!(driver = self.driver.name(), "Releasing signal driver");
        self.driver.shutdown()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for HardwareGuard {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = self.release() {
                tracing::error!("Failed to shut down signal driver: {e}");
            }
        }
    }
}

/// Runs a session inside the hardware guard and handles every way it can end
pub struct CleanupCoordinator {
    guard: HardwareGuard,
    cancel: CancellationToken,
}

impl CleanupCoordinator {
    pub fn new(driver: Box<dyn SignalDriver>, cancel: CancellationToken) -> Self {
        Self {
            guard: HardwareGuard::new(driver),
            cancel,
        }
    }

    /// Run the session, then return the hardware to a safe state.
    ///
    /// Cancellation is reported as `Ok(SessionOutcome::Cancelled)` after the
    /// best-effort stop sequence. Faults are returned unchanged after the
    /// driver has been released; a failure to release does not replace them.
    pub async fn run(
        mut self,
        source: &dyn PlaylistSource,
        progress: &mut dyn ProgressSink,
        session: &Session,
        timings: &Timings,
        drift_warning: DriftWarning,
    ) -> Result<SessionOutcome, SessionError> {
        let result = {
            let mut controller = SessionController::new(
                self.guard.driver_mut(),
                source,
                &mut *progress,
                timings.clone(),
                drift_warning,
                self.cancel.clone(),
            );
            controller.run(session).await
        };

        match result {
            Ok(()) => {
                self.guard.release()?;
                Ok(SessionOutcome::Completed)
            }
            Err(SessionError::Cancelled) => {
                tracing::warn!("Session cancelled, stopping recorder");
                self.stop_recorder(source, timings.press).await;
                progress.status("Cleaning up.");
                self.release_logged();
                Ok(SessionOutcome::Cancelled)
            }
            Err(SessionError::Source(e)) => {
                // The recorder is still running; close the disc before letting go
                tracing::error!("Playlist source failed mid-session: {e}");
                self.stop_recorder(source, timings.press).await;
                self.release_logged();
                Err(SessionError::Source(e))
            }
            Err(e) => {
                tracing::error!("Session failed: {e}");
                self.release_logged();
                Err(e)
            }
        }
    }

    /// Stop button and playback stop; failures are logged, never raised
    async fn stop_recorder(&mut self, source: &dyn PlaylistSource, press: Duration) {
        let stop = ButtonEvent::new(Button::Stop, press);
        match tokio::time::timeout(STOP_TIMEOUT, self.guard.driver_mut().press_button(stop)).await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("Could not press Stop during cleanup: {e}"),
            Err(_) => tracing::warn!("Timed out pressing Stop during cleanup"),
        }
        match tokio::time::timeout(STOP_TIMEOUT, source.set_playback_state(PlaybackState::Stop))
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("Could not stop playback during cleanup: {e}"),
            Err(_) => tracing::warn!("Timed out stopping playback during cleanup"),
        }
    }

    fn release_logged(&mut self) {
        if let Err(e) = self.guard.release() {
            tracing::error!("Failed to shut down signal driver: {e}");
        }
    }
}
