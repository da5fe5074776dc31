//! Recording and labelling session controller.
//!
//! Drives the recorder through one strictly ordered sequence per session:
//!
//! ```text
//! Silent        standby ─ settle ─ Pause ─ play playlist
//!               per track: label ─ wait out track ─ TMark | silence gap | Stop (last)
//! LiveLabel     per track: Play ─ Pause ─ label ─ Right | Stop (last)
//! EraseRelabel  as LiveLabel, erasing the old title before typing
//! all modes     TOC commit wait ─ optional disc title
//! ```
//!
//! Every wait is cancellable, and the cancellation token is also checked
//! before each track and before each hardware call.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::{DriftWarning, SessionConfig, SessionMode, Timings, TmarkPolicy};
use crate::driver::{Button, ButtonEvent, SignalDriver};
use crate::error::{SessionError, SessionResult};
use crate::progress::{Progress, ProgressSink};
use crate::source::{PlaybackState, PlaylistSource, TrackLabel};

/// Everything the controller needs to know about one invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub mode: SessionMode,
    pub tracks: Vec<TrackLabel>,
    pub disc_title: Option<String>,
    pub tmark_policy: TmarkPolicy,
}

impl Session {
    pub fn new(
        mode: SessionMode,
        tracks: Vec<TrackLabel>,
        disc_title: Option<String>,
        tmark_policy: TmarkPolicy,
    ) -> Self {
        Self {
            mode,
            tracks,
            disc_title,
            tmark_policy,
        }
    }

    /// Fetch the track list once and build the session from configuration.
    ///
    /// Runs before any hardware action, so an empty playlist never touches
    /// the recorder.
    pub async fn load(
        source: &dyn PlaylistSource,
        config: &SessionConfig,
        progress: &mut dyn ProgressSink,
    ) -> SessionResult<Self> {
        let tracks = source
            .fetch_track_list(&config.track_list_request())
            .await?;
        if tracks.is_empty() {
            return Err(SessionError::EmptyTrackList);
        }

        progress.status("The following tracks will be labelled:");
        for track in &tracks {
            progress.status(track);
        }

        Ok(Self::new(
            config.session_mode(),
            tracks,
            config.disc_title.clone().filter(|t| !t.trim().is_empty()),
            config.tmark_policy(),
        ))
    }
}

/// Wait before the track boundary, derived from the measured remaining time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingBudget {
    raw_secs: f64,
}

impl TimingBudget {
    pub fn new(remaining_secs: f64, offset_secs: f64) -> Self {
        Self {
            raw_secs: remaining_secs - offset_secs,
        }
    }

    /// Unclamped budget; negative when labelling overran the track
    pub fn raw_secs(&self) -> f64 {
        self.raw_secs
    }

    /// Duration to actually wait, never negative
    pub fn wait(&self) -> Duration {
        Duration::try_from_secs_f64(self.raw_secs.max(0.0)).unwrap_or(Duration::ZERO)
    }

    pub fn exceeds(&self, warning: DriftWarning) -> bool {
        match warning {
            DriftWarning::Disabled => false,
            DriftWarning::Below { threshold_secs } => self.raw_secs < -threshold_secs.abs(),
        }
    }
}

/// Runs a [`Session`] against a signal driver and a playlist source
pub struct SessionController<'a> {
    driver: &'a mut dyn SignalDriver,
    source: &'a dyn PlaylistSource,
    progress: &'a mut dyn ProgressSink,
    timings: Timings,
    drift_warning: DriftWarning,
    cancel: CancellationToken,
}

impl<'a> SessionController<'a> {
    pub fn new(
        driver: &'a mut dyn SignalDriver,
        source: &'a dyn PlaylistSource,
        progress: &'a mut dyn ProgressSink,
        timings: Timings,
        drift_warning: DriftWarning,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            driver,
            source,
            progress,
            timings,
            drift_warning,
            cancel,
        }
    }

    pub async fn run(&mut self, session: &Session) -> SessionResult<()> {
        if session.tracks.is_empty() {
            return Err(SessionError::EmptyTrackList);
        }
        tracing::info!(
            mode = ?session.mode,
            tracks = session.tracks.len(),
            driver = self.driver.name(),
            source = self.source.name(),
            "Starting session"
        );
        if let Some(notice) = self.driver.notice() {
            self.progress.status(notice);
        }

        if session.mode == SessionMode::Silent {
            self.arm_recording().await?;
        }

        let total = session.tracks.len();
        for (index, label) in session.tracks.iter().enumerate() {
            self.checkpoint()?;
            let is_last = index + 1 == total;

            match session.mode {
                SessionMode::Silent => self.progress.status(&format!("Recording: {label}")),
                _ => self.progress.status(&format!("Labelling: {label}")),
            }
            self.progress.progress(Progress::track(index, total));

            if session.mode.is_post_hoc() {
                self.relabel_track(label, is_last, session.mode.erases_titles())
                    .await?;
            } else {
                self.record_track(label, is_last, session.tmark_policy)
                    .await?;
            }
        }

        self.finish(session).await
    }

    /// Record-standby, then start recording and the playlist together
    async fn arm_recording(&mut self) -> SessionResult<()> {
        self.progress.status("Wait for REC Standby...");
        self.progress.progress(Progress::indeterminate());

        self.checkpoint()?;
        self.driver.enter_record_standby().await?;
        self.wait(self.timings.standby_settle).await?;

        self.press(Button::Pause).await?;
        self.checkpoint()?;
        self.source
            .set_playback_state(PlaybackState::StartFromFirst)
            .await?;
        Ok(())
    }

    async fn record_track(
        &mut self,
        label: &str,
        is_last: bool,
        policy: TmarkPolicy,
    ) -> SessionResult<()> {
        self.enter_label(label, false).await?;

        self.checkpoint()?;
        let remaining = self.source.current_track_remaining_secs().await?;
        let budget = TimingBudget::new(remaining, self.timings.tmark_offset_secs);
        self.progress.status(&format!(
            "Track labelled. Time to TMark: {:.0}s",
            remaining
        ));
        if budget.exceeds(self.drift_warning) {
            tracing::warn!(
                remaining_secs = remaining,
                overrun_secs = -budget.raw_secs(),
                "Labelling took longer than the track; the boundary will be late"
            );
        }
        self.wait(budget.wait()).await?;

        if is_last {
            // Stopping writes the TOC instead of starting another track
            return self.press(Button::Stop).await;
        }
        match policy {
            TmarkPolicy::TrackMark => self.press(Button::TMark).await,
            TmarkPolicy::SilenceGap => {
                self.set_playback(PlaybackState::Pause).await?;
                self.wait(self.timings.silence_gap).await?;
                self.set_playback(PlaybackState::Play).await
            }
        }
    }

    async fn relabel_track(&mut self, label: &str, is_last: bool, erase: bool) -> SessionResult<()> {
        // Play then Pause parks the transport at the start of the track
        self.press(Button::Play).await?;
        self.wait(self.timings.pulse_settle).await?;
        self.press(Button::Pause).await?;
        self.wait(self.timings.pulse_settle).await?;

        self.enter_label(label, erase).await?;

        if is_last {
            self.press(Button::Stop).await
        } else {
            self.press(Button::Right).await
        }
    }

    async fn finish(&mut self, session: &Session) -> SessionResult<()> {
        self.progress.status("Waiting for TOC to save...");
        self.progress.progress(Progress::indeterminate());
        self.wait(self.timings.toc_commit).await?;

        if let Some(title) = &session.disc_title {
            self.progress.status("Labelling album title...");
            self.enter_label(title, session.mode.erases_titles())
                .await?;
            self.press(Button::Stop).await?;
            self.wait(self.timings.final_settle).await?;
        }

        tracing::info!("Session complete");
        Ok(())
    }

    async fn enter_label(&mut self, text: &str, erase: bool) -> SessionResult<()> {
        self.checkpoint()?;
        self.driver.enter_label_entry().await?;
        if erase {
            self.checkpoint()?;
            let event = ButtonEvent::new(Button::Playmode, self.timings.press)
                .repeated(self.timings.erase_repeats);
            self.driver.press_button(event).await?;
        }
        self.checkpoint()?;
        self.driver.type_string(text).await?;
        Ok(())
    }

    async fn press(&mut self, button: Button) -> SessionResult<()> {
        self.checkpoint()?;
        self.driver
            .press_button(ButtonEvent::new(button, self.timings.press))
            .await?;
        Ok(())
    }

    async fn set_playback(&mut self, state: PlaybackState) -> SessionResult<()> {
        self.checkpoint()?;
        self.source.set_playback_state(state).await?;
        Ok(())
    }

    fn checkpoint(&self) -> SessionResult<()> {
        if self.cancel.is_cancelled() {
            return Err(SessionError::Cancelled);
        }
        Ok(())
    }

    /// The only suspension primitive: a sleep that ends early on cancellation
    async fn wait(&self, duration: Duration) -> SessionResult<()> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(SessionError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}
