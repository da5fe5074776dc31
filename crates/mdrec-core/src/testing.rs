//! Test doubles for the signal driver and playlist source.
//!
//! Both doubles append to one shared [`CallLog`] so tests can assert the
//! interleaving of button events and playback commands, together with the
//! (paused) tokio clock time at which each call happened.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::{DriftWarning, LabelMode, RecorderModel, SessionConfig, Timings};
use crate::driver::{Button, ButtonEvent, SignalDriver};
use crate::error::{DriverError, SourceError};
use crate::progress::{Progress, ProgressSink};
use crate::source::{PlaybackState, PlaylistProvider, PlaylistSource, TrackLabel, TrackListRequest};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Press(Button, u32),
    LabelEntry,
    Type(String),
    Standby,
    Shutdown,
    Playback(PlaybackState),
    Remaining,
}

#[derive(Debug, Clone)]
pub struct CallLog {
    start: Instant,
    entries: Arc<Mutex<Vec<(Duration, Call)>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn push(&self, call: Call) {
        self.entries
            .lock()
            .unwrap()
            .push((self.start.elapsed(), call));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|(_, c)| c.clone())
            .collect()
    }

    pub fn timestamps(&self) -> Vec<Duration> {
        self.entries.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }
}

pub struct MockDriver {
    log: CallLog,
    fail_on_press: Option<usize>,
    presses: usize,
}

impl MockDriver {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            fail_on_press: None,
            presses: 0,
        }
    }

    /// Fail the nth (1-based) button press with an I/O error
    pub fn failing_on_press(mut self, n: usize) -> Self {
        self.fail_on_press = Some(n);
        self
    }
}

#[async_trait]
impl SignalDriver for MockDriver {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn press_button(&mut self, event: ButtonEvent) -> Result<(), DriverError> {
        self.presses += 1;
        if self.fail_on_press == Some(self.presses) {
            return Err(DriverError::Io(std::io::Error::other("device unplugged")));
        }
        self.log.push(Call::Press(event.button, event.repeat));
        Ok(())
    }

    async fn enter_label_entry(&mut self) -> Result<(), DriverError> {
        self.log.push(Call::LabelEntry);
        Ok(())
    }

    async fn type_string(&mut self, text: &str) -> Result<(), DriverError> {
        self.log.push(Call::Type(text.to_string()));
        Ok(())
    }

    async fn enter_record_standby(&mut self) -> Result<(), DriverError> {
        self.log.push(Call::Standby);
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), DriverError> {
        self.log.push(Call::Shutdown);
        Ok(())
    }
}

pub struct MockSource {
    log: CallLog,
    tracks: Vec<TrackLabel>,
    remaining: Mutex<VecDeque<f64>>,
    remaining_calls: AtomicUsize,
    cancel_on_remaining: Option<(usize, CancellationToken)>,
    fail_playback: bool,
}

impl MockSource {
    /// Remaining time reported once scripted values run out
    pub const DEFAULT_REMAINING: f64 = 10.0;

    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            tracks: vec!["A".into(), "B".into(), "C".into()],
            remaining: Mutex::new(VecDeque::new()),
            remaining_calls: AtomicUsize::new(0),
            cancel_on_remaining: None,
            fail_playback: false,
        }
    }

    pub fn with_tracks(mut self, tracks: &[&str]) -> Self {
        self.tracks = tracks.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_remaining(self, values: &[f64]) -> Self {
        *self.remaining.lock().unwrap() = values.iter().copied().collect();
        self
    }

    /// Cancel `token` while answering the nth (1-based) remaining-time query
    pub fn cancelling_on_remaining(mut self, n: usize, token: CancellationToken) -> Self {
        self.cancel_on_remaining = Some((n, token));
        self
    }

    pub fn failing_playback(mut self) -> Self {
        self.fail_playback = true;
        self
    }
}

#[async_trait]
impl PlaylistSource for MockSource {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn check_connectivity(&self) -> Result<(), SourceError> {
        Ok(())
    }

    async fn fetch_track_list(
        &self,
        _request: &TrackListRequest,
    ) -> Result<Vec<TrackLabel>, SourceError> {
        Ok(self.tracks.clone())
    }

    async fn current_track_remaining_secs(&self) -> Result<f64, SourceError> {
        self.log.push(Call::Remaining);
        let n = self.remaining_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((at, token)) = &self.cancel_on_remaining {
            if *at == n {
                token.cancel();
            }
        }
        Ok(self
            .remaining
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Self::DEFAULT_REMAINING))
    }

    async fn set_playback_state(&self, state: PlaybackState) -> Result<(), SourceError> {
        self.log.push(Call::Playback(state));
        if self.fail_playback {
            return Err(SourceError::NothingPlaying { provider: "mock" });
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordedProgress {
    pub values: Vec<Progress>,
    pub statuses: Vec<String>,
}

impl ProgressSink for RecordedProgress {
    fn progress(&mut self, progress: Progress) {
        self.values.push(progress);
    }

    fn status(&mut self, message: &str) {
        self.statuses.push(message.to_string());
    }
}

pub fn config(label_mode: LabelMode, disc_title: Option<&str>) -> SessionConfig {
    SessionConfig {
        label_template: "%artist% - %title%".into(),
        recorder: RecorderModel::default(),
        disc_title: disc_title.map(str::to_string),
        language_hint: None,
        provider: PlaylistProvider::Beefweb {
            base_url: "http://localhost:8880".into(),
        },
        label_mode,
        no_tmarks: false,
        timings: Timings::default(),
        drift_warning: DriftWarning::default(),
    }
}
