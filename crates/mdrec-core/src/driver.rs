//! Signal driver interface.
//!
//! A driver turns button events into the resistance values the recorder's
//! remote input understands. The session controller only ever talks to the
//! [`SignalDriver`] trait and owns the driver exclusively for a session.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

use crate::config::RecorderModel;
use crate::error::DriverError;

/// Front-panel buttons the controller presses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Play,
    Pause,
    Stop,
    TMark,
    Playmode,
    Right,
}

impl Button {
    pub fn as_str(&self) -> &'static str {
        match self {
            Button::Play => "Play",
            Button::Pause => "Pause",
            Button::Stop => "Stop",
            Button::TMark => "TMark",
            Button::Playmode => "Playmode",
            Button::Right => "Right",
        }
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single emulated button gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub button: Button,
    pub press: Duration,
    pub repeat: u32,
}

impl ButtonEvent {
    pub fn new(button: Button, press: Duration) -> Self {
        Self {
            button,
            press,
            repeat: 1,
        }
    }

    pub fn repeated(mut self, repeat: u32) -> Self {
        self.repeat = repeat;
        self
    }
}

/// Primitive button and text emulation on the recorder.
///
/// Every call blocks (asynchronously) until the gesture is complete, so the
/// controller can account for its duration.
#[async_trait]
pub trait SignalDriver: Send {
    /// Backend identifier for logging
    fn name(&self) -> &'static str;

    /// Line shown to the operator before a session starts, if any
    fn notice(&self) -> Option<&'static str> {
        None
    }

    async fn press_button(&mut self, event: ButtonEvent) -> Result<(), DriverError>;

    /// Put the recorder into its title entry state
    async fn enter_label_entry(&mut self) -> Result<(), DriverError>;

    /// Type text into the title entry and confirm it
    async fn type_string(&mut self, text: &str) -> Result<(), DriverError>;

    /// Arm the recorder (record-pause)
    async fn enter_record_standby(&mut self) -> Result<(), DriverError>;

    /// Release the signal device. Must be safe to call from `Drop`.
    fn shutdown(&mut self) -> Result<(), DriverError>;
}

/// Driver that performs no I/O and paces itself like the hardware would.
///
/// Used for dry runs: every gesture is logged and takes roughly as long as
/// it would on a real recorder.
#[derive(Debug)]
pub struct SimulatedDriver {
    recorder: RecorderModel,
    press: Duration,
    shut_down: bool,
}

impl SimulatedDriver {
    pub fn new(recorder: RecorderModel, press: Duration) -> Self {
        tracing::info!(recorder = recorder.as_str(), "Simulated signal driver ready");
        Self {
            recorder,
            press,
            shut_down: false,
        }
    }

    fn ensure_open(&self) -> Result<(), DriverError> {
        if self.shut_down {
            return Err(DriverError::Unavailable("driver already shut down".into()));
        }
        Ok(())
    }

    fn check_charset(&self, text: &str) -> Result<(), DriverError> {
        let japanese = self.recorder.is_japanese();
        match text
            .chars()
            .find(|c| !(c.is_ascii() || (japanese && is_kana(*c))))
        {
            Some(c) => Err(DriverError::UnsupportedCharacter(c)),
            None => Ok(()),
        }
    }
}

fn is_kana(c: char) -> bool {
    matches!(c, '\u{3040}'..='\u{30ff}' | '\u{ff61}'..='\u{ff9f}')
}

#[async_trait]
impl SignalDriver for SimulatedDriver {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn notice(&self) -> Option<&'static str> {
        Some("Dry run: no recorder is connected, button presses are only simulated.")
    }

    async fn press_button(&mut self, event: ButtonEvent) -> Result<(), DriverError> {
        self.ensure_open()?;
        tracing::debug!(button = %event.button, repeat = event.repeat, "press");
        tokio::time::sleep(event.press * event.repeat.max(1)).await;
        Ok(())
    }

    async fn enter_label_entry(&mut self) -> Result<(), DriverError> {
        self.ensure_open()?;
        tracing::debug!("enter label entry");
        tokio::time::sleep(self.press * 2).await;
        Ok(())
    }

    async fn type_string(&mut self, text: &str) -> Result<(), DriverError> {
        self.ensure_open()?;
        self.check_charset(text)?;
        tracing::debug!(text, "type");
        let chars = text.chars().count() as u32;
        tokio::time::sleep(self.press * (chars + 1)).await;
        Ok(())
    }

    async fn enter_record_standby(&mut self) -> Result<(), DriverError> {
        self.ensure_open()?;
        tracing::debug!("enter record standby");
        tokio::time::sleep(self.press).await;
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), DriverError> {
        if !self.shut_down {
            tracing::info!("Simulated signal driver shut down");
            self.shut_down = true;
        }
        Ok(())
    }
}
