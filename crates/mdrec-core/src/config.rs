use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::source::{PlaylistProvider, TrackListRequest};

/// Default button press length in milliseconds
pub const DEFAULT_PRESS_MS: u64 = 150;
/// Default calibration offset subtracted from the remaining play time
pub const DEFAULT_TMARK_OFFSET_SECS: f64 = 1.0;
/// Number of Playmode repeats that clear an existing title
pub const ERASE_REPEATS: u32 = 128;

/// Supported Sony portable recorder families
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum RecorderModel {
    #[default]
    R55ToR900,
    R55ToR900Jpn,
    R55ToR900JpnEarlyFw,
    R909,
    R909Jpn,
}

impl RecorderModel {
    /// Get the string identifier for this recorder family
    pub fn as_str(&self) -> &'static str {
        match self {
            RecorderModel::R55ToR900 => "r55-r900",
            RecorderModel::R55ToR900Jpn => "r55-r900-jpn",
            RecorderModel::R55ToR900JpnEarlyFw => "r55-r900-jpn-early-fw",
            RecorderModel::R909 => "r909",
            RecorderModel::R909Jpn => "r909-jpn",
        }
    }

    /// Human-readable name, as printed on the recorder selection list
    pub fn display_name(&self) -> &'static str {
        match self {
            RecorderModel::R55ToR900 => "R55 through R900",
            RecorderModel::R55ToR900Jpn => "R55 through R900 JPN",
            RecorderModel::R55ToR900JpnEarlyFw => "R55 through R900 JPN early FW",
            RecorderModel::R909 => "R909/R910/N1",
            RecorderModel::R909Jpn => "R909/R910/N1 JPN",
        }
    }

    /// List all supported recorder families
    pub fn all() -> &'static [RecorderModel] {
        &[
            RecorderModel::R55ToR900,
            RecorderModel::R55ToR900Jpn,
            RecorderModel::R55ToR900JpnEarlyFw,
            RecorderModel::R909,
            RecorderModel::R909Jpn,
        ]
    }

    /// Whether the recorder firmware has the Japanese (kana) character set
    pub fn is_japanese(&self) -> bool {
        matches!(
            self,
            RecorderModel::R55ToR900Jpn
                | RecorderModel::R55ToR900JpnEarlyFw
                | RecorderModel::R909Jpn
        )
    }
}

impl fmt::Display for RecorderModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for RecorderModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        RecorderModel::all()
            .iter()
            .find(|m| m.as_str() == needle || m.display_name().to_lowercase() == needle)
            .copied()
            .ok_or_else(|| {
                format!(
                    "Unknown recorder: {}. Available: {}",
                    s,
                    RecorderModel::all()
                        .iter()
                        .map(|m| m.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
    }
}

/// What to do with the disc in the recorder (`--only-label`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LabelMode {
    /// Record the playlist and title tracks as they are recorded
    #[default]
    Off,
    /// Title the tracks of an already recorded disc
    On,
    /// Like `On`, clearing existing titles first
    Erase,
}

impl LabelMode {
    pub fn session_mode(&self) -> SessionMode {
        match self {
            LabelMode::Off => SessionMode::Silent,
            LabelMode::On => SessionMode::LiveLabel,
            LabelMode::Erase => SessionMode::EraseRelabel,
        }
    }
}

impl std::str::FromStr for LabelMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "OFF" => Ok(LabelMode::Off),
            "ON" => Ok(LabelMode::On),
            "ERASE" => Ok(LabelMode::Erase),
            _ => Err(format!("Unknown label mode: {}. Available: OFF, ON, ERASE", s)),
        }
    }
}

/// Operating mode of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Record from the playlist, titling each track while it plays
    Silent,
    /// Title tracks of a finished recording
    LiveLabel,
    /// Erase then title tracks of a finished recording
    EraseRelabel,
}

impl SessionMode {
    pub fn is_post_hoc(&self) -> bool {
        !matches!(self, SessionMode::Silent)
    }

    pub fn erases_titles(&self) -> bool {
        matches!(self, SessionMode::EraseRelabel)
    }
}

/// How track boundaries are created while recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TmarkPolicy {
    /// Press TMark at each boundary
    TrackMark,
    /// Pause playback for a short silence and let the recorder split on it
    SilenceGap,
}

/// Hardware timing constants used by the session controller.
#[derive(Debug, Clone, PartialEq)]
pub struct Timings {
    pub press: Duration,
    /// Subtracted from the remaining play time before the track boundary
    pub tmark_offset_secs: f64,
    pub standby_settle: Duration,
    /// Gap between transport pulses so the recorder does not see a double press
    pub pulse_settle: Duration,
    pub silence_gap: Duration,
    pub toc_commit: Duration,
    pub final_settle: Duration,
    pub erase_repeats: u32,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            press: Duration::from_millis(DEFAULT_PRESS_MS),
            tmark_offset_secs: DEFAULT_TMARK_OFFSET_SECS,
            standby_settle: Duration::from_secs(8),
            pulse_settle: Duration::from_millis(100),
            silence_gap: Duration::from_millis(2100),
            toc_commit: Duration::from_secs(12),
            final_settle: Duration::from_secs(8),
            erase_repeats: ERASE_REPEATS,
        }
    }
}

impl Timings {
    /// Default timings with a stored calibration applied.
    ///
    /// Every recorder family shares the same defaults; per-recorder tuning
    /// comes only from the calibration saved for that recorder.
    pub fn calibrated(calibration: Option<&Calibration>) -> Self {
        let mut timings = Self::default();
        if let Some(cal) = calibration {
            if let Some(ms) = cal.press_ms {
                timings.press = Duration::from_millis(ms);
            }
            if let Some(offset) = cal.tmark_offset_secs {
                timings.tmark_offset_secs = offset;
            }
        }
        tracing::debug!(?timings, "Resolved timings");
        timings
    }
}

/// Per-recorder calibration persisted in the settings file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub press_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmark_offset_secs: Option<f64>,
}

/// When to warn about a track boundary that could not be placed on time
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriftWarning {
    Disabled,
    /// Warn when the unclamped wait drops below `-threshold_secs`
    Below { threshold_secs: f64 },
}

impl Default for DriftWarning {
    fn default() -> Self {
        DriftWarning::Below {
            threshold_secs: 0.0,
        }
    }
}

/// Fully resolved configuration for one invocation
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub label_template: String,
    pub recorder: RecorderModel,
    pub disc_title: Option<String>,
    pub language_hint: Option<String>,
    pub provider: PlaylistProvider,
    pub label_mode: LabelMode,
    pub no_tmarks: bool,
    pub timings: Timings,
    pub drift_warning: DriftWarning,
}

impl SessionConfig {
    pub fn session_mode(&self) -> SessionMode {
        self.label_mode.session_mode()
    }

    pub fn tmark_policy(&self) -> TmarkPolicy {
        if self.no_tmarks {
            TmarkPolicy::SilenceGap
        } else {
            TmarkPolicy::TrackMark
        }
    }

    pub fn track_list_request(&self) -> TrackListRequest {
        TrackListRequest {
            template: self.label_template.clone(),
            language_hint: self.language_hint.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_from_display_name() {
        let model: RecorderModel = "R909/R910/N1 JPN".parse().unwrap();
        assert_eq!(model, RecorderModel::R909Jpn);
        assert!(model.is_japanese());
    }

    #[test]
    fn test_recorder_from_identifier() {
        let model: RecorderModel = "r55-r900".parse().unwrap();
        assert_eq!(model, RecorderModel::R55ToR900);
        assert!(!model.is_japanese());
        assert!("R1000".parse::<RecorderModel>().is_err());
    }

    #[test]
    fn test_label_mode_maps_to_session_mode() {
        assert_eq!("off".parse::<LabelMode>().unwrap().session_mode(), SessionMode::Silent);
        assert_eq!("ON".parse::<LabelMode>().unwrap().session_mode(), SessionMode::LiveLabel);
        assert!(LabelMode::Erase.session_mode().erases_titles());
        assert!(!LabelMode::On.session_mode().erases_titles());
    }

    #[test]
    fn test_calibration_overrides_defaults() {
        let cal = Calibration {
            press_ms: Some(200),
            tmark_offset_secs: None,
        };
        let timings = Timings::calibrated(Some(&cal));
        assert_eq!(timings.press, Duration::from_millis(200));
        assert_eq!(timings.tmark_offset_secs, DEFAULT_TMARK_OFFSET_SECS);
        assert_eq!(timings.silence_gap, Duration::from_millis(2100));
        assert_eq!(Timings::calibrated(None), Timings::default());
    }
}
