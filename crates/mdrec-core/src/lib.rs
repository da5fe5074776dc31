pub mod cleanup;
pub mod config;
pub mod driver;
pub mod error;
pub mod label;
pub mod progress;
pub mod session;
pub mod settings;
pub mod source;

#[cfg(test)]
mod testing;

pub use cleanup::{CANCELLED_EXIT_CODE, CleanupCoordinator, HardwareGuard, SessionOutcome};
pub use config::{
    Calibration, DriftWarning, LabelMode, RecorderModel, SessionConfig, SessionMode, Timings,
    TmarkPolicy,
};
pub use driver::{Button, ButtonEvent, SignalDriver, SimulatedDriver};
pub use error::{DriverError, SessionError, SessionResult, SourceError};
pub use progress::{Progress, ProgressSink, StdoutProgress};
pub use session::{Session, SessionController, TimingBudget};
pub use settings::Settings;
pub use source::{
    DEFAULT_BEEFWEB_URL, PlaybackState, PlaylistProvider, PlaylistSource, TrackLabel,
    TrackListRequest,
};
