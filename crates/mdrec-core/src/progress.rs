//! Progress reporting.
//!
//! Progress is printed as `Progress: <current>/<total>` lines so a wrapper UI
//! can pick it up with a regex like `^Progress: (-?\d+)/(\d+)$`. A current
//! value of `-1` marks an indeterminate wait.

use std::fmt;
use std::io::Write;

/// One progress value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub current: i64,
    pub total: u64,
}

impl Progress {
    /// Long wait with no measurable progress (standby, TOC commit)
    pub fn indeterminate() -> Self {
        Self {
            current: -1,
            total: 1,
        }
    }

    /// Progress at the start of processing track `index` (0-based)
    pub fn track(index: usize, total: usize) -> Self {
        Self {
            current: (index + 1) as i64,
            total: total as u64,
        }
    }

    pub fn is_indeterminate(&self) -> bool {
        self.current < 0
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Progress: {}/{}", self.current, self.total)
    }
}

/// Receiver for progress values and operator status lines
pub trait ProgressSink: Send {
    fn progress(&mut self, progress: Progress);

    fn status(&mut self, message: &str);
}

/// Prints to stdout, flushing after every line
#[derive(Debug, Default)]
pub struct StdoutProgress {
    /// Suppress `Progress:` lines (status lines are still printed)
    pub quiet_progress: bool,
}

impl StdoutProgress {
    fn emit(line: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "{line}");
        let _ = stdout.flush();
    }
}

impl ProgressSink for StdoutProgress {
    fn progress(&mut self, progress: Progress) {
        if !self.quiet_progress {
            Self::emit(&progress.to_string());
        }
    }

    fn status(&mut self, message: &str) {
        Self::emit(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_line_format() {
        assert_eq!(Progress::indeterminate().to_string(), "Progress: -1/1");
        assert_eq!(Progress::track(0, 3).to_string(), "Progress: 1/3");
        assert_eq!(Progress::track(2, 3).to_string(), "Progress: 3/3");
    }

    #[test]
    fn test_indeterminate_flag() {
        assert!(Progress::indeterminate().is_indeterminate());
        assert!(!Progress::track(0, 1).is_indeterminate());
    }
}
