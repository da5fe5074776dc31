use clap::{ArgGroup, Parser};
use mdrec_core::{LabelMode, RecorderModel};

#[derive(Parser, Debug)]
#[command(name = "mdrec")]
#[command(version)]
#[command(group(ArgGroup::new("calibration").multiple(true).args(["offset", "press_ms"])))]
#[command(
    about = "Record and label MDs on Sony portable recorders",
    long_about = "Record a playlist onto a MiniDisc in real time and title every track \
                  by emulating the remote control buttons, or title the tracks of a disc \
                  that is already recorded."
)]
pub struct Args {
    /// Track label template, e.g. "%artist% - %title%"
    #[arg(default_value = "%artist% - %title%")]
    pub label: String,

    /// Recorder family (e.g. r55-r900, r909-jpn, or the display name)
    #[arg(default_value = "r55-r900")]
    pub recorder: RecorderModel,

    /// Title for the whole disc, typed after the tracks
    #[arg(long)]
    pub disc_title: Option<String>,

    /// Language for track metadata (e.g. "ja"), where the provider supports it
    #[arg(long)]
    pub language_hint: Option<String>,

    /// Use a Spotify playlist instead of foobar2000
    #[arg(long, value_name = "URI")]
    pub spotify: Option<String>,

    /// Base URL of the foobar2000 beefweb plugin
    #[arg(long, value_name = "URL")]
    pub beefweb_url: Option<String>,

    /// Title an already recorded disc instead of recording (OFF, ON, ERASE)
    #[arg(long, alias = "only_label", value_name = "MODE", default_value = "OFF")]
    pub only_label: LabelMode,

    /// Separate tracks with a short silence instead of track marks
    #[arg(long)]
    pub no_tmarks: bool,

    /// Seconds before the end of a track to place the track mark
    #[arg(long, value_name = "SECS", allow_negative_numbers = true)]
    pub offset: Option<f64>,

    /// Button press length in milliseconds
    #[arg(long, value_name = "MS")]
    pub press_ms: Option<u64>,

    /// Store --offset/--press-ms as the calibration for this recorder
    #[arg(long, requires = "calibration")]
    pub save_calibration: bool,

    /// Warn when labelling overruns a track by more than this many seconds
    #[arg(long, value_name = "SECS", conflicts_with = "no_drift_warn")]
    pub drift_warn: Option<f64>,

    /// Never warn about late track marks
    #[arg(long)]
    pub no_drift_warn: bool,

    /// Do not print "Progress:" lines
    #[arg(long)]
    pub no_progress: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn has_calibration(&self) -> bool {
        self.offset.is_some() || self.press_ms.is_some()
    }
}
