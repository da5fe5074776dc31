use anyhow::{Context, Result, anyhow};
use mdrec_core::settings::SPOTIFY_TOKEN_ENV_VAR;
use mdrec_core::{
    Calibration, CleanupCoordinator, DEFAULT_BEEFWEB_URL, DriftWarning, PlaylistProvider,
    Session, SessionConfig, SessionOutcome, Settings, SimulatedDriver, StdoutProgress, Timings,
};
use tokio_util::sync::CancellationToken;

use crate::args::Args;

/// Pick the playlist provider from the arguments and stored settings
pub fn resolve_provider(args: &Args, settings: &Settings) -> Result<PlaylistProvider> {
    if let Some(uri) = &args.spotify {
        let token = settings.spotify_token().ok_or_else(|| {
            anyhow!(
                "No Spotify access token configured.\n\
                 Set the {SPOTIFY_TOKEN_ENV_VAR} environment variable or add \
                 \"spotify_access_token\" to {}",
                Settings::path().display()
            )
        })?;
        return Ok(PlaylistProvider::Spotify {
            playlist_uri: uri.clone(),
            token,
        });
    }

    let base_url = args
        .beefweb_url
        .clone()
        .or_else(|| settings.beefweb_url.clone())
        .unwrap_or_else(|| DEFAULT_BEEFWEB_URL.to_string());
    Ok(PlaylistProvider::Beefweb { base_url })
}

/// Build the immutable session configuration
pub fn load_session_config(args: &Args, settings: &Settings) -> Result<SessionConfig> {
    let mut timings = Timings::calibrated(settings.calibration_for(args.recorder));
    if let Some(ms) = args.press_ms {
        timings.press = std::time::Duration::from_millis(ms);
    }
    if let Some(offset) = args.offset {
        timings.tmark_offset_secs = offset;
    }

    let drift_warning = if args.no_drift_warn {
        DriftWarning::Disabled
    } else {
        match args.drift_warn {
            Some(threshold_secs) => DriftWarning::Below { threshold_secs },
            None => DriftWarning::default(),
        }
    };

    Ok(SessionConfig {
        label_template: args.label.clone(),
        recorder: args.recorder,
        disc_title: args.disc_title.clone(),
        language_hint: args.language_hint.clone(),
        provider: resolve_provider(args, settings)?,
        label_mode: args.only_label,
        no_tmarks: args.no_tmarks,
        timings,
        drift_warning,
    })
}

fn save_calibration(args: &Args, settings: &mut Settings) -> Result<()> {
    settings.set_calibration(
        args.recorder,
        Calibration {
            press_ms: args.press_ms,
            tmark_offset_secs: args.offset,
        },
    );
    settings.save().context("Failed to save calibration")?;
    println!(
        "Saved calibration for {} to {}",
        args.recorder,
        Settings::path().display()
    );
    Ok(())
}

/// Run one session end to end.
///
/// Nothing touches the recorder until the provider has answered the
/// connectivity probe and returned a non-empty track list.
pub async fn run(args: Args, cancel: CancellationToken) -> Result<SessionOutcome> {
    let mut settings = Settings::load();
    if args.save_calibration {
        save_calibration(&args, &mut settings)?;
    }

    let config = load_session_config(&args, &settings)?;
    let provider_name = config.provider.display_name();
    let source = config
        .provider
        .build()
        .with_context(|| format!("Failed to set up {provider_name}"))?;

    tracing::info!(
        provider = provider_name,
        recorder = config.recorder.as_str(),
        mode = ?config.session_mode(),
        "Checking playlist source"
    );
    tokio::select! {
        _ = cancel.cancelled() => return Ok(SessionOutcome::Cancelled),
        checked = source.check_connectivity() => {
            checked.with_context(|| format!("Cannot connect to {provider_name}"))?;
        }
    }

    let mut progress = StdoutProgress {
        quiet_progress: args.no_progress,
    };
    let session = tokio::select! {
        _ = cancel.cancelled() => return Ok(SessionOutcome::Cancelled),
        loaded = Session::load(source.as_ref(), &config, &mut progress) => {
            loaded.context("Failed to load the track list")?
        }
    };

    let driver = SimulatedDriver::new(config.recorder, config.timings.press);
    let outcome = CleanupCoordinator::new(Box::new(driver), cancel)
        .run(
            source.as_ref(),
            &mut progress,
            &session,
            &config.timings,
            config.drift_warning,
        )
        .await?;
    Ok(outcome)
}
