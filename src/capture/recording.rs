//! Recording output configuration
//!
//! Selects the recording encoder from the engine-reported list and writes the
//! advanced-mode output settings (encoder, bitrate, path, container, FPS)
//! before the first recording starts.

use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

use crate::config::RecordingConfig;
use crate::engine::SettingsStore;
use crate::error::Result;

/// Encoder used when the engine reports none
pub const DEFAULT_ENCODER: &str = "x264";

/// Bitrate for AMF encoders, which cannot take the lossless sentinel
pub const AMF_BITRATE: u32 = 50_000;

/// Upper bitrate limit applied to every encoder
pub const MAX_BITRATE: u32 = 300_000;

const LOSSLESS: &str = "Lossless";

/// How the recording bitrate is expressed to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitratePolicy {
    /// Lossless sentinel value
    Lossless,
    /// Explicit bitrate in Kbps
    Fixed(u32),
}

impl BitratePolicy {
    pub fn setting_value(&self) -> Value {
        match self {
            Self::Lossless => Value::from(LOSSLESS),
            Self::Fixed(kbps) => Value::from(*kbps),
        }
    }
}

/// Encoder and bitrate chosen for recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderChoice {
    pub encoder: String,
    pub bitrate: BitratePolicy,
    pub max_bitrate: u32,
}

impl EncoderChoice {
    /// Choose from encoders in engine preference order (recommended last)
    pub fn from_available(available: &[String]) -> Self {
        let encoder = available
            .last()
            .cloned()
            .unwrap_or_else(|| DEFAULT_ENCODER.to_string());

        // AMF reads "Lossless" as a zero bitrate and fails to start
        let bitrate = if encoder.to_lowercase().contains("amf") {
            BitratePolicy::Fixed(AMF_BITRATE)
        } else {
            BitratePolicy::Lossless
        };

        Self {
            encoder,
            bitrate,
            max_bitrate: MAX_BITRATE,
        }
    }
}

/// Query the engine's recording encoders and pick one
pub fn select_encoder<S: SettingsStore + ?Sized>(store: &mut S) -> EncoderChoice {
    let available: Vec<String> = store
        .get_available_values("Output", "Recording", "RecEncoder")
        .into_iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();

    debug!("Available recording encoders: {:?}", available);
    EncoderChoice::from_available(&available)
}

/// Write the recording output settings
pub fn configure_output<S: SettingsStore + ?Sized>(
    store: &mut S,
    output_path: &Path,
    config: &RecordingConfig,
) -> Result<EncoderChoice> {
    store.set_setting("Output", "Mode", "Advanced")?;

    let choice = select_encoder(store);
    store.set_setting("Output", "RecEncoder", choice.encoder.as_str())?;
    store.set_setting("Output", "Recbitrate", choice.bitrate.setting_value())?;
    store.set_setting("Output", "Recmax_bitrate", choice.max_bitrate)?;

    store.set_setting(
        "Output",
        "RecFilePath",
        output_path.to_string_lossy().into_owned(),
    )?;
    store.set_setting("Output", "RecFormat", config.format.as_str())?;
    store.set_setting("Video", "FPSCommon", config.fps)?;

    info!(
        "Recording output configured: encoder={}, bitrate={:?}, format={}, {} fps, path={:?}",
        choice.encoder, choice.bitrate, config.format, config.fps, output_path
    );

    Ok(choice)
}
