//! Audio track allocation
//!
//! Track 1 always carries the mix of every source. Each non-default audio
//! device then gets its own track, starting at 2, and is routed into both
//! track 1 and its own track.

use anyhow::Context as _;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::engine::{Engine, OutputSource, SceneHandle, SettingsStore, SourceHandle};
use crate::error::Result;
use crate::platform::{AudioDevice, AudioDeviceClass, Platform};

/// Track reserved for the downmix of all sources
pub const MIXED_TRACK: u32 = 1;

/// Number of recording tracks the engine supports
pub const MAX_TRACKS: u32 = 6;

const MIXED_TRACK_NAME: &str = "Mixed: all sources";

/// Mixer mask routing a source into track 1 and `track`
///
/// Tracks are 1-based; `track` must be in `1..=MAX_TRACKS`.
pub(crate) fn mixer_mask(track: u32) -> u32 {
    debug_assert!((MIXED_TRACK..=MAX_TRACKS).contains(&track));
    (1 << (MIXED_TRACK - 1)) | (1 << (track - 1))
}

/// Mask with tracks `1..next_track` marked used
///
/// `next_track` starts at 2 since track 1 is always taken.
pub(crate) fn used_tracks_mask(next_track: u32) -> u32 {
    debug_assert!(next_track > MIXED_TRACK);
    (1 << (next_track - 1)) - 1
}

/// A device attached to its own track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackAssignment {
    pub device: AudioDevice,
    pub class: AudioDeviceClass,
    pub source: SourceHandle,
    pub track: u32,
    pub mixers: u32,
}

/// Result of allocating tracks to every enumerated device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackAllocation {
    pub assignments: Vec<TrackAssignment>,
    /// Next unassigned track index
    pub next_track: u32,
    pub used_tracks: u32,
}

/// Route the scene to track 1 and attach every audio device to its own track
pub fn allocate_tracks<E, P>(engine: &mut E, platform: &P, scene: SceneHandle) -> Result<TrackAllocation>
where
    E: Engine + ?Sized,
    P: Platform + ?Sized,
{
    engine
        .set_global_output_source(MIXED_TRACK, OutputSource::Scene(scene))
        .context("Failed to set scene as global output")?;
    engine.set_setting("Output", &track_name_key(MIXED_TRACK), MIXED_TRACK_NAME)?;

    let mut track = MIXED_TRACK + 1;
    let mut assignments = Vec::new();

    for class in AudioDeviceClass::ALL {
        let devices = platform
            .audio_devices(class)
            .with_context(|| format!("Failed to enumerate {:?} devices", class))?;
        debug!("Found {} {:?} devices", devices.len(), class);

        for device in devices {
            if device.is_default() {
                continue;
            }
            if track > MAX_TRACKS {
                warn!(
                    "No recording track left for {:?} device '{}' ({})",
                    class, device.name, device.id
                );
                continue;
            }

            let source = engine
                .create_input(
                    class.source_kind(),
                    class.source_name(),
                    json!({ "device_id": device.id }),
                )
                .with_context(|| format!("Failed to create audio source for '{}'", device.name))?;

            engine.set_setting("Output", &track_name_key(track), device.name.as_str())?;

            let mixers = mixer_mask(track);
            engine
                .set_audio_mixers(source, mixers)
                .context("Failed to set audio mixers")?;
            engine
                .set_global_output_source(track, OutputSource::Source(source))
                .with_context(|| format!("Failed to set output source for track {}", track))?;

            debug!(
                "Track {} <- '{}' ({}), mixers {:#b}",
                track, device.name, device.id, mixers
            );

            assignments.push(TrackAssignment {
                device,
                class,
                source,
                track,
                mixers,
            });
            track += 1;
        }
    }

    let used_tracks = used_tracks_mask(track);
    engine.set_setting("Output", "RecTracks", used_tracks)?;

    info!(
        "Allocated {} audio tracks (used tracks mask {:#b})",
        assignments.len(),
        used_tracks
    );

    Ok(TrackAllocation {
        assignments,
        next_track: track,
        used_tracks,
    })
}

fn track_name_key(track: u32) -> String {
    format!("Track{}Name", track)
}
