//! Recording session on top of the external OBS engine
//!
//! Before the first recording the session configures the engine:
//! - recording encoder, bitrate and output settings
//! - a scene capturing one monitor at its physical resolution
//! - one audio track per device, plus the mixed track 1

mod audio;
mod recording;
mod session;
mod sources;

pub use audio::{allocate_tracks, TrackAllocation, TrackAssignment, MAX_TRACKS, MIXED_TRACK};
pub use recording::{
    configure_output, select_encoder, BitratePolicy, EncoderChoice, AMF_BITRATE, DEFAULT_ENCODER,
    MAX_BITRATE,
};
pub use session::{init_error_message, CaptureSession, SessionState};
pub use sources::{build_scene, CaptureScene, SceneGeometry};
