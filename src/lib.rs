//! obs-recorder
//!
//! Drives an external OBS process through a recording session: initialize,
//! start, stop, shutdown. The engine is reached through the [`Engine`]
//! capability trait; display and audio device enumeration come from the
//! host through [`Platform`].
//!
//! ```ignore
//! let config = RecorderConfig::load()?;
//! let _log_guard = obs_recorder::logging::init_logging(&config)?;
//! let mut session = CaptureSession::new(engine, platform, config);
//! session.initialize(Path::new("/home/me/Videos"), 0)?;
//! session.start().await?;
//! // ...
//! session.stop().await?;
//! session.shutdown()?;
//! ```

pub mod capture;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod platform;

pub use capture::{CaptureSession, SessionState};
pub use config::RecorderConfig;
pub use engine::{Engine, Signal};
pub use error::{Result, SessionError};
pub use platform::Platform;
