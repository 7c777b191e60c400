//! Capability interface to the external OBS process
//!
//! The engine itself is opaque: it is reached through the [`Engine`] trait,
//! whose commands are synchronous calls. Completion of long-running commands
//! (starting and stopping a recording) is reported later through the signal
//! callback registered with [`Engine::connect_output_signals`].

mod settings;
mod signals;

#[cfg(test)]
pub(crate) mod fake;

pub use settings::{Parameter, SettingPath, SettingsContainer, SettingsStore, SubCategory};
pub use signals::{assert_signal, SignalChannel, SignalWaiter, SIGNAL_TIMEOUT};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Callback invoked by the engine for every output signal it emits
pub type SignalCallback = Box<dyn Fn(Signal) + Send + Sync + 'static>;

/// Asynchronous event emitted by the engine for recording, streaming, etc.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    /// Operation family, e.g. "recording"
    #[serde(rename = "type")]
    pub kind: String,
    /// Operation step, e.g. "start", "stopping", "stop"
    pub signal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
    /// Reason attached by the engine when an operation fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Signal {
    pub fn new(kind: impl Into<String>, signal: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            signal: signal.into(),
            code: None,
            error: None,
        }
    }

    pub fn with_code(mut self, code: i32) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.signal)?;
        if let Some(code) = self.code {
            write!(f, " (code {})", code)?;
        }
        if let Some(error) = &self.error {
            write!(f, ": {}", error)?;
        }
        Ok(())
    }
}

/// Handle to an input source created by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceHandle(pub u64);

/// Handle to a scene created by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneHandle(pub u64);

/// Handle to a source placed inside a scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneItemHandle(pub u64);

/// Anything the engine can route to a global output channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSource {
    Scene(SceneHandle),
    Source(SourceHandle),
}

/// Command surface of the external capture engine
///
/// Implementations wrap the engine's IPC client. All methods are
/// synchronous; errors are opaque to this crate.
pub trait Engine {
    /// Start hosting the IPC channel the engine process connects to
    fn host_ipc(&mut self, endpoint_id: &str) -> Result<()>;

    fn set_working_directory(&mut self, path: &Path) -> Result<()>;

    /// Invoke the engine's API init entry point, returning its result code
    /// (0 on success)
    fn init_api(&mut self, locale: &str, data_path: &Path, version: &str) -> Result<i32>;

    fn connect_output_signals(&mut self, on_signal: SignalCallback) -> Result<()>;

    fn create_input(
        &mut self,
        kind: &str,
        name: &str,
        params: serde_json::Value,
    ) -> Result<SourceHandle>;

    fn create_scene(&mut self, name: &str) -> Result<SceneHandle>;

    fn scene_add(&mut self, scene: SceneHandle, source: SourceHandle) -> Result<SceneItemHandle>;

    fn set_scene_item_scale(&mut self, item: SceneItemHandle, x: f64, y: f64) -> Result<()>;

    /// Route an audio source into the tracks set in `mixers` (bit 0 = track 1)
    fn set_audio_mixers(&mut self, source: SourceHandle, mixers: u32) -> Result<()>;

    fn set_global_output_source(&mut self, channel: u32, source: OutputSource) -> Result<()>;

    fn get_settings(&mut self, category: &str) -> Result<SettingsContainer>;

    fn save_settings(&mut self, category: &str, container: &SettingsContainer) -> Result<()>;

    fn start_recording(&mut self) -> Result<()>;

    fn stop_recording(&mut self) -> Result<()>;

    fn remove_signal_callback(&mut self) -> Result<()>;

    fn disconnect(&mut self) -> Result<()>;
}

impl<E: Engine + ?Sized> Engine for Box<E> {
    fn host_ipc(&mut self, endpoint_id: &str) -> Result<()> {
        (**self).host_ipc(endpoint_id)
    }

    fn set_working_directory(&mut self, path: &Path) -> Result<()> {
        (**self).set_working_directory(path)
    }

    fn init_api(&mut self, locale: &str, data_path: &Path, version: &str) -> Result<i32> {
        (**self).init_api(locale, data_path, version)
    }

    fn connect_output_signals(&mut self, on_signal: SignalCallback) -> Result<()> {
        (**self).connect_output_signals(on_signal)
    }

    fn create_input(
        &mut self,
        kind: &str,
        name: &str,
        params: serde_json::Value,
    ) -> Result<SourceHandle> {
        (**self).create_input(kind, name, params)
    }

    fn create_scene(&mut self, name: &str) -> Result<SceneHandle> {
        (**self).create_scene(name)
    }

    fn scene_add(&mut self, scene: SceneHandle, source: SourceHandle) -> Result<SceneItemHandle> {
        (**self).scene_add(scene, source)
    }

    fn set_scene_item_scale(&mut self, item: SceneItemHandle, x: f64, y: f64) -> Result<()> {
        (**self).set_scene_item_scale(item, x, y)
    }

    fn set_audio_mixers(&mut self, source: SourceHandle, mixers: u32) -> Result<()> {
        (**self).set_audio_mixers(source, mixers)
    }

    fn set_global_output_source(&mut self, channel: u32, source: OutputSource) -> Result<()> {
        (**self).set_global_output_source(channel, source)
    }

    fn get_settings(&mut self, category: &str) -> Result<SettingsContainer> {
        (**self).get_settings(category)
    }

    fn save_settings(&mut self, category: &str, container: &SettingsContainer) -> Result<()> {
        (**self).save_settings(category, container)
    }

    fn start_recording(&mut self) -> Result<()> {
        (**self).start_recording()
    }

    fn stop_recording(&mut self) -> Result<()> {
        (**self).stop_recording()
    }

    fn remove_signal_callback(&mut self) -> Result<()> {
        (**self).remove_signal_callback()
    }

    fn disconnect(&mut self) -> Result<()> {
        (**self).disconnect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_deserialization() {
        let json = r#"{"type":"recording","signal":"stop","code":-4,"error":"Encoder failed"}"#;
        let signal: Signal = serde_json::from_str(json).unwrap();
        assert_eq!(signal.kind, "recording");
        assert_eq!(signal.signal, "stop");
        assert_eq!(signal.code, Some(-4));
        assert_eq!(signal.error.as_deref(), Some("Encoder failed"));

        let minimal: Signal = serde_json::from_str(r#"{"type":"recording","signal":"start"}"#).unwrap();
        assert_eq!(minimal, Signal::new("recording", "start"));
    }

    #[test]
    fn test_signal_display() {
        assert_eq!(Signal::new("recording", "start").to_string(), "recording/start");
        let failed = Signal::new("recording", "stop").with_code(-4).with_error("Encoder failed");
        assert_eq!(failed.to_string(), "recording/stop (code -4): Encoder failed");
    }
}
