//! In-memory engine and platform used by the unit tests

use anyhow::{bail, Result};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::{
    Engine, OutputSource, Parameter, SceneHandle, SceneItemHandle, SettingsContainer, Signal,
    SignalCallback, SourceHandle, SubCategory,
};
use crate::platform::{AudioDevice, AudioDeviceClass, DisplayInfo, Platform};

/// Engine commands, in the order they were issued
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    HostIpc(String),
    SetWorkingDirectory(PathBuf),
    InitApi { locale: String, data_path: PathBuf, version: String },
    ConnectOutputSignals,
    CreateInput { kind: String, name: String, params: Value },
    CreateScene(String),
    SceneAdd { scene: SceneHandle, source: SourceHandle },
    SetSceneItemScale { item: SceneItemHandle, x: f64, y: f64 },
    SetAudioMixers { source: SourceHandle, mixers: u32 },
    SetGlobalOutputSource { channel: u32, source: OutputSource },
    StartRecording,
    StopRecording,
    RemoveSignalCallback,
    Disconnect,
}

#[derive(Default)]
struct Inner {
    calls: Vec<Call>,
    saves: HashMap<String, usize>,
    callback: Option<SignalCallback>,
}

/// Engine double that records every command and replays scripted signals
///
/// Clones share state, so a test can keep a handle after moving one into a
/// session.
#[derive(Clone)]
pub struct FakeEngine {
    inner: Arc<Mutex<Inner>>,
    settings: Arc<Mutex<HashMap<String, SettingsContainer>>>,
    init_code: i32,
    on_start: Vec<Signal>,
    on_stop: Vec<Signal>,
    fail_disconnect: bool,
    next_handle: Arc<Mutex<u64>>,
}

fn parameter(name: &str, value: Value) -> Parameter {
    Parameter {
        name: name.to_string(),
        current_value: value,
        values: Vec::new(),
    }
}

fn default_settings() -> HashMap<String, SettingsContainer> {
    let mut audio = Vec::new();
    for track in 1..=6 {
        audio.push(parameter(&format!("Track{}Name", track), json!("")));
    }

    let output = SettingsContainer {
        subcategories: vec![
            SubCategory {
                name: "Untitled".to_string(),
                parameters: vec![parameter("Mode", json!("Simple"))],
            },
            SubCategory {
                name: "Recording".to_string(),
                parameters: vec![
                    parameter("RecEncoder", json!("none")),
                    parameter("RecFilePath", json!("")),
                    parameter("RecFormat", json!("mp4")),
                    parameter("Recbitrate", json!(2500)),
                    parameter("Recmax_bitrate", json!(0)),
                    parameter("RecTracks", json!(1)),
                ],
            },
            SubCategory {
                name: "Audio".to_string(),
                parameters: audio,
            },
        ],
    };

    let video = SettingsContainer {
        subcategories: vec![SubCategory {
            name: "Untitled".to_string(),
            parameters: vec![
                parameter("Base", json!("1920x1080")),
                parameter("Output", json!("1280x720")),
                parameter("FPSCommon", json!(30)),
            ],
        }],
    };

    HashMap::from([("Output".to_string(), output), ("Video".to_string(), video)])
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            settings: Arc::new(Mutex::new(default_settings())),
            init_code: 0,
            on_start: vec![Signal::new("recording", "start")],
            on_stop: vec![
                Signal::new("recording", "stopping"),
                Signal::new("recording", "stop"),
            ],
            fail_disconnect: false,
            next_handle: Arc::new(Mutex::new(1)),
        }
    }

    /// Encoders reported for Output/Recording/RecEncoder
    pub fn with_encoders(self, encoders: &[&str]) -> Self {
        {
            let mut settings = self.settings.lock().unwrap();
            let output = settings.get_mut("Output").unwrap();
            let param = output.find_mut(Some("Recording"), "RecEncoder").unwrap();
            param.values = encoders
                .iter()
                .map(|e| {
                    let mut entry = serde_json::Map::new();
                    entry.insert(format!("Encoder {}", e), json!(e));
                    entry
                })
                .collect();
        }
        self
    }

    pub fn with_init_code(mut self, code: i32) -> Self {
        self.init_code = code;
        self
    }

    /// Signals emitted synchronously when recording starts
    pub fn on_start(mut self, signals: Vec<Signal>) -> Self {
        self.on_start = signals;
        self
    }

    /// Signals emitted synchronously when recording stops
    pub fn on_stop(mut self, signals: Vec<Signal>) -> Self {
        self.on_stop = signals;
        self
    }

    pub fn failing_disconnect(mut self) -> Self {
        self.fail_disconnect = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.inner.lock().unwrap().calls.iter().filter(|c| pred(*c)).count()
    }

    pub fn saves_for(&self, category: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .saves
            .get(category)
            .copied()
            .unwrap_or(0)
    }

    pub fn setting(&self, category: &str, parameter: &str) -> Option<Value> {
        self.settings
            .lock()
            .unwrap()
            .get(category)
            .and_then(|c| c.find(None, parameter))
            .map(|p| p.current_value.clone())
    }

    /// Deliver a signal through the registered callback, if any
    pub fn emit(&self, signal: Signal) {
        let inner = self.inner.lock().unwrap();
        if let Some(callback) = inner.callback.as_ref() {
            callback(signal);
        }
    }

    fn record(&self, call: Call) {
        self.inner.lock().unwrap().calls.push(call);
    }

    fn handle(&self) -> u64 {
        let mut next = self.next_handle.lock().unwrap();
        let handle = *next;
        *next += 1;
        handle
    }
}

impl Engine for FakeEngine {
    fn host_ipc(&mut self, endpoint_id: &str) -> Result<()> {
        self.record(Call::HostIpc(endpoint_id.to_string()));
        Ok(())
    }

    fn set_working_directory(&mut self, path: &Path) -> Result<()> {
        self.record(Call::SetWorkingDirectory(path.to_path_buf()));
        Ok(())
    }

    fn init_api(&mut self, locale: &str, data_path: &Path, version: &str) -> Result<i32> {
        self.record(Call::InitApi {
            locale: locale.to_string(),
            data_path: data_path.to_path_buf(),
            version: version.to_string(),
        });
        Ok(self.init_code)
    }

    fn connect_output_signals(&mut self, on_signal: SignalCallback) -> Result<()> {
        self.record(Call::ConnectOutputSignals);
        self.inner.lock().unwrap().callback = Some(on_signal);
        Ok(())
    }

    fn create_input(&mut self, kind: &str, name: &str, params: Value) -> Result<SourceHandle> {
        self.record(Call::CreateInput {
            kind: kind.to_string(),
            name: name.to_string(),
            params,
        });
        Ok(SourceHandle(self.handle()))
    }

    fn create_scene(&mut self, name: &str) -> Result<SceneHandle> {
        self.record(Call::CreateScene(name.to_string()));
        Ok(SceneHandle(self.handle()))
    }

    fn scene_add(&mut self, scene: SceneHandle, source: SourceHandle) -> Result<SceneItemHandle> {
        self.record(Call::SceneAdd { scene, source });
        Ok(SceneItemHandle(self.handle()))
    }

    fn set_scene_item_scale(&mut self, item: SceneItemHandle, x: f64, y: f64) -> Result<()> {
        self.record(Call::SetSceneItemScale { item, x, y });
        Ok(())
    }

    fn set_audio_mixers(&mut self, source: SourceHandle, mixers: u32) -> Result<()> {
        self.record(Call::SetAudioMixers { source, mixers });
        Ok(())
    }

    fn set_global_output_source(&mut self, channel: u32, source: OutputSource) -> Result<()> {
        self.record(Call::SetGlobalOutputSource { channel, source });
        Ok(())
    }

    fn get_settings(&mut self, category: &str) -> Result<SettingsContainer> {
        match self.settings.lock().unwrap().get(category) {
            Some(container) => Ok(container.clone()),
            None => bail!("Unknown settings category {}", category),
        }
    }

    fn save_settings(&mut self, category: &str, container: &SettingsContainer) -> Result<()> {
        self.settings
            .lock()
            .unwrap()
            .insert(category.to_string(), container.clone());
        *self
            .inner
            .lock()
            .unwrap()
            .saves
            .entry(category.to_string())
            .or_default() += 1;
        Ok(())
    }

    fn start_recording(&mut self) -> Result<()> {
        self.record(Call::StartRecording);
        for signal in self.on_start.clone() {
            self.emit(signal);
        }
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<()> {
        self.record(Call::StopRecording);
        for signal in self.on_stop.clone() {
            self.emit(signal);
        }
        Ok(())
    }

    fn remove_signal_callback(&mut self) -> Result<()> {
        self.record(Call::RemoveSignalCallback);
        self.inner.lock().unwrap().callback = None;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        self.record(Call::Disconnect);
        if self.fail_disconnect {
            bail!("IPC pipe already closed");
        }
        Ok(())
    }
}

/// Platform double with a fixed display and device lists
#[derive(Clone)]
pub struct FakePlatform {
    pub display: DisplayInfo,
    pub desktop: Vec<AudioDevice>,
    pub microphones: Vec<AudioDevice>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            display: DisplayInfo {
                width: 1920,
                height: 1080,
                scale_factor: 1.0,
            },
            desktop: Vec::new(),
            microphones: Vec::new(),
        }
    }

    pub fn with_display(mut self, display: DisplayInfo) -> Self {
        self.display = display;
        self
    }

    pub fn with_desktop(mut self, devices: Vec<AudioDevice>) -> Self {
        self.desktop = devices;
        self
    }

    pub fn with_microphones(mut self, devices: Vec<AudioDevice>) -> Self {
        self.microphones = devices;
        self
    }
}

impl Platform for FakePlatform {
    fn display_info(&self, index: usize) -> Result<DisplayInfo> {
        if index > 0 {
            bail!("No display at index {}", index);
        }
        Ok(self.display)
    }

    fn audio_devices(&self, class: AudioDeviceClass) -> Result<Vec<AudioDevice>> {
        Ok(match class {
            AudioDeviceClass::DesktopOutput => self.desktop.clone(),
            AudioDeviceClass::MicrophoneInput => self.microphones.clone(),
        })
    }
}
