//! Host platform collaborators: display geometry and audio devices
//!
//! Enumeration itself lives outside this crate; only the interface and the
//! per-OS engine source kinds are defined here.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Device id the engine uses for the system default device
pub const DEFAULT_DEVICE_ID: &str = "default";

/// Geometry of one monitor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayInfo {
    /// Logical width in points
    pub width: u32,
    /// Logical height in points
    pub height: u32,
    pub scale_factor: f64,
}

impl DisplayInfo {
    /// Pixel dimensions (logical size times scale factor)
    pub fn physical_size(&self) -> (u32, u32) {
        (
            (self.width as f64 * self.scale_factor).round() as u32,
            (self.height as f64 * self.scale_factor).round() as u32,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioDevice {
    pub id: String,
    pub name: String,
}

impl AudioDevice {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    pub fn is_default(&self) -> bool {
        self.id == DEFAULT_DEVICE_ID
    }
}

/// Audio device classes, in track allocation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioDeviceClass {
    /// Desktop audio (what the speakers play)
    DesktopOutput,
    MicrophoneInput,
}

impl AudioDeviceClass {
    pub const ALL: [AudioDeviceClass; 2] = [Self::DesktopOutput, Self::MicrophoneInput];

    /// Engine input kind that captures a device of this class
    #[cfg(target_os = "windows")]
    pub fn source_kind(&self) -> &'static str {
        match self {
            Self::DesktopOutput => "wasapi_output_capture",
            Self::MicrophoneInput => "wasapi_input_capture",
        }
    }

    #[cfg(target_os = "macos")]
    pub fn source_kind(&self) -> &'static str {
        match self {
            Self::DesktopOutput => "coreaudio_output_capture",
            Self::MicrophoneInput => "coreaudio_input_capture",
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    pub fn source_kind(&self) -> &'static str {
        match self {
            Self::DesktopOutput => "pulse_output_capture",
            Self::MicrophoneInput => "pulse_input_capture",
        }
    }

    /// Name given to sources of this class
    pub fn source_name(&self) -> &'static str {
        match self {
            Self::DesktopOutput => "desktop-audio",
            Self::MicrophoneInput => "mic-audio",
        }
    }
}

/// Engine input kind for full-monitor video capture
#[cfg(target_os = "windows")]
pub const DISPLAY_CAPTURE_KIND: &str = "monitor_capture";
#[cfg(target_os = "macos")]
pub const DISPLAY_CAPTURE_KIND: &str = "display_capture";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub const DISPLAY_CAPTURE_KIND: &str = "xshm_input";

/// Display and audio device enumeration provided by the host application
pub trait Platform {
    fn display_info(&self, index: usize) -> Result<DisplayInfo>;

    fn audio_devices(&self, class: AudioDeviceClass) -> Result<Vec<AudioDevice>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_physical_size() {
        let retina = DisplayInfo {
            width: 1440,
            height: 900,
            scale_factor: 2.0,
        };
        assert_eq!(retina.physical_size(), (2880, 1800));

        let fractional = DisplayInfo {
            width: 1536,
            height: 864,
            scale_factor: 1.25,
        };
        assert_eq!(fractional.physical_size(), (1920, 1080));
    }

    #[test]
    fn test_default_device() {
        assert!(AudioDevice::new("default", "Default").is_default());
        assert!(!AudioDevice::new("dev1", "Speakers").is_default());
    }
}
