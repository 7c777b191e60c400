//! Video capture source and scene construction
//!
//! Captures one monitor at its physical resolution and places it in a scene
//! scaled so captured pixels map 1:1 onto the output frame.

use anyhow::{anyhow, Context as _};
use serde_json::json;
use tracing::{debug, info};

use crate::engine::{Engine, SceneHandle, SceneItemHandle, SettingsStore, SourceHandle};
use crate::error::Result;
use crate::platform::{Platform, DISPLAY_CAPTURE_KIND};

const VIDEO_SOURCE_NAME: &str = "desktop-video";
const SCENE_NAME: &str = "capture-scene";

/// Capture and output geometry for one monitor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneGeometry {
    pub capture_width: u32,
    pub capture_height: u32,
    pub output_width: u32,
    pub output_height: u32,
}

impl SceneGeometry {
    /// Capture and output both at the monitor's physical resolution
    pub fn native(width: u32, height: u32) -> Self {
        Self {
            capture_width: width,
            capture_height: height,
            output_width: width,
            output_height: height,
        }
    }

    /// Captured width per output pixel
    pub fn scale_factor(&self) -> f64 {
        self.capture_width as f64 / self.output_width as f64
    }

    /// Scene item transform that undoes [`SceneGeometry::scale_factor`]
    pub fn item_scale(&self) -> (f64, f64) {
        let factor = self.scale_factor();
        (1.0 / factor, 1.0 / factor)
    }
}

/// The capture scene and the handles inside it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureScene {
    pub scene: SceneHandle,
    pub source: SourceHandle,
    pub item: SceneItemHandle,
    pub geometry: SceneGeometry,
}

/// Build the display capture scene for `monitor_index`
pub fn build_scene<E, P>(engine: &mut E, platform: &P, monitor_index: usize) -> Result<CaptureScene>
where
    E: Engine + ?Sized,
    P: Platform + ?Sized,
{
    let monitor = platform
        .display_info(monitor_index)
        .with_context(|| format!("Failed to get display info for monitor {}", monitor_index))?;
    let (width, height) = monitor.physical_size();
    if width == 0 || height == 0 {
        return Err(anyhow!(
            "Monitor {} has no usable size ({}x{} @ {}x)",
            monitor_index,
            monitor.width,
            monitor.height,
            monitor.scale_factor
        )
        .into());
    }
    let geometry = SceneGeometry::native(width, height);

    debug!(
        "Monitor {}: {}x{} logical @ {}x -> {}x{} physical",
        monitor_index, monitor.width, monitor.height, monitor.scale_factor, width, height
    );

    let source = engine
        .create_input(
            DISPLAY_CAPTURE_KIND,
            VIDEO_SOURCE_NAME,
            json!({
                "monitor": monitor_index,
                "width": geometry.capture_width,
                "height": geometry.capture_height,
            }),
        )
        .context("Failed to create display capture source")?;

    let resolution = format!("{}x{}", geometry.output_width, geometry.output_height);
    engine.set_setting("Video", "Base", resolution.as_str())?;
    engine.set_setting("Video", "Output", resolution.as_str())?;

    let scene = engine
        .create_scene(SCENE_NAME)
        .context("Failed to create capture scene")?;
    let item = engine
        .scene_add(scene, source)
        .context("Failed to add capture source to scene")?;

    let (scale_x, scale_y) = geometry.item_scale();
    engine
        .set_scene_item_scale(item, scale_x, scale_y)
        .context("Failed to scale capture source")?;

    info!(
        "Capture scene built: {}x{} capture -> {} output (scale {:.3})",
        geometry.capture_width,
        geometry.capture_height,
        resolution,
        geometry.scale_factor()
    );

    Ok(CaptureScene {
        scene,
        source,
        item,
        geometry,
    })
}
