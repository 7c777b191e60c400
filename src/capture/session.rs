//! Recording session lifecycle
//!
//! Drives the engine through initialize -> start -> stop -> shutdown. Start
//! and stop are request/confirmation pairs: the command returns immediately
//! and the engine later confirms through its output signals.
//!
//! ```text
//! Uninitialized -> Initializing -> Configured <-> Recording
//!                       |              ^            |
//!                       v              +- Stopping <-+
//!                     Error
//! ```

use anyhow::Context as _;
use std::path::Path;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::audio::{allocate_tracks, TrackAllocation};
use super::recording::{configure_output, EncoderChoice};
use super::sources::{build_scene, CaptureScene};
use crate::config::RecorderConfig;
use crate::engine::{Engine, SignalChannel, SIGNAL_TIMEOUT};
use crate::error::{Result, SessionError};
use crate::platform::Platform;

const RECORDING_SIGNAL: &str = "recording";

/// Lifecycle state of a [`CaptureSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Initializing,
    /// Configured and idle, ready to record
    Configured,
    Recording,
    Stopping,
    /// Initialization failed and the engine could not be torn down
    Error,
}

/// Human-readable explanation of an engine init result code
pub fn init_error_message(code: i32) -> String {
    match code {
        -2 => "DirectX could not be found on your system. Please install the latest version \
               of DirectX for your machine here \
               <https://www.microsoft.com/en-us/download/details.aspx?id=35> and try again."
            .to_string(),
        -5 => "Failed to initialize OBS. Your video drivers may be out of date, or OBS may \
               not be supported on your system."
            .to_string(),
        _ => format!(
            "An unknown error #{} was encountered while initializing OBS.",
            code
        ),
    }
}

/// A recording session against one engine process
///
/// Owned by the caller for the lifetime of the process. Dropping a session
/// that is still initialized shuts the engine connection down.
pub struct CaptureSession<E: Engine, P: Platform> {
    engine: E,
    platform: P,
    config: RecorderConfig,
    signals: SignalChannel,
    state: SessionState,
    /// Set once the engine IPC channel is hosted
    session_id: Option<Uuid>,
    encoder: Option<EncoderChoice>,
    scene: Option<CaptureScene>,
    tracks: Option<TrackAllocation>,
}

impl<E: Engine, P: Platform> CaptureSession<E, P> {
    pub fn new(engine: E, platform: P, config: RecorderConfig) -> Self {
        Self {
            engine,
            platform,
            config,
            signals: SignalChannel::new(),
            state: SessionState::Uninitialized,
            session_id: None,
            encoder: None,
            scene: None,
            tracks: None,
        }
    }

    /// Connect to the engine and configure it to record `monitor_index` into
    /// `output_path`
    ///
    /// Does nothing if the session is already initialized. On failure the
    /// engine connection is torn down before the error is returned.
    pub fn initialize(&mut self, output_path: &Path, monitor_index: usize) -> Result<()> {
        if self.state != SessionState::Uninitialized {
            warn!("OBS is already initialized (state {:?}), skipping", self.state);
            return Ok(());
        }

        info!("Initializing OBS...");
        self.state = SessionState::Initializing;

        match self.bring_up(output_path, monitor_index) {
            Ok(()) => {
                self.state = SessionState::Configured;
                info!("OBS initialized");
                Ok(())
            }
            Err(e) => {
                error!("OBS init failure: {}", e);
                self.state = SessionState::Error;
                self.force_shutdown();
                Err(e)
            }
        }
    }

    fn bring_up(&mut self, output_path: &Path, monitor_index: usize) -> Result<()> {
        let working_dir = self.config.working_directory()?;
        let data_dir = self.config.data_directory()?;

        let session_id = Uuid::new_v4();
        let endpoint = format!("{}-{}", self.config.engine.ipc_prefix, session_id);
        debug!("Hosting OBS IPC endpoint {}", endpoint);
        self.engine
            .host_ipc(&endpoint)
            .context("Failed to host OBS IPC channel")?;
        self.session_id = Some(session_id);

        self.engine
            .set_working_directory(&working_dir)
            .with_context(|| format!("Failed to set OBS working directory {:?}", working_dir))?;

        let code = self
            .engine
            .init_api(
                &self.config.engine.locale,
                &data_dir,
                &self.config.engine.version,
            )
            .context("Failed to call OBS API init")?;
        if code != 0 {
            return Err(SessionError::InitializationFailure {
                code,
                message: init_error_message(code),
            });
        }

        self.engine
            .connect_output_signals(self.signals.callback())
            .context("Failed to connect OBS output signals")?;

        self.encoder = Some(configure_output(
            &mut self.engine,
            output_path,
            &self.config.recording,
        )?);

        let scene = build_scene(&mut self.engine, &self.platform, monitor_index)?;
        self.tracks = Some(allocate_tracks(&mut self.engine, &self.platform, scene.scene)?);
        self.scene = Some(scene);

        Ok(())
    }

    /// Best-effort teardown after a failed initialization
    fn force_shutdown(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("Forced shutdown after init failure failed: {}", e);
        }
    }

    /// Start recording and wait for the engine to confirm
    ///
    /// On timeout or an unexpected signal the state is left unchanged; the
    /// engine may still be starting.
    pub async fn start(&mut self) -> Result<()> {
        if self.state != SessionState::Configured {
            return Err(SessionError::NotInitialized);
        }

        info!("Starting recording...");
        let mut waiter = self.signals.subscribe();
        self.engine
            .start_recording()
            .context("Failed to issue start recording")?;

        waiter
            .expect(RECORDING_SIGNAL, "start", SIGNAL_TIMEOUT)
            .await?;

        self.state = SessionState::Recording;
        info!("Recording started");
        Ok(())
    }

    /// Stop recording and wait for the engine's "stopping" then "stop"
    ///
    /// On failure, or if the returned future is dropped before the engine
    /// confirms, the session goes back to [`SessionState::Recording`].
    pub async fn stop(&mut self) -> Result<()> {
        if self.state != SessionState::Recording {
            return Err(SessionError::NotRecording);
        }

        info!("Stopping recording...");
        let transition = StateTransition::enter(&mut self.state, SessionState::Stopping);

        confirm_stop(&mut self.engine, &mut self.signals).await?;

        transition.commit(SessionState::Configured);
        info!("Recording stopped");
        Ok(())
    }

    /// Disconnect from the engine
    ///
    /// Returns `false` without touching the engine if already shut down.
    pub fn shutdown(&mut self) -> Result<bool> {
        if self.state == SessionState::Uninitialized {
            debug!("OBS is already shut down");
            return Ok(false);
        }

        if self.state == SessionState::Recording {
            warn!("Shutting down OBS while recording");
        }

        info!("Shutting down OBS...");
        self.disconnect_engine()
            .map_err(SessionError::ShutdownFailure)?;

        self.state = SessionState::Uninitialized;
        self.session_id = None;
        self.encoder = None;
        self.scene = None;
        self.tracks = None;

        info!("OBS shutdown successfully");
        Ok(true)
    }

    fn disconnect_engine(&mut self) -> anyhow::Result<()> {
        self.engine
            .remove_signal_callback()
            .context("Failed to remove OBS signal callback")?;
        self.engine
            .disconnect()
            .context("Failed to disconnect OBS IPC channel")?;
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == SessionState::Recording
    }

    /// Id of the current engine connection
    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    /// Encoder picked during initialization
    pub fn encoder(&self) -> Option<&EncoderChoice> {
        self.encoder.as_ref()
    }

    /// The capture scene registered as the primary output
    pub fn scene(&self) -> Option<&CaptureScene> {
        self.scene.as_ref()
    }

    pub fn tracks(&self) -> Option<&TrackAllocation> {
        self.tracks.as_ref()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }
}

async fn confirm_stop<E: Engine>(engine: &mut E, signals: &mut SignalChannel) -> Result<()> {
    let mut waiter = signals.subscribe();
    engine
        .stop_recording()
        .context("Failed to issue stop recording")?;

    waiter
        .expect(RECORDING_SIGNAL, "stopping", SIGNAL_TIMEOUT)
        .await?;
    waiter
        .expect(RECORDING_SIGNAL, "stop", SIGNAL_TIMEOUT)
        .await?;
    Ok(())
}

/// Holds a session in a transient state until committed
///
/// Dropped without [`StateTransition::commit`], it puts back the state it
/// replaced. This also covers a cancelled future.
struct StateTransition<'a> {
    state: &'a mut SessionState,
    previous: SessionState,
    committed: bool,
}

impl<'a> StateTransition<'a> {
    fn enter(state: &'a mut SessionState, transient: SessionState) -> Self {
        let previous = std::mem::replace(state, transient);
        Self {
            state,
            previous,
            committed: false,
        }
    }

    fn commit(mut self, next: SessionState) {
        *self.state = next;
        self.committed = true;
    }
}

impl Drop for StateTransition<'_> {
    fn drop(&mut self) {
        if !self.committed {
            debug!("Rolling back {:?} to {:?}", self.state, self.previous);
            *self.state = self.previous;
        }
    }
}

impl<E: Engine, P: Platform> Drop for CaptureSession<E, P> {
    fn drop(&mut self) {
        if self.state == SessionState::Uninitialized {
            return;
        }

        if let Err(e) = self.shutdown() {
            warn!("Error shutting down OBS on drop: {}", e);
        }
    }
}
