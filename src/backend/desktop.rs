//! Desktop session backed by a rodio output sink.
//!
//! Desktops have no hardware volume property to watch, so the output level is
//! the sink volume and the host's key handling moves it through a
//! [`SinkVolumeControl`]. The control doubles as the feedback suppressor:
//! there is no system HUD to hide, and restoring the level goes through it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rodio::{OutputStream, Sink};
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::error::{SessionError, SuppressionError};
use crate::interpreter::{quantize, VOLUME_STEP};
use crate::session::{AudioSession, ObserverToken, VolumeListener};
use crate::suppressor::SystemFeedbackSuppressor;

struct SinkVolume {
    sink: Option<Sink>,
    level: f32,
    observers: Vec<(ObserverToken, VolumeListener)>,
    next_token: u64,
}

/// Cloneable handle that moves the session's output level and notifies
/// observers, standing in for the platform's volume property.
#[derive(Clone)]
pub struct SinkVolumeControl {
    state: Arc<Mutex<SinkVolume>>,
}

impl SinkVolumeControl {
    pub fn level(&self) -> f32 {
        self.state().level
    }

    pub fn step_up(&self) {
        let level = self.level() + VOLUME_STEP;
        self.set_level(level);
    }

    pub fn step_down(&self) {
        let level = self.level() - VOLUME_STEP;
        self.set_level(level);
    }

    /// Sets an arbitrary level. Levels are not quantized here, so a slider can
    /// produce non-standard jumps.
    pub fn set_level(&self, level: f32) {
        let (level, observers) = {
            let mut state = self.state();
            state.level = level.clamp(0.0, 1.0);
            if let Some(sink) = state.sink.as_ref() {
                sink.set_volume(state.level);
            }
            let observers: Vec<VolumeListener> = state
                .observers
                .iter()
                .map(|(_, listener)| Arc::clone(listener))
                .collect();
            (state.level, observers)
        };
        for listener in observers {
            listener(level);
        }
    }

    fn state(&self) -> MutexGuard<'_, SinkVolume> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SystemFeedbackSuppressor for SinkVolumeControl {
    fn install(&mut self) -> Result<(), SuppressionError> {
        Ok(())
    }

    fn remove(&mut self) {}

    fn set_system_volume(&mut self, level: f32) -> Result<(), SuppressionError> {
        self.set_level(level);
        Ok(())
    }
}

/// Audio session over the default output device.
///
/// The output stream is opened on activation and closed on deactivation. Session
/// categories have no desktop equivalent and are only logged.
pub struct RodioSession {
    control: SinkVolumeControl,
    // must outlive the sink, and must stay on the thread that opened it
    stream: Option<OutputStream>,
}

impl RodioSession {
    pub fn new(initial_level: f32) -> Self {
        Self {
            control: SinkVolumeControl {
                state: Arc::new(Mutex::new(SinkVolume {
                    sink: None,
                    level: quantize(initial_level),
                    observers: Vec::new(),
                    next_token: 0,
                })),
            },
            stream: None,
        }
    }

    pub fn volume_control(&self) -> SinkVolumeControl {
        self.control.clone()
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}

impl AudioSession for RodioSession {
    fn activate(&mut self, config: &SessionConfig) -> Result<(), SessionError> {
        if self.stream.is_some() {
            return Ok(());
        }
        let (stream, stream_handle) = OutputStream::try_default()?;
        let sink = Sink::try_new(&stream_handle)?;

        let mut state = self.control.state();
        sink.set_volume(state.level);
        state.sink = Some(sink);
        self.stream = Some(stream);
        debug!(?config, "session category ignored on desktop output");
        info!("opened default output device");
        Ok(())
    }

    fn deactivate(&mut self) -> Result<(), SessionError> {
        if let Some(sink) = self.control.state().sink.take() {
            sink.stop();
        }
        if self.stream.take().is_some() {
            info!("closed default output device");
        }
        Ok(())
    }

    fn output_volume(&self) -> f32 {
        self.control.level()
    }

    fn add_volume_observer(&mut self, listener: VolumeListener) -> ObserverToken {
        let mut state = self.control.state();
        state.next_token += 1;
        let token = ObserverToken::new(state.next_token);
        state.observers.push((token, listener));
        token
    }

    fn remove_volume_observer(&mut self, token: ObserverToken) {
        self.control
            .state()
            .observers
            .retain(|(registered, _)| *registered != token);
    }
}
