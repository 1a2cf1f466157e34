//! In-memory platform: a session and a suppressor sharing one simulated device.
//!
//! Hardware presses, external slider moves and activation failures can be
//! injected, and everything the handler does to the platform is observable.
//!
//! Notifications are delivered inline, as key-value observation does: a level
//! set from inside a listener reaches every listener before the outer delivery
//! resumes. With more than one observer the later ones can then see the older
//! level last, so the simulation is meant for a single handler per platform.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::config::SessionConfig;
use crate::error::{SessionError, SuppressionError};
use crate::interpreter::VOLUME_STEP;
use crate::session::{AudioSession, ObserverToken, VolumeListener};
use crate::suppressor::SystemFeedbackSuppressor;

struct Device {
    volume: f32,
    session_active: bool,
    category: Option<SessionConfig>,
    replaced_category: Option<Option<SessionConfig>>,
    activation_failure: Option<String>,
    observers: Vec<(ObserverToken, VolumeListener)>,
    next_token: u64,
    overlay_installed: bool,
    click_muted: bool,
    hud_shown: usize,
}

/// Shared handle to the simulated device. Clones refer to the same device.
#[derive(Clone)]
pub struct SimulatedPlatform {
    device: Arc<Mutex<Device>>,
}

impl SimulatedPlatform {
    pub fn new(volume: f32) -> Self {
        Self {
            device: Arc::new(Mutex::new(Device {
                volume: volume.clamp(0.0, 1.0),
                session_active: false,
                category: None,
                replaced_category: None,
                activation_failure: None,
                observers: Vec::new(),
                next_token: 0,
                overlay_installed: false,
                click_muted: false,
                hud_shown: 0,
            })),
        }
    }

    /// Starts out with `category` already applied, as if another part of the
    /// application configured the session.
    pub fn with_category(volume: f32, category: SessionConfig) -> Self {
        let platform = Self::new(volume);
        platform.device().category = Some(category);
        platform
    }

    pub fn session(&self) -> SimulatedSession {
        SimulatedSession {
            platform: self.clone(),
        }
    }

    pub fn suppressor(&self) -> SimulatedSuppressor {
        SimulatedSuppressor {
            platform: self.clone(),
        }
    }

    /// Hardware up button: one step, clamped at 1.0. The notification is
    /// delivered even when the level cannot move.
    pub fn press_up(&self) {
        self.hardware_press(VOLUME_STEP);
    }

    pub fn press_down(&self) {
        self.hardware_press(-VOLUME_STEP);
    }

    /// Volume moved by something other than the buttons, e.g. a slider.
    pub fn set_volume(&self, level: f32) {
        let (level, observers) = {
            let mut device = self.device();
            device.volume = level.clamp(0.0, 1.0);
            (device.volume, device.listeners())
        };
        Self::notify(level, observers);
    }

    /// Makes the next activation fail with `reason`.
    pub fn fail_next_activation(&self, reason: impl Into<String>) {
        self.device().activation_failure = Some(reason.into());
    }

    pub fn volume(&self) -> f32 {
        self.device().volume
    }

    pub fn is_session_active(&self) -> bool {
        self.device().session_active
    }

    pub fn category(&self) -> Option<SessionConfig> {
        self.device().category
    }

    pub fn observer_count(&self) -> usize {
        self.device().observers.len()
    }

    pub fn is_overlay_installed(&self) -> bool {
        self.device().overlay_installed
    }

    pub fn is_click_muted(&self) -> bool {
        self.device().click_muted
    }

    /// Number of times the system volume indicator would have appeared.
    pub fn hud_shown(&self) -> usize {
        self.device().hud_shown
    }

    fn hardware_press(&self, delta: f32) {
        let (level, observers) = {
            let mut device = self.device();
            device.volume = (device.volume + delta).clamp(0.0, 1.0);
            if !device.overlay_installed {
                device.hud_shown += 1;
            }
            (device.volume, device.listeners())
        };
        Self::notify(level, observers);
    }

    fn notify(level: f32, observers: Vec<VolumeListener>) {
        for listener in observers {
            listener(level);
        }
    }

    fn device(&self) -> MutexGuard<'_, Device> {
        self.device.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Device {
    fn listeners(&self) -> Vec<VolumeListener> {
        self.observers
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }
}

pub struct SimulatedSession {
    platform: SimulatedPlatform,
}

impl AudioSession for SimulatedSession {
    fn activate(&mut self, config: &SessionConfig) -> Result<(), SessionError> {
        let mut device = self.platform.device();
        if let Some(reason) = device.activation_failure.take() {
            return Err(SessionError::Activation(reason));
        }
        if !device.session_active {
            device.replaced_category = Some(device.category);
        }
        device.category = Some(*config);
        device.session_active = true;
        debug!(?config, "simulated session activated");
        Ok(())
    }

    fn deactivate(&mut self) -> Result<(), SessionError> {
        let mut device = self.platform.device();
        if let Some(previous) = device.replaced_category.take() {
            device.category = previous;
        }
        device.session_active = false;
        Ok(())
    }

    fn output_volume(&self) -> f32 {
        self.platform.volume()
    }

    fn add_volume_observer(&mut self, listener: VolumeListener) -> ObserverToken {
        let mut device = self.platform.device();
        device.next_token += 1;
        let token = ObserverToken::new(device.next_token);
        device.observers.push((token, listener));
        token
    }

    fn remove_volume_observer(&mut self, token: ObserverToken) {
        self.platform
            .device()
            .observers
            .retain(|(registered, _)| *registered != token);
    }
}

pub struct SimulatedSuppressor {
    platform: SimulatedPlatform,
}

impl SystemFeedbackSuppressor for SimulatedSuppressor {
    fn install(&mut self) -> Result<(), SuppressionError> {
        let mut device = self.platform.device();
        device.overlay_installed = true;
        device.click_muted = true;
        Ok(())
    }

    fn remove(&mut self) {
        let mut device = self.platform.device();
        device.overlay_installed = false;
        device.click_muted = false;
    }

    fn set_system_volume(&mut self, level: f32) -> Result<(), SuppressionError> {
        if !self.platform.is_overlay_installed() {
            return Err(SuppressionError::NoActiveWindow);
        }
        self.platform.set_volume(level);
        Ok(())
    }
}
