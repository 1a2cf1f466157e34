use std::sync::Arc;

use crate::config::SessionConfig;
use crate::error::SessionError;

/// Receives every new output-volume level, on whichever thread the platform
/// delivers notifications.
pub type VolumeListener = Arc<dyn Fn(f32) + Send + Sync>;

/// Identifies a listener registered with [`AudioSession::add_volume_observer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverToken(u64);

impl ObserverToken {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// The platform's process-wide audio session, injected into the handler.
///
/// Implementations must not invoke listeners while holding a lock a listener
/// could need, since listeners run user callbacks synchronously.
pub trait AudioSession {
    /// Applies `config` and activates the session. Implementations remember the
    /// state they replaced so [`deactivate`](Self::deactivate) can restore it.
    fn activate(&mut self, config: &SessionConfig) -> Result<(), SessionError>;

    fn deactivate(&mut self) -> Result<(), SessionError>;

    /// Current output level in [0.0, 1.0].
    fn output_volume(&self) -> f32;

    fn add_volume_observer(&mut self, listener: VolumeListener) -> ObserverToken;

    fn remove_volume_observer(&mut self, token: ObserverToken);
}
