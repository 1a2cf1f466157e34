use crate::error::SuppressionError;

/// Hides the platform's own volume feedback while the handler is active.
///
/// On platforms without a public switch for the volume HUD this is done by
/// placing a zero-opacity, non-interactive volume view in the active window;
/// that view is also the only way to move the system level programmatically,
/// which is why [`set_system_volume`](Self::set_system_volume) lives here.
pub trait SystemFeedbackSuppressor: Send {
    /// Installs the invisible artifact and mutes the volume-change click.
    fn install(&mut self) -> Result<(), SuppressionError>;

    /// Removes whatever [`install`](Self::install) added. Safe to call when
    /// nothing is installed.
    fn remove(&mut self);

    fn set_system_volume(&mut self, _level: f32) -> Result<(), SuppressionError> {
        Err(SuppressionError::Unsupported)
    }
}

/// Suppressor for hosts with no system volume HUD.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSuppressor;

impl SystemFeedbackSuppressor for NoopSuppressor {
    fn install(&mut self) -> Result<(), SuppressionError> {
        Ok(())
    }

    fn remove(&mut self) {}
}
