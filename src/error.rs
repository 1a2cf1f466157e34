use rodio::{PlayError, StreamError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, VolumeButtonError>;

/// Failure reported by an [`AudioSession`](crate::AudioSession) implementation.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("audio session could not be activated: {0}")]
    Activation(String),
    #[error("audio session could not be deactivated: {0}")]
    Deactivation(String),
    #[error(transparent)]
    Stream(#[from] StreamError),
    #[error(transparent)]
    Play(#[from] PlayError),
    #[error("unsupported by this audio session: {0}")]
    Unsupported(&'static str),
}

/// Failure reported by a [`SystemFeedbackSuppressor`](crate::SystemFeedbackSuppressor).
/// The handler logs these and carries on without suppression.
#[derive(Debug, Error)]
pub enum SuppressionError {
    #[error("no active window to host the volume overlay")]
    NoActiveWindow,
    #[error("system volume cannot be changed through this suppressor")]
    Unsupported,
    #[error("{0}")]
    Platform(String),
}

#[derive(Debug, Error)]
pub enum VolumeButtonError {
    #[error("session activation failed: {0}")]
    SessionActivation(#[source] SessionError),
    #[error("remote control queue is full")]
    RemoteQueueFull,
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
