//! Detects hardware volume-button presses by watching the system output level.
//!
//! Volume buttons raise no event of their own; a press shows up only as a change
//! of the output-volume property. [`VolumeButtonHandler`] observes that
//! property through an [`AudioSession`], tells presses apart from other volume
//! changes and runs the matching callback. Mute presses come from a media
//! remote via [`RemoteCommand`], since hardware mute is not observable.

pub mod backend;
mod command;
mod config;
mod error;
mod handle;
mod handler;
mod interpreter;
mod session;
mod suppressor;

pub use command::{RemoteCommand, SessionEvent};
pub use config::{HandlerConfig, SessionCategory, SessionConfig, SessionOptions};
pub use error::{Result, SessionError, SuppressionError, VolumeButtonError};
pub use handle::{remote_control_channel, RemoteControlHandle, RemoteControlReceiver};
pub use handler::{ButtonCallback, HandlerBuilder, VolumeButtonHandler};
pub use interpreter::{
    quantize, ButtonPress, ResyncReason, VolumeChange, VolumeInterpreter, VOLUME_STEP,
};
pub use session::{AudioSession, ObserverToken, VolumeListener};
pub use suppressor::{NoopSuppressor, SystemFeedbackSuppressor};
