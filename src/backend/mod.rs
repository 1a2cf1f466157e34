//! [`AudioSession`](crate::AudioSession) implementations.

pub mod desktop;
pub mod simulated;
