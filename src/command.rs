/// Media remote-control signals understood by the handler.
///
/// Hardware mute does not reliably surface through the output-volume level, so
/// the mute callback is driven exclusively by these commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCommand {
    ToggleMute,
    SetMuted(bool),
}

/// Platform lifecycle notifications forwarded by the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    BecameActive,
    ResignedActive,
    InterruptionBegan,
    InterruptionEnded,
}
