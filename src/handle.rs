use rtrb::{Consumer, Producer, RingBuffer};

use crate::command::RemoteCommand;
use crate::error::{Result, VolumeButtonError};

/// Creates a bounded, lock-free queue carrying remote-control commands from the
/// thread that receives them to the notification-delivery thread.
pub fn remote_control_channel(capacity: usize) -> (RemoteControlHandle, RemoteControlReceiver) {
    let (producer, consumer) = RingBuffer::new(capacity);
    (
        RemoteControlHandle { producer },
        RemoteControlReceiver { consumer },
    )
}

pub struct RemoteControlHandle {
    producer: Producer<RemoteCommand>,
}

impl RemoteControlHandle {
    pub fn send(&mut self, command: RemoteCommand) -> Result<()> {
        self.producer
            .push(command)
            .map_err(|_| VolumeButtonError::RemoteQueueFull)
    }

    pub fn toggle_mute(&mut self) -> Result<()> {
        self.send(RemoteCommand::ToggleMute)
    }
}

pub struct RemoteControlReceiver {
    consumer: Consumer<RemoteCommand>,
}

impl RemoteControlReceiver {
    pub fn try_recv(&mut self) -> Option<RemoteCommand> {
        self.consumer.pop().ok()
    }

    /// True once the sending half was dropped.
    pub fn is_abandoned(&self) -> bool {
        self.consumer.is_abandoned()
    }
}
