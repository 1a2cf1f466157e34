//! Platform-independent classification of output-volume changes.

use tracing::trace;

/// Increment by which hardware buttons move the output level.
pub const VOLUME_STEP: f32 = 0.0625;

/// Highest level the baseline is kept at while recentering, so an up press at
/// the physical limit still produces a delta.
pub const MAX_BASELINE: f32 = 0.99999;
pub const MIN_BASELINE: f32 = 0.00001;

// Deltas within this distance of VOLUME_STEP count as a single step.
const STEP_TOLERANCE: f32 = 0.0005;
const LEVEL_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonPress {
    Up,
    Down,
    Mute,
}

/// Why a notification did not count as a button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncReason {
    /// No observable delta, e.g. a press at 0.0 or 1.0.
    Unchanged,
    /// Delta did not match [`VOLUME_STEP`] while exact jumps are required.
    NonStandardJump,
    /// Echo of a level the handler set itself.
    Restore,
    /// Application inactive or session interrupted.
    Suspended,
    /// Level was not a finite number; tracking state left untouched.
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeChange {
    Press(ButtonPress),
    Resync(ResyncReason),
}

/// Tracks the last accepted output level and turns each new level into a
/// [`VolumeChange`].
#[derive(Debug, Clone)]
pub struct VolumeInterpreter {
    last_volume: f32,
    exact_jumps_only: bool,
    pending_restore: Option<f32>,
}

impl VolumeInterpreter {
    pub fn new(baseline: f32) -> Self {
        Self {
            last_volume: clamp_level(baseline),
            exact_jumps_only: false,
            pending_restore: None,
        }
    }

    pub fn last_volume(&self) -> f32 {
        self.last_volume
    }

    pub fn exact_jumps_only(&self) -> bool {
        self.exact_jumps_only
    }

    pub fn set_exact_jumps_only(&mut self, enabled: bool) {
        self.exact_jumps_only = enabled;
    }

    /// Replaces the tracked level without classifying anything.
    pub fn reset(&mut self, baseline: f32) {
        self.last_volume = clamp_level(baseline);
        self.pending_restore = None;
    }

    /// Marks `level` as a value the handler is about to set on its own, so the
    /// matching notification is a resync instead of a press.
    pub fn expect_restore(&mut self, level: f32) {
        self.pending_restore = Some(clamp_level(level));
    }

    pub fn cancel_restore(&mut self) {
        self.pending_restore = None;
    }

    /// Accepts `new_volume` as the current level without classifying it.
    pub fn resync(&mut self, new_volume: f32, reason: ResyncReason) -> VolumeChange {
        if !new_volume.is_finite() {
            return VolumeChange::Resync(ResyncReason::Invalid);
        }
        self.last_volume = clamp_level(new_volume);
        VolumeChange::Resync(reason)
    }

    pub fn classify(&mut self, new_volume: f32) -> VolumeChange {
        if !new_volume.is_finite() {
            trace!(new_volume, "ignoring non-finite volume level");
            return VolumeChange::Resync(ResyncReason::Invalid);
        }
        let new_volume = clamp_level(new_volume);
        let old_volume = self.last_volume;
        self.last_volume = new_volume;

        if let Some(expected) = self.pending_restore.take() {
            if levels_equal(new_volume, expected) {
                return VolumeChange::Resync(ResyncReason::Restore);
            }
        }

        let delta = new_volume - old_volume;
        let change = if self.exact_jumps_only
            && !is_single_step(delta)
            && !is_limit_press(new_volume, delta)
        {
            VolumeChange::Resync(ResyncReason::NonStandardJump)
        } else if new_volume > old_volume {
            VolumeChange::Press(ButtonPress::Up)
        } else if new_volume < old_volume {
            VolumeChange::Press(ButtonPress::Down)
        } else {
            VolumeChange::Resync(ResyncReason::Unchanged)
        };
        trace!(old_volume, new_volume, ?change, "classified volume change");
        change
    }
}

/// Rounds `level` to the nearest hardware step inside [0.0, 1.0].
pub fn quantize(level: f32) -> f32 {
    let steps = (1.0 / VOLUME_STEP).round();
    (clamp_level(level) * steps).round() / steps
}

pub fn is_single_step(delta: f32) -> bool {
    (delta.abs() - VOLUME_STEP).abs() <= STEP_TOLERANCE
}

// A press from a baseline held just inside the limits only moves the level by
// the remaining fraction of a step.
fn is_limit_press(new_volume: f32, delta: f32) -> bool {
    (new_volume == 0.0 || new_volume == 1.0) && delta != 0.0 && delta.abs() < VOLUME_STEP
}

pub(crate) fn levels_equal(a: f32, b: f32) -> bool {
    (a - b).abs() <= LEVEL_EPSILON
}

fn clamp_level(level: f32) -> f32 {
    level.clamp(0.0, 1.0)
}
