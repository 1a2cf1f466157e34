use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, trace, warn};

use crate::command::{RemoteCommand, SessionEvent};
use crate::config::{HandlerConfig, SessionConfig};
use crate::error::{Result, VolumeButtonError};
use crate::handle::RemoteControlReceiver;
use crate::interpreter::{
    levels_equal, ButtonPress, ResyncReason, VolumeChange, VolumeInterpreter, MAX_BASELINE,
    MIN_BASELINE,
};
use crate::session::{AudioSession, ObserverToken, VolumeListener};
use crate::suppressor::{NoopSuppressor, SystemFeedbackSuppressor};

pub type ButtonCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Default, Clone)]
struct Callbacks {
    up: Option<ButtonCallback>,
    down: Option<ButtonCallback>,
    mute: Option<ButtonCallback>,
}

impl Callbacks {
    fn slot(&mut self, press: ButtonPress) -> &mut Option<ButtonCallback> {
        match press {
            ButtonPress::Up => &mut self.up,
            ButtonPress::Down => &mut self.down,
            ButtonPress::Mute => &mut self.mute,
        }
    }
}

/// State reachable from the volume listener.
struct Shared {
    interpreter: VolumeInterpreter,
    callbacks: Callbacks,
    listening: bool,
    app_active: bool,
    interrupted: bool,
    // level the system volume is pushed back to after every press
    recenter_to: Option<f32>,
    // set while the suppressor moves the level; notifications only resync
    recentering: bool,
}

impl Shared {
    fn suspended(&self) -> bool {
        !self.app_active || self.interrupted
    }
}

/// Turns output-volume changes into up/down button presses and remote mute
/// commands into mute presses.
///
/// Callbacks run synchronously on the thread that delivers the notification,
/// with no internal lock held.
pub struct VolumeButtonHandler<S, F = NoopSuppressor>
where
    S: AudioSession,
    F: SystemFeedbackSuppressor + 'static,
{
    session: S,
    suppressor: Arc<Mutex<F>>,
    shared: Arc<Mutex<Shared>>,
    session_config: SessionConfig,
    observer: Option<ObserverToken>,
    suppression_installed: bool,
}

impl<S, F> VolumeButtonHandler<S, F>
where
    S: AudioSession,
    F: SystemFeedbackSuppressor + 'static,
{
    /// Handler without callbacks; set them with [`set_up_callback`](Self::set_up_callback)
    /// and friends.
    pub fn new(session: S, suppressor: F) -> Self {
        Self::from_parts(session, suppressor, Callbacks::default(), HandlerConfig::default())
    }

    pub fn with_callbacks<U, D>(session: S, suppressor: F, up: U, down: D) -> Self
    where
        U: Fn() + Send + Sync + 'static,
        D: Fn() + Send + Sync + 'static,
    {
        let callbacks = Callbacks {
            up: Some(Arc::new(up)),
            down: Some(Arc::new(down)),
            mute: None,
        };
        Self::from_parts(session, suppressor, callbacks, HandlerConfig::default())
    }

    /// Like [`with_callbacks`](Self::with_callbacks) plus a mute callback.
    ///
    /// Mute is meant for a media remote; hardware mute switches may not be
    /// reported at all.
    pub fn with_mute_callback<U, D, M>(session: S, suppressor: F, up: U, down: D, mute: M) -> Self
    where
        U: Fn() + Send + Sync + 'static,
        D: Fn() + Send + Sync + 'static,
        M: Fn() + Send + Sync + 'static,
    {
        let callbacks = Callbacks {
            up: Some(Arc::new(up)),
            down: Some(Arc::new(down)),
            mute: Some(Arc::new(mute)),
        };
        Self::from_parts(session, suppressor, callbacks, HandlerConfig::default())
    }

    pub fn builder(session: S, suppressor: F) -> HandlerBuilder<S, F> {
        HandlerBuilder::new(session, suppressor)
    }

    fn from_parts(session: S, suppressor: F, callbacks: Callbacks, config: HandlerConfig) -> Self {
        let baseline = session.output_volume();
        let mut interpreter = VolumeInterpreter::new(baseline);
        interpreter.set_exact_jumps_only(config.exact_jumps_only);
        Self {
            session,
            suppressor: Arc::new(Mutex::new(suppressor)),
            shared: Arc::new(Mutex::new(Shared {
                interpreter,
                callbacks,
                listening: false,
                app_active: true,
                interrupted: false,
                recenter_to: None,
                recentering: false,
            })),
            session_config: config.session,
            observer: None,
            suppression_installed: false,
        }
    }

    pub fn set_up_callback<C>(&self, callback: C)
    where
        C: Fn() + Send + Sync + 'static,
    {
        self.set_callback(ButtonPress::Up, callback);
    }

    pub fn set_down_callback<C>(&self, callback: C)
    where
        C: Fn() + Send + Sync + 'static,
    {
        self.set_callback(ButtonPress::Down, callback);
    }

    pub fn set_mute_callback<C>(&self, callback: C)
    where
        C: Fn() + Send + Sync + 'static,
    {
        self.set_callback(ButtonPress::Mute, callback);
    }

    pub fn set_callback<C>(&self, press: ButtonPress, callback: C)
    where
        C: Fn() + Send + Sync + 'static,
    {
        *lock(&self.shared).callbacks.slot(press) = Some(Arc::new(callback));
    }

    pub fn clear_callback(&self, press: ButtonPress) {
        *lock(&self.shared).callbacks.slot(press) = None;
    }

    pub fn has_callback(&self, press: ButtonPress) -> bool {
        lock(&self.shared).callbacks.slot(press).is_some()
    }

    pub fn session_config(&self) -> SessionConfig {
        self.session_config
    }

    /// Takes effect the next time the session is activated.
    pub fn set_session_config(&mut self, config: SessionConfig) {
        self.session_config = config;
    }

    pub fn set_exact_jumps_only(&self, enabled: bool) {
        lock(&self.shared).interpreter.set_exact_jumps_only(enabled);
    }

    pub fn exact_jumps_only(&self) -> bool {
        lock(&self.shared).interpreter.exact_jumps_only()
    }

    pub fn last_volume(&self) -> f32 {
        lock(&self.shared).interpreter.last_volume()
    }

    pub fn is_active(&self) -> bool {
        self.observer.is_some()
    }

    pub fn is_suppressing_system_feedback(&self) -> bool {
        self.suppression_installed
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    /// Activates the session, records the current level as the baseline and
    /// starts observing volume changes. With `disable_system_volume_handler`
    /// the system HUD and click sound are suppressed and the level is pushed
    /// back to the baseline after every press.
    ///
    /// Calling this while active does nothing. On error the handler stays
    /// inactive.
    pub fn start_handler(&mut self, disable_system_volume_handler: bool) -> Result<()> {
        if self.observer.is_some() {
            debug!("volume button handler already active");
            return Ok(());
        }

        if let Err(e) = self.session.activate(&self.session_config) {
            warn!("failed to activate audio session: {}", e);
            return Err(VolumeButtonError::SessionActivation(e));
        }
        // an activated session means any earlier interruption is over
        lock(&self.shared).interrupted = false;

        if disable_system_volume_handler {
            match lock(&self.suppressor).install() {
                Ok(()) => self.suppression_installed = true,
                Err(e) => warn!("system volume feedback stays visible: {}", e),
            }
        }

        self.establish_baseline();

        let listener = volume_listener(Arc::clone(&self.shared), Arc::clone(&self.suppressor));
        self.observer = Some(self.session.add_volume_observer(listener));

        info!(
            baseline = self.last_volume(),
            suppressed = self.suppression_installed,
            "volume button handler started"
        );
        Ok(())
    }

    /// Stops observing, removes any suppression artifact and restores the
    /// session. Does nothing when not active.
    pub fn stop_handler(&mut self) {
        let Some(token) = self.observer.take() else {
            debug!("volume button handler not active");
            return;
        };

        self.session.remove_volume_observer(token);
        {
            let mut shared = lock(&self.shared);
            shared.listening = false;
            shared.recenter_to = None;
            shared.recentering = false;
            shared.interpreter.cancel_restore();
        }

        if self.suppression_installed {
            lock(&self.suppressor).remove();
            self.suppression_installed = false;
        }

        if let Err(e) = self.session.deactivate() {
            warn!("failed to deactivate audio session: {}", e);
        }
        info!("volume button handler stopped");
    }

    /// Forwards an application lifecycle or session interruption event.
    ///
    /// Only [`SessionEvent::InterruptionEnded`] can fail, when the session cannot
    /// be reactivated; retrying is left to the caller.
    pub fn handle_session_event(&mut self, event: SessionEvent) -> Result<()> {
        debug!(?event, "session event");
        match event {
            SessionEvent::BecameActive => {
                lock(&self.shared).app_active = true;
                if self.is_active() {
                    self.establish_baseline();
                }
            }
            SessionEvent::ResignedActive => {
                lock(&self.shared).app_active = false;
            }
            SessionEvent::InterruptionBegan => {
                lock(&self.shared).interrupted = true;
            }
            SessionEvent::InterruptionEnded => {
                if self.is_active() {
                    if let Err(e) = self.session.activate(&self.session_config) {
                        warn!("failed to reactivate audio session: {}", e);
                        return Err(VolumeButtonError::SessionActivation(e));
                    }
                    self.establish_baseline();
                }
                lock(&self.shared).interrupted = false;
            }
        }
        Ok(())
    }

    /// Fires the mute callback for a remote-control mute command. Returns
    /// whether a callback ran.
    pub fn handle_remote_command(&self, command: RemoteCommand) -> bool {
        let callback = {
            let shared = lock(&self.shared);
            if !shared.listening || shared.suspended() {
                trace!(?command, "remote command while not listening");
                return false;
            }
            shared.callbacks.mute.clone()
        };
        debug!(?command, "remote mute command");
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    /// Drains `receiver`, returning the number of commands processed.
    pub fn pump_remote_commands(&self, receiver: &mut RemoteControlReceiver) -> usize {
        let mut processed = 0;
        while let Some(command) = receiver.try_recv() {
            self.handle_remote_command(command);
            processed += 1;
        }
        processed
    }

    /// Probes the session and makes the result the baseline, keeping it off the
    /// hard limits when suppression lets us move the system level.
    fn establish_baseline(&mut self) {
        let probed = self.session.output_volume();
        let mut baseline = probed;

        if self.suppression_installed {
            let clamped = probed.clamp(MIN_BASELINE, MAX_BASELINE);
            if !levels_equal(clamped, probed) {
                {
                    let mut shared = lock(&self.shared);
                    shared.recentering = true;
                    shared.interpreter.expect_restore(clamped);
                }
                let result = lock(&self.suppressor).set_system_volume(clamped);
                lock(&self.shared).recentering = false;
                match result {
                    Ok(()) => baseline = clamped,
                    Err(e) => debug!("baseline left at {}: {}", probed, e),
                }
            }
        }

        let mut shared = lock(&self.shared);
        shared.interpreter.reset(baseline);
        shared.recenter_to = self.suppression_installed.then_some(baseline);
        shared.listening = true;
    }
}

impl<S, F> Drop for VolumeButtonHandler<S, F>
where
    S: AudioSession,
    F: SystemFeedbackSuppressor + 'static,
{
    fn drop(&mut self) {
        self.stop_handler();
    }
}

/// Builds a [`VolumeButtonHandler`] from callbacks and a [`HandlerConfig`].
pub struct HandlerBuilder<S, F> {
    session: S,
    suppressor: F,
    callbacks: Callbacks,
    config: HandlerConfig,
}

impl<S, F> HandlerBuilder<S, F>
where
    S: AudioSession,
    F: SystemFeedbackSuppressor + 'static,
{
    pub fn new(session: S, suppressor: F) -> Self {
        Self {
            session,
            suppressor,
            callbacks: Callbacks::default(),
            config: HandlerConfig::default(),
        }
    }

    pub fn on_up<C>(mut self, callback: C) -> Self
    where
        C: Fn() + Send + Sync + 'static,
    {
        self.callbacks.up = Some(Arc::new(callback));
        self
    }

    pub fn on_down<C>(mut self, callback: C) -> Self
    where
        C: Fn() + Send + Sync + 'static,
    {
        self.callbacks.down = Some(Arc::new(callback));
        self
    }

    pub fn on_mute<C>(mut self, callback: C) -> Self
    where
        C: Fn() + Send + Sync + 'static,
    {
        self.callbacks.mute = Some(Arc::new(callback));
        self
    }

    pub fn config(mut self, config: HandlerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    pub fn exact_jumps_only(mut self, enabled: bool) -> Self {
        self.config.exact_jumps_only = enabled;
        self
    }

    pub fn build(self) -> VolumeButtonHandler<S, F> {
        VolumeButtonHandler::from_parts(self.session, self.suppressor, self.callbacks, self.config)
    }

    /// Builds and starts the handler, honouring
    /// `config.disable_system_volume_handler`.
    pub fn start(self) -> Result<VolumeButtonHandler<S, F>> {
        let disable = self.config.disable_system_volume_handler;
        let mut handler = self.build();
        handler.start_handler(disable)?;
        Ok(handler)
    }
}

fn volume_listener<F>(shared: Arc<Mutex<Shared>>, suppressor: Arc<Mutex<F>>) -> VolumeListener
where
    F: SystemFeedbackSuppressor + 'static,
{
    Arc::new(move |level| on_volume_change(&shared, &suppressor, level))
}

fn on_volume_change<F>(shared: &Mutex<Shared>, suppressor: &Mutex<F>, level: f32)
where
    F: SystemFeedbackSuppressor,
{
    let (callback, recenter) = {
        let mut state = lock(shared);
        if !state.listening {
            return;
        }
        if state.suspended() {
            state.interpreter.resync(level, ResyncReason::Suspended);
            return;
        }
        if state.recentering {
            // still consumes a matching pending restore
            state.interpreter.classify(level);
            return;
        }
        match state.interpreter.classify(level) {
            VolumeChange::Press(press) => {
                let recenter = state.recenter_to.is_some();
                (state.callbacks.slot(press).clone(), recenter)
            }
            VolumeChange::Resync(ResyncReason::Restore | ResyncReason::Invalid) => return,
            VolumeChange::Resync(_) => {
                // a level set from elsewhere becomes the new baseline
                let Some(target) = state.recenter_to.as_mut() else {
                    return;
                };
                *target = level.clamp(MIN_BASELINE, MAX_BASELINE);
                (None, true)
            }
        }
    };

    if let Some(callback) = callback {
        callback();
    }

    if recenter {
        recenter_system_volume(shared, suppressor);
    }
}

/// Pushes the system level back to the current recentering target. The target
/// is read here, after the callback ran, so a level the callback set itself
/// wins over the one captured at the press.
fn recenter_system_volume<F>(shared: &Mutex<Shared>, suppressor: &Mutex<F>)
where
    F: SystemFeedbackSuppressor,
{
    let target = {
        let mut state = lock(shared);
        let Some(target) = state.recenter_to else {
            return;
        };
        if !state.listening || state.recentering {
            return;
        }
        if levels_equal(target, state.interpreter.last_volume()) {
            return;
        }
        state.recentering = true;
        state.interpreter.expect_restore(target);
        target
    };

    let result = lock(suppressor).set_system_volume(target);

    let mut state = lock(shared);
    state.recentering = false;
    if let Err(e) = result {
        warn!("failed to restore system volume to {}: {}", target, e);
        state.interpreter.cancel_restore();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Arc};
    use std::time::Duration;

    use crate::backend::simulated::{SimulatedPlatform, SimulatedSession, SimulatedSuppressor};
    use crate::command::{RemoteCommand, SessionEvent};
    use crate::config::{HandlerConfig, SessionCategory, SessionConfig};
    use crate::error::VolumeButtonError;
    use crate::handle::remote_control_channel;
    use crate::handler::VolumeButtonHandler;
    use crate::interpreter::{ButtonPress, MAX_BASELINE};

    type Handler = VolumeButtonHandler<SimulatedSession, SimulatedSuppressor>;

    struct Presses {
        up: Arc<AtomicUsize>,
        down: Arc<AtomicUsize>,
        mute: Arc<AtomicUsize>,
    }

    impl Presses {
        fn counts(&self) -> (usize, usize, usize) {
            (
                self.up.load(Ordering::SeqCst),
                self.down.load(Ordering::SeqCst),
                self.mute.load(Ordering::SeqCst),
            )
        }
    }

    fn counter(count: &Arc<AtomicUsize>) -> impl Fn() + Send + Sync + 'static {
        let count = Arc::clone(count);
        move || {
            count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn mock_handler(volume: f32) -> (Handler, SimulatedPlatform, Presses) {
        let platform = SimulatedPlatform::new(volume);
        let presses = Presses {
            up: Arc::new(AtomicUsize::new(0)),
            down: Arc::new(AtomicUsize::new(0)),
            mute: Arc::new(AtomicUsize::new(0)),
        };
        let handler = VolumeButtonHandler::with_mute_callback(
            platform.session(),
            platform.suppressor(),
            counter(&presses.up),
            counter(&presses.down),
            counter(&presses.mute),
        );
        (handler, platform, presses)
    }

    #[test]
    fn up_and_down() {
        let (mut handler, platform, presses) = mock_handler(0.5);
        handler.start_handler(false).unwrap();

        platform.press_up();
        assert_eq!(presses.counts(), (1, 0, 0));
        assert_eq!(handler.last_volume(), 0.5625);

        platform.press_down();
        platform.press_down();
        assert_eq!(presses.counts(), (1, 2, 0));
        assert_eq!(handler.last_volume(), 0.4375);
        // without suppression the level stays where the presses left it
        assert_eq!(platform.volume(), 0.4375);
    }

    #[test]
    fn probe_is_baseline() {
        let (mut handler, platform, presses) = mock_handler(0.25);
        handler.start_handler(false).unwrap();
        assert_eq!(handler.last_volume(), 0.25);
        assert_eq!(presses.counts(), (0, 0, 0));

        platform.set_volume(0.25);
        assert_eq!(presses.counts(), (0, 0, 0));
    }

    #[test]
    fn exact_jumps_only_ignores_slider() {
        let (mut handler, platform, presses) = mock_handler(0.5);
        handler.set_exact_jumps_only(true);
        handler.start_handler(false).unwrap();

        platform.set_volume(0.52);
        assert_eq!(presses.counts(), (0, 0, 0));
        assert_eq!(handler.last_volume(), 0.52);

        handler.set_exact_jumps_only(false);
        platform.set_volume(0.6);
        assert_eq!(presses.counts(), (1, 0, 0));
    }

    #[test]
    fn press_at_max_without_suppression() {
        let (mut handler, platform, presses) = mock_handler(1.0);
        handler.start_handler(false).unwrap();

        platform.press_up();
        assert_eq!(presses.counts(), (0, 0, 0));
        assert_eq!(handler.last_volume(), 1.0);

        platform.press_down();
        assert_eq!(presses.counts(), (0, 1, 0));
    }

    #[test]
    fn stop_handler() {
        let (mut handler, platform, presses) = mock_handler(0.5);
        handler.start_handler(false).unwrap();
        handler.stop_handler();

        assert!(!handler.is_active());
        assert!(!platform.is_session_active());
        assert_eq!(platform.observer_count(), 0);

        platform.press_up();
        assert_eq!(presses.counts(), (0, 0, 0));
        assert!(!handler.handle_remote_command(RemoteCommand::ToggleMute));

        // stopping twice is harmless
        handler.stop_handler();

        handler.start_handler(false).unwrap();
        assert_eq!(handler.last_volume(), 0.5625);
        platform.press_up();
        assert_eq!(presses.counts(), (1, 0, 0));
    }

    #[test]
    fn double_start_registers_once() {
        let (mut handler, platform, presses) = mock_handler(0.5);
        handler.start_handler(false).unwrap();
        handler.start_handler(false).unwrap();
        assert_eq!(platform.observer_count(), 1);

        platform.press_up();
        assert_eq!(presses.counts(), (1, 0, 0));
    }

    #[test]
    fn activation_failure_leaves_handler_inactive() {
        let (mut handler, platform, presses) = mock_handler(0.5);
        platform.fail_next_activation("category held by another app");

        let err = handler.start_handler(true).unwrap_err();
        assert!(matches!(err, VolumeButtonError::SessionActivation(_)));
        assert!(!handler.is_active());
        assert!(!handler.is_suppressing_system_feedback());
        assert_eq!(platform.observer_count(), 0);
        assert!(!platform.is_overlay_installed());

        platform.press_up();
        assert_eq!(presses.counts(), (0, 0, 0));

        handler.start_handler(false).unwrap();
        platform.press_up();
        assert_eq!(presses.counts(), (1, 0, 0));
    }

    #[test]
    fn suppression_recenters_volume() {
        let (mut handler, platform, presses) = mock_handler(0.5);
        handler.start_handler(true).unwrap();
        assert!(platform.is_overlay_installed());
        assert!(platform.is_click_muted());

        platform.press_up();
        platform.press_up();
        platform.press_down();
        assert_eq!(presses.counts(), (2, 1, 0));
        assert_eq!(platform.volume(), 0.5);
        assert_eq!(handler.last_volume(), 0.5);
        assert_eq!(platform.hud_shown(), 0);

        handler.stop_handler();
        assert!(!platform.is_overlay_installed());
        assert!(!platform.is_click_muted());
        platform.press_up();
        assert_eq!(platform.hud_shown(), 1);
    }

    #[test]
    fn suppression_keeps_baseline_off_the_limit() {
        let (mut handler, platform, presses) = mock_handler(1.0);
        handler.set_exact_jumps_only(true);
        handler.start_handler(true).unwrap();
        assert_eq!(handler.last_volume(), MAX_BASELINE);
        assert_eq!(platform.volume(), MAX_BASELINE);

        platform.press_up();
        platform.press_up();
        assert_eq!(presses.counts(), (2, 0, 0));
        assert_eq!(platform.volume(), MAX_BASELINE);
    }

    #[test]
    fn rebaseline_at_limit_fires_nothing() {
        let (mut handler, platform, presses) = mock_handler(0.5);
        handler.start_handler(true).unwrap();

        handler.handle_session_event(SessionEvent::ResignedActive).unwrap();
        platform.set_volume(1.0);
        handler.handle_session_event(SessionEvent::BecameActive).unwrap();

        assert_eq!(presses.counts(), (0, 0, 0));
        assert_eq!(platform.volume(), MAX_BASELINE);
        assert_eq!(handler.last_volume(), MAX_BASELINE);

        platform.press_up();
        assert_eq!(presses.counts(), (1, 0, 0));
    }

    #[test]
    fn callback_moving_volume_while_recentering() {
        let (mut handler, platform, _presses) = mock_handler(0.5);
        let up = Arc::new(AtomicUsize::new(0));
        let slider = platform.clone();
        let count = Arc::clone(&up);
        handler.set_up_callback(move || {
            if count.fetch_add(1, Ordering::SeqCst) < 2 {
                slider.set_volume(0.8);
            }
        });
        handler.start_handler(true).unwrap();

        let (done_sender, done) = mpsc::channel();
        let buttons = platform.clone();
        std::thread::spawn(move || {
            buttons.press_up();
            done_sender.send(()).unwrap();
        });
        done.recv_timeout(Duration::from_secs(3)).unwrap();

        // the level set by the callback becomes the new baseline
        assert_eq!(up.load(Ordering::SeqCst), 2);
        assert_eq!(platform.volume(), 0.8);
        assert_eq!(handler.last_volume(), 0.8);

        platform.press_up();
        assert_eq!(up.load(Ordering::SeqCst), 3);
        assert_eq!(platform.volume(), 0.8);
        assert_eq!(handler.last_volume(), 0.8);
    }

    #[test]
    fn restart_after_unfinished_interruption() {
        let (mut handler, platform, presses) = mock_handler(0.5);
        handler.start_handler(false).unwrap();
        handler.handle_session_event(SessionEvent::InterruptionBegan).unwrap();
        handler.stop_handler();

        handler.start_handler(false).unwrap();
        platform.press_up();
        assert_eq!(presses.counts(), (1, 0, 0));
    }

    #[test]
    fn session_category_is_restored() {
        let previous = SessionConfig {
            category: SessionCategory::Ambient,
            ..SessionConfig::default()
        };
        let platform = SimulatedPlatform::with_category(0.5, previous);
        let mut handler = VolumeButtonHandler::new(platform.session(), platform.suppressor());

        handler.start_handler(false).unwrap();
        assert_eq!(platform.category(), Some(SessionConfig::default()));

        handler.stop_handler();
        assert_eq!(platform.category(), Some(previous));
    }

    #[test]
    fn session_config_applies_on_next_start() {
        let platform = SimulatedPlatform::new(0.5);
        let mut handler = VolumeButtonHandler::new(platform.session(), platform.suppressor());
        let config = SessionConfig {
            category: SessionCategory::PlayAndRecord,
            ..SessionConfig::default()
        };
        handler.set_session_config(config);
        handler.start_handler(false).unwrap();
        assert_eq!(platform.category(), Some(config));
    }

    #[test]
    fn remote_mute() {
        let (mut handler, _platform, presses) = mock_handler(0.5);
        assert!(!handler.handle_remote_command(RemoteCommand::ToggleMute));

        handler.start_handler(false).unwrap();
        assert!(handler.handle_remote_command(RemoteCommand::ToggleMute));
        assert!(handler.handle_remote_command(RemoteCommand::SetMuted(false)));
        assert_eq!(presses.counts(), (0, 0, 2));
    }

    #[test]
    fn mute_is_not_inferred_from_volume() {
        let (mut handler, platform, presses) = mock_handler(0.0625);
        handler.start_handler(false).unwrap();
        platform.press_down();
        assert_eq!(platform.volume(), 0.0);
        assert_eq!(presses.counts(), (0, 1, 0));
    }

    #[test]
    fn pump_remote_queue() {
        let (mut handler, _platform, presses) = mock_handler(0.5);
        handler.start_handler(false).unwrap();
        let (mut remote, mut receiver) = remote_control_channel(8);

        let sender = std::thread::spawn(move || {
            remote.toggle_mute().unwrap();
            remote.toggle_mute().unwrap();
        });
        sender.join().unwrap();

        assert_eq!(handler.pump_remote_commands(&mut receiver), 2);
        assert_eq!(presses.counts(), (0, 0, 2));
        assert_eq!(handler.pump_remote_commands(&mut receiver), 0);
    }

    #[test]
    fn inactive_app_resyncs_without_firing() {
        let (mut handler, platform, presses) = mock_handler(0.5);
        handler.start_handler(false).unwrap();

        handler.handle_session_event(SessionEvent::ResignedActive).unwrap();
        platform.press_up();
        assert_eq!(presses.counts(), (0, 0, 0));
        assert_eq!(handler.last_volume(), 0.5625);
        assert!(!handler.handle_remote_command(RemoteCommand::ToggleMute));

        platform.set_volume(0.25);
        handler.handle_session_event(SessionEvent::BecameActive).unwrap();
        assert_eq!(handler.last_volume(), 0.25);
        platform.press_up();
        assert_eq!(presses.counts(), (1, 0, 0));
    }

    #[test]
    fn interruption() {
        let (mut handler, platform, presses) = mock_handler(0.5);
        handler.start_handler(false).unwrap();

        handler.handle_session_event(SessionEvent::InterruptionBegan).unwrap();
        platform.press_up();
        assert_eq!(presses.counts(), (0, 0, 0));

        platform.fail_next_activation("still interrupted");
        let err = handler
            .handle_session_event(SessionEvent::InterruptionEnded)
            .unwrap_err();
        assert!(matches!(err, VolumeButtonError::SessionActivation(_)));
        platform.press_up();
        assert_eq!(presses.counts(), (0, 0, 0));

        handler.handle_session_event(SessionEvent::InterruptionEnded).unwrap();
        platform.press_up();
        assert_eq!(presses.counts(), (1, 0, 0));
    }

    #[test]
    fn callbacks_set_after_construction() {
        let platform = SimulatedPlatform::new(0.5);
        let mut handler = VolumeButtonHandler::new(platform.session(), platform.suppressor());
        handler.start_handler(false).unwrap();

        // a press without a callback still moves the baseline
        platform.press_up();
        assert_eq!(handler.last_volume(), 0.5625);

        let up = Arc::new(AtomicUsize::new(0));
        handler.set_up_callback(counter(&up));
        assert!(handler.has_callback(ButtonPress::Up));
        platform.press_up();
        assert_eq!(up.load(Ordering::SeqCst), 1);

        handler.clear_callback(ButtonPress::Up);
        assert!(!handler.has_callback(ButtonPress::Up));
        platform.press_up();
        assert_eq!(up.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn builder_from_config() {
        let platform = SimulatedPlatform::new(0.5);
        let up = Arc::new(AtomicUsize::new(0));
        let config = HandlerConfig::from_toml_str(
            "exact_jumps_only = true\ndisable_system_volume_handler = true",
        )
        .unwrap();

        let handler = VolumeButtonHandler::builder(platform.session(), platform.suppressor())
            .on_up(counter(&up))
            .config(config)
            .start()
            .unwrap();
        assert!(handler.is_active());
        assert!(handler.exact_jumps_only());
        assert!(handler.is_suppressing_system_feedback());

        platform.set_volume(0.7);
        assert_eq!(up.load(Ordering::SeqCst), 0);
        platform.press_up();
        assert_eq!(up.load(Ordering::SeqCst), 1);
        assert_eq!(platform.volume(), 0.7);
    }

    #[test]
    fn drop_stops_handler() {
        let (mut handler, platform, _presses) = mock_handler(0.5);
        handler.start_handler(true).unwrap();
        std::mem::drop(handler);

        assert_eq!(platform.observer_count(), 0);
        assert!(!platform.is_session_active());
        assert!(!platform.is_overlay_installed());
    }
}
