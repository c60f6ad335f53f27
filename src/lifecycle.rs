//! Snowfall lifecycle: start, restart, time out, fade out, tear down

use tracing::{debug, info};

use crate::config::SnowConfig;
use crate::constants::*;
use crate::driver::{render_frame, FrameInput, FrameOutcome};
use crate::error::SnowResult;
use crate::host::{FrameHandle, Host, TimerHandle, TimerKind};
use crate::scene::SharedScene;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    FadingOut,
    Stopped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopMode {
    /// Fade out first, stop once the fade had time to finish.
    Graceful,
    Immediate,
}

/// One hosted instance of the effect. Several instances on a page share a
/// single scene, including its fade; each runs its own frame loop against it.
pub struct Snowfall<H: Host> {
    host: H,
    config: SnowConfig,
    scene: Option<SharedScene<H::Surface>>,
    phase: Phase,
    started_at: f64,
    first_render: bool,
    /// Torn down by the page but still fading the overlay out.
    disposed: bool,
    frame: Option<FrameHandle>,
    timeout: Option<TimerHandle>,
    restart: Option<TimerHandle>,
    force_stop: Option<TimerHandle>,
}

impl<H: Host> Snowfall<H> {
    pub fn new(host: H, config: SnowConfig) -> Self {
        Self {
            host,
            config: config.clamped(),
            scene: None,
            phase: Phase::Idle,
            started_at: 0.0,
            first_render: true,
            disposed: false,
            frame: None,
            timeout: None,
            restart: None,
            force_stop: None,
        }
    }

    pub fn config(&self) -> SnowConfig {
        self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, Phase::Running | Phase::FadingOut)
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn scene(&self) -> Option<&SharedScene<H::Surface>> {
        self.scene.as_ref()
    }

    pub fn particle_count(&self) -> usize {
        self.scene
            .as_ref()
            .map_or(0, |scene| scene.borrow().store.len())
    }

    /// When the shared snowfall started fading, if it is.
    pub fn fade_started_at(&self) -> Option<f64> {
        self.scene
            .as_ref()
            .and_then(|scene| scene.borrow().fade_started_at)
    }

    /// Display hook. Joins a snowfall already running on the page, or
    /// starts a fresh one.
    pub fn render(&mut self) {
        debug!(first_render = self.first_render, "initializing snowfall");

        let scene = match self.host.find_scene() {
            Some(scene) => Some(scene),
            None => {
                debug!("creating overlay");
                self.host.create_scene()
            }
        };
        let Some(scene) = scene else {
            debug!("no drawing surface, snowfall disabled");
            self.first_render = false;
            return;
        };

        let rejoining = std::mem::take(&mut self.disposed);
        let (empty, fading) = {
            let mut scene = scene.borrow_mut();
            if self.scene.is_none() || rejoining {
                scene.attach();
            }
            (scene.store.is_empty(), scene.is_fading())
        };
        self.scene = Some(scene);
        let first_render = std::mem::replace(&mut self.first_render, false);

        // A fading snowfall is on its way out; start over rather than join it.
        if self.host.flag().is_present() && !empty && !fading {
            if first_render {
                info!("snowfall already running on this page, attaching");
            } else {
                debug!("resuming running snowfall");
            }
            if !self.is_active() {
                self.phase = Phase::Running;
                self.started_at = self.host.wall_clock();
            }
            if self.frame.is_none() {
                self.schedule_frame();
            }
            return;
        }

        self.start();
    }

    /// (Re)starts the snowfall with the current configuration.
    pub fn start(&mut self) {
        let Some(scene) = self.scene.clone() else {
            debug!("no overlay, start ignored");
            return;
        };

        self.started_at = self.host.wall_clock();
        self.cancel_all();
        self.phase = Phase::Running;
        scene.borrow_mut().restart(&self.config, self.host.now());
        info!(
            snow_amount = self.config.snow_amount,
            timer = self.config.timer,
            "snowfall started"
        );

        self.schedule_frame();

        if let Some(ms) = self.config.timeout_ms() {
            self.timeout = Some(self.host.set_timer(TimerKind::Timeout, ms as u32));
            debug!(secs = self.config.timer, "timer set");
        } else {
            debug!("timer is 0, snowfall will run indefinitely");
        }

        self.host.flag().publish(&self.config, self.host.wall_clock());
    }

    /// Frame callback for `handle`. Callbacks for superseded handles are
    /// dropped.
    pub fn on_frame(&mut self, handle: FrameHandle) {
        if self.frame != Some(handle) {
            debug!(?handle, "stale frame callback");
            return;
        }
        self.frame = None;

        if !self.is_active() {
            return;
        }
        let Some(scene) = self.scene.clone() else {
            return;
        };
        let (empty, fading) = {
            let scene = scene.borrow();
            (scene.store.is_empty(), scene.is_fading())
        };
        if empty {
            debug!("overlay emptied elsewhere, frame loop ends");
            self.leave();
            return;
        }
        if self.disposed && !fading {
            debug!("overlay restarted by another instance, handing it over");
            self.leave();
            return;
        }
        // Follow the shared fade, whichever instance began or cancelled it.
        self.phase = if fading {
            Phase::FadingOut
        } else {
            Phase::Running
        };

        if self.phase == Phase::Running {
            if let Some(ms) = self.config.timeout_ms() {
                if self.host.wall_clock() - self.started_at > ms {
                    info!(secs = self.config.timer, "timer fallback triggered");
                    self.begin_fade();
                }
            }
        }

        let input = FrameInput {
            now: self.host.now(),
            fall_speed: self.config.fall_speed,
        };
        let outcome = render_frame(&mut *scene.borrow_mut(), input);

        if outcome == FrameOutcome::Exhausted {
            info!("all snowflakes faded out");
            self.halt();
            if self.disposed {
                self.release_overlay();
            } else {
                self.host.flag().clear();
            }
            return;
        }

        self.schedule_frame();
    }

    /// Timer callback for `handle`.
    pub fn on_timer(&mut self, handle: TimerHandle) {
        let handle = Some(handle);
        if self.timeout == handle {
            self.timeout = None;
            info!(secs = self.config.timer, "snowfall timer expired");
            self.begin_fade();
        } else if self.restart == handle {
            self.restart = None;
            self.start();
        } else if self.force_stop == handle {
            self.force_stop = None;
            let fading = self
                .scene
                .as_ref()
                .map_or(false, |scene| scene.borrow().is_fading());
            if fading {
                info!("fade did not finish, forcing stop");
                self.halt();
                self.release_flag();
            } else {
                self.leave();
            }
        } else {
            debug!(?handle, "stale timer callback");
        }
    }

    /// Starts the fade out of the shared snowfall. No-op unless running.
    pub fn begin_fade(&mut self) {
        if self.phase != Phase::Running {
            return;
        }
        let Some(scene) = &self.scene else {
            return;
        };
        let started_at = scene.borrow_mut().begin_fade(self.host.now());
        debug!(started_at, "starting fade out");
        self.phase = Phase::FadingOut;
        if let Some(timer) = self.timeout.take() {
            self.host.clear_timer(timer);
        }
    }

    pub fn stop(&mut self, mode: StopMode) {
        debug!(?mode, "stopping snowfall");
        if mode == StopMode::Graceful && self.is_active() && !self.scene_is_empty() {
            self.begin_fade();
            if let Some(timer) = self.force_stop.take() {
                self.host.clear_timer(timer);
            }
            let delay = FADE_DURATION_MS as u32 + FORCE_STOP_GRACE_MS;
            self.force_stop = Some(self.host.set_timer(TimerKind::ForceStop, delay));
            return;
        }
        self.halt();
        self.release_flag();
    }

    /// Applies one settings change and schedules a debounced restart.
    pub fn on_property_changed(&mut self, path: &str, value: f64) -> SnowResult<()> {
        let field = self.config.set_path(path, value)?;
        debug!(property = field.path(), value, "property changed");
        self.schedule_restart();
        Ok(())
    }

    /// Replaces the whole configuration and schedules a debounced restart.
    pub fn reconfigure(&mut self, config: SnowConfig) {
        self.config = config.clamped();
        self.schedule_restart();
    }

    pub fn on_resize(&mut self, width: f32, height: f32) {
        if let Some(scene) = &self.scene {
            let purged = scene.borrow_mut().resize(width, height);
            if purged > 0 {
                debug!(purged, "dropped snowflakes outside resized viewport");
            }
        }
    }

    /// Teardown hook. Other instances keep the shared snowfall running; the
    /// last one fades it out and releases the overlay once the fade is over.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        let Some(scene) = self.scene.clone() else {
            self.cancel_all();
            self.phase = Phase::Stopped;
            return;
        };

        let remaining = scene.borrow_mut().detach();
        if remaining > 0 {
            info!(remaining, "other instances exist, keeping snowfall running");
            self.leave();
            self.scene = None;
            return;
        }

        self.disposed = true;
        if let Some(timer) = self.restart.take() {
            self.host.clear_timer(timer);
        }
        if self.is_active() && !self.scene_is_empty() {
            info!("last instance, fading snowfall out");
            self.stop(StopMode::Graceful);
            if self.frame.is_none() {
                self.schedule_frame();
            }
        } else {
            info!("last instance, stopping snowfall");
            self.halt();
            self.release_overlay();
        }
    }

    fn schedule_restart(&mut self) {
        for timer in [self.timeout.take(), self.restart.take()].into_iter().flatten() {
            self.host.clear_timer(timer);
        }
        self.restart = Some(self.host.set_timer(TimerKind::Restart, RESTART_DEBOUNCE_MS));
    }

    fn schedule_frame(&mut self) {
        if let Some(frame) = self.frame.take() {
            self.host.cancel_frame(frame);
        }
        self.frame = Some(self.host.request_frame());
    }

    fn cancel_all(&mut self) {
        for timer in [self.timeout.take(), self.restart.take(), self.force_stop.take()]
            .into_iter()
            .flatten()
        {
            self.host.clear_timer(timer);
        }
        if let Some(frame) = self.frame.take() {
            self.host.cancel_frame(frame);
        }
    }

    /// Enters `Stopped`: no callbacks pending, blank overlay, no particles.
    fn halt(&mut self) {
        self.phase = Phase::Stopped;
        self.cancel_all();
        if let Some(scene) = &self.scene {
            scene.borrow_mut().wipe();
        }
        debug!("snowfall stopped");
    }

    /// Enters `Stopped` without touching the shared overlay.
    fn leave(&mut self) {
        self.phase = Phase::Stopped;
        self.cancel_all();
        if self.disposed {
            self.release_overlay();
        }
    }

    fn release_flag(&mut self) {
        if self.disposed {
            self.release_overlay();
            return;
        }
        let others = self
            .scene
            .as_ref()
            .map_or(0, |scene| scene.borrow().instances().saturating_sub(1));
        if others == 0 {
            self.host.flag().clear();
        }
    }

    /// Drops a disposed instance's hold on the overlay, removing it from the
    /// page unless another instance attached meanwhile.
    fn release_overlay(&mut self) {
        let Some(scene) = self.scene.take() else {
            return;
        };
        if scene.borrow().instances() == 0 {
            self.host.flag().clear();
            self.host.release_scene();
        }
    }

    fn scene_is_empty(&self) -> bool {
        self.scene
            .as_ref()
            .map_or(true, |scene| scene.borrow().store.is_empty())
    }
}

impl<H: Host> Drop for Snowfall<H> {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
