//! What the lifecycle controller needs from its environment

use crate::coordination::{CoordinationFlag, FlagStore};
use crate::scene::SharedScene;
use crate::surface::Surface;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub u32);

/// Deferred callbacks the controller arms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerKind {
    /// Configured snowfall duration elapsed.
    Timeout,
    /// Debounced restart after a settings change.
    Restart,
    /// Fallback stop after a graceful fade.
    ForceStop,
}

/// Scheduling, clocks and page resources. Callbacks come back to the
/// controller through `Snowfall::on_frame` and `Snowfall::on_timer`
/// carrying the handle returned here.
pub trait Host {
    type Surface: Surface;
    type Flags: FlagStore;

    /// Monotonic milliseconds, used for frame pacing and fades.
    fn now(&self) -> f64;

    /// Milliseconds since the Unix epoch.
    fn wall_clock(&self) -> f64;

    fn request_frame(&mut self) -> FrameHandle;

    fn cancel_frame(&mut self, handle: FrameHandle);

    fn set_timer(&mut self, kind: TimerKind, delay_ms: u32) -> TimerHandle;

    fn clear_timer(&mut self, handle: TimerHandle);

    /// The overlay already present on the page, if any.
    fn find_scene(&self) -> Option<SharedScene<Self::Surface>>;

    /// Creates the page overlay. `None` when no drawing surface can be had.
    fn create_scene(&mut self) -> Option<SharedScene<Self::Surface>>;

    /// Drops the page overlay once the last instance is gone.
    fn release_scene(&mut self);

    fn flag(&self) -> &CoordinationFlag<Self::Flags>;
}
