//! Per-frame animation step

use tracing::debug;

use crate::constants::*;
use crate::scene::Scene;
use crate::surface::Surface;

/// Throttles frame callbacks down to `TARGET_FPS`.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameClock {
    last: f64,
}

impl FrameClock {
    pub fn reset(&mut self, now: f64) {
        self.last = now;
    }

    /// Returns the elapsed time when a frame is due, keeping the remainder so
    /// the cadence does not drift.
    pub fn tick(&mut self, now: f64) -> Option<f64> {
        let delta = now - self.last;
        if delta < FRAME_INTERVAL_MS {
            return None;
        }
        self.last = now - (delta % FRAME_INTERVAL_MS);
        Some(delta)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FrameInput {
    /// Monotonic timestamp in ms.
    pub now: f64,
    pub fall_speed: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Not enough time since the previous frame.
    Throttled,
    Drawn { visible: usize },
    /// Fading and nothing left on screen.
    Exhausted,
}

pub fn global_fade_progress(now: f64, started_at: f64) -> f32 {
    ((now - started_at) / FADE_DURATION_MS).clamp(0.0, 1.0) as f32
}

/// Fade of one particle: particles further right and lower start later, so
/// the effect dissolves in a diagonal wave.
pub fn individual_fade(global: f32, x: f32, y: f32, width: f32, height: f32) -> f32 {
    let extent = width + height;
    let start = if extent > 0.0 {
        ((x + y) / extent * FADE_STAGGER).clamp(0.0, FADE_STAGGER)
    } else {
        0.0
    };
    ((global - start) / (1.0 - start)).clamp(0.0, 1.0)
}

/// Advances and draws every live particle of `scene`, fading them while the
/// scene is fading out.
pub fn render_frame<S: Surface>(scene: &mut Scene<S>, input: FrameInput) -> FrameOutcome {
    let Some(delta) = scene.clock.tick(input.now) else {
        return FrameOutcome::Throttled;
    };

    scene.surface.clear();
    let (width, height) = scene.surface.size();
    let global = scene
        .fade_started_at
        .map(|started_at| global_fade_progress(input.now, started_at));
    let mut visible = 0;

    for index in 0..scene.store.len() {
        let particle = &mut scene.store.particles_mut()[index];
        if particle.is_faded() {
            continue;
        }

        if let Some(global) = global {
            let fade = individual_fade(global, particle.x, particle.y, width, height);
            // Positions move while fading; never let a particle un-fade.
            particle.fade = particle.fade.max(fade);
            particle.speed *= FADE_DECAY;
            particle.swing *= FADE_DECAY;
        }

        scene
            .store
            .advance(index, input.fall_speed, width, height, global.is_none());

        let particle = scene.store.particles_mut()[index];
        let alpha = particle.alpha();
        if alpha > VISIBLE_ALPHA {
            scene
                .surface
                .fill_disc(particle.x, particle.y, particle.radius(), alpha);
            visible += 1;
        }
    }

    if global.is_some() {
        if visible == 0 {
            return FrameOutcome::Exhausted;
        }
    } else if scene.store.shed_load(delta) {
        debug!(
            particles = scene.store.len(),
            frame_ms = delta,
            "reduced snowflakes for performance"
        );
    }

    FrameOutcome::Drawn { visible }
}
