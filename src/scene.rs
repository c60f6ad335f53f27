//! The overlay shared by every effect instance on a page

use std::cell::RefCell;
use std::rc::Rc;

use crate::config::SnowConfig;
use crate::driver::FrameClock;
use crate::particle::ParticleStore;
use crate::surface::Surface;

pub type SharedScene<S> = Rc<RefCell<Scene<S>>>;

/// Overlay surface, particle population, frame pacing and fade state. One
/// per page; instances attach to it and drive it.
pub struct Scene<S> {
    pub surface: S,
    pub store: ParticleStore,
    pub clock: FrameClock,
    /// Monotonic start of the fade out, whichever instance began it.
    pub fade_started_at: Option<f64>,
    instances: usize,
}

impl<S: Surface> Scene<S> {
    pub fn new(surface: S, store: ParticleStore) -> Self {
        Self {
            surface,
            store,
            clock: FrameClock::default(),
            fade_started_at: None,
            instances: 0,
        }
    }

    pub fn shared(self) -> SharedScene<S> {
        Rc::new(RefCell::new(self))
    }

    pub fn attach(&mut self) -> usize {
        self.instances += 1;
        self.instances
    }

    /// Returns how many instances are still attached.
    pub fn detach(&mut self) -> usize {
        self.instances = self.instances.saturating_sub(1);
        self.instances
    }

    pub fn instances(&self) -> usize {
        self.instances
    }

    pub fn is_fading(&self) -> bool {
        self.fade_started_at.is_some()
    }

    /// Starts the fade at `now` unless one is already under way.
    pub fn begin_fade(&mut self, now: f64) -> f64 {
        *self.fade_started_at.get_or_insert(now)
    }

    /// Fresh population for `config`, paced from `now`, no fade.
    pub fn restart(&mut self, config: &SnowConfig, now: f64) {
        self.clock.reset(now);
        self.fade_started_at = None;
        self.populate(config);
    }

    /// Regenerates the population for `config` over the current surface.
    pub fn populate(&mut self, config: &SnowConfig) {
        let (width, height) = self.surface.size();
        self.store.populate(
            config.snow_amount as usize,
            config.fall_speed,
            config.wind_strength,
            width,
            height,
        );
    }

    /// Resizes the surface and drops particles stranded far outside it.
    pub fn resize(&mut self, width: f32, height: f32) -> usize {
        self.surface.resize(width, height);
        self.store.purge_outside(width, height)
    }

    /// Blank surface, empty population, no fade.
    pub fn wipe(&mut self) {
        self.surface.clear();
        self.store.clear();
        self.fade_started_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::particle_at;
    use crate::surface::RecordingSurface;

    fn scene() -> Scene<RecordingSurface> {
        Scene::new(RecordingSurface::new(800.0, 600.0), ParticleStore::with_seed(2))
    }

    #[test]
    fn attach_and_detach_count_instances() {
        let mut scene = scene();
        assert_eq!(scene.attach(), 1);
        assert_eq!(scene.attach(), 2);
        assert_eq!(scene.detach(), 1);
        assert_eq!(scene.detach(), 0);
        assert_eq!(scene.detach(), 0);
    }

    #[test]
    fn populate_uses_surface_size() {
        let mut scene = scene();
        let config = SnowConfig {
            snow_amount: 250,
            ..SnowConfig::default()
        };
        scene.populate(&config);
        assert_eq!(scene.store.len(), 250);
        assert!(scene.store.iter().all(|p| p.x < 800.0 && p.y < 600.0));
    }

    #[test]
    fn resize_purges_and_updates_surface() {
        let mut scene = scene();
        scene.store.push(particle_at(10.0, 10.0));
        scene.store.push(particle_at(790.0, 10.0));

        assert_eq!(scene.resize(320.0, 480.0), 1);
        assert_eq!(scene.surface.size(), (320.0, 480.0));
        assert_eq!(scene.store.len(), 1);
    }

    #[test]
    fn wipe_clears_surface_store_and_fade() {
        let mut scene = scene();
        scene.populate(&SnowConfig::default());
        scene.begin_fade(10.0);
        scene.surface.fill_disc(1.0, 1.0, 1.0, 1.0);
        scene.wipe();
        assert!(scene.store.is_empty());
        assert!(scene.surface.discs.is_empty());
        assert_eq!(scene.surface.clears, 1);
        assert!(!scene.is_fading());
    }

    #[test]
    fn first_fade_start_wins() {
        let mut scene = scene();
        assert_eq!(scene.begin_fade(100.0), 100.0);
        assert_eq!(scene.begin_fade(400.0), 100.0);
        assert_eq!(scene.fade_started_at, Some(100.0));
    }

    #[test]
    fn restart_repopulates_and_cancels_fade() {
        let mut scene = scene();
        scene.begin_fade(100.0);
        scene.restart(&SnowConfig::default(), 500.0);
        assert!(!scene.is_fading());
        assert_eq!(scene.store.len(), 100);
        assert_eq!(scene.clock.tick(520.0), None);
        assert_eq!(scene.clock.tick(550.0), Some(50.0));
    }
}
