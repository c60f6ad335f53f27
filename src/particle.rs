//! Snowflake records and the store that owns them

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

use crate::constants::*;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub speed: f32,
    pub swing: f32,
    pub phase: f32,
    pub phase_speed: f32,
    pub opacity: f32,
    /// 0 = fully visible, 1 = fully faded.
    pub fade: f32,
}

impl Particle {
    pub fn is_faded(&self) -> bool {
        self.fade >= 1.0
    }

    pub fn alpha(&self) -> f32 {
        self.opacity * (1.0 - self.fade)
    }

    pub fn radius(&self) -> f32 {
        self.size * (1.0 - self.fade * FADE_SHRINK)
    }

    /// One frame of fall and sinusoidal sway.
    pub fn drift(&mut self) {
        self.y += self.speed;
        self.phase += self.phase_speed;
        self.x += self.phase.sin() * SWING_FACTOR * self.swing;
    }
}

/// Ordered particle collection plus the random source that feeds it.
pub struct ParticleStore {
    particles: Vec<Particle>,
    rng: SmallRng,
}

impl Default for ParticleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ParticleStore {
    pub fn new() -> Self {
        Self {
            particles: Vec::new(),
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            particles: Vec::new(),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }

    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }

    /// Replaces the collection with `count` fresh particles spread over the
    /// viewport.
    pub fn populate(
        &mut self,
        count: usize,
        fall_speed: f32,
        wind_strength: f32,
        width: f32,
        height: f32,
    ) {
        let rng = &mut self.rng;
        self.particles = (0..count)
            .map(|_| Particle {
                x: rng.gen::<f32>() * width,
                y: rng.gen::<f32>() * height,
                size: rng.gen::<f32>() * SIZE_SPREAD + SIZE_MIN,
                speed: (rng.gen::<f32>() * SPEED_SPREAD + SPEED_MIN) * fall_speed,
                swing: (rng.gen::<f32>() * SWING_SPREAD + SWING_MIN) * wind_strength,
                phase: rng.gen::<f32>() * TAU,
                phase_speed: rng.gen::<f32>() * PHASE_SPEED_SPREAD + PHASE_SPEED_MIN,
                opacity: rng.gen::<f32>() * OPACITY_SPREAD + OPACITY_MIN,
                fade: 0.0,
            })
            .collect();
    }

    /// Steps a single particle through one frame of motion and applies the
    /// gust and recycle rules. `vary` allows recycled particles to pick a new
    /// size, speed and opacity.
    pub fn advance(&mut self, index: usize, fall_speed: f32, width: f32, height: f32, vary: bool) {
        let Some(p) = self.particles.get_mut(index) else {
            return;
        };

        p.drift();
        gust(p, &mut self.rng, width);
        recycle(p, &mut self.rng, fall_speed, width, height, vary);
    }

    /// Drops every other particle. Returns the new length.
    pub fn downsample(&mut self) -> usize {
        let mut index = 0;
        self.particles.retain(|_| {
            let keep = index % 2 == 0;
            index += 1;
            keep
        });
        self.particles.len()
    }

    /// Load-shedding check run after a frame: halves the store when it is
    /// oversized and the frame was slow.
    pub fn shed_load(&mut self, frame_ms: f64) -> bool {
        if self.particles.len() > DOWNSAMPLE_THRESHOLD && frame_ms > SLOW_FRAME_MS {
            self.downsample();
            return true;
        }
        false
    }

    /// Removes particles far outside a resized viewport. Never reorders or
    /// touches the survivors.
    pub fn purge_outside(&mut self, width: f32, height: f32) -> usize {
        let before = self.particles.len();
        self.particles.retain(|p| {
            p.x >= -RESIZE_MARGIN
                && p.x <= width + RESIZE_MARGIN
                && p.y >= -RESIZE_MARGIN
                && p.y <= height + RESIZE_MARGIN
        });
        before - self.particles.len()
    }

    #[cfg(test)]
    pub(crate) fn push(&mut self, particle: Particle) {
        self.particles.push(particle);
    }
}

/// Rarely blows a particle just past the left or right edge. Returns whether
/// it did.
pub fn gust<R: Rng>(p: &mut Particle, rng: &mut R, width: f32) -> bool {
    if !rng.gen_bool(GUST_CHANCE) {
        return false;
    }
    p.x = if rng.gen_bool(0.5) {
        -GUST_OFFSET
    } else {
        width + GUST_OFFSET
    };
    true
}

/// Respawns particles that left the viewport: fallen ones reenter above the
/// top edge, drifted ones jump back inside.
pub fn recycle<R: Rng>(
    p: &mut Particle,
    rng: &mut R,
    fall_speed: f32,
    width: f32,
    height: f32,
    vary: bool,
) {
    if p.y > height + BOTTOM_MARGIN {
        p.y = RESPAWN_Y;
        p.x = rng.gen::<f32>() * width;

        if vary && rng.gen_bool(RESPAWN_CHANCE) {
            p.size = rng.gen::<f32>() * SIZE_SPREAD + SIZE_MIN;
            p.speed = (rng.gen::<f32>() * SPEED_SPREAD + SPEED_MIN) * fall_speed;
            p.opacity = rng.gen::<f32>() * OPACITY_SPREAD + OPACITY_MIN;
        }
    }

    if p.x < -HORIZONTAL_MARGIN || p.x > width + HORIZONTAL_MARGIN {
        p.x = rng.gen::<f32>() * width;
        p.y = rng.gen::<f32>() * height;
    }
}

#[cfg(test)]
pub(crate) fn particle_at(x: f32, y: f32) -> Particle {
    Particle {
        x,
        y,
        size: 2.0,
        speed: 1.0,
        swing: 0.0,
        phase: 0.0,
        phase_speed: 0.0,
        opacity: 0.5,
        fade: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: f32 = 800.0;
    const H: f32 = 600.0;

    #[test]
    fn populate_fills_viewport_with_exact_count() {
        let mut store = ParticleStore::with_seed(7);
        for count in [20, 100, 2000] {
            store.populate(count, 2.0, 2.0, W, H);
            assert_eq!(store.len(), count);
            for p in store.iter() {
                assert!((0.0..W).contains(&p.x));
                assert!((0.0..H).contains(&p.y));
                assert!((SIZE_MIN..=SIZE_MIN + SIZE_SPREAD).contains(&p.size));
                assert!((OPACITY_MIN..=OPACITY_MIN + OPACITY_SPREAD).contains(&p.opacity));
                assert_eq!(p.fade, 0.0);
            }
        }
    }

    #[test]
    fn populate_scales_speed_and_swing() {
        let mut store = ParticleStore::with_seed(1);
        store.populate(200, 10.0, 0.0, W, H);
        for p in store.iter() {
            assert!(p.speed >= SPEED_MIN * 10.0 && p.speed <= (SPEED_MIN + SPEED_SPREAD) * 10.0);
            assert_eq!(p.swing, 0.0);
        }
    }

    #[test]
    fn fallen_particle_respawns_above_top() {
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..100 {
            let mut p = particle_at(400.0, H + 10.5);
            recycle(&mut p, &mut rng, 2.0, W, H, true);
            assert!(p.y < 0.0);
            assert!((0.0..W).contains(&p.x));
        }
    }

    #[test]
    fn particle_at_bottom_margin_is_left_alone() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut p = particle_at(400.0, H + BOTTOM_MARGIN);
        recycle(&mut p, &mut rng, 2.0, W, H, true);
        assert_eq!(p, particle_at(400.0, H + BOTTOM_MARGIN));
    }

    #[test]
    fn settled_respawn_keeps_appearance() {
        let mut rng = SmallRng::seed_from_u64(9);
        for _ in 0..200 {
            let mut p = particle_at(400.0, H + 20.0);
            recycle(&mut p, &mut rng, 30.0, W, H, false);
            assert_eq!(p.opacity, 0.5);
            assert_eq!(p.size, 2.0);
            assert_eq!(p.speed, 1.0);
        }
    }

    #[test]
    fn drifted_particle_jumps_inside_viewport() {
        let mut rng = SmallRng::seed_from_u64(5);
        for x in [-50.5, -400.0, W + 50.5, W + 900.0] {
            let mut p = particle_at(x, 100.0);
            recycle(&mut p, &mut rng, 2.0, W, H, true);
            assert!(p.x >= 0.0 && p.x < W, "x = {}", p.x);
            assert!(p.y >= 0.0 && p.y < H, "y = {}", p.y);
        }
    }

    #[test]
    fn downsample_keeps_even_indices() {
        let mut store = ParticleStore::with_seed(0);
        for i in 0..5 {
            store.push(particle_at(i as f32, 0.0));
        }
        assert_eq!(store.downsample(), 3);
        let xs: Vec<f32> = store.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn shed_load_needs_large_store_and_slow_frame() {
        let mut store = ParticleStore::with_seed(0);
        store.populate(DOWNSAMPLE_THRESHOLD, 1.0, 1.0, W, H);
        assert!(!store.shed_load(100.0));

        store.populate(DOWNSAMPLE_THRESHOLD + 2, 1.0, 1.0, W, H);
        assert!(!store.shed_load(SLOW_FRAME_MS));
        assert!(store.shed_load(SLOW_FRAME_MS + 1.0));
        assert_eq!(store.len(), (DOWNSAMPLE_THRESHOLD + 2) / 2);
    }

    #[test]
    fn purge_only_removes_far_outside_entries() {
        let mut store = ParticleStore::with_seed(0);
        store.push(particle_at(10.0, 10.0));
        store.push(particle_at(700.0, 10.0));
        store.push(particle_at(10.0, 580.0));
        store.push(particle_at(-49.0, -49.0));

        assert_eq!(store.purge_outside(400.0, 300.0), 2);
        let kept: Vec<(f32, f32)> = store.iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(kept, vec![(10.0, 10.0), (-49.0, -49.0)]);
    }

    #[test]
    fn drift_moves_down_and_swings() {
        let mut p = particle_at(400.0, 100.0);
        p.swing = 10.0;
        p.phase_speed = 0.5;

        p.drift();
        assert_eq!(p.y, 101.0);
        assert_eq!(p.phase, 0.5);
        let expected_x = 400.0 + 0.5f32.sin() * SWING_FACTOR * 10.0;
        assert!((p.x - expected_x).abs() < 1e-4, "x = {}", p.x);
    }

    #[test]
    fn gusts_are_rare_and_land_just_past_an_edge() {
        let mut rng = SmallRng::seed_from_u64(21);
        let (mut left, mut right) = (0, 0);
        for _ in 0..200_000 {
            let mut p = particle_at(400.0, 100.0);
            if gust(&mut p, &mut rng, W) {
                if p.x == -GUST_OFFSET {
                    left += 1;
                } else {
                    assert_eq!(p.x, W + GUST_OFFSET);
                    right += 1;
                }
            } else {
                assert_eq!(p.x, 400.0);
            }
        }
        // 0.0002 per frame, about 40 expected
        assert!((10..=100).contains(&(left + right)), "{left} + {right} gusts");
        assert!(left > 0 && right > 0);
    }

    #[test]
    fn advance_keeps_gusted_particle_in_place() {
        let mut store = ParticleStore::with_seed(21);
        store.push(particle_at(400.0, 100.0));

        let mut gusted = None;
        for _ in 0..200_000 {
            store.particles_mut()[0] = particle_at(400.0, 100.0);
            store.advance(0, 2.0, W, H, true);
            let p = store.iter().next().copied().unwrap();
            assert_eq!(p.y, 101.0);
            if p.x != 400.0 {
                gusted = Some(p.x);
                break;
            }
        }
        // Inside the horizontal margin, so recycling leaves it there.
        let x = gusted.expect("no gust in 200000 frames");
        assert!(x == -GUST_OFFSET || x == W + GUST_OFFSET, "x = {x}");
    }

    #[test]
    fn advance_ignores_missing_index() {
        let mut store = ParticleStore::with_seed(0);
        store.advance(3, 1.0, W, H, true);
        assert!(store.is_empty());
    }
}
