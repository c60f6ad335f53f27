//! Snowfall constants

// Configuration defaults
pub const DEFAULT_SNOW_AMOUNT: u32 = 100;
pub const DEFAULT_FALL_SPEED: f32 = 2.0;
pub const DEFAULT_WIND_STRENGTH: f32 = 2.0;
pub const DEFAULT_TIMER_SECS: u32 = 0;

// Configuration ranges (inclusive)
pub const SNOW_AMOUNT_RANGE: (u32, u32) = (20, 2000);
pub const FALL_SPEED_RANGE: (f32, f32) = (0.5, 30.0);
pub const WIND_STRENGTH_RANGE: (f32, f32) = (0.0, 5.0);
pub const TIMER_RANGE_SECS: (u32, u32) = (0, 500);

// Particles
pub const SIZE_MIN: f32 = 1.0;
pub const SIZE_SPREAD: f32 = 3.0;
pub const SPEED_MIN: f32 = 0.2;
pub const SPEED_SPREAD: f32 = 0.8;
pub const SWING_MIN: f32 = 5.0;
pub const SWING_SPREAD: f32 = 20.0;
pub const PHASE_SPEED_MIN: f32 = 0.005;
pub const PHASE_SPEED_SPREAD: f32 = 0.01;
pub const OPACITY_MIN: f32 = 0.3;
pub const OPACITY_SPREAD: f32 = 0.4;

// Motion
pub const SWING_FACTOR: f32 = 0.3;
pub const GUST_CHANCE: f64 = 0.0002;
pub const GUST_OFFSET: f32 = 10.0;
pub const RESPAWN_CHANCE: f64 = 0.1;
pub const RESPAWN_Y: f32 = -5.0;
pub const BOTTOM_MARGIN: f32 = 10.0;
pub const HORIZONTAL_MARGIN: f32 = 50.0;
pub const RESIZE_MARGIN: f32 = 50.0;

// Fade out
pub const FADE_DURATION_MS: f64 = 2000.0;
pub const FADE_STAGGER: f32 = 0.5;
pub const FADE_DECAY: f32 = 0.995;
pub const FADE_SHRINK: f32 = 0.5;
pub const VISIBLE_ALPHA: f32 = 0.01;
pub const FORCE_STOP_GRACE_MS: u32 = 500;

// Frame pacing
pub const TARGET_FPS: f64 = 20.0;
pub const FRAME_INTERVAL_MS: f64 = 1000.0 / TARGET_FPS;

// Load shedding
pub const DOWNSAMPLE_THRESHOLD: usize = 2000;
pub const SLOW_FRAME_MS: f64 = 20.0;

// Lifecycle
pub const RESTART_DEBOUNCE_MS: u32 = 300;

// Page integration
pub const STORAGE_KEY: &str = "snowEffectGlobalState";
pub const CANVAS_ID: &str = "snow-effect-canvas";
pub const LOG_PREFIX: &str = "[SnowEffect]";
