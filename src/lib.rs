//! SnowEffect - canvas snowfall overlay for hosted portal pages, in WASM

use tracing::info;
use wasm_bindgen::prelude::*;

pub mod config;
pub mod constants;
pub mod coordination;
pub mod display;
pub mod driver;
pub mod error;
pub mod host;
pub mod lifecycle;
pub mod particle;
pub mod scene;
pub mod surface;
pub mod web;

pub use config::{ConfigField, SnowConfig};
pub use constants::*;
pub use coordination::{CoordinationFlag, CoordinationRecord, FlagStore, MemoryFlagStore};
pub use display::DisplayMode;
pub use error::{SnowError, SnowResult};
pub use host::{FrameHandle, Host, TimerHandle, TimerKind};
pub use lifecycle::{Phase, Snowfall, StopMode};
pub use particle::{Particle, ParticleStore};
pub use scene::{Scene, SharedScene};
pub use surface::{RecordingSurface, Surface};
pub use web::SnowEffect;

#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    tracing_wasm::set_as_global_default();
    info!("{LOG_PREFIX} WASM loaded v{}", version());
}

#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").into()
}
