//! Drawing surface abstraction

/// The overlay the driver paints on. Sizes are in CSS pixels.
pub trait Surface {
    fn size(&self) -> (f32, f32);

    fn resize(&mut self, width: f32, height: f32);

    fn clear(&mut self);

    /// Filled white disc.
    fn fill_disc(&mut self, x: f32, y: f32, radius: f32, alpha: f32);
}

/// Surface that records draw calls instead of painting. Used by tests and
/// headless hosts.
#[derive(Debug, Default, Clone)]
pub struct RecordingSurface {
    pub width: f32,
    pub height: f32,
    pub clears: usize,
    pub discs: Vec<Disc>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Disc {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub alpha: f32,
}

impl RecordingSurface {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    fn clear(&mut self) {
        self.clears += 1;
        self.discs.clear();
    }

    fn fill_disc(&mut self, x: f32, y: f32, radius: f32, alpha: f32) {
        self.discs.push(Disc {
            x,
            y,
            radius,
            alpha,
        });
    }
}
