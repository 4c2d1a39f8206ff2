use rand::Rng;
use serde::{Deserialize, Serialize};

/// Texel value of the undisturbed medium: chemical A everywhere, no B.
pub const EMPTY_TEXEL: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
/// Texel value inside a seeded region.
pub const SEEDED_TEXEL: [f32; 4] = [1.0, 1.0, 0.0, 1.0];

/// Initial state written into both render targets.
///
/// Sizes are in pixels and measured from the canvas centre. Red holds
/// chemical A, green holds chemical B.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SeedPattern {
    Circle { radius: f32 },
    Square { size: f32 },
    Noise { density: f32 },
    Empty,
}

impl Default for SeedPattern {
    fn default() -> Self {
        SeedPattern::Circle { radius: 50.0 }
    }
}

impl SeedPattern {
    /// Rasterises the pattern into a row-major `width * height` texel grid.
    pub fn fill(&self, width: u32, height: u32) -> Vec<[f32; 4]> {
        let (w, h) = (width as usize, height as usize);
        let mut texels = vec![EMPTY_TEXEL; w * h];
        let cx = width as f32 / 2.0;
        let cy = height as f32 / 2.0;

        match *self {
            SeedPattern::Empty => {}
            SeedPattern::Circle { radius } => {
                let r2 = radius * radius;
                for y in 0..h {
                    for x in 0..w {
                        let dx = x as f32 + 0.5 - cx;
                        let dy = y as f32 + 0.5 - cy;
                        if dx * dx + dy * dy <= r2 {
                            texels[y * w + x] = SEEDED_TEXEL;
                        }
                    }
                }
            }
            SeedPattern::Square { size } => {
                let half = size / 2.0;
                for y in 0..h {
                    for x in 0..w {
                        let dx = (x as f32 + 0.5 - cx).abs();
                        let dy = (y as f32 + 0.5 - cy).abs();
                        if dx <= half && dy <= half {
                            texels[y * w + x] = SEEDED_TEXEL;
                        }
                    }
                }
            }
            SeedPattern::Noise { density } => {
                let density = density.clamp(0.0, 1.0) as f64;
                let mut rng = rand::thread_rng();
                for texel in texels.iter_mut() {
                    if rng.gen_bool(density) {
                        *texel = SEEDED_TEXEL;
                    }
                }
            }
        }

        texels
    }

    pub fn sanitize(&mut self) {
        match self {
            SeedPattern::Circle { radius } => *radius = radius.clamp(0.0, 4096.0),
            SeedPattern::Square { size } => *size = size.clamp(0.0, 8192.0),
            SeedPattern::Noise { density } => *density = density.clamp(0.0, 1.0),
            SeedPattern::Empty => {}
        }
    }
}
