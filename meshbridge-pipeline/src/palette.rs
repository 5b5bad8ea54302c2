//! Segment colours
//!
//! A palette is built for one segmentation result and maps every segment id
//! to a distinct RGBA colour. The preset palette starts with thirteen fixed
//! colours and continues with golden-ratio hues; the random palette draws RGB
//! components uniformly.

use crate::config::PaletteKind;
use meshbridge_core::Rgba;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const PRESET_COLORS: [Rgba; 13] = [
    [1.0, 0.0, 0.0, 1.0],
    [0.0, 1.0, 0.0, 1.0],
    [0.0, 0.0, 1.0, 1.0],
    [1.0, 1.0, 0.0, 1.0],
    [1.0, 0.0, 1.0, 1.0],
    [0.0, 1.0, 1.0, 1.0],
    [0.0, 0.0, 0.0, 1.0],
    [1.0, 0.0, 0.5, 1.0],
    [1.0, 0.5, 0.0, 1.0],
    [0.5, 1.0, 0.0, 1.0],
    [0.0, 1.0, 0.5, 1.0],
    [0.5, 0.0, 1.0, 1.0],
    [0.0, 0.5, 1.0, 1.0],
];

const GOLDEN_RATIO_CONJUGATE: f32 = 0.618_034;

fn hsv_to_rgba(h: f32, s: f32, v: f32) -> Rgba {
    let h6 = (h.fract() * 6.0).min(5.999_999);
    let sector = h6.floor();
    let f = h6 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match sector as u32 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    [r, g, b, 1.0]
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialPalette {
    colors: Vec<Rgba>,
}

impl MaterialPalette {
    /// Deterministic palette with `count` colours
    pub fn preset(count: usize) -> Self {
        let colors = PRESET_COLORS
            .iter()
            .copied()
            .chain((0..).map(|i| hsv_to_rgba(i as f32 * GOLDEN_RATIO_CONJUGATE, 0.65, 0.85)))
            .take(count)
            .collect();
        Self { colors }
    }

    /// Random palette with `count` pairwise distinct colours
    pub fn random<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Self {
        let mut colors: Vec<Rgba> = Vec::with_capacity(count);
        while colors.len() < count {
            let color = [rng.gen::<f32>(), rng.gen::<f32>(), rng.gen::<f32>(), 1.0];
            if !colors.contains(&color) {
                colors.push(color);
            }
        }
        Self { colors }
    }

    pub fn from_kind(kind: PaletteKind, count: usize) -> Self {
        match kind {
            PaletteKind::Preset => Self::preset(count),
            PaletteKind::Random { seed: Some(seed) } => {
                Self::random(count, &mut StdRng::seed_from_u64(seed))
            }
            PaletteKind::Random { seed: None } => Self::random(count, &mut rand::thread_rng()),
        }
    }

    /// Colour of segment `segment`
    pub fn color(&self, segment: usize) -> Option<Rgba> {
        self.colors.get(segment).copied()
    }

    pub fn colors(&self) -> &[Rgba] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}
