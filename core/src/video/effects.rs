//! CRT effect pipeline
//!
//! Stages run in a fixed order over a float working copy of the frame:
//! scanline overlay, bulge, vignette, noise, triangle blur. Every static
//! term (overlay darkening, bulge sample coordinates, vignette falloff) is
//! precomputed when the pipeline is built, so a frame only pays for the
//! lookups and the two blur passes.

use image::RgbaImage;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::EffectConfig;

/// Channels per pixel in the working buffer
const CHANNELS: usize = 4;

/// Taps on each side of the blur kernel center
const BLUR_TAPS: i32 = 8;

/// Overlay gradient stops as (position, darkening)
const GRADIENT_STOPS: [(f32, f32); 3] = [(0.0, 0.0), (0.7, 0.1), (1.0, 0.4)];

/// One stage of the pipeline with its parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EffectStage {
    /// Darken every second row plus a radial edge gradient
    Scanlines { dark_even: f32, dark_odd: f32 },
    /// Barrel distortion about the frame center. `radius` is in pixels.
    Bulge { radius: f32, strength: f32 },
    Vignette { size: f32, amount: f32 },
    /// Uniform per-pixel brightness jitter in `[-amount/2, amount/2]`
    Noise { amount: f32 },
    /// Separable triangle blur. `radius` is in pixels.
    Blur { radius: f32 },
}

/// Precomputed CRT post-processing for one frame size.
pub struct EffectPipeline {
    width: u32,
    height: u32,
    stages: Vec<EffectStage>,
    /// Per-pixel multiplier from the scanline overlay
    overlay: Vec<f32>,
    /// Per-pixel source coordinate for the bulge, in pixel space
    bulge: Vec<[f32; 2]>,
    /// Per-pixel vignette multiplier
    vignette: Vec<f32>,
    rng: Pcg32,
    row_seeds: Vec<u64>,
    work: Vec<f32>,
    scratch: Vec<f32>,
}

impl EffectPipeline {
    /// Build the pipeline for a `width`×`height` frame.
    pub fn new(config: &EffectConfig, width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let mut stages = Vec::new();

        if config.scanlines {
            stages.push(EffectStage::Scanlines {
                dark_even: config.scanline_even,
                dark_odd: config.scanline_odd,
            });
        }
        if config.bulge {
            stages.push(EffectStage::Bulge {
                radius: config.bulge_radius * width as f32,
                strength: config.bulge_strength,
            });
        }
        if config.vignette {
            stages.push(EffectStage::Vignette {
                size: config.vignette_size,
                amount: config.vignette_amount,
            });
        }
        if config.noise {
            stages.push(EffectStage::Noise {
                amount: config.noise_amount,
            });
        }
        if config.blur && config.blur_radius > 0.0 {
            stages.push(EffectStage::Blur {
                radius: config.blur_radius,
            });
        }

        let rng = match config.seed {
            Some(seed) => Pcg32::seed_from_u64(seed),
            None => Pcg32::seed_from_u64(rand::random()),
        };

        let mut pipeline = Self {
            width,
            height,
            stages,
            overlay: Vec::new(),
            bulge: Vec::new(),
            vignette: Vec::new(),
            rng,
            row_seeds: Vec::new(),
            work: Vec::new(),
            scratch: Vec::new(),
        };
        pipeline.precompute();

        debug!(
            "Effect pipeline built for {}x{}: {:?}",
            width, height, pipeline.stages
        );
        pipeline
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Active stages in application order
    pub fn stages(&self) -> &[EffectStage] {
        &self.stages
    }

    /// True when no stage is active and `apply` leaves frames untouched.
    pub fn is_identity(&self) -> bool {
        self.stages.is_empty()
    }

    fn precompute(&mut self) {
        let (w, h) = (self.width, self.height);
        for stage in self.stages.clone() {
            match stage {
                EffectStage::Scanlines {
                    dark_even,
                    dark_odd,
                } => self.overlay = overlay_map(w, h, dark_even, dark_odd),
                EffectStage::Bulge { radius, strength } => {
                    self.bulge = bulge_map(w, h, radius, strength)
                }
                EffectStage::Vignette { size, amount } => {
                    self.vignette = vignette_map(w, h, size, amount)
                }
                EffectStage::Noise { .. } | EffectStage::Blur { .. } => {}
            }
        }
    }

    /// Run every active stage over `image` in place.
    ///
    /// Returns false, leaving the image untouched, when its size does not
    /// match the pipeline.
    pub fn apply(&mut self, image: &mut RgbaImage) -> bool {
        if image.width() != self.width || image.height() != self.height {
            warn!(
                "Effect pipeline is {}x{}, got a {}x{} frame",
                self.width,
                self.height,
                image.width(),
                image.height()
            );
            return false;
        }
        if self.stages.is_empty() {
            return true;
        }

        self.work.clear();
        self.work
            .extend(image.as_raw().iter().map(|&c| f32::from(c) / 255.0));

        for stage in self.stages.clone() {
            match stage {
                EffectStage::Scanlines { .. } => self.apply_overlay(),
                EffectStage::Bulge { .. } => self.apply_bulge(),
                EffectStage::Vignette { .. } => self.apply_vignette(),
                EffectStage::Noise { amount } => self.apply_noise(amount),
                EffectStage::Blur { radius } => self.apply_blur(radius),
            }
        }

        for (dst, &src) in image.iter_mut().zip(&self.work) {
            *dst = (src.clamp(0.0, 1.0) * 255.0).round() as u8;
        }
        true
    }

    fn row_len(&self) -> usize {
        self.width as usize * CHANNELS
    }

    fn apply_overlay(&mut self) {
        let row_len = self.row_len();
        let width = self.width as usize;
        let overlay = &self.overlay;
        self.work
            .par_chunks_mut(row_len)
            .enumerate()
            .for_each(|(y, row)| {
                let keep_row = &overlay[y * width..(y + 1) * width];
                for (px, &keep) in row.chunks_exact_mut(CHANNELS).zip(keep_row) {
                    px[0] *= keep;
                    px[1] *= keep;
                    px[2] *= keep;
                }
            });
    }

    fn apply_bulge(&mut self) {
        let (w, h) = (self.width as usize, self.height as usize);
        let row_len = self.row_len();
        self.scratch.clone_from(&self.work);
        let src = &self.scratch;
        let coords = &self.bulge;
        self.work
            .par_chunks_mut(row_len)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, px) in row.chunks_exact_mut(CHANNELS).enumerate() {
                    let [sx, sy] = coords[y * w + x];
                    px.copy_from_slice(&sample_bilinear(src, w, h, sx, sy));
                }
            });
    }

    fn apply_vignette(&mut self) {
        let row_len = self.row_len();
        let width = self.width as usize;
        let falloff = &self.vignette;
        self.work
            .par_chunks_mut(row_len)
            .enumerate()
            .for_each(|(y, row)| {
                let factors = &falloff[y * width..(y + 1) * width];
                for (px, &f) in row.chunks_exact_mut(CHANNELS).zip(factors) {
                    px[0] *= f;
                    px[1] *= f;
                    px[2] *= f;
                }
            });
    }

    fn apply_noise(&mut self, amount: f32) {
        let row_len = self.row_len();
        // Per-row seeds keep the parallel pass deterministic for a fixed seed
        self.row_seeds.clear();
        for _ in 0..self.height {
            let seed = self.rng.random::<u64>();
            self.row_seeds.push(seed);
        }
        let seeds = &self.row_seeds;
        self.work
            .par_chunks_mut(row_len)
            .zip(seeds.par_iter())
            .for_each(|(row, &seed)| {
                let mut rng = Pcg32::seed_from_u64(seed);
                for px in row.chunks_exact_mut(CHANNELS) {
                    let diff = (rng.random::<f32>() - 0.5) * amount;
                    px[0] += diff;
                    px[1] += diff;
                    px[2] += diff;
                }
            });
    }

    fn apply_blur(&mut self, radius: f32) {
        let (w, h) = (self.width as usize, self.height as usize);
        let row_len = self.row_len();

        // Horizontal: work -> scratch
        self.scratch.resize(self.work.len(), 0.0);
        let src = &self.work;
        self.scratch
            .par_chunks_mut(row_len)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, px) in row.chunks_exact_mut(CHANNELS).enumerate() {
                    px.copy_from_slice(&triangle_tap(src, w, h, x, y, radius, true));
                }
            });

        // Vertical: scratch -> work
        let src = &self.scratch;
        self.work
            .par_chunks_mut(row_len)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, px) in row.chunks_exact_mut(CHANNELS).enumerate() {
                    px.copy_from_slice(&triangle_tap(src, w, h, x, y, radius, false));
                }
            });
    }
}

impl std::fmt::Debug for EffectPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectPipeline")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stages", &self.stages)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Stage math
// ============================================================================

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Darkening of the radial overlay gradient at `t` (0 center, 1 corner radius)
fn gradient_alpha(t: f32) -> f32 {
    let t = t.max(0.0);
    for pair in GRADIENT_STOPS.windows(2) {
        let (p0, a0) = pair[0];
        let (p1, a1) = pair[1];
        if t <= p1 {
            return mix(a0, a1, (t - p0) / (p1 - p0));
        }
    }
    GRADIENT_STOPS[GRADIENT_STOPS.len() - 1].1
}

/// Multiplier left after compositing the black overlay over each pixel.
fn overlay_map(width: u32, height: u32, dark_even: f32, dark_odd: f32) -> Vec<f32> {
    let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
    let radius = width.max(height) as f32 / 2.0;
    let mut map = Vec::with_capacity(width as usize * height as usize);

    for y in 0..height {
        let line = match y % 4 {
            0 => dark_even,
            2 => dark_odd,
            _ => 0.0,
        };
        for x in 0..width {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            let edge = gradient_alpha((dx * dx + dy * dy).sqrt() / radius);
            map.push((1.0 - line) * (1.0 - edge));
        }
    }
    map
}

/// Source coordinate (pixel space, centers at +0.5) for every output pixel.
fn bulge_map(width: u32, height: u32, radius: f32, strength: f32) -> Vec<[f32; 2]> {
    let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
    let strength = strength.clamp(-1.0, 1.0);
    let mut map = Vec::with_capacity(width as usize * height as usize);

    for y in 0..height {
        for x in 0..width {
            let mut dx = x as f32 + 0.5 - cx;
            let mut dy = y as f32 + 0.5 - cy;
            let dist = (dx * dx + dy * dy).sqrt();
            if dist > f32::EPSILON && dist < radius {
                let percent = dist / radius;
                let scale = if strength > 0.0 {
                    mix(1.0, smoothstep(0.0, radius / dist, percent), strength * 0.75)
                } else {
                    mix(
                        1.0,
                        percent.powf(1.0 + strength * 0.75) * radius / dist,
                        1.0 - percent,
                    )
                };
                dx *= scale;
                dy *= scale;
            }
            map.push([dx + cx, dy + cy]);
        }
    }
    map
}

fn vignette_map(width: u32, height: u32, size: f32, amount: f32) -> Vec<f32> {
    let mut map = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height {
        let v = (y as f32 + 0.5) / height as f32 - 0.5;
        for x in 0..width {
            let u = (x as f32 + 0.5) / width as f32 - 0.5;
            let dist = (u * u + v * v).sqrt();
            map.push(smoothstep(0.8, size * 0.799, dist * (amount + size)));
        }
    }
    map
}

fn pixel(src: &[f32], w: usize, x: usize, y: usize) -> &[f32] {
    let i = (y * w + x) * CHANNELS;
    &src[i..i + CHANNELS]
}

/// Bilinear sample at pixel-space `(sx, sy)`, clamped to the frame edge.
fn sample_bilinear(src: &[f32], w: usize, h: usize, sx: f32, sy: f32) -> [f32; 4] {
    let fx = (sx - 0.5).clamp(0.0, (w - 1) as f32);
    let fy = (sy - 0.5).clamp(0.0, (h - 1) as f32);
    let (x0, y0) = (fx.floor() as usize, fy.floor() as usize);
    let (x1, y1) = ((x0 + 1).min(w - 1), (y0 + 1).min(h - 1));
    let (tx, ty) = (fx - x0 as f32, fy - y0 as f32);

    let (p00, p10) = (pixel(src, w, x0, y0), pixel(src, w, x1, y0));
    let (p01, p11) = (pixel(src, w, x0, y1), pixel(src, w, x1, y1));
    let mut out = [0.0; 4];
    for c in 0..CHANNELS {
        let top = mix(p00[c], p10[c], tx);
        let bottom = mix(p01[c], p11[c], tx);
        out[c] = mix(top, bottom, ty);
    }
    out
}

/// One pass of the triangle kernel at `(x, y)` along a single axis.
fn triangle_tap(
    src: &[f32],
    w: usize,
    h: usize,
    x: usize,
    y: usize,
    radius: f32,
    horizontal: bool,
) -> [f32; 4] {
    let mut acc = [0.0f32; 4];
    let mut total = 0.0;

    for t in -BLUR_TAPS..=BLUR_TAPS {
        let percent = t as f32 / BLUR_TAPS as f32;
        let weight = 1.0 - percent.abs();
        if weight <= 0.0 {
            continue;
        }
        let offset = percent * radius;
        let (sx, sy) = if horizontal {
            (x as f32 + 0.5 + offset, y as f32 + 0.5)
        } else {
            (x as f32 + 0.5, y as f32 + 0.5 + offset)
        };
        let sample = sample_bilinear(src, w, h, sx, sy);
        for c in 0..CHANNELS {
            acc[c] += sample[c] * weight;
        }
        total += weight;
    }

    acc.map(|v| v / total)
}
