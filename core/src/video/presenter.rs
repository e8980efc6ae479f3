//! Pixel presenter: native frame buffer to on-screen image

use image::RgbaImage;
use tracing::{debug, info, warn};

use super::effects::EffectPipeline;
use super::viewport::Viewport;
use crate::config::VideoConfig;
use crate::error::SurfaceError;

/// Output target for presented frames (window, texture, headless buffer).
pub trait Surface {
    /// Draw `image` into `viewport`.
    fn present(&mut self, image: &RgbaImage, viewport: &Viewport) -> Result<(), SurfaceError>;
}

/// Converts the core's packed pixels into a displayable image, optionally
/// through the CRT effect pipeline.
#[derive(Debug)]
pub struct PixelPresenter<S> {
    config: VideoConfig,
    surface: Option<S>,
    effects: Option<EffectPipeline>,
    /// Last frame written by `set_buffer`
    buffer: RgbaImage,
    /// Scratch image the effect stages run on
    output: RgbaImage,
    container: Option<(u32, u32)>,
    viewport: Viewport,
    frames_presented: u64,
    frames_dropped: u64,
}

impl<S: Surface> PixelPresenter<S> {
    /// Create a presenter for `config.width`×`config.height` frames.
    ///
    /// Pass `effects: None` when no effect backend is available; frames are
    /// then presented unprocessed at the native aspect ratio.
    pub fn new(config: VideoConfig, surface: Option<S>, effects: Option<EffectPipeline>) -> Self {
        let effects = effects.and_then(|fx| check_pipeline(fx, &config));
        if effects.is_none() {
            info!("No effect pipeline, presenting unprocessed frames");
        }

        let (width, height) = (config.width.max(1), config.height.max(1));
        Self {
            buffer: opaque_black(width, height),
            output: opaque_black(width, height),
            viewport: Viewport {
                x: 0,
                y: 0,
                width,
                height,
            },
            config,
            surface,
            effects,
            container: None,
            frames_presented: 0,
            frames_dropped: 0,
        }
    }

    pub fn config(&self) -> &VideoConfig {
        &self.config
    }

    /// Whether presented frames go through the effect pipeline
    pub fn effects_active(&self) -> bool {
        self.effects.is_some()
    }

    pub fn effects(&self) -> Option<&EffectPipeline> {
        self.effects.as_ref()
    }

    /// The presentation buffer as last written by `set_buffer`
    pub fn frame(&self) -> &RgbaImage {
        &self.buffer
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Frames the surface refused
    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped
    }

    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> Option<&mut S> {
        self.surface.as_mut()
    }

    pub fn attach_surface(&mut self, surface: S) {
        self.surface = Some(surface);
        debug!("Surface attached");
    }

    pub fn detach_surface(&mut self) -> Option<S> {
        self.surface.take()
    }

    /// Copy one frame of `0x00BBGGRR` pixels into the presentation buffer.
    ///
    /// Returns false without touching the buffer when no surface is attached
    /// or `pixels` holds fewer than width×height entries. Extra entries are
    /// ignored.
    pub fn set_buffer(&mut self, pixels: &[u32]) -> bool {
        if self.surface.is_none() {
            return false;
        }

        let expected = self.buffer.width() as usize * self.buffer.height() as usize;
        if pixels.len() < expected {
            warn!(
                "Frame buffer too short ({} pixels, expected {}), ignoring",
                pixels.len(),
                expected
            );
            return false;
        }

        for (dst, &src) in self.buffer.chunks_exact_mut(4).zip(pixels) {
            dst[0] = src as u8;
            dst[1] = (src >> 8) as u8;
            dst[2] = (src >> 16) as u8;
            dst[3] = 0xff;
        }
        true
    }

    /// Hand the current frame to the surface.
    ///
    /// A lost surface while presenting an effect frame disables the
    /// pipeline for good and retries with the plain buffer. Other failures
    /// drop the frame. Returns whether the surface accepted a frame.
    pub fn present(&mut self) -> bool {
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };

        if let Some(effects) = self.effects.as_mut() {
            self.output.copy_from_slice(&self.buffer);
            effects.apply(&mut self.output);

            match surface.present(&self.output, &self.viewport) {
                Ok(()) => {
                    self.frames_presented += 1;
                    return true;
                }
                Err(SurfaceError::Lost) => {
                    warn!("Surface lost while presenting effects, falling back to plain frames");
                    self.effects = None;
                    if let Some((w, h)) = self.container {
                        self.viewport = fit_viewport(&self.config, false, w, h);
                    }
                }
                Err(e) => {
                    warn!("Failed to present frame: {}", e);
                    self.frames_dropped += 1;
                    return false;
                }
            }
        }

        match surface.present(&self.buffer, &self.viewport) {
            Ok(()) => {
                self.frames_presented += 1;
                true
            }
            Err(e) => {
                warn!("Failed to present frame: {}", e);
                self.frames_dropped += 1;
                false
            }
        }
    }

    /// Recompute placement for a container of `width`×`height`.
    ///
    /// Unchanged dimensions return the cached viewport.
    pub fn resize(&mut self, width: u32, height: u32) -> Viewport {
        if self.container == Some((width, height)) {
            return self.viewport;
        }
        self.container = Some((width, height));
        self.viewport = fit_viewport(&self.config, self.effects.is_some(), width, height);
        debug!(
            "Viewport for {}x{} container: {:?}",
            width, height, self.viewport
        );
        self.viewport
    }

    /// Switch resolution or effect pipeline, reallocating both images.
    pub fn reconfigure(&mut self, config: VideoConfig, effects: Option<EffectPipeline>) {
        let (width, height) = (config.width.max(1), config.height.max(1));
        self.buffer = opaque_black(width, height);
        self.output = opaque_black(width, height);
        self.effects = effects.and_then(|fx| check_pipeline(fx, &config));
        self.config = config;

        self.viewport = match self.container {
            Some((w, h)) => fit_viewport(&self.config, self.effects.is_some(), w, h),
            None => Viewport {
                x: 0,
                y: 0,
                width,
                height,
            },
        };
    }
}

fn opaque_black(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, image::Rgba([0, 0, 0, 0xff]))
}

fn check_pipeline(effects: EffectPipeline, config: &VideoConfig) -> Option<EffectPipeline> {
    if effects.width() == config.width && effects.height() == config.height {
        Some(effects)
    } else {
        warn!(
            "Effect pipeline built for {}x{} does not match {}x{} frames, disabling effects",
            effects.width(),
            effects.height(),
            config.width,
            config.height
        );
        None
    }
}

/// Effect frames fill part of the container at the display aspect; plain
/// frames fill all of it at the native aspect.
fn fit_viewport(config: &VideoConfig, effects: bool, width: u32, height: u32) -> Viewport {
    if effects {
        Viewport::fit(width, height, config.display_aspect, config.fill)
    } else {
        let native = config.width.max(1) as f32 / config.height.max(1) as f32;
        Viewport::fit(width, height, native, 1.0)
    }
}
