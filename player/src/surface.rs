//! Headless surface keeping the last presented frame

use std::path::Path;

use anyhow::{Context, Result};
use image::RgbaImage;
use tracing::info;

use retrosync_core::{Surface, SurfaceError, Viewport};

/// Surface with no window behind it; the last frame can be saved as PNG.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    last: Option<RgbaImage>,
    viewport: Viewport,
    presented: u64,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_frame(&self) -> Option<&RgbaImage> {
        self.last.as_ref()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }

    /// Write the last presented frame to `path` as PNG.
    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        let frame = self
            .last_frame()
            .context("No frame has been presented yet")?;
        frame
            .save(path)
            .with_context(|| format!("Failed to write snapshot: {}", path.display()))?;
        info!("Snapshot written to {}", path.display());
        Ok(())
    }
}

impl Surface for HeadlessSurface {
    fn present(&mut self, image: &RgbaImage, viewport: &Viewport) -> Result<(), SurfaceError> {
        match &mut self.last {
            Some(last) if last.dimensions() == image.dimensions() => last.copy_from_slice(image),
            slot => *slot = Some(image.clone()),
        }
        self.viewport = *viewport;
        self.presented += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn viewport() -> Viewport {
        Viewport {
            x: 0,
            y: 0,
            width: 4,
            height: 4,
        }
    }

    #[test]
    fn test_present_keeps_latest_frame() {
        let mut surface = HeadlessSurface::new();
        let first = RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255]));
        let second = RgbaImage::from_pixel(4, 4, Rgba([9, 8, 7, 255]));

        assert!(surface.present(&first, &viewport()).is_ok());
        assert!(surface.present(&second, &viewport()).is_ok());

        assert_eq!(surface.last_frame(), Some(&second));
        assert_eq!(surface.presented(), 2);
        assert_eq!(surface.viewport(), viewport());
    }

    #[test]
    fn test_snapshot_without_frame_fails() {
        let dir = tempfile::tempdir().unwrap();
        let surface = HeadlessSurface::new();
        assert!(surface.save_snapshot(&dir.path().join("none.png")).is_err());
    }

    #[test]
    fn test_snapshot_roundtrips_through_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let mut surface = HeadlessSurface::new();
        let frame = RgbaImage::from_fn(4, 4, |x, y| Rgba([x as u8 * 60, y as u8 * 60, 0, 255]));
        surface.present(&frame, &viewport()).unwrap();

        surface.save_snapshot(&path).unwrap();
        let loaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(loaded, frame);
    }
}
