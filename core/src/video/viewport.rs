//! On-screen placement of the presented frame

/// Rectangle inside the host container where the frame is drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Largest `aspect`-shaped rectangle fitting in `fill` of the container,
    /// centered.
    ///
    /// The side that limits the fit is taken exactly, the other one is
    /// rounded. A zero-sized container yields an empty viewport.
    pub fn fit(container_w: u32, container_h: u32, aspect: f32, fill: f32) -> Self {
        if container_w == 0 || container_h == 0 || aspect <= 0.0 {
            return Self::default();
        }

        let fill = fill.clamp(0.0, 1.0);
        let parent_w = (container_w as f32 * fill).round();
        let parent_h = (container_h as f32 * fill).round();
        if parent_w < 1.0 || parent_h < 1.0 {
            return Self::default();
        }

        let (width, height) = if aspect < parent_w / parent_h {
            ((parent_h * aspect).round(), parent_h)
        } else {
            (parent_w, (parent_w / aspect).round())
        };
        let width = (width as u32).min(container_w);
        let height = (height as u32).min(container_h);

        Self {
            x: (container_w - width) / 2,
            y: (container_h - height) / 2,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Integer-ish zoom relative to a native frame width
    pub fn scale(&self, native_width: u32) -> f32 {
        if native_width == 0 {
            return 0.0;
        }
        self.width as f32 / native_width as f32
    }
}
