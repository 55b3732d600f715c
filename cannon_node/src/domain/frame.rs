// Pixel-space screen bounds and the mapping into normalized [0,1] x [0,1] coordinates.

/// A point in the host overlay's pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Renderable area of one display, in pixels.
///
/// All physics runs in coordinates normalized to this frame so trajectories do not depend on
/// the display resolution of either end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenFrame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenFrame {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Frame anchored at the origin.
    pub fn sized(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    /// Maps a pixel point into the frame, clamping to the frame edges.
    pub fn normalize(&self, point: PixelPoint) -> (f64, f64) {
        let nx = if self.width > 0.0 {
            (point.x - self.x) / self.width
        } else {
            0.0
        };
        let ny = if self.height > 0.0 {
            (point.y - self.y) / self.height
        } else {
            0.0
        };
        (nx.clamp(0.0, 1.0), ny.clamp(0.0, 1.0))
    }

    /// Maps normalized coordinates back to pixels. Values outside [0,1] are not clamped so a
    /// projectile slightly past the edge still renders where it physically is.
    pub fn denormalize(&self, nx: f64, ny: f64) -> PixelPoint {
        PixelPoint {
            x: self.x + nx * self.width,
            y: self.y + ny * self.height,
        }
    }

    /// True when the normalized point lies inside the visible frame (edges included).
    pub fn contains_normalized(nx: f64, ny: f64) -> bool {
        (0.0..=1.0).contains(&nx) && (0.0..=1.0).contains(&ny)
    }
}
