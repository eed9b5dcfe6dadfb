//! Opacity fields used to clip rectangular layers.
//!
//! A field answers "how opaque is this pixel" in its own coordinate space.
//! The compositor translates destination pixels into field coordinates before
//! asking, so one field type serves any placement.

/// Anything that can answer per-pixel opacity.
pub trait OpacityField {
    /// Alpha in `0..=255` at `(x, y)`.
    fn opacity_at(&self, x: i32, y: i32) -> u8;
}

pub const OPAQUE: u8 = 0xFF;
pub const TRANSPARENT: u8 = 0;

/// Hard-edged disc. Points strictly inside the circle are opaque; the
/// boundary itself and everything outside are transparent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircleMask {
    pub center: (i32, i32),
    pub radius: i32,
}

impl CircleMask {
    pub fn new(center: (i32, i32), radius: i32) -> Self {
        Self { center, radius }
    }

    /// Largest disc centered inside a `width` x `height` rectangle.
    pub fn inscribed(width: u32, height: u32) -> Self {
        let width = width.min(i32::MAX as u32) as i32;
        let height = height.min(i32::MAX as u32) as i32;
        Self {
            center: (width / 2, height / 2),
            radius: width.min(height) / 2,
        }
    }

    /// Enclosing square as `(min_x, min_y, max_x, max_y)`, max exclusive.
    pub fn bounds(&self) -> (i32, i32, i32, i32) {
        let (cx, cy) = self.center;
        (
            cx - self.radius,
            cy - self.radius,
            cx + self.radius,
            cy + self.radius,
        )
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        let dx = i64::from(x) - i64::from(self.center.0);
        let dy = i64::from(y) - i64::from(self.center.1);
        let r = i64::from(self.radius);
        dx * dx + dy * dy < r * r
    }
}

impl OpacityField for CircleMask {
    fn opacity_at(&self, x: i32, y: i32) -> u8 {
        if self.contains(x, y) {
            OPAQUE
        } else {
            TRANSPARENT
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_is_transparent() {
        let r = 12;
        let mask = CircleMask::new((0, 0), r);
        assert_eq!(mask.opacity_at(r - 1, 0), OPAQUE);
        assert_eq!(mask.opacity_at(r, 0), TRANSPARENT);
        assert_eq!(mask.opacity_at(0, r - 1), OPAQUE);
        assert_eq!(mask.opacity_at(0, r), TRANSPARENT);
    }

    #[test]
    fn mask_is_symmetric() {
        let mask = CircleMask::new((0, 0), 9);
        for x in -10..=10 {
            for y in -10..=10 {
                let alpha = mask.opacity_at(x, y);
                assert_eq!(alpha, mask.opacity_at(-x, y));
                assert_eq!(alpha, mask.opacity_at(x, -y));
                assert_eq!(alpha, mask.opacity_at(y, x));
            }
        }
    }

    #[test]
    fn offset_center_shifts_the_disc() {
        let mask = CircleMask::new((12, 12), 12);
        assert_eq!(mask.opacity_at(12, 12), OPAQUE);
        assert_eq!(mask.opacity_at(0, 12), TRANSPARENT);
        assert_eq!(mask.opacity_at(1, 12), OPAQUE);
        assert_eq!(mask.opacity_at(0, 0), TRANSPARENT);
        assert_eq!(mask.bounds(), (0, 0, 24, 24));
    }

    #[test]
    fn inscribed_uses_the_shorter_side() {
        let mask = CircleMask::inscribed(128, 96);
        assert_eq!(mask.center, (64, 48));
        assert_eq!(mask.radius, 48);
    }

    #[test]
    fn zero_radius_is_fully_transparent() {
        let mask = CircleMask::new((3, 3), 0);
        assert_eq!(mask.opacity_at(3, 3), TRANSPARENT);
    }
}
