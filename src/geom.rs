use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Point {
    pub(crate) x: f32,
    pub(crate) y: f32,
}

impl Point {
    pub(crate) fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub(crate) fn distance(self, other: Point) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Size {
    pub(crate) w: f32,
    pub(crate) h: f32,
}

impl Size {
    pub(crate) fn new(w: f32, h: f32) -> Self {
        Self { w, h }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct Rect {
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) w: f32,
    pub(crate) h: f32,
}

impl Rect {
    pub(crate) fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub(crate) fn right(&self) -> f32 {
        self.x + self.w
    }

    pub(crate) fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub(crate) fn center(&self) -> Point {
        Point::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    pub(crate) fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }

    /// True when the rect overlaps the viewport `0..vw` x `0..vh`.
    pub(crate) fn intersects_viewport(&self, vp: Size) -> bool {
        self.bottom() > 0.0 && self.right() > 0.0 && self.x < vp.w && self.y < vp.h
    }
}

/// Like `f32::clamp`, but never panics: when `hi < lo` the lower bound wins.
pub(crate) fn clamp_range(v: f32, lo: f32, hi: f32) -> f32 {
    if hi < lo || v < lo {
        lo
    } else if v > hi {
        hi
    } else {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_range_prefers_lower_bound_when_inverted() {
        assert_eq!(clamp_range(5.0, 10.0, 2.0), 10.0);
        assert_eq!(clamp_range(-3.0, 0.0, 4.0), 0.0);
        assert_eq!(clamp_range(9.0, 0.0, 4.0), 4.0);
        assert_eq!(clamp_range(2.5, 0.0, 4.0), 2.5);
    }

    #[test]
    fn rect_viewport_intersection() {
        let vp = Size::new(80.0, 24.0);
        assert!(Rect::new(10.0, 5.0, 4.0, 2.0).intersects_viewport(vp));
        assert!(!Rect::new(10.0, -5.0, 4.0, 2.0).intersects_viewport(vp));
        assert!(!Rect::new(80.0, 5.0, 4.0, 2.0).intersects_viewport(vp));
        assert!(Rect::new(-2.0, 23.5, 4.0, 2.0).intersects_viewport(vp));
    }
}
