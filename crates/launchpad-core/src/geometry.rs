//! Screen-space geometry.
//!
//! All values are integer screen pixels. Sizes are signed so that layout
//! arithmetic can go negative before being clamped; a [`Bounds`] returned by
//! any layout function always has a non-negative width and height.

use serde::{Deserialize, Serialize};

/// A point in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Offset this point by `dx`, `dy`.
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// A size in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// A rectangle: origin plus size.
///
/// Surface bounds are relative to the owning host's content area; host
/// bounds are absolute screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Bounds {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Bounds of the given size at the origin.
    pub const fn from_size(width: i32, height: i32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub const fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub const fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub const fn right(&self) -> i32 {
        self.x + self.width
    }

    pub const fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// The same size, moved to `(x, y)`.
    pub const fn with_position(self, x: i32, y: i32) -> Self {
        Self::new(x, y, self.width, self.height)
    }

    /// The same origin, resized to `width` x `height`.
    pub const fn with_size(self, width: i32, height: i32) -> Self {
        Self::new(self.x, self.y, width, height)
    }

    /// The local content area of a window with these outer bounds.
    ///
    /// Surface bounds are expressed relative to this rectangle.
    pub const fn local(&self) -> Self {
        Self::from_size(self.width, self.height)
    }

    /// Clamp width and height to zero.
    pub fn clamped(self) -> Self {
        Self::new(self.x, self.y, self.width.max(0), self.height.max(0))
    }

    /// Shrink by `amount` on every side, clamping the size to zero.
    pub fn inset(self, amount: i32) -> Self {
        Self::new(
            self.x + amount,
            self.y + amount,
            self.width - amount * 2,
            self.height - amount * 2,
        )
        .clamped()
    }

    /// Check if the point lies inside these bounds.
    pub fn contains_point(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    /// Check if `other` lies entirely within these bounds.
    ///
    /// An empty rectangle on the boundary is considered contained.
    pub fn contains(&self, other: &Bounds) -> bool {
        other.width >= 0
            && other.height >= 0
            && other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Check if two rectangles share any area.
    pub fn overlaps(&self, other: &Bounds) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Move and shrink these bounds until they fit inside `outer`.
    pub fn clamp_within(self, outer: &Bounds) -> Self {
        let outer_width = outer.width.max(0);
        let outer_height = outer.height.max(0);
        let width = self.width.clamp(0, outer_width);
        let height = self.height.clamp(0, outer_height);
        let x = self.x.clamp(outer.x, outer.x + outer_width - width);
        let y = self.y.clamp(outer.y, outer.y + outer_height - height);
        Self::new(x, y, width, height)
    }

    /// Compare two rectangles allowing each edge to differ by `tolerance`.
    pub fn approx_eq(&self, other: &Bounds, tolerance: i32) -> bool {
        (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.width - other.width).abs() <= tolerance
            && (self.height - other.height).abs() <= tolerance
    }
}
