//! Geometry primitives and the exact collision predicates used by the simulation
//!
//! All predicates are pure and compare without tolerance so that collision
//! outcomes are reproducible.

use serde::{Deserialize, Serialize};

/// A point on the playing field. Positive y points down, like a canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Circular bounding volume, used for power-ups.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

impl Circle {
    pub const fn new(x: f32, y: f32, radius: f32) -> Self {
        Self { x, y, radius }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Three vertices; callers guarantee a non-zero area.
pub type Triangle = [Point; 3];

pub fn degree_to_rad(degree: f32) -> f32 {
    degree * std::f32::consts::PI / 180.0
}

/// Barycentric point-in-triangle test, inclusive of vertices and edges.
///
/// A degenerate triangle divides by zero and yields `false` for every point,
/// since comparisons against NaN fail.
pub fn point_in_triangle(point: Point, triangle: &Triangle) -> bool {
    let [p1, p2, p3] = *triangle;

    let denominator = (p2.y - p3.y) * (p1.x - p3.x) + (p3.x - p2.x) * (p1.y - p3.y);
    let a = ((p2.y - p3.y) * (point.x - p3.x) + (p3.x - p2.x) * (point.y - p3.y)) / denominator;
    let b = ((p3.y - p1.y) * (point.x - p3.x) + (p1.x - p3.x) * (point.y - p3.y)) / denominator;
    let c = 1.0 - a - b;

    (0.0..=1.0).contains(&a) && (0.0..=1.0).contains(&b) && (0.0..=1.0).contains(&c)
}

/// True when the point touches or lies inside the circle.
pub fn point_in_circle(point: Point, circle: &Circle) -> bool {
    let dx = point.x - circle.x;
    let dy = point.y - circle.y;
    dx * dx + dy * dy <= circle.radius * circle.radius
}

/// True when the point has left the `[0, width] x [0, height]` field.
pub fn point_outside_field(point: Point, width: f32, height: f32) -> bool {
    point.x < 0.0 || point.y < 0.0 || point.x > width || point.y > height
}
