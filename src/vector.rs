/*
 * Vector Utilities Module
 *
 * Small 2D helpers on top of glam's Vec2. Everything here is pure and
 * zero-safe: normalising a zero vector yields the zero vector so that
 * steering contributions built from it simply vanish.
 */

use glam::Vec2;

#[inline]
pub fn dot(a: Vec2, b: Vec2) -> f32 {
    a.x * b.x + a.y * b.y
}

#[inline]
pub fn ssq(v: Vec2) -> f32 {
    dot(v, v)
}

#[inline]
pub fn magnitude(v: Vec2) -> f32 {
    ssq(v).sqrt()
}

// Unit vector in the direction of v, or zero for a zero-length input
#[inline]
pub fn unit(v: Vec2) -> Vec2 {
    let mag = magnitude(v);
    if mag == 0.0 || !mag.is_finite() {
        return Vec2::ZERO;
    }
    v / mag
}

// Rescale v to unit length only when it is longer than one
#[inline]
pub fn cap_unit(v: Vec2) -> Vec2 {
    if ssq(v) > 1.0 {
        unit(v)
    } else {
        v
    }
}

// Rescale v to at most `max` length, preserving direction
#[inline]
pub fn clamp_length(v: Vec2, max: f32) -> Vec2 {
    if ssq(v) > max * max {
        unit(v) * max
    } else {
        v
    }
}

// Unsigned angle in radians between two vectors.
// None when either vector has no direction, where acos would be NaN.
pub fn angle_between(a: Vec2, b: Vec2) -> Option<f32> {
    let (ua, ub) = (unit(a), unit(b));
    if ua == Vec2::ZERO || ub == Vec2::ZERO {
        return None;
    }
    Some(dot(ua, ub).clamp(-1.0, 1.0).acos())
}

// Signed angle in radians from `from` to `to`, positive anti-clockwise, in (-pi, pi]
pub fn signed_angle(from: Vec2, to: Vec2) -> f32 {
    let cross = from.x * to.y - from.y * to.x;
    cross.atan2(dot(from, to))
}

// Heading of a vector in whole degrees [0, 360), anti-clockwise from +x
pub fn heading_degrees(v: Vec2) -> u32 {
    let degrees = v.y.atan2(v.x).to_degrees().rem_euclid(360.0);
    (degrees.round() as u32) % 360
}
