//! Discrete-time physics shared by the ball and coin games
//!
//! Everything here works on one fixed tick at a time: integrate a body,
//! test overlaps with boxes or circles, then push the body back out and
//! flip or rescale the velocity along the contact axis.

use glam::Vec2;

/// Reference tick rate that per-tick constants (friction factors) are tuned for.
pub const REFERENCE_HZ: f32 = 60.0;

const EPSILON: f32 = 1e-5;

/// A moving point: position plus velocity in world units per second.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Body {
    pub pos: Vec2,
    pub vel: Vec2,
}

impl Body {
    pub fn new(pos: Vec2, vel: Vec2) -> Self {
        Self { pos, vel }
    }

    pub fn at_rest(pos: Vec2) -> Self {
        Self { pos, vel: Vec2::ZERO }
    }

    pub fn step(&mut self, dt: f32) {
        self.pos += self.vel * dt;
    }

    pub fn apply_gravity(&mut self, gravity: f32, dt: f32) {
        self.vel.y += gravity * dt;
    }

    /// Scale the velocity by a per-tick friction factor (tuned at 60 Hz).
    ///
    /// Returns true once the body has come to rest, in which case the
    /// velocity is snapped to exactly zero.
    pub fn apply_friction(&mut self, per_tick: f32, dt: f32, rest_speed: f32) -> bool {
        self.vel *= per_tick.powf(dt * REFERENCE_HZ);
        if self.vel.length() < rest_speed {
            self.vel = Vec2::ZERO;
            true
        } else {
            false
        }
    }

    pub fn speed(&self) -> f32 {
        self.vel.length()
    }

    pub fn is_moving(&self) -> bool {
        self.vel.length_squared() > EPSILON
    }
}

/// Axis-aligned box, `min` is the top-left corner (y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            min: Vec2::new(x, y),
            max: Vec2::new(x + w, y + h),
        }
    }

    pub fn from_center(center: Vec2, half: Vec2) -> Self {
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Strict overlap: boxes that only share an edge do not collide.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Penetration depth on each axis (x, y) of `self` into `other`.
    pub fn overlap_depths(&self, other: &Aabb) -> Vec2 {
        let left = self.max.x - other.min.x;
        let right = other.max.x - self.min.x;
        let top = self.max.y - other.min.y;
        let bottom = other.max.y - self.min.y;
        Vec2::new(left.min(right), top.min(bottom))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Vec2,
    pub radius: f32,
}

impl Circle {
    pub fn new(center: Vec2, radius: f32) -> Self {
        Self { center, radius }
    }

    pub fn overlaps_circle(&self, other: &Circle) -> bool {
        let r = self.radius + other.radius;
        self.center.distance_squared(other.center) < r * r
    }

    pub fn overlaps_aabb(&self, rect: &Aabb) -> bool {
        let closest = self.center.clamp(rect.min, rect.max);
        self.center.distance_squared(closest) < self.radius * self.radius
    }

    pub fn bounding_box(&self) -> Aabb {
        Aabb::from_center(self.center, Vec2::splat(self.radius))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// Which side of `target` the moving box came through: the axis of least
/// penetration. Side hits flip x, top/bottom hits flip y.
pub fn hit_axis(moving: &Aabb, target: &Aabb) -> Axis {
    let depth = moving.overlap_depths(target);
    if depth.x <= depth.y {
        Axis::X
    } else {
        Axis::Y
    }
}

/// Walls touched during one `bounce_in_bounds` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WallHits {
    pub left: bool,
    pub right: bool,
    pub top: bool,
    pub bottom: bool,
}

impl WallHits {
    pub fn any(&self) -> bool {
        self.left || self.right || self.top || self.bottom
    }
}

/// Keep a circle inside `bounds`, reflecting the velocity axis of every wall
/// it crossed and scaling it by `restitution`.
///
/// After the call the reflected component always points back into the box,
/// even if the body was already travelling inwards.
pub fn bounce_in_bounds(body: &mut Body, radius: f32, bounds: &Aabb, restitution: f32) -> WallHits {
    let mut hits = WallHits::default();
    if body.pos.x - radius < bounds.min.x {
        body.pos.x = bounds.min.x + radius;
        body.vel.x = body.vel.x.abs() * restitution;
        hits.left = true;
    } else if body.pos.x + radius > bounds.max.x {
        body.pos.x = bounds.max.x - radius;
        body.vel.x = -body.vel.x.abs() * restitution;
        hits.right = true;
    }
    if body.pos.y - radius < bounds.min.y {
        body.pos.y = bounds.min.y + radius;
        body.vel.y = body.vel.y.abs() * restitution;
        hits.top = true;
    } else if body.pos.y + radius > bounds.max.y {
        body.pos.y = bounds.max.y - radius;
        body.vel.y = -body.vel.y.abs() * restitution;
        hits.bottom = true;
    }
    hits
}

/// Separate two overlapping circles and exchange momentum along the contact
/// normal. Returns false (and leaves both untouched) when they do not overlap.
///
/// Position correction is split in inverse-mass proportion. The impulse is
/// only applied while the pair is approaching, so a resting contact does not
/// gain energy.
pub fn resolve_circle_pair(
    a: &mut Body,
    radius_a: f32,
    mass_a: f32,
    b: &mut Body,
    radius_b: f32,
    mass_b: f32,
    restitution: f32,
) -> bool {
    let delta = a.pos - b.pos;
    let dist = delta.length();
    let min_dist = radius_a + radius_b;
    if dist >= min_dist {
        return false;
    }

    // Coincident centres: pick an arbitrary but stable normal
    let normal = if dist > EPSILON { delta / dist } else { Vec2::X };
    let inv_a = 1.0 / mass_a;
    let inv_b = 1.0 / mass_b;
    let inv_sum = inv_a + inv_b;

    let overlap = min_dist - dist;
    a.pos += normal * overlap * (inv_a / inv_sum);
    b.pos -= normal * overlap * (inv_b / inv_sum);

    let approach = (a.vel - b.vel).dot(normal);
    if approach < 0.0 {
        let impulse = -(1.0 + restitution) * approach / inv_sum;
        a.vel += normal * impulse * inv_a;
        b.vel -= normal * impulse * inv_b;
    }
    true
}

/// Mirror `v` about a surface with unit `normal`.
pub fn reflect(v: Vec2, normal: Vec2) -> Vec2 {
    v - 2.0 * v.dot(normal) * normal
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn step_integrates_velocity() {
        let mut b = Body::new(Vec2::new(1.0, 2.0), Vec2::new(10.0, -4.0));
        b.step(0.5);
        assert_eq!(b.pos, Vec2::new(6.0, 0.0));
    }

    #[test]
    fn friction_snaps_to_rest() {
        let mut b = Body::new(Vec2::ZERO, Vec2::new(0.3, 0.0));
        assert!(b.apply_friction(0.99, 1.0 / 60.0, 0.4));
        assert_eq!(b.vel, Vec2::ZERO);
        assert!(!b.is_moving());
    }

    #[test]
    fn friction_at_reference_rate_matches_per_tick_factor() {
        let mut b = Body::new(Vec2::ZERO, Vec2::new(100.0, 0.0));
        b.apply_friction(0.99, 1.0 / 60.0, 0.0);
        assert!((b.vel.x - 99.0).abs() < 1e-3);
    }

    #[test]
    fn ball_reflects_sign_on_wall_contact() {
        let bounds = Aabb::new(0.0, 0.0, 10.0, 10.0);
        let mut b = Body::new(Vec2::new(9.8, 5.0), Vec2::new(3.0, 1.0));
        let hits = bounce_in_bounds(&mut b, 0.5, &bounds, 1.0);
        assert!(hits.right && !hits.left);
        assert_eq!(b.vel.x, -3.0);
        assert_eq!(b.vel.y, 1.0);
        assert_eq!(b.pos.x, 9.5);
    }

    #[test]
    fn restitution_scales_reflected_axis_only() {
        let bounds = Aabb::new(0.0, 0.0, 10.0, 10.0);
        let mut b = Body::new(Vec2::new(5.0, 0.1), Vec2::new(2.0, -4.0));
        bounce_in_bounds(&mut b, 0.5, &bounds, 0.5);
        assert_eq!(b.vel, Vec2::new(2.0, 2.0));
    }

    #[test]
    fn hit_axis_prefers_shallow_side() {
        let brick = Aabb::new(10.0, 10.0, 6.0, 1.0);
        // Coming up from below, barely inside the bottom edge
        let ball = Aabb::from_center(Vec2::new(13.0, 11.3), Vec2::splat(0.5));
        assert_eq!(hit_axis(&ball, &brick), Axis::Y);
        // Clipping the left edge
        let ball = Aabb::from_center(Vec2::new(9.7, 10.5), Vec2::splat(0.5));
        assert_eq!(hit_axis(&ball, &brick), Axis::X);
    }

    #[test]
    fn touching_boxes_do_not_overlap() {
        let a = Aabb::new(0.0, 0.0, 1.0, 1.0);
        let b = Aabb::new(1.0, 0.0, 1.0, 1.0);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&Aabb::new(0.99, 0.0, 1.0, 1.0)));
    }

    #[test]
    fn circle_box_overlap_uses_closest_point() {
        let rect = Aabb::new(0.0, 0.0, 2.0, 2.0);
        assert!(Circle::new(Vec2::new(2.4, 1.0), 0.5).overlaps_aabb(&rect));
        // Near the corner but outside the rounded distance
        assert!(!Circle::new(Vec2::new(2.4, 2.4), 0.5).overlaps_aabb(&rect));
    }

    #[test]
    fn head_on_equal_masses_swap_velocities() {
        let mut a = Body::new(Vec2::new(0.0, 0.0), Vec2::new(5.0, 0.0));
        let mut b = Body::new(Vec2::new(1.9, 0.0), Vec2::ZERO);
        assert!(resolve_circle_pair(&mut a, 1.0, 1.0, &mut b, 1.0, 1.0, 1.0));
        assert!(a.vel.x.abs() < 1e-4);
        assert!((b.vel.x - 5.0).abs() < 1e-4);
    }

    #[test]
    fn separating_pair_keeps_velocity() {
        let mut a = Body::new(Vec2::new(0.0, 0.0), Vec2::new(-1.0, 0.0));
        let mut b = Body::new(Vec2::new(1.5, 0.0), Vec2::new(1.0, 0.0));
        resolve_circle_pair(&mut a, 1.0, 1.0, &mut b, 1.0, 1.0, 1.0);
        assert_eq!(a.vel, Vec2::new(-1.0, 0.0));
        assert_eq!(b.vel, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn reflect_off_floor() {
        assert_eq!(reflect(Vec2::new(1.0, 2.0), Vec2::new(0.0, -1.0)), Vec2::new(1.0, -2.0));
    }

    fn vec2() -> impl Strategy<Value = Vec2> {
        (-50.0f32..50.0, -50.0f32..50.0).prop_map(|(x, y)| Vec2::new(x, y))
    }

    proptest! {
        #[test]
        fn bounce_keeps_circle_inside(pos in vec2(), vel in vec2(), radius in 0.1f32..2.0, e in 0.0f32..1.0) {
            let bounds = Aabb::new(-20.0, -20.0, 40.0, 40.0);
            let mut b = Body::new(pos, vel);
            let hits = bounce_in_bounds(&mut b, radius, &bounds, e);
            prop_assert!(b.pos.x - radius >= bounds.min.x - 1e-4);
            prop_assert!(b.pos.x + radius <= bounds.max.x + 1e-4);
            prop_assert!(b.pos.y - radius >= bounds.min.y - 1e-4);
            prop_assert!(b.pos.y + radius <= bounds.max.y + 1e-4);
            if hits.left { prop_assert!(b.vel.x >= 0.0); }
            if hits.right { prop_assert!(b.vel.x <= 0.0); }
            if hits.top { prop_assert!(b.vel.y >= 0.0); }
            if hits.bottom { prop_assert!(b.vel.y <= 0.0); }
        }

        #[test]
        fn circle_pair_separates_and_conserves_momentum(
            pa in vec2(), va in vec2(), vb in vec2(),
            offset in (-1.5f32..1.5, -1.5f32..1.5),
            ma in 0.5f32..3.0, mb in 0.5f32..3.0,
            e in 0.0f32..1.0,
        ) {
            let mut a = Body::new(pa, va);
            let mut b = Body::new(pa + Vec2::new(offset.0, offset.1), vb);
            let before = a.vel * ma + b.vel * mb;
            resolve_circle_pair(&mut a, 1.0, ma, &mut b, 1.0, mb, e);
            let after = a.vel * ma + b.vel * mb;
            prop_assert!(a.pos.distance(b.pos) >= 2.0 - 1e-3);
            prop_assert!((before - after).length() < 1e-2 * (1.0 + before.length()));
        }
    }
}
