//! Contact detection between circles and thick segments
//!
//! Every shape in the arena is a circle (robots, balls, basket tubes) or a
//! segment with a radius (walls, backboards), so two tests cover all pairs.

use glam::Vec2;

/// Result of a contact check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether the shapes overlap
    pub hit: bool,
    /// Unit normal pointing from the second shape toward the first
    pub normal: Vec2,
    /// Penetration depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Check overlap between circle `a` and circle `b`.
///
/// Coincident centers push along +Y so the pair can still separate.
pub fn circle_circle(a: Vec2, ra: f32, b: Vec2, rb: f32) -> CollisionResult {
    let delta = a - b;
    let dist_sq = delta.length_squared();
    let rsum = ra + rb;
    if dist_sq >= rsum * rsum {
        return CollisionResult::miss();
    }

    let dist = dist_sq.sqrt();
    let normal = if dist > f32::EPSILON {
        delta / dist
    } else {
        Vec2::Y
    };

    CollisionResult {
        hit: true,
        normal,
        penetration: rsum - dist,
    }
}

/// Closest point to `p` on the segment `a`-`b`
pub fn closest_point_on_segment(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let line_vec = b - a;
    let len_sq = line_vec.length_squared();
    if len_sq < 1e-12 {
        return a;
    }
    let t = ((p - a).dot(line_vec) / len_sq).clamp(0.0, 1.0);
    a + line_vec * t
}

/// Check overlap between a circle and a segment thickened by `seg_radius`
pub fn circle_segment(
    center: Vec2,
    radius: f32,
    a: Vec2,
    b: Vec2,
    seg_radius: f32,
) -> CollisionResult {
    let closest = closest_point_on_segment(center, a, b);
    let mut result = circle_circle(center, radius, closest, seg_radius);

    if result.hit && (center - closest).length_squared() <= f32::EPSILON {
        // Center sits on the segment: push perpendicular to it
        let line_vec = (b - a).normalize_or_zero();
        result.normal = if line_vec == Vec2::ZERO {
            Vec2::Y
        } else {
            line_vec.perp()
        };
    }

    result
}

/// Contact between a circle moving from `from` to `center` and a thick
/// segment, keeping the circle on the side of the segment it started on.
///
/// A center that crossed the segment's line within its extent is reported
/// as penetrating by the full crossing, so resolving the contact puts it
/// back on its starting side regardless of how far it went.
pub fn circle_segment_swept(
    from: Vec2,
    center: Vec2,
    radius: f32,
    a: Vec2,
    b: Vec2,
    seg_radius: f32,
) -> CollisionResult {
    let line_vec = b - a;
    let len = line_vec.length();
    if len <= f32::EPSILON {
        return circle_segment(center, radius, a, b, seg_radius);
    }

    let dir = line_vec / len;
    let side = dir.perp();
    let before = (from - a).dot(side);
    let after = (center - a).dot(side);

    if before * after < 0.0 {
        let t = before / (before - after);
        let crossing = (from + (center - from) * t - a).dot(dir);
        // End caps count, so a crossing right at a joint between segments is caught
        if (-seg_radius..=len + seg_radius).contains(&crossing) {
            return CollisionResult {
                hit: true,
                normal: side * before.signum(),
                penetration: radius + seg_radius + after.abs(),
            };
        }
    }

    let mut result = circle_segment(center, radius, a, b, seg_radius);
    if result.hit && after == 0.0 && before != 0.0 {
        let along = (center - a).dot(dir);
        if (0.0..=len).contains(&along) {
            result.normal = side * before.signum();
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_circle_overlap() {
        let result = circle_circle(Vec2::new(0.3, 0.0), 0.2, Vec2::ZERO, 0.2);
        assert!(result.hit);
        assert!((result.penetration - 0.1).abs() < 1e-6);
        // Normal points from b toward a
        assert!((result.normal - Vec2::X).length() < 1e-6);
    }

    #[test]
    fn test_circle_circle_touching_is_miss() {
        let result = circle_circle(Vec2::new(0.4, 0.0), 0.2, Vec2::ZERO, 0.2);
        assert!(!result.hit);
    }

    #[test]
    fn test_coincident_centers_still_separate() {
        let result = circle_circle(Vec2::ONE, 0.1, Vec2::ONE, 0.1);
        assert!(result.hit);
        assert_eq!(result.normal, Vec2::Y);
        assert!((result.penetration - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_circle_segment_side_hit() {
        // Vertical wall at x = 1, ball just left of it
        let result = circle_segment(
            Vec2::new(0.95, 0.0),
            0.1,
            Vec2::new(1.0, -1.0),
            Vec2::new(1.0, 1.0),
            0.01,
        );
        assert!(result.hit);
        assert!((result.normal - Vec2::NEG_X).length() < 1e-6);
        assert!((result.penetration - 0.06).abs() < 1e-5);
    }

    #[test]
    fn test_circle_segment_endpoint() {
        // Ball beyond the segment end only touches the rounded cap
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(1.0, 0.0);
        let miss = circle_segment(Vec2::new(1.2, 0.0), 0.1, a, b, 0.05);
        assert!(!miss.hit);
        let hit = circle_segment(Vec2::new(1.1, 0.0), 0.1, a, b, 0.05);
        assert!(hit.hit);
        assert!((hit.normal - Vec2::X).length() < 1e-6);
    }

    #[test]
    fn test_swept_circle_pushed_back_across_line() {
        // Started left of the wall at x = 1, ended well past it
        let a = Vec2::new(1.0, -1.0);
        let b = Vec2::new(1.0, 1.0);
        let result = circle_segment_swept(Vec2::new(0.9, 0.0), Vec2::new(1.5, 0.2), 0.1, a, b, 0.01);
        assert!(result.hit);
        assert!((result.normal - Vec2::NEG_X).length() < 1e-6);
        // Resolving lands the center exactly one contact band left of the wall
        let resolved = 1.5 + result.normal.x * result.penetration;
        assert!((resolved - (1.0 - 0.11)).abs() < 1e-5);
    }

    #[test]
    fn test_swept_keeps_starting_side_when_pushed_past_center_line() {
        // Slightly past the line, plain overlap would push it further out
        let a = Vec2::new(1.0, -1.0);
        let b = Vec2::new(1.0, 1.0);
        let plain = circle_segment(Vec2::new(1.02, 0.0), 0.1, a, b, 0.01);
        assert!((plain.normal - Vec2::X).length() < 1e-6);

        let swept = circle_segment_swept(Vec2::new(0.95, 0.0), Vec2::new(1.02, 0.0), 0.1, a, b, 0.01);
        assert!((swept.normal - Vec2::NEG_X).length() < 1e-6);
        assert!((swept.penetration - 0.13).abs() < 1e-5);
    }

    #[test]
    fn test_swept_passes_beyond_segment_end() {
        // Crosses the wall's line above its end cap
        let a = Vec2::new(1.0, -0.3);
        let b = Vec2::new(1.0, 0.3);
        let result = circle_segment_swept(Vec2::new(0.5, 1.0), Vec2::new(1.5, 1.0), 0.02, a, b, 0.02);
        assert!(!result.hit);
    }

    #[test]
    fn test_swept_matches_plain_without_crossing() {
        let a = Vec2::new(1.0, -1.0);
        let b = Vec2::new(1.0, 1.0);
        let swept = circle_segment_swept(Vec2::new(0.9, 0.0), Vec2::new(0.95, 0.0), 0.1, a, b, 0.01);
        let plain = circle_segment(Vec2::new(0.95, 0.0), 0.1, a, b, 0.01);
        assert_eq!(swept.hit, plain.hit);
        assert_eq!(swept.normal, plain.normal);
        assert_eq!(swept.penetration, plain.penetration);
    }

    #[test]
    fn test_closest_point_degenerate_segment() {
        let p = closest_point_on_segment(Vec2::new(3.0, 4.0), Vec2::ONE, Vec2::ONE);
        assert_eq!(p, Vec2::ONE);
    }
}
