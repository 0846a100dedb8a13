//! Cone-of-vision filtering over candidate sets pre-selected by the grid.

use crate::config::VisionConfig;
use crate::spatial_grid::Rect;
use fauna_data::Agent;
use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// A detected entity and its distance from the viewer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection<T> {
    pub entity: T,
    pub distance: f64,
}

/// Field of view anchored at a position and facing.
#[derive(Debug, Clone, Copy)]
pub struct VisionCone {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
    pub half_fov: f64,
    pub range: f64,
    cos_half_fov: f64,
}

impl VisionCone {
    #[must_use]
    pub fn new(x: f64, y: f64, heading: f64, fov: f64, range: f64) -> Self {
        let half_fov = (fov * 0.5).clamp(0.0, PI);
        Self {
            x,
            y,
            heading,
            half_fov,
            range: range.max(0.0),
            cos_half_fov: half_fov.cos(),
        }
    }

    /// The agent's own cone: configured FOV, range scaled by its vision gene.
    #[must_use]
    pub fn for_agent(agent: &Agent, config: &VisionConfig) -> Self {
        Self::new(
            agent.physics.x,
            agent.physics.y,
            agent.physics.heading,
            config.fov_degrees.to_radians(),
            config.range * f64::from(agent.traits.vision),
        )
    }

    /// A full circle of the given radius.
    #[must_use]
    pub fn omnidirectional(x: f64, y: f64, range: f64) -> Self {
        Self::new(x, y, 0.0, TAU, range)
    }

    /// Distance to `(tx, ty)` if the point lies inside the cone.
    ///
    /// The angle test compares the normalized dot product with
    /// `cos(fov / 2)` instead of computing the angle itself.
    #[must_use]
    pub fn sees(&self, tx: f64, ty: f64) -> Option<f64> {
        let dx = tx - self.x;
        let dy = ty - self.y;
        let distance = (dx * dx + dy * dy).sqrt();
        if distance > self.range {
            return None;
        }
        if distance <= f64::EPSILON || self.half_fov >= PI {
            return Some(distance);
        }
        let dot = (dx * self.heading.cos() + dy * self.heading.sin()) / distance;
        (dot >= self.cos_half_fov).then_some(distance)
    }

    /// Filters candidates to those inside the cone, nearest first. Equal
    /// distances are ordered by entity so results do not depend on grid order.
    pub fn detect<T, I>(&self, candidates: I) -> Vec<Detection<T>>
    where
        T: Ord,
        I: IntoIterator<Item = (T, f64, f64)>,
    {
        let mut seen: Vec<Detection<T>> = candidates
            .into_iter()
            .filter_map(|(entity, x, y)| {
                self.sees(x, y).map(|distance| Detection { entity, distance })
            })
            .collect();
        seen.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.entity.cmp(&b.entity))
        });
        seen
    }

    pub fn nearest<T, I>(&self, candidates: I) -> Option<Detection<T>>
    where
        T: Ord,
        I: IntoIterator<Item = (T, f64, f64)>,
    {
        self.detect(candidates).into_iter().next()
    }

    /// Tight axis-aligned bounds of the cone, used as the grid pre-filter.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        if self.half_fov >= FRAC_PI_2 * 2.0 - f64::EPSILON {
            return Rect::around(self.x, self.y, self.range);
        }
        let mut rect = Rect::new(self.x, self.y, self.x, self.y);
        let mut include = |angle: f64| {
            let px = self.x + self.range * angle.cos();
            let py = self.y + self.range * angle.sin();
            rect = Rect::new(
                rect.min_x.min(px),
                rect.min_y.min(py),
                rect.max_x.max(px),
                rect.max_y.max(py),
            );
        };
        include(self.heading - self.half_fov);
        include(self.heading + self.half_fov);
        include(self.heading);
        for quadrant in 0..4 {
            let axis = f64::from(quadrant) * FRAC_PI_2;
            if angle_between(self.heading, axis) <= self.half_fov {
                include(axis);
            }
        }
        rect
    }
}

/// Smallest absolute angle between two headings, in `[0, PI]`.
#[must_use]
pub fn angle_between(a: f64, b: f64) -> f64 {
    let diff = (b - a).rem_euclid(TAU);
    if diff > PI {
        TAU - diff
    } else {
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forward_cone() -> VisionCone {
        // Facing +x, 90 degree field of view, range 100.
        VisionCone::new(0.0, 0.0, 0.0, FRAC_PI_2, 100.0)
    }

    #[test]
    fn test_sees_target_in_front() {
        assert_eq!(forward_cone().sees(50.0, 0.0), Some(50.0));
    }

    #[test]
    fn test_ignores_target_behind() {
        assert!(forward_cone().sees(-50.0, 0.0).is_none());
    }

    #[test]
    fn test_ignores_target_out_of_range() {
        assert!(forward_cone().sees(100.5, 0.0).is_none());
    }

    #[test]
    fn test_edge_of_fov_is_inclusive() {
        let cone = forward_cone();
        // 45 degrees off axis, exactly half the field of view.
        let d = 50.0 / 2f64.sqrt();
        assert!(cone.sees(d + 1e-9, d).is_some());
        assert!(cone.sees(d, d + 1.0).is_none());
    }

    #[test]
    fn test_detect_sorted_nearest_first() {
        let cone = forward_cone();
        let found = cone.detect(vec![(1u32, 80.0, 0.0), (2u32, 10.0, 0.0), (3u32, -5.0, 0.0)]);
        let ids: Vec<u32> = found.iter().map(|d| d.entity).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_equal_distance_breaks_ties_by_entity() {
        let cone = VisionCone::omnidirectional(0.0, 0.0, 100.0);
        let found = cone.detect(vec![(9u32, 0.0, 10.0), (4u32, 10.0, 0.0)]);
        assert_eq!(found[0].entity, 4);
    }

    #[test]
    fn test_omnidirectional_sees_behind() {
        let cone = VisionCone::omnidirectional(0.0, 0.0, 100.0);
        assert!(cone.sees(-50.0, 0.0).is_some());
        assert!(cone.nearest(vec![(1u32, -30.0, 0.0)]).is_some());
    }

    #[test]
    fn test_bounds_cover_every_visible_point() {
        for heading in [0.0, 0.7, 2.0, 3.5, 5.9] {
            let cone = VisionCone::new(10.0, -4.0, heading, 2.1, 80.0);
            let bounds = cone.bounds();
            for step in 0..64 {
                let angle = heading - cone.half_fov + cone.half_fov * 2.0 * f64::from(step) / 63.0;
                let px = 10.0 + 80.0 * angle.cos();
                let py = -4.0 + 80.0 * angle.sin();
                assert!(
                    bounds.expanded(1e-6).contains(px, py),
                    "heading {heading}: ({px}, {py}) outside {bounds:?}"
                );
            }
        }
    }

    #[test]
    fn test_angle_between_wraps() {
        assert!((angle_between(0.1, TAU - 0.1) - 0.2).abs() < 1e-9);
        assert!((angle_between(0.0, PI) - PI).abs() < 1e-9);
    }
}
