//! Heading smoothing, speed selection and world-boundary handling.

use crate::config::{MovementConfig, WorldConfig};
use crate::spatial_grid::Rect;
use fauna_data::Agent;
use rand::{Rng, RngCore};
use std::f64::consts::{PI, TAU};

/// Lead angle used to pick the next point on an orbit.
const ORBIT_LEAD: f64 = 0.6;

/// Desired motion for one tick, produced by the behavior system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Steering {
    /// Random walk at reduced speed.
    Wander,
    /// Head straight for a point, arriving without overshoot.
    Seek { x: f64, y: f64 },
    /// Like `Seek`, but stop `stop_distance` short of the point.
    Follow { x: f64, y: f64, stop_distance: f64 },
    /// Circle `(cx, cy)` at `radius`, converging onto the circle.
    Orbit { cx: f64, cy: f64, radius: f64 },
    /// Stand still, optionally turning to face a point.
    Hold { face: Option<(f64, f64)> },
}

/// Wraps an angle into `(-PI, PI]`.
#[must_use]
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// Drives agent physics from a [`Steering`] intent.
#[derive(Debug, Clone, Copy)]
pub struct MovementController<'a> {
    movement: &'a MovementConfig,
    bounds: Rect,
}

impl<'a> MovementController<'a> {
    #[must_use]
    pub fn new(movement: &'a MovementConfig, world: &WorldConfig) -> Self {
        Self {
            movement,
            bounds: Rect::new(
                world.margin,
                world.margin,
                world.width - world.margin,
                world.height - world.margin,
            ),
        }
    }

    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Top speed of an agent, world units per second.
    #[must_use]
    pub fn max_speed(&self, agent: &Agent) -> f64 {
        self.movement.base_speed * f64::from(agent.traits.speed)
    }

    /// Fraction of top speed used in the last step, for metabolism.
    #[must_use]
    pub fn speed_fraction(&self, agent: &Agent) -> f64 {
        let max = self.max_speed(agent);
        if max <= f64::EPSILON {
            return 0.0;
        }
        (agent.physics.speed / max).clamp(0.0, 1.0)
    }

    /// Advances the agent by `dt` seconds. Returns the old position so the
    /// caller can update the spatial grid.
    pub fn apply(&self, agent: &mut Agent, steering: Steering, dt: f64, rng: &mut dyn RngCore) -> (f64, f64) {
        let old = agent.position();
        let max_speed = self.max_speed(agent);
        let max_turn = self.movement.max_turn_rate * dt;

        let (desired_heading, speed) = match steering {
            Steering::Wander => {
                let jitter = rng.gen_range(-1.0..=1.0) * self.movement.wander_jitter * dt;
                (
                    Some(agent.physics.heading + jitter),
                    max_speed * self.movement.wander_speed_factor,
                )
            }
            Steering::Seek { x, y } => {
                let distance = agent.distance_to_point(x, y);
                let heading = heading_to(old, (x, y), agent.physics.heading);
                (Some(heading), arrival_speed(max_speed, distance, dt))
            }
            Steering::Follow { x, y, stop_distance } => {
                let distance = agent.distance_to_point(x, y);
                let heading = heading_to(old, (x, y), agent.physics.heading);
                let remaining = (distance - stop_distance).max(0.0);
                (Some(heading), arrival_speed(max_speed, remaining, dt))
            }
            Steering::Orbit { cx, cy, radius } => {
                let radius = radius.max(0.0);
                let angle = (old.1 - cy).atan2(old.0 - cx);
                let aim = (
                    cx + radius * (angle + ORBIT_LEAD).cos(),
                    cy + radius * (angle + ORBIT_LEAD).sin(),
                );
                let distance = agent.distance_to_point(aim.0, aim.1);
                let speed = max_speed * self.movement.orbit_speed_factor;
                (
                    Some(heading_to(old, aim, agent.physics.heading)),
                    arrival_speed(speed, distance, dt),
                )
            }
            Steering::Hold { face } => (
                face.map(|target| heading_to(old, target, agent.physics.heading)),
                0.0,
            ),
        };

        if let Some(desired) = desired_heading {
            let delta = wrap_angle(desired - agent.physics.heading).clamp(-max_turn, max_turn);
            agent.physics.heading = wrap_angle(agent.physics.heading + delta);
        }

        agent.physics.speed = speed;
        agent.physics.x += agent.physics.heading.cos() * speed * dt;
        agent.physics.y += agent.physics.heading.sin() * speed * dt;
        self.confine(agent);
        old
    }

    /// Reflects the heading off any crossed wall and clamps the position.
    pub fn confine(&self, agent: &mut Agent) {
        let b = self.bounds;
        let p = &mut agent.physics;
        if p.x < b.min_x || p.x > b.max_x {
            p.x = p.x.clamp(b.min_x, b.max_x);
            p.heading = wrap_angle(PI - p.heading);
        }
        if p.y < b.min_y || p.y > b.max_y {
            p.y = p.y.clamp(b.min_y, b.max_y);
            p.heading = wrap_angle(-p.heading);
        }
    }
}

fn heading_to(from: (f64, f64), to: (f64, f64), fallback: f64) -> f64 {
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    if dx.abs() <= f64::EPSILON && dy.abs() <= f64::EPSILON {
        fallback
    } else {
        dy.atan2(dx)
    }
}

/// Speed that covers at most `remaining` in one step.
fn arrival_speed(max_speed: f64, remaining: f64, dt: f64) -> f64 {
    if dt <= 0.0 {
        return 0.0;
    }
    max_speed.min(remaining / dt)
}
