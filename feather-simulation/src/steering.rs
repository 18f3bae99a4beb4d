//! Force sub-routines of the agent controller.
//!
//! Every function here is pure: it reads the thinking agent, its tuning and
//! a read-only slice of the population, and returns a force. Candidates that
//! sit exactly on top of the agent (distance zero) are skipped, as is the
//! agent itself.

use feather_core::{AgentId, Vector2, Vector2Ext};
use smallvec::SmallVec;

use crate::agent::Agent;
use crate::obstacle::{Obstacle, ObstacleRegistry};
use crate::tuning::{ConversionRule, SpeciesTuning};

/// Weight of the separation term in the flock force.
pub const SEPARATION_WEIGHT: f32 = 1.5;
/// Cohesion target speed as a fraction of the speed cap once inside `min_distance`.
pub const DAMPED_SPEED_FACTOR: f32 = 0.1;
/// Look-ahead distance, in multiples of `min_distance`, at full speed.
pub const LOOK_AHEAD_FACTOR: f32 = 2.0;
/// Look-ahead points inside `radius * OBSTACLE_CLEARANCE` are pushed away.
pub const OBSTACLE_CLEARANCE: f32 = 1.2;
/// Avoidance contributions at or under this magnitude are ignored.
pub const SIGNIFICANT_FORCE: f32 = 1.0;

/// Output of [`pursuit_force`].
#[derive(Debug, Clone, Default)]
pub struct Pursuit {
    pub force: Vector2,
    /// Candidates caught by the conversion rule, in candidate order.
    pub conversions: SmallVec<[AgentId; 2]>,
}

/// The three flocking terms, each clamped to `max_force`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlockForce {
    pub separation: Vector2,
    pub cohesion: Vector2,
    pub alignment: Vector2,
}

impl FlockForce {
    pub fn total(&self) -> Vector2 {
        self.separation * SEPARATION_WEIGHT + self.cohesion + self.alignment
    }
}

/// Iterates candidates within sensing range as `(other, unit vector from other to me, distance)`.
fn in_range<'a>(
    me: &'a Agent,
    tuning: &'a SpeciesTuning,
    agents: &'a [Agent],
    candidates: &'a [AgentId],
) -> impl Iterator<Item = (&'a Agent, Vector2, f32)> + 'a {
    candidates
        .iter()
        .filter(move |&&id| id != me.id())
        .filter_map(move |id| agents.get(id.index()))
        .filter_map(move |other| {
            let diff = me.position() - other.position();
            let dist = diff.length();
            (dist > 0.0 && dist < tuning.sensing_range).then(|| (other, diff / dist, dist))
        })
}

/// Boosts a unit vector inverse-proportionally once closer than `min_distance`.
#[inline]
fn proximity_boost(direction: Vector2, dist: f32, min_distance: f32) -> Vector2 {
    if dist < min_distance {
        direction / (dist / min_distance)
    } else {
        direction
    }
}

/// Shared flee/chase algorithm: the averaged, proximity-boosted direction away
/// from every candidate in range, scaled by the speed cap and clamped to
/// `max_force`. Flee subtracts this force, chase adds it.
///
/// With a conversion rule, candidates close enough and approached head-on are
/// reported in [`Pursuit::conversions`].
pub fn pursuit_force(
    me: &Agent,
    tuning: &SpeciesTuning,
    agents: &[Agent],
    candidates: &[AgentId],
    conversion: Option<&ConversionRule>,
) -> Pursuit {
    let heading = me.velocity().normalized();
    let mut pursuit = Pursuit::default();
    let mut count = 0usize;

    for (other, away, dist) in in_range(me, tuning, agents, candidates) {
        count += 1;
        if let Some(rule) = conversion {
            if rule.converts(dist, away.dot(heading)) {
                pursuit.conversions.push(other.id());
            }
        }
        pursuit.force += proximity_boost(away, dist, tuning.min_distance);
    }

    if count > 0 {
        pursuit.force /= count as f32;
        pursuit.force *= tuning.speed_cap;
        pursuit.force.limit_in_place(tuning.max_force);
    }

    pursuit
}

/// Separation, cohesion and alignment against same-species candidates.
pub fn flock_force(
    me: &Agent,
    tuning: &SpeciesTuning,
    agents: &[Agent],
    candidates: &[AgentId],
) -> FlockForce {
    let mut separation = Vector2::ZERO;
    let mut center = Vector2::ZERO;
    let mut heading = Vector2::ZERO;
    let mut count = 0usize;

    for (other, away, dist) in in_range(me, tuning, agents, candidates) {
        count += 1;
        separation += proximity_boost(away, dist, tuning.min_distance);
        center += other.position();
        heading += other.velocity();
    }

    if count == 0 {
        return FlockForce::default();
    }

    FlockForce {
        separation: (separation.normalized() * tuning.speed_cap - me.velocity())
            .limit(tuning.max_force),
        cohesion: steer(me, tuning, center / count as f32, true),
        alignment: (heading.normalized() * tuning.speed_cap - me.velocity())
            .limit(tuning.max_force),
    }
}

/// Steering force towards `destination`, clamped to `max_force`.
///
/// With `damped`, the desired speed drops to a tenth of the cap once the
/// destination is within `min_distance`, so the agent settles instead of
/// orbiting the target.
pub fn steer(me: &Agent, tuning: &SpeciesTuning, destination: Vector2, damped: bool) -> Vector2 {
    let diff = destination - me.position();
    let dist = diff.length();
    if dist <= 0.0 {
        return Vector2::ZERO;
    }

    let speed = if damped && dist < tuning.min_distance {
        tuning.speed_cap * DAMPED_SPEED_FACTOR
    } else {
        tuning.speed_cap
    };
    ((diff / dist) * speed - me.velocity()).limit(tuning.max_force)
}

/// Push away from `obstacle` if the look-ahead point would be too close to it.
pub fn obstacle_force(me: &Agent, tuning: &SpeciesTuning, obstacle: &Obstacle) -> Vector2 {
    let velocity = me.velocity();
    let look_ahead = tuning.min_distance * LOOK_AHEAD_FACTOR * velocity.length() / tuning.speed_cap;
    let ahead = me.position() + velocity.normalized() * look_ahead;

    let diff = ahead - obstacle.position();
    if diff.length() > obstacle.radius() * OBSTACLE_CLEARANCE {
        return Vector2::ZERO;
    }
    diff.normalized() * tuning.max_force
}

/// Averaged avoidance over obstacles in sensing range, scaled by the speed cap.
///
/// Not clamped to `max_force`: avoidance may exceed the nominal cap so
/// agents never pass through an obstacle.
pub fn avoid_obstacles(
    me: &Agent,
    tuning: &SpeciesTuning,
    obstacles: &ObstacleRegistry,
) -> Vector2 {
    let mut avoidance = Vector2::ZERO;
    let mut count = 0usize;

    for obstacle in obstacles.iter() {
        let dist = me.position().distance(obstacle.position());
        if !(dist > 0.0 && dist < tuning.sensing_range) {
            continue;
        }
        let force = obstacle_force(me, tuning, obstacle);
        if force.length() > SIGNIFICANT_FORCE {
            avoidance += force;
            count += 1;
        }
    }

    if count > 0 {
        avoidance /= count as f32;
        avoidance *= tuning.speed_cap;
    }
    avoidance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::species::Species;

    const EPS: f32 = 1e-3;

    fn agent(n: u32, species: Species, position: (f32, f32), velocity: (f32, f32)) -> Agent {
        Agent::new(
            AgentId::new(n),
            species,
            Vector2::new(position.0, position.1),
            Vector2::new(velocity.0, velocity.1),
            (0, 0),
        )
    }

    fn ids(agents: &[Agent]) -> Vec<AgentId> {
        agents.iter().map(Agent::id).collect()
    }

    #[test]
    fn pursuit_with_no_candidates_is_zero() {
        let agents = vec![agent(0, Species::Red, (100.0, 100.0), (5.0, 0.0))];
        let tuning = SpeciesTuning::default();
        let p = pursuit_force(&agents[0], &tuning, &agents, &ids(&agents), None);
        assert_eq!(p.force, Vector2::ZERO);
        assert!(p.conversions.is_empty());
    }

    #[test]
    fn pursuit_ignores_candidates_out_of_range() {
        let agents = vec![
            agent(0, Species::Red, (0.0, 0.0), (0.0, 0.0)),
            agent(1, Species::Green, (300.0, 0.0), (0.0, 0.0)),
        ];
        let tuning = SpeciesTuning::default();
        let p = pursuit_force(&agents[0], &tuning, &agents, &[AgentId::new(1)], None);
        assert_eq!(p.force, Vector2::ZERO);
    }

    #[test]
    fn pursuit_points_away_and_is_clamped() {
        let agents = vec![
            agent(0, Species::Red, (100.0, 100.0), (0.0, 0.0)),
            agent(1, Species::Green, (200.0, 100.0), (0.0, 0.0)),
        ];
        let tuning = SpeciesTuning::default();
        let p = pursuit_force(&agents[0], &tuning, &agents, &[AgentId::new(1)], None);
        // Unit vector away from the candidate times the speed cap, clamped to max_force
        assert!((p.force.length() - tuning.max_force).abs() < EPS);
        assert!(p.force.x < 0.0);
        assert!(p.force.y.abs() < EPS);
    }

    #[test]
    fn pursuit_under_the_cap_is_untouched() {
        let agents = vec![
            agent(0, Species::Red, (100.0, 100.0), (0.0, 0.0)),
            agent(1, Species::Green, (200.0, 100.0), (0.0, 0.0)),
            agent(2, Species::Green, (0.0, 100.0), (0.0, 0.0)),
            agent(3, Species::Green, (100.0, 200.0), (0.0, 0.0)),
        ];
        let tuning = SpeciesTuning {
            max_force: 1_000.0,
            ..SpeciesTuning::default()
        };
        let p = pursuit_force(&agents[0], &tuning, &agents, &ids(&agents[1..]), None);
        // x terms cancel; the average is (0, -1/3), scaled by the speed cap
        assert!(p.force.x.abs() < EPS);
        assert!((p.force.y + tuning.speed_cap / 3.0).abs() < EPS);
    }

    #[test]
    fn close_candidates_are_boosted() {
        let tuning = SpeciesTuning {
            max_force: 1_000.0,
            ..SpeciesTuning::default()
        };
        let near = vec![
            agent(0, Species::Red, (100.0, 100.0), (0.0, 0.0)),
            agent(1, Species::Green, (112.0, 100.0), (0.0, 0.0)),
        ];
        let p = pursuit_force(&near[0], &tuning, &near, &[AgentId::new(1)], None);
        // 12 units away with min distance 48: boosted by 48 / 12 = 4
        assert!((p.force.length() - 4.0 * tuning.speed_cap).abs() < 1e-2);
    }

    #[test]
    fn conversion_requires_head_on_approach() {
        let tuning = SpeciesTuning::default();
        let rule = ConversionRule::default();
        let head_on = vec![
            agent(0, Species::Red, (100.0, 100.0), (50.0, 0.0)),
            agent(1, Species::Green, (110.0, 100.0), (0.0, 0.0)),
        ];
        let p = pursuit_force(&head_on[0], &tuning, &head_on, &[AgentId::new(1)], Some(&rule));
        assert_eq!(p.conversions.as_slice(), &[AgentId::new(1)]);

        let moving_away = vec![
            agent(0, Species::Red, (100.0, 100.0), (-50.0, 0.0)),
            agent(1, Species::Green, (110.0, 100.0), (0.0, 0.0)),
        ];
        let p = pursuit_force(
            &moving_away[0],
            &tuning,
            &moving_away,
            &[AgentId::new(1)],
            Some(&rule),
        );
        assert!(p.conversions.is_empty());

        // Flee never converts
        let p = pursuit_force(&head_on[0], &tuning, &head_on, &[AgentId::new(1)], None);
        assert!(p.conversions.is_empty());
    }

    #[test]
    fn stationary_chaser_never_converts() {
        let agents = vec![
            agent(0, Species::Red, (100.0, 100.0), (0.0, 0.0)),
            agent(1, Species::Green, (101.0, 100.0), (0.0, 0.0)),
        ];
        let rule = ConversionRule::default();
        let tuning = SpeciesTuning::default();
        let p = pursuit_force(&agents[0], &tuning, &agents, &[AgentId::new(1)], Some(&rule));
        assert!(p.conversions.is_empty());
    }

    #[test]
    fn coincident_candidates_are_skipped() {
        let agents = vec![
            agent(0, Species::Red, (100.0, 100.0), (1.0, 0.0)),
            agent(1, Species::Red, (100.0, 100.0), (0.0, 1.0)),
        ];
        let tuning = SpeciesTuning::default();
        assert_eq!(flock_force(&agents[0], &tuning, &agents, &ids(&agents)), FlockForce::default());
        let p = pursuit_force(&agents[0], &tuning, &agents, &ids(&agents), None);
        assert_eq!(p.force, Vector2::ZERO);
    }

    #[test]
    fn flock_terms_are_each_clamped() {
        let agents = vec![
            agent(0, Species::Blue, (300.0, 300.0), (-80.0, 30.0)),
            agent(1, Species::Blue, (310.0, 300.0), (100.0, 0.0)),
            agent(2, Species::Blue, (300.0, 350.0), (90.0, 10.0)),
            agent(3, Species::Blue, (420.0, 380.0), (70.0, -60.0)),
        ];
        let tuning = SpeciesTuning::default();
        let flock = flock_force(&agents[0], &tuning, &agents, &ids(&agents));
        for term in [flock.separation, flock.cohesion, flock.alignment] {
            assert!(term.length() <= tuning.max_force + EPS, "{term:?}");
        }
        assert_ne!(flock.total(), Vector2::ZERO);
    }

    #[test]
    fn flock_separates_and_aligns() {
        let agents = vec![
            agent(0, Species::Green, (100.0, 100.0), (0.0, 0.0)),
            agent(1, Species::Green, (130.0, 100.0), (0.0, 20.0)),
        ];
        let tuning = SpeciesTuning {
            max_force: 10_000.0,
            ..SpeciesTuning::default()
        };
        let flock = flock_force(&agents[0], &tuning, &agents, &ids(&agents));
        // Separation pushes away from the neighbor (-x), alignment follows its heading (+y)
        assert!((flock.separation - Vector2::new(-tuning.speed_cap, 0.0)).length() < EPS);
        assert!((flock.alignment - Vector2::new(0.0, tuning.speed_cap)).length() < EPS);
        // Neighbor is inside min_distance: cohesion is damped to a tenth of the cap
        let damped = Vector2::new(tuning.speed_cap * DAMPED_SPEED_FACTOR, 0.0);
        assert!((flock.cohesion - damped).length() < EPS);
    }

    #[test]
    fn steer_at_destination_is_zero() {
        let me = agent(0, Species::Red, (50.0, 50.0), (10.0, 0.0));
        let tuning = SpeciesTuning::default();
        assert_eq!(steer(&me, &tuning, Vector2::new(50.0, 50.0), false), Vector2::ZERO);
    }

    #[test]
    fn steer_undamped_targets_full_speed() {
        let me = agent(0, Species::Red, (0.0, 0.0), (0.0, 0.0));
        let tuning = SpeciesTuning {
            max_force: 1_000.0,
            ..SpeciesTuning::default()
        };
        let near = steer(&me, &tuning, Vector2::new(10.0, 0.0), false);
        assert!((near.x - tuning.speed_cap).abs() < EPS);
        let damped = steer(&me, &tuning, Vector2::new(10.0, 0.0), true);
        assert!((damped.x - tuning.speed_cap * DAMPED_SPEED_FACTOR).abs() < EPS);
    }

    #[test]
    fn obstacle_ahead_pushes_at_max_force() {
        let tuning = SpeciesTuning::default();
        let obstacle = Obstacle::new(Vector2::new(200.0, 100.0), 96.0).unwrap();
        // Moving at full speed towards the obstacle: look-ahead is 96 units
        let me = agent(0, Species::Red, (50.0, 110.0), (100.0, 0.0));
        let force = obstacle_force(&me, &tuning, &obstacle);
        assert!((force.length() - tuning.max_force).abs() < EPS);
        assert!(force.x < 0.0);
    }

    #[test]
    fn obstacle_with_clear_look_ahead_is_ignored() {
        let tuning = SpeciesTuning::default();
        let obstacle = Obstacle::new(Vector2::new(200.0, 100.0), 20.0).unwrap();
        let me = agent(0, Species::Red, (50.0, 100.0), (10.0, 0.0));
        assert_eq!(obstacle_force(&me, &tuning, &obstacle), Vector2::ZERO);
    }

    #[test]
    fn avoidance_is_scaled_but_not_clamped() {
        let tuning = SpeciesTuning::default();
        let mut obstacles = ObstacleRegistry::new();
        obstacles.register(Obstacle::new(Vector2::new(200.0, 100.0), 96.0).unwrap());
        let me = agent(0, Species::Red, (50.0, 110.0), (100.0, 0.0));

        let avoidance = avoid_obstacles(&me, &tuning, &obstacles);
        assert!((avoidance.length() - tuning.max_force * tuning.speed_cap).abs() < 1.0);
        assert!(avoidance.length() > tuning.max_force);
    }

    #[test]
    fn avoidance_ignores_obstacles_out_of_range() {
        let tuning = SpeciesTuning::default();
        let mut obstacles = ObstacleRegistry::new();
        obstacles.register(Obstacle::new(Vector2::new(800.0, 800.0), 96.0).unwrap());
        let me = agent(0, Species::Red, (50.0, 50.0), (100.0, 100.0));
        assert_eq!(avoid_obstacles(&me, &tuning, &obstacles), Vector2::ZERO);
    }
}
