mod common;

use common::{AgentBuilder, WorldBuilder};
use fauna_core::food::Resources;
use fauna_core::metrics::counter;
use fauna_data::{BehaviorState, SimEvent, Target};

const DT: f64 = 0.05;

fn meal_eaten(events: &[SimEvent]) -> bool {
    events
        .iter()
        .any(|e| matches!(e, SimEvent::FoodConsumed { .. }))
}

#[test]
fn test_hungry_agent_eats_food_in_front() {
    let mut s = WorldBuilder::new()
        .without_metabolism()
        .with_food(410.0, 400.0, 30.0)
        .with_agent(AgentBuilder::male().at(400.0, 400.0).heading(0.0).energy(40.0))
        .build();
    let agent = s.agent(0);
    let food = s.food[0];

    s.step(DT);
    let target = s.world.agent(agent).and_then(|a| a.behavior.target);
    assert_eq!(target, Some(Target::Food(food)));
    assert_state!(s.world, agent, BehaviorState::Seeking);

    let ate = s.run_until(DT, 200, |_, events| meal_eaten(events));
    assert!(ate.is_some(), "agent never finished eating");

    let eater = s.world.agent(agent).expect("agent exists");
    assert!((eater.vitals.energy - 70.0).abs() < 1e-9);
    assert_state!(s.world, agent, BehaviorState::Idle);
    assert_eq!(s.world.resources().food_count(), 0);
    assert!(s.world.resources().food(food).is_none());
    assert_eq!(s.world.metrics().get(counter::MEALS), 1);
}

#[test]
fn test_eating_takes_the_configured_duration() {
    let mut s = WorldBuilder::new()
        .without_metabolism()
        .with_food(405.0, 400.0, 30.0)
        .with_agent(AgentBuilder::female().at(400.0, 400.0).energy(40.0))
        .build();
    let agent = s.agent(0);
    let duration = s.world.config().behavior.eating_duration_ms;

    let started = s.run_until(DT, 50, |world, _| {
        world
            .agent(agent)
            .is_some_and(|a| a.state() == BehaviorState::Eating)
    });
    assert!(started.is_some(), "agent never started eating");
    let began_at = s.world.clock_ms();

    s.run_until(DT, 200, |_, events| meal_eaten(events))
        .expect("meal finished");
    assert!(s.world.clock_ms() - began_at >= duration);
}

#[test]
fn test_meal_is_capped_at_max_energy() {
    let mut s = WorldBuilder::new()
        .without_metabolism()
        .with_food(410.0, 400.0, 80.0)
        .with_agent(AgentBuilder::male().at(400.0, 400.0).energy(40.0))
        .build();
    let agent = s.agent(0);

    s.run_until(DT, 200, |_, events| meal_eaten(events))
        .expect("meal finished");

    let max = s.world.config().metabolism.max_energy;
    let eater = s.world.agent(agent).expect("agent exists");
    assert_eq!(eater.vitals.energy, max);
}

#[test]
fn test_food_behind_is_not_seen() {
    let mut s = WorldBuilder::new()
        .with_food(360.0, 400.0, 30.0)
        .with_agent(AgentBuilder::male().at(400.0, 400.0).heading(0.0).energy(40.0))
        .build();
    let agent = s.agent(0);

    s.step(DT);

    assert_state!(s.world, agent, BehaviorState::Idle);
}

#[test]
fn test_vanished_food_sends_seeker_back_to_idle() {
    let mut s = WorldBuilder::new()
        .with_food(600.0, 400.0, 30.0)
        .with_agent(AgentBuilder::male().at(400.0, 400.0).heading(0.0).energy(40.0))
        .build();
    let agent = s.agent(0);
    let food = s.food[0];

    s.step(DT);
    assert_state!(s.world, agent, BehaviorState::Seeking);

    assert!(s.world.resources_mut().remove_food(food).is_some());
    s.step(DT);

    assert_state!(s.world, agent, BehaviorState::Idle);
}

#[test]
fn test_fed_agent_ignores_food() {
    let mut s = WorldBuilder::new()
        .with_food(410.0, 400.0, 30.0)
        .with_agent(AgentBuilder::female().at(400.0, 400.0).energy(90.0))
        .build();
    let agent = s.agent(0);

    s.step(DT);

    assert_state!(s.world, agent, BehaviorState::Idle);
    assert_eq!(s.world.resources().food_count(), 1);
}
