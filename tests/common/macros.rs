/// Asserts an agent's current behavior state.
#[macro_export]
macro_rules! assert_state {
    ($world:expr, $id:expr, $state:expr) => {
        let agent = $world.agent($id).expect("Agent not found in world");
        assert_eq!(
            agent.state(),
            $state,
            "Agent {} is {} instead of {}",
            $id,
            agent.state(),
            $state
        );
    };
}

/// Asserts an agent's current state and target agent.
#[macro_export]
macro_rules! assert_engaged {
    ($world:expr, $id:expr, $state:expr, $partner:expr) => {
        let agent = $world.agent($id).expect("Agent not found in world");
        assert!(
            agent.is_engaged_with($state, $partner),
            "Agent {} should be {} with {} but is {} targeting {:?}",
            $id,
            $state,
            $partner,
            agent.state(),
            agent.behavior.target
        );
    };
}

/// Asserts that the live population matches the expected value.
#[macro_export]
macro_rules! assert_population {
    ($world:expr, $count:expr) => {
        assert_eq!($world.alive_count(), $count, "Population count mismatch");
    };
}

/// Asserts that an agent is dead or already released.
#[macro_export]
macro_rules! assert_agent_dead {
    ($world:expr, $id:expr) => {
        let alive = $world.agent($id).is_some_and(|a| a.is_alive());
        assert!(!alive, "Agent {} should be dead but is alive", $id);
    };
}
