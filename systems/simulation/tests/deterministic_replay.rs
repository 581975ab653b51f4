use treasure_map_core::{
    AdventurerId, AdventurerSpec, CellCoord, InstructionPath, Orientation, Scenario,
    SimulationSnapshot, StepOutcome,
};
use treasure_map_system_simulation::Simulation;

fn crossing_scenario() -> Scenario {
    Scenario::new(4, 4)
        .with_blocked(CellCoord::new(1, 1))
        .with_reward(CellCoord::new(2, 0), 2)
        .with_reward(CellCoord::new(0, 2), 5)
        .with_adventurer(AdventurerSpec::new(
            "Ana",
            CellCoord::new(0, 0),
            Orientation::East,
            InstructionPath::new("AADAA"),
        ))
        .with_adventurer(AdventurerSpec::new(
            "Ben",
            CellCoord::new(3, 3),
            Orientation::North,
            InstructionPath::new("AAGAA"),
        ))
}

fn replay(scenario: &Scenario) -> (Vec<Vec<StepOutcome>>, SimulationSnapshot) {
    let simulation = Simulation::from_scenario(scenario).expect("valid scenario");
    let mut rounds = Vec::new();
    while !simulation.is_finished().expect("finished check") {
        rounds.push(simulation.step_round().expect("round"));
    }
    (rounds, simulation.snapshot().expect("snapshot"))
}

#[test]
fn round_robin_replay_is_deterministic() {
    let scenario = crossing_scenario();
    let (first_log, first_state) = replay(&scenario);
    let (second_log, second_state) = replay(&scenario);

    assert_eq!(first_log, second_log);
    assert_eq!(first_state, second_state);
}

#[test]
fn crossing_paths_resolve_in_identifier_order() {
    let (log, state) = replay(&crossing_scenario());
    let ana = AdventurerId::new(0);
    let ben = AdventurerId::new(1);

    assert_eq!(log.len(), 5);
    assert_eq!(
        log[1][0],
        StepOutcome::Moved {
            adventurer: ana,
            from: CellCoord::new(1, 0),
            to: CellCoord::new(2, 0),
            collected: 2,
        }
    );
    assert_eq!(
        log[3][1],
        StepOutcome::Bounced {
            adventurer: ben,
            at: CellCoord::new(3, 1),
            target: Some(CellCoord::new(2, 1)),
        }
    );
    assert_eq!(
        log[4][1],
        StepOutcome::Moved {
            adventurer: ben,
            from: CellCoord::new(3, 1),
            to: CellCoord::new(2, 1),
            collected: 0,
        }
    );

    let ana_state = state.adventurer(ana).expect("ana");
    assert_eq!(ana_state.position, CellCoord::new(2, 2));
    assert_eq!(ana_state.orientation, Orientation::South);
    assert_eq!(ana_state.reward_tally, 2);

    let ben_state = state.adventurer(ben).expect("ben");
    assert_eq!(ben_state.position, CellCoord::new(2, 1));
    assert_eq!(ben_state.orientation, Orientation::West);
    assert_eq!(ben_state.reward_tally, 0);

    assert_eq!(state.grid().remaining_rewards(), 5);
    assert_eq!(state.collected_rewards(), 2);
}
