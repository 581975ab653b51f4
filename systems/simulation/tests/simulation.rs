use treasure_map_core::{
    AdventurerId, AdventurerSpec, CellCoord, GridError, InstructionPath, Orientation, Scenario,
    SetupError, StepOutcome,
};
use treasure_map_system_simulation::Simulation;

fn spec(name: &str, column: u32, row: u32, orientation: Orientation, path: &str) -> AdventurerSpec {
    AdventurerSpec::new(
        name,
        CellCoord::new(column, row),
        orientation,
        InstructionPath::new(path),
    )
}

#[test]
fn reference_path_ends_on_expected_cell() {
    let scenario =
        Scenario::new(3, 3).with_adventurer(spec("John", 0, 0, Orientation::East, "AADADAGA"));
    let simulation = Simulation::from_scenario(&scenario).expect("valid scenario");
    let id = AdventurerId::new(0);

    let mut steps = 0;
    while !simulation.is_finished().expect("finished check") {
        let outcome = simulation.step(id).expect("step");
        assert!(outcome.consumed_instruction());
        steps += 1;
    }

    let snapshot = simulation.snapshot().expect("snapshot");
    let john = snapshot.adventurer(id).expect("john");
    assert_eq!(steps, 8);
    assert_eq!(john.position, CellCoord::new(1, 2));
    assert_eq!(john.orientation, Orientation::South);
    assert_eq!(john.cursor, 8);
    assert!(john.complete);
    assert_eq!(snapshot.grid().occupant(CellCoord::new(1, 2)), Some(id));
}

#[test]
fn outward_facing_adventurer_bounces_until_complete() {
    let scenario =
        Scenario::new(3, 3).with_adventurer(spec("Edge", 2, 1, Orientation::East, "AAAA"));
    let simulation = Simulation::from_scenario(&scenario).expect("valid scenario");
    let id = AdventurerId::new(0);

    for expected_cursor in 1..=4 {
        let outcome = simulation.step(id).expect("step");
        assert_eq!(
            outcome,
            StepOutcome::Bounced {
                adventurer: id,
                at: CellCoord::new(2, 1),
                target: None,
            }
        );
        let snapshot = simulation.snapshot().expect("snapshot");
        let edge = snapshot.adventurer(id).expect("edge");
        assert_eq!(edge.cursor, expected_cursor);
        assert_eq!(edge.position, CellCoord::new(2, 1));
    }

    assert!(simulation.is_finished().expect("finished check"));
    assert_eq!(
        simulation.step(id).expect("step"),
        StepOutcome::Idle { adventurer: id }
    );
}

#[test]
fn blocked_target_consumes_the_advance() {
    let scenario = Scenario::new(3, 1)
        .with_blocked(CellCoord::new(1, 0))
        .with_adventurer(spec("Climber", 0, 0, Orientation::East, "AD"));
    let simulation = Simulation::from_scenario(&scenario).expect("valid scenario");
    let id = AdventurerId::new(0);

    assert_eq!(
        simulation.step(id).expect("step"),
        StepOutcome::Bounced {
            adventurer: id,
            at: CellCoord::new(0, 0),
            target: Some(CellCoord::new(1, 0)),
        }
    );
    assert!(matches!(
        simulation.step(id).expect("step"),
        StepOutcome::Turned {
            orientation: Orientation::South,
            ..
        }
    ));
    assert!(simulation.is_finished().expect("finished check"));
}

#[test]
fn reward_is_transferred_exactly_once() {
    let scenario = Scenario::new(3, 1)
        .with_reward(CellCoord::new(1, 0), 7)
        .with_adventurer(spec("First", 0, 0, Orientation::East, "AA"))
        .with_adventurer(spec("Second", 2, 0, Orientation::West, "AAA"));
    let simulation = Simulation::from_scenario(&scenario).expect("valid scenario");
    let first = AdventurerId::new(0);
    let second = AdventurerId::new(1);

    assert_eq!(
        simulation.step(first).expect("step"),
        StepOutcome::Moved {
            adventurer: first,
            from: CellCoord::new(0, 0),
            to: CellCoord::new(1, 0),
            collected: 7,
        }
    );
    assert!(matches!(
        simulation.step(second).expect("step"),
        StepOutcome::Bounced { .. }
    ));
    assert!(matches!(
        simulation.step(first).expect("step"),
        StepOutcome::Bounced { .. }
    ));

    let snapshot = simulation.snapshot().expect("snapshot");
    assert_eq!(snapshot.grid().remaining_rewards(), 0);
    assert_eq!(snapshot.adventurer(first).map(|a| a.reward_tally), Some(7));

    let scenario = Scenario::new(3, 1)
        .with_reward(CellCoord::new(1, 0), 7)
        .with_adventurer(spec("First", 0, 0, Orientation::East, "AA"));
    let simulation = Simulation::from_scenario(&scenario).expect("valid scenario");
    let _ = simulation.run_sequential().expect("run");
    let snapshot = simulation.snapshot().expect("snapshot");
    let tally = snapshot.adventurer(first).map(|a| a.reward_tally);
    assert_eq!(tally, Some(7), "moving on adds nothing");
}

#[test]
fn second_visitor_collects_nothing() {
    let scenario = Scenario::new(2, 2)
        .with_reward(CellCoord::new(1, 0), 4)
        .with_adventurer(spec("Early", 0, 0, Orientation::East, "ADA"))
        .with_adventurer(spec("Late", 0, 1, Orientation::North, "ADA"));
    let simulation = Simulation::from_scenario(&scenario).expect("valid scenario");
    let rounds = simulation.run_sequential().expect("run");
    assert_eq!(rounds, 3);

    let snapshot = simulation.snapshot().expect("snapshot");
    let early = snapshot.adventurer(AdventurerId::new(0)).expect("early");
    let late = snapshot.adventurer(AdventurerId::new(1)).expect("late");
    assert_eq!(early.position, CellCoord::new(1, 1));
    assert_eq!(early.reward_tally, 4);
    assert_eq!(late.position, CellCoord::new(1, 0));
    assert_eq!(late.reward_tally, 0);
}

#[test]
fn malformed_symbol_is_skipped_without_stalling() {
    let scenario =
        Scenario::new(2, 2).with_adventurer(spec("Typo", 0, 0, Orientation::South, "AxA"));
    let simulation = Simulation::from_scenario(&scenario).expect("valid scenario");
    let id = AdventurerId::new(0);

    assert!(matches!(
        simulation.step(id).expect("step"),
        StepOutcome::Moved { .. }
    ));
    assert_eq!(
        simulation.step(id).expect("step"),
        StepOutcome::Rejected {
            adventurer: id,
            symbol: 'x',
            index: 1,
        }
    );
    assert!(matches!(
        simulation.step(id).expect("step"),
        StepOutcome::Bounced { target: None, .. }
    ));

    let snapshot = simulation.snapshot().expect("snapshot");
    let typo = snapshot.adventurer(id).expect("typo");
    assert_eq!(typo.position, CellCoord::new(0, 1));
    assert_eq!(typo.cursor, 3);
    assert!(typo.complete);
}

#[test]
fn cursor_never_decreases_nor_overshoots() {
    let scenario = Scenario::new(4, 4)
        .with_blocked(CellCoord::new(2, 2))
        .with_adventurer(spec("Wanderer", 1, 1, Orientation::East, "AAGAD?AADA"))
        .with_adventurer(spec("Drifter", 3, 3, Orientation::North, "AGAAAAGA"));
    let simulation = Simulation::from_scenario(&scenario).expect("valid scenario");

    let mut previous = vec![0_usize; simulation.adventurer_count()];
    for _ in 0..20 {
        let _ = simulation.step_round().expect("round");
        let snapshot = simulation.snapshot().expect("snapshot");
        for adventurer in snapshot.adventurers() {
            let index = adventurer.id.index();
            assert!(adventurer.cursor >= previous[index]);
            assert!(adventurer.cursor <= adventurer.path.len());
            previous[index] = adventurer.cursor;
        }
    }
    assert!(simulation.is_finished().expect("finished check"));
}

#[test]
fn finished_only_when_every_adventurer_completes() {
    let scenario = Scenario::new(3, 3)
        .with_adventurer(spec("Short", 0, 0, Orientation::East, "D"))
        .with_adventurer(spec("Long", 2, 2, Orientation::West, "DDD"))
        .with_adventurer(spec("Idle", 1, 1, Orientation::North, ""));
    let simulation = Simulation::from_scenario(&scenario).expect("valid scenario");

    assert!(!simulation.is_finished().expect("finished check"));
    let _ = simulation.step_round().expect("round");
    assert!(!simulation.is_finished().expect("finished check"));
    let _ = simulation.step_round().expect("round");
    assert!(!simulation.is_finished().expect("finished check"));
    let _ = simulation.step_round().expect("round");
    assert!(simulation.is_finished().expect("finished check"));
    assert!(simulation.snapshot().expect("snapshot").is_finished());
}

#[test]
fn empty_roster_is_finished_immediately() {
    let simulation = Simulation::from_scenario(&Scenario::new(1, 1)).expect("valid scenario");
    assert!(simulation.is_finished().expect("finished check"));
    assert_eq!(simulation.run_sequential().expect("run"), 0);
}

#[test]
fn setup_rejects_invalid_scenarios() {
    assert_eq!(
        Simulation::from_scenario(&Scenario::new(0, 4)).err(),
        Some(SetupError::Grid(GridError::InvalidDimensions {
            width: 0,
            height: 4
        }))
    );

    let negative = Scenario::new(2, 2).with_reward(CellCoord::new(1, 1), -3);
    assert_eq!(
        Simulation::from_scenario(&negative).err(),
        Some(SetupError::Grid(GridError::NegativeReward {
            cell: CellCoord::new(1, 1),
            count: -3
        }))
    );

    let on_mountain = Scenario::new(2, 2)
        .with_blocked(CellCoord::new(0, 0))
        .with_adventurer(spec("Stuck", 0, 0, Orientation::North, "A"));
    assert_eq!(
        Simulation::from_scenario(&on_mountain).err(),
        Some(SetupError::StartUnavailable {
            name: "Stuck".to_owned(),
            cell: CellCoord::new(0, 0)
        })
    );

    let crowded = Scenario::new(2, 2)
        .with_adventurer(spec("One", 1, 0, Orientation::North, "A"))
        .with_adventurer(spec("Two", 1, 0, Orientation::North, "A"));
    assert!(matches!(
        Simulation::from_scenario(&crowded),
        Err(SetupError::StartUnavailable { .. })
    ));

    let outside = Scenario::new(2, 2).with_blocked(CellCoord::new(5, 0));
    assert!(matches!(
        Simulation::from_scenario(&outside),
        Err(SetupError::Grid(GridError::OutOfBounds { .. }))
    ));
}

#[test]
fn starting_on_a_reward_collects_it() {
    let scenario = Scenario::new(2, 1)
        .with_reward(CellCoord::new(0, 0), 2)
        .with_adventurer(spec("Lucky", 0, 0, Orientation::East, ""));
    let simulation = Simulation::from_scenario(&scenario).expect("valid scenario");
    let snapshot = simulation.snapshot().expect("snapshot");
    assert_eq!(snapshot.collected_rewards(), 2);
    assert_eq!(snapshot.grid().remaining_rewards(), 0);
}

#[test]
fn full_reward_cells_are_collected_without_loss() {
    let full = i64::from(u32::MAX);
    let scenario = Scenario::new(3, 1)
        .with_reward(CellCoord::new(1, 0), full)
        .with_reward(CellCoord::new(2, 0), full)
        .with_adventurer(spec("Hoarder", 0, 0, Orientation::East, "AA"));
    let simulation = Simulation::from_scenario(&scenario).expect("valid scenario");
    let hoarder = AdventurerId::new(0);
    let total = 2 * u64::from(u32::MAX);

    let mut collected = 0;
    for _ in 0..2 {
        match simulation.step(hoarder).expect("step") {
            StepOutcome::Moved { collected: amount, .. } => {
                assert_eq!(amount, u32::MAX);
                collected += u64::from(amount);
            }
            other => panic!("expected a move, got {other:?}"),
        }
    }

    let snapshot = simulation.snapshot().expect("snapshot");
    let tally = snapshot.adventurer(hoarder).map(|a| a.reward_tally);
    assert_eq!(tally, Some(total));
    assert_eq!(collected + snapshot.grid().remaining_rewards(), total);
    assert_eq!(snapshot.collected_rewards(), total);
}
