//! Property tests over whole engine runs.

use crate::agent::Role;
use crate::config::{BehaviorMode, DiffusionDirection, EngineConfig};
use crate::engine::Engine;
use crate::scheduler::Scheduler;
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;

fn build(seed: u64, extra: usize, mode: BehaviorMode, direction: DiffusionDirection) -> Engine {
    let mut config = EngineConfig::default();
    config.behavior.mode = mode;
    config.diffusion.direction = direction;
    let mut engine = Engine::new(config, ChaCha8Rng::seed_from_u64(seed)).unwrap();
    engine.bootstrap(extra).unwrap();
    engine
}

fn modes() -> impl Strategy<Value = (BehaviorMode, DiffusionDirection)> {
    (
        prop_oneof![Just(BehaviorMode::EdgeDirected), Just(BehaviorMode::SelfWalk)],
        prop_oneof![Just(DiffusionDirection::OneWay), Just(DiffusionDirection::Bidirectional)],
    )
}

proptest! {
    #[test]
    fn uncertainty_and_threat_stay_in_unit_interval(
        seed in any::<u64>(),
        extra in 0usize..12,
        ticks in 1u64..40,
        (mode, direction) in modes(),
    ) {
        let mut scheduler = Scheduler::new(build(seed, extra, mode, direction));
        for _ in 0..ticks {
            let report = scheduler.step();
            prop_assert!((0.0..=1.0).contains(&report.threat));
            for agent in scheduler.agents() {
                prop_assert!((0.0..=1.0).contains(&agent.uncertainty()));
            }
        }
    }

    #[test]
    fn threat_is_bounded_for_arbitrary_graphs(
        uncertainties in prop::collection::vec(0.0f64..=1.0, 0..10),
        edges in prop::collection::vec((0usize..10, 0usize..10), 0..40),
    ) {
        let mut engine = Engine::seeded(0);
        let ids: Vec<_> = uncertainties
            .iter()
            .map(|&u| engine.add_agent(Role::Observer, Some(u)).unwrap().id())
            .collect();
        for (s, t) in edges {
            if s < ids.len() && t < ids.len() && s != t {
                engine.add_relationship(ids[s], ids[t]).unwrap();
            }
        }

        let threat = engine.current_threat();
        prop_assert!((0.0..=1.0).contains(&threat));
        if ids.is_empty() {
            prop_assert_eq!(threat, 0.0);
        }
    }

    #[test]
    fn seeded_runs_are_identical(seed in any::<u64>(), ticks in 0u64..30) {
        let run = || {
            let mut scheduler = Scheduler::new(
                build(seed, 5, BehaviorMode::EdgeDirected, DiffusionDirection::OneWay),
            );
            let reports = scheduler.run(ticks);
            (scheduler.engine().graph().clone(), reports)
        };
        prop_assert_eq!(run(), run());
    }

    #[test]
    fn only_observers_ever_change_role(
        seed in any::<u64>(),
        ticks in 1u64..60,
        (mode, direction) in modes(),
    ) {
        let mut scheduler = Scheduler::new(build(seed, 9, mode, direction));

        for _ in 0..ticks {
            let before: HashMap<_, _> = scheduler
                .agents()
                .iter()
                .map(|a| (a.id(), a.role()))
                .collect();

            let report = scheduler.step();

            for agent in scheduler.agents() {
                let was = before[&agent.id()];
                if agent.role() != was {
                    prop_assert_eq!(was, Role::Observer, "tick {} changed {}", report.tick, agent.id());
                }
            }
            for (id, _) in &report.role_changes {
                prop_assert_eq!(before[id], Role::Observer);
            }
            for id in &report.converted {
                prop_assert_eq!(scheduler.engine().graph().agent(*id).map(|a| a.role()), Some(Role::Defender));
            }
        }
    }
}
