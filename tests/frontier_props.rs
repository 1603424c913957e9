use polities::{
    config::SimParams,
    settlement::{Relation, StageKind, Stockpile},
    spatial::{ResourceKind, TileGrid, TileId, TilePos},
    systems::{diplomacy, lifecycle},
    territory::recompute_border,
    world::{SettlementId, SettlementSeed, World},
};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const SIDE: u32 = 8;

#[derive(Debug, Clone)]
enum Op {
    Claim { tile: u32, state: usize },
    Release { tile: u32 },
    Transfer { tile: u32, to: usize },
}

fn op() -> impl Strategy<Value = Op> {
    let tile = 0..SIDE * SIDE;
    prop_oneof![
        (tile.clone(), 0..3usize).prop_map(|(tile, state)| Op::Claim { tile, state }),
        tile.clone().prop_map(|tile| Op::Release { tile }),
        (tile, 0..3usize).prop_map(|(tile, to)| Op::Transfer { tile, to }),
    ]
}

fn seeded_world() -> (World, Vec<SettlementId>) {
    let mut params = SimParams::default();
    params.state.territory_radius = 1;
    let mut world = World::new(
        TileGrid::uniform(SIDE, SIDE, ResourceKind::Food, 1.0),
        params,
    );
    let states = [(1, 1), (6, 1), (3, 6)]
        .into_iter()
        .map(|(x, y)| {
            world
                .spawn(SettlementSeed {
                    name: None,
                    stage: StageKind::State,
                    position: TilePos::new(x, y),
                    population: 10.0,
                    stock: Stockpile::default(),
                    technology: None,
                })
                .unwrap()
        })
        .collect();
    (world, states)
}

fn tile(world: &World, raw: u32) -> TileId {
    world
        .grid()
        .id_at(TilePos::new(raw % SIDE, raw / SIDE))
        .unwrap()
}

proptest! {
    #[test]
    fn borders_match_recomputation(ops in prop::collection::vec(op(), 1..60)) {
        let (mut world, states) = seeded_world();
        for op in ops {
            match op {
                Op::Claim { tile: raw, state } => {
                    let t = tile(&world, raw);
                    let was_free = world.grid().owner(t).is_none();
                    prop_assert_eq!(world.claim_tile(t, states[state]), was_free);
                }
                Op::Release { tile: raw } => {
                    let t = tile(&world, raw);
                    let owner = world.grid().owner(t);
                    prop_assert_eq!(world.release_tile(t), owner);
                }
                Op::Transfer { tile: raw, to } => {
                    let t = tile(&world, raw);
                    if let Some(from) = world.grid().owner(t) {
                        let moved = world.transfer_tile(t, from, states[to]);
                        prop_assert_eq!(moved, from != states[to]);
                    }
                }
            }
            prop_assert!(world.verify_invariants().is_ok());
            for id in &states {
                let settlement = world.settlement(*id).unwrap();
                let expected = recompute_border(world.grid(), *id, &settlement.territory);
                prop_assert_eq!(&settlement.polity().unwrap().border, &expected);
            }
        }
    }
}

#[test]
fn refreshing_twice_changes_nothing() {
    let (mut world, states) = seeded_world();
    // join the first two states with a corridor
    for x in 3..5 {
        let t = world.grid().id_at(TilePos::new(x, 1)).unwrap();
        world.claim_tile(t, states[0]);
    }
    for id in &states {
        diplomacy::refresh(&mut world, *id);
    }
    let first: Vec<_> = states
        .iter()
        .map(|id| world.polity(*id).unwrap().diplomacy.clone())
        .collect();
    assert_eq!(first[0].get(&states[1]), Some(&Relation::Peace));

    for id in &states {
        let changes = diplomacy::refresh(&mut world, *id);
        assert_eq!(changes, diplomacy::DiplomacyChanges::default());
    }
    let second: Vec<_> = states
        .iter()
        .map(|id| world.polity(*id).unwrap().diplomacy.clone())
        .collect();
    assert_eq!(first, second);
}

#[test]
fn lost_contact_drops_the_relation_on_both_sides() {
    let (mut world, states) = seeded_world();
    let corridor: Vec<TileId> = (3..5)
        .map(|x| world.grid().id_at(TilePos::new(x, 1)).unwrap())
        .collect();
    for t in &corridor {
        world.claim_tile(*t, states[0]);
    }
    diplomacy::set_relation(&mut world, states[0], states[1], Relation::War);
    world.release_tile(corridor[1]);

    let changes = diplomacy::refresh(&mut world, states[0]);
    assert_eq!(changes.dropped, vec![states[1]]);
    assert_eq!(world.polity(states[0]).unwrap().relation(states[1]), None);
    assert_eq!(world.polity(states[1]).unwrap().relation(states[0]), None);
}

#[test]
fn promotion_progress_never_regresses_while_gathering() {
    let mut world = World::new(
        TileGrid::uniform(16, 16, ResourceKind::Wood, 1_000.0),
        SimParams::default(),
    );
    let id = world
        .spawn(SettlementSeed {
            name: None,
            stage: StageKind::Tribe,
            position: TilePos::new(8, 8),
            population: 20.0,
            stock: Stockpile {
                food: 5_000.0,
                water: 5_000.0,
                ..Stockpile::default()
            },
            technology: None,
        })
        .unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let mut last = 0.0;
    for _ in 0..400 {
        let report = lifecycle::advance(&mut world, id, &mut rng).unwrap();
        let settlement = world.settlement(id).unwrap();
        if report.promoted.is_some() {
            assert_eq!(settlement.kind(), StageKind::City);
            return;
        }
        assert!(settlement.progress >= last, "{} < {last}", settlement.progress);
        last = settlement.progress;
    }
    panic!("tribe never reached city stage");
}
