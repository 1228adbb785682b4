use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use conquest_core::{CellIndex, EntityId, Ownership, PackedColor};
use conquest_system_expansion::{expand, ExpansionBudget, ExpansionConfig, Territory};
use conquest_world::{query, TerrainRaster, World, DEFAULT_LAND_ALPHA_THRESHOLD};

const WIDTH: u32 = 48;
const HEIGHT: u32 = 32;

#[test]
fn deterministic_replay_produces_identical_grids() {
    let first = replay(&scripted_budgets());
    let second = replay(&scripted_budgets());

    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert!(first.passes.iter().any(|pass| pass.claimed > 0));
}

fn replay(budgets: &[(f64, u32)]) -> ReplayOutcome {
    let mut world = patterned_world();
    let config = ExpansionConfig::default();
    let mut local = seeded(&mut world, EntityId::new(1), 5 * WIDTH + 6);
    let mut remote = seeded(&mut world, EntityId::new(2), 24 * WIDTH + 40);
    let mut passes = Vec::new();

    for &(banked, granted) in budgets {
        let budget =
            ExpansionBudget::for_resource(&config, banked, &local, world.claimable_cells());
        let outcome = expand(&mut world, &mut local, budget);
        passes.push(PassRecord {
            entity: local.entity(),
            claimed: outcome.claimed,
            spent_bits: outcome.spent.to_bits(),
            stale_dropped: outcome.stale_dropped,
        });

        let outcome = expand(
            &mut world,
            &mut remote,
            ExpansionBudget::for_pixels(&config, granted, 20),
        );
        passes.push(PassRecord {
            entity: remote.entity(),
            claimed: outcome.claimed,
            spent_bits: outcome.spent.to_bits(),
            stale_dropped: outcome.stale_dropped,
        });
    }

    ReplayOutcome {
        ownership: query::ownership_view(&world).to_vec(),
        render: query::render_buffer(&world).iter().map(|c| c.bits()).collect(),
        passes,
    }
}

fn scripted_budgets() -> Vec<(f64, u32)> {
    (0..60)
        .map(|step| (f64::from(step % 7) * 45.0, (step * 13) % 31))
        .collect()
}

fn seeded(world: &mut World, entity: EntityId, index: u32) -> Territory {
    let mut territory = Territory::new(entity);
    assert!(territory.claim(world, CellIndex::new(index)).is_some());
    territory
}

fn patterned_world() -> World {
    let ocean =
        TerrainRaster::filled(WIDTH, HEIGHT, PackedColor::opaque(14, 165, 233)).expect("ocean");
    let mut land = TerrainRaster::filled(WIDTH, HEIGHT, PackedColor::TRANSPARENT).expect("land");
    for row in 0..HEIGHT {
        for column in 0..WIDTH {
            let lake = (column * 7 + row * 11) % 23 == 0 || (column > 20 && column < 24 && row < 20);
            if !lake {
                let shade = u8::try_from((column * 3 + row) % 60).expect("shade fits");
                assert!(land.set_pixel(column, row, PackedColor::opaque(90 + shade, 160, 80)));
            }
        }
    }
    World::from_rasters(&ocean, &land, DEFAULT_LAND_ALPHA_THRESHOLD).expect("valid map")
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct ReplayOutcome {
    ownership: Vec<Ownership>,
    render: Vec<u32>,
    passes: Vec<PassRecord>,
}

impl ReplayOutcome {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct PassRecord {
    entity: EntityId,
    claimed: u32,
    spent_bits: u64,
    stale_dropped: u32,
}
