use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use conquest_core::{
    CellIndex, Command, EntityId, Notification, Ownership, PackedColor, RgbColor,
};
use conquest_simulation::{apply, Simulation, SimulationConfig};
use conquest_world::{query, TerrainRaster, World, DEFAULT_LAND_ALPHA_THRESHOLD};

const WIDTH: u32 = 96;
const HEIGHT: u32 = 64;
const LOCAL: EntityId = EntityId::new(1);

#[test]
fn deterministic_replay_produces_identical_sessions() {
    let script = scripted_commands(false);
    let first = replay(&script);
    let second = replay(&script);

    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert!(first.ticks > 0);
}

#[test]
fn delivery_timing_within_a_tick_does_not_matter() {
    let early = replay(&scripted_commands(false));
    let late = replay(&scripted_commands(true));

    assert_eq!(early.ownership, late.ownership);
    assert_eq!(early.render, late.render);
}

#[test]
fn scripted_session_grows_every_participant() {
    let outcome = replay(&scripted_commands(false));
    for entity in [LOCAL, EntityId::new(4), EntityId::new(9)] {
        let owned = outcome
            .ownership
            .iter()
            .filter(|ownership| ownership.is_owned_by(entity))
            .count();
        assert!(owned > 0, "entity {entity:?} owns nothing");
    }
}

fn replay(script: &[Command]) -> ReplayOutcome {
    let mut simulation = Simulation::new(patterned_world(), LOCAL, SimulationConfig::default());
    let mut events = Vec::new();
    for command in script.iter().cloned() {
        apply(&mut simulation, command, &mut events);
    }

    let world = simulation.world();
    ReplayOutcome {
        ownership: query::ownership_view(world).to_vec(),
        render: query::render_buffer(world).iter().map(|c| c.bits()).collect(),
        events: events.iter().map(|event| format!("{event:?}")).collect(),
        ticks: simulation.tick(),
    }
}

/// Builds a session script. With `deliver_late`, every notification is queued
/// after the local commands issued between the same two ticks instead of
/// before them.
fn scripted_commands(deliver_late: bool) -> Vec<Command> {
    let mut script = vec![
        Command::PreviewSpawn {
            cell: CellIndex::new(12 * WIDTH + 14),
        },
        Command::Deliver {
            notification: Notification::SpawnAssigned {
                entity: EntityId::new(9),
                cell: CellIndex::new(48 * WIDTH + 80),
                color: Some(RgbColor::new(0x3b, 0x82, 0xf6)),
            },
        },
        Command::Deliver {
            notification: Notification::SpawnAssigned {
                entity: EntityId::new(4),
                cell: CellIndex::new(40 * WIDTH + 22),
                color: None,
            },
        },
        Command::Tick {
            banked_resource: None,
        },
        Command::PreviewSpawn {
            cell: CellIndex::new(14 * WIDTH + 50),
        },
        Command::CommitSpawn,
    ];

    for step in 0..80_u32 {
        let mut local = Vec::new();
        if step % 9 == 0 {
            local.push(Command::DispatchAttack {
                troops: u64::from(400 + step * 25),
                ratio_percent: 20 + (step % 4) as u8 * 10,
            });
        }

        let mut remote = Vec::new();
        if step % 3 == 0 {
            remote.push(Command::Deliver {
                notification: Notification::TerritoryGranted {
                    entity: EntityId::new(4 + 5 * (step % 2)),
                    amount: (step * 7) % 37,
                    color: None,
                },
            });
        }
        if step == 61 {
            remote.push(Command::Deliver {
                notification: Notification::EntityRemoved {
                    entity: EntityId::new(9),
                },
            });
        }

        if deliver_late {
            script.extend(local);
            script.extend(remote);
        } else {
            script.extend(remote);
            script.extend(local);
        }
        script.push(Command::Tick {
            banked_resource: None,
        });
    }

    script
}

fn patterned_world() -> World {
    let ocean =
        TerrainRaster::filled(WIDTH, HEIGHT, PackedColor::opaque(14, 165, 233)).expect("ocean");
    let mut land = TerrainRaster::filled(WIDTH, HEIGHT, PackedColor::TRANSPARENT).expect("land");
    for row in 0..HEIGHT {
        for column in 0..WIDTH {
            let lake = (column * 5 + row * 13) % 29 == 0
                || (column > 40 && column < 44 && row > 24 && row < 56);
            if !lake {
                let shade = u8::try_from((column + row * 2) % 50).expect("shade fits");
                assert!(land.set_pixel(column, row, PackedColor::opaque(100 + shade, 170, 85)));
            }
        }
    }
    World::from_rasters(&ocean, &land, DEFAULT_LAND_ALPHA_THRESHOLD).expect("valid map")
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct ReplayOutcome {
    ownership: Vec<Ownership>,
    render: Vec<u32>,
    events: Vec<String>,
    ticks: u64,
}

impl ReplayOutcome {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}
