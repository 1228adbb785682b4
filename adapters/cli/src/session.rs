//! Session driver shared by the headless and windowed modes.
//!
//! Stands in for the collaborators around the engine: the script plays the
//! session peer and a [`Treasury`] plays a minimal economy that grows troops
//! every tick and pays for dispatched attacks.

use conquest_core::{CellIndex, Command, EntityId, Event, SessionPhase};
use conquest_rendering::RemoteSpawn;
use conquest_simulation::{apply, Simulation, SimulationConfig};
use conquest_world::World;

use crate::{config::SessionConfig, script::Script};

/// Troop pool of the local player.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Treasury {
    troops: u64,
    income: u64,
}

impl Treasury {
    pub(crate) const fn new(troops: u64, income: u64) -> Self {
        Self { troops, income }
    }

    pub(crate) const fn troops(&self) -> u64 {
        self.troops
    }

    fn collect(&mut self) {
        self.troops = self.troops.saturating_add(self.income);
    }

    fn spend(&mut self, amount: u64) {
        self.troops = self.troops.saturating_sub(amount);
    }
}

pub(crate) struct Session {
    simulation: Simulation,
    script: Script,
    treasury: Treasury,
    attack_ratio: u8,
}

impl Session {
    pub(crate) fn new(
        world: World,
        settings: &SessionConfig,
        simulation: SimulationConfig,
        script: Script,
    ) -> Self {
        let local = EntityId::new(settings.local_entity);
        Self {
            simulation: Simulation::new(world, local, simulation),
            script,
            treasury: Treasury::new(settings.starting_troops, settings.troop_income),
            attack_ratio: settings.attack_ratio,
        }
    }

    pub(crate) const fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub(crate) const fn treasury(&self) -> Treasury {
        self.treasury
    }

    pub(crate) fn script(&self) -> &Script {
        &self.script
    }

    /// Applies a local command and settles any troops it dispatched.
    pub(crate) fn issue(&mut self, command: Command) -> Vec<Event> {
        let mut events = Vec::new();
        apply(&mut self.simulation, command, &mut events);
        for event in &events {
            if let Event::AttackDispatched { amount, .. } = event {
                self.treasury.spend(*amount);
            }
        }
        events
    }

    pub(crate) fn preview(&mut self, cell: CellIndex) -> Vec<Event> {
        self.issue(Command::PreviewSpawn { cell })
    }

    /// Sends the configured share of the troop pool into expansion.
    pub(crate) fn attack(&mut self) -> Vec<Event> {
        self.issue(Command::DispatchAttack {
            troops: self.treasury.troops(),
            ratio_percent: self.attack_ratio,
        })
    }

    /// Delivers due notifications, collects income and advances one tick.
    pub(crate) fn tick(&mut self) -> Vec<Event> {
        let upcoming = self.simulation.tick() + 1;
        for notification in self.script.due(upcoming) {
            let _ = self.issue(Command::Deliver { notification });
        }
        if self.simulation.phase() == SessionPhase::Playing {
            self.treasury.collect();
        }
        self.issue(Command::Tick {
            banked_resource: None,
        })
    }

    pub(crate) fn remote_spawns(&self) -> Vec<RemoteSpawn> {
        self.simulation
            .mirrors()
            .iter()
            .map(|mirror| RemoteSpawn {
                entity: mirror.entity(),
                cell: mirror.seeded_at(),
                color: mirror.color(),
            })
            .collect()
    }
}

/// Logs the events a command produced.
pub(crate) fn log_events(events: &[Event]) {
    for event in events {
        match event {
            Event::TickAdvanced { .. } => {}
            Event::PhaseChanged { phase } => tracing::info!(?phase, "session phase changed"),
            Event::SpawnPreviewed {
                requested,
                cell,
                resolution,
                ..
            } => tracing::info!(
                requested = requested.get(),
                cell = cell.get(),
                ?resolution,
                "spawn previewed"
            ),
            Event::PreviewRejected { cell } => {
                tracing::info!(cell = cell.get(), "spawn preview rejected")
            }
            Event::SpawnCommitted { cell, .. } => {
                tracing::info!(cell = cell.get(), "spawn committed")
            }
            Event::AttackDispatched { amount, .. } => tracing::info!(amount, "attack dispatched"),
            Event::ExpansionReported {
                entity,
                pixels_claimed,
                cost_spent,
            } => tracing::info!(
                entity = entity.get(),
                pixels_claimed,
                cost_spent,
                "expansion report"
            ),
            Event::TerritoryChanged { entity, claimed } => {
                tracing::debug!(entity = entity.get(), claimed, "territory changed")
            }
            Event::ResourceExhausted { entity } => {
                tracing::info!(entity = entity.get(), "attack finished")
            }
            Event::MirrorSeeded {
                entity,
                cell,
                resolution,
            } => tracing::info!(
                entity = entity.get(),
                cell = cell.get(),
                ?resolution,
                "remote entity seeded"
            ),
            Event::MirrorRemoved { entity } => {
                tracing::info!(entity = entity.get(), "remote entity removed")
            }
            Event::MirrorStalled { entity, dropped } => {
                tracing::debug!(entity = entity.get(), dropped, "remote entity stalled")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conquest_core::PackedColor;
    use conquest_world::{query, TerrainRaster, DEFAULT_LAND_ALPHA_THRESHOLD};

    fn open_world(width: u32, height: u32) -> World {
        let ocean = TerrainRaster::filled(width, height, PackedColor::opaque(14, 165, 233))
            .expect("ocean raster");
        let land = TerrainRaster::filled(width, height, PackedColor::opaque(120, 180, 90))
            .expect("land raster");
        World::from_rasters(&ocean, &land, DEFAULT_LAND_ALPHA_THRESHOLD).expect("valid map")
    }

    fn session(script: Script) -> Session {
        Session::new(
            open_world(80, 60),
            &SessionConfig::default(),
            SimulationConfig::default(),
            script,
        )
    }

    #[test]
    fn dispatched_troops_leave_the_treasury() {
        let mut session = session(Script::default());
        let _ = session.preview(CellIndex::new(30 * 80 + 40));
        let _ = session.issue(Command::CommitSpawn);

        let events = session.attack();

        assert_eq!(
            events,
            vec![Event::AttackDispatched {
                entity: EntityId::new(1),
                amount: 200,
            }]
        );
        assert_eq!(session.treasury().troops(), 800);
    }

    #[test]
    fn scripted_notifications_arrive_before_their_tick() {
        let script = Script::parse(
            r#"[{"tick": 2, "event": "spawn_assigned", "entity": 9, "cell": 2460}]"#,
        )
        .expect("valid script");
        let mut session = session(script);

        let _ = session.tick();
        assert!(session.simulation().mirrors().is_empty());

        let events = session.tick();
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::MirrorSeeded { entity, .. } if entity.get() == 9)));
        assert_eq!(
            session.remote_spawns(),
            vec![RemoteSpawn {
                entity: EntityId::new(9),
                cell: CellIndex::new(2460),
                color: conquest_core::RgbColor::DEFAULT_REMOTE,
            }]
        );
    }

    #[test]
    fn income_accrues_only_while_playing() {
        let mut session = session(Script::default());
        let _ = session.tick();
        assert_eq!(session.treasury().troops(), 1_000);

        let _ = session.preview(CellIndex::new(30 * 80 + 40));
        let _ = session.issue(Command::CommitSpawn);
        let _ = session.tick();
        assert_eq!(session.treasury().troops(), 1_010);
        assert_eq!(
            query::owned_count(session.simulation().world(), EntityId::new(1)),
            293
        );
    }
}
