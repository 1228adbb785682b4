#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-session host for the Conquest engine.
//!
//! A [`Simulation`] owns the grid, the local player's territory and the
//! mirror roster. It is driven exclusively through [`apply`]: local intent
//! arrives as [`Command`] values, remote notifications are queued with
//! [`Command::Deliver`] and take effect at the next [`Command::Tick`], and
//! every observable outcome is reported as an [`Event`]. Within a tick the
//! queued notifications are applied first, then the local player expands,
//! then every mirror expands in ascending id order. Two clients that feed
//! the same commands and notifications in the same order end up with
//! identical grids.

use std::collections::VecDeque;

use conquest_core::{
    CellIndex, Command, EntityId, EntityPalette, Event, Notification, SessionPhase,
};
use conquest_system_expansion::{expand, ExpansionBudget, ExpansionConfig, Territory};
use conquest_system_mirror::{MirrorConfig, MirrorRoster};
use conquest_system_spawning::{PreviewedSpawn, SpawnConfig, SpawnPreview};
use conquest_world::{query, World};
use serde::Deserialize;

/// Default share of troops dispatched by an attack, in percent.
pub const DEFAULT_ATTACK_RATIO: u8 = 20;

/// Tuning for every system hosted by a simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Expansion speed and cost.
    pub expansion: ExpansionConfig,
    /// Spawn search and seeding.
    pub spawn: SpawnConfig,
    /// Remote mirror throttling.
    pub mirror: MirrorConfig,
}

#[derive(Debug)]
struct LocalPlayer {
    entity: EntityId,
    territory: Option<Territory>,
    spawn: Option<PreviewedSpawn>,
    banked: f64,
}

/// Authoritative state of a single local session.
#[derive(Debug)]
pub struct Simulation {
    world: World,
    config: SimulationConfig,
    local: LocalPlayer,
    preview: SpawnPreview,
    mirrors: MirrorRoster,
    inbox: VecDeque<Notification>,
    phase: SessionPhase,
    tick: u64,
}

impl Simulation {
    /// Starts a session on `world` for the local entity `local`.
    #[must_use]
    pub fn new(mut world: World, local: EntityId, config: SimulationConfig) -> Self {
        world.register_palette(local, EntityPalette::LOCAL);
        let preview = SpawnPreview::capture(&world);
        Self {
            world,
            config,
            local: LocalPlayer {
                entity: local,
                territory: None,
                spawn: None,
                banked: 0.0,
            },
            preview,
            mirrors: MirrorRoster::new(local, config.mirror),
            inbox: VecDeque::new(),
            phase: SessionPhase::SpawnSelection,
            tick: 0,
        }
    }

    /// Grid shared by every entity.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Configuration the session was started with.
    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Current session phase.
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Number of ticks processed.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Local entity identifier.
    #[must_use]
    pub const fn local_entity(&self) -> EntityId {
        self.local.entity
    }

    /// Resource currently banked for local expansion.
    #[must_use]
    pub const fn banked(&self) -> f64 {
        self.local.banked
    }

    /// Local territory, once a spawn was previewed.
    #[must_use]
    pub const fn local_territory(&self) -> Option<&Territory> {
        self.local.territory.as_ref()
    }

    /// Spawn currently previewed or committed by the local player.
    #[must_use]
    pub const fn local_spawn(&self) -> Option<PreviewedSpawn> {
        self.local.spawn
    }

    /// Remote entities mirrored locally.
    #[must_use]
    pub const fn mirrors(&self) -> &MirrorRoster {
        &self.mirrors
    }

    /// Notifications waiting for the next tick boundary.
    #[must_use]
    pub fn queued_notifications(&self) -> usize {
        self.inbox.len()
    }

    fn preview_spawn(&mut self, cell: CellIndex, out: &mut Vec<Event>) {
        if self.phase != SessionPhase::SpawnSelection
            || !query::is_unclaimed_land(&self.world, cell)
        {
            out.push(Event::PreviewRejected { cell });
            return;
        }

        let entity = self.local.entity;
        match self
            .preview
            .preview(&mut self.world, entity, cell, &self.config.spawn)
        {
            Ok((previewed, territory)) => {
                let claimed = territory.claimed();
                self.local.territory = Some(territory);
                self.local.spawn = Some(previewed);
                out.push(Event::SpawnPreviewed {
                    entity,
                    requested: cell,
                    cell: previewed.site.cell,
                    resolution: previewed.site.resolution,
                });
                out.push(Event::TerritoryChanged { entity, claimed });
                self.mirrors
                    .reseed(&mut self.world, &self.config.spawn, out);
            }
            Err(error) => {
                tracing::warn!(%error, cell = cell.get(), "spawn preview failed");
                out.push(Event::PreviewRejected { cell });
            }
        }
    }

    fn commit_spawn(&mut self, out: &mut Vec<Event>) {
        if self.phase != SessionPhase::SpawnSelection {
            return;
        }
        let Some(committed) = self.preview.commit() else {
            tracing::debug!("commit requested before any spawn preview");
            return;
        };

        self.phase = SessionPhase::Playing;
        tracing::info!(
            entity = self.local.entity.get(),
            cell = committed.site.cell.get(),
            "spawn committed"
        );
        out.push(Event::SpawnCommitted {
            entity: self.local.entity,
            cell: committed.site.cell,
        });
        out.push(Event::PhaseChanged {
            phase: SessionPhase::Playing,
        });
    }

    fn dispatch_attack(&mut self, troops: u64, ratio_percent: u8, out: &mut Vec<Event>) {
        if self.phase != SessionPhase::Playing || self.local.banked > 0.0 {
            tracing::debug!(
                banked = self.local.banked,
                "attack dispatch ignored while a batch is active"
            );
            return;
        }

        let ratio = u64::from(ratio_percent.clamp(1, 100));
        let amount = troops.saturating_mul(ratio) / 100;
        if amount == 0 {
            return;
        }

        self.local.banked = amount as f64;
        out.push(Event::AttackDispatched {
            entity: self.local.entity,
            amount,
        });
    }

    fn advance(&mut self, banked_resource: Option<f64>, out: &mut Vec<Event>) {
        self.tick += 1;

        while let Some(notification) = self.inbox.pop_front() {
            self.mirrors
                .apply(&mut self.world, &notification, &self.config.spawn, out);
        }

        if let Some(banked) = banked_resource {
            self.local.banked = banked.max(0.0);
        }

        if self.phase == SessionPhase::Playing {
            self.expand_local(out);
            self.mirrors
                .advance(&mut self.world, &self.config.expansion, out);
        }

        out.push(Event::TickAdvanced { tick: self.tick });
    }

    fn expand_local(&mut self, out: &mut Vec<Event>) {
        let entity = self.local.entity;
        let Some(territory) = self.local.territory.as_mut() else {
            return;
        };
        if self.local.banked <= 0.0 {
            return;
        }

        let expansion: &ExpansionConfig = &self.config.expansion;
        let claimable = self.world.claimable_cells();
        let cost = expansion.pixel_cost(territory.claimed(), claimable);
        if self.local.banked < cost || territory.frontier().is_empty() {
            self.local.banked = 0.0;
            out.push(Event::ResourceExhausted { entity });
            return;
        }

        let budget = ExpansionBudget::for_resource(expansion, self.local.banked, territory, claimable);
        let outcome = expand(&mut self.world, territory, budget);
        self.local.banked = outcome.remaining;

        if outcome.spent > 0.0 {
            out.push(Event::ExpansionReported {
                entity,
                pixels_claimed: outcome.claimed,
                cost_spent: outcome.spent,
            });
        }
        if outcome.claimed > 0 {
            out.push(Event::TerritoryChanged {
                entity,
                claimed: territory.claimed(),
            });
        }

        let next_cost = expansion.pixel_cost(territory.claimed(), claimable);
        if self.local.banked < next_cost {
            self.local.banked = 0.0;
            out.push(Event::ResourceExhausted { entity });
        }
    }
}

/// Applies the provided command to the session, mutating state deterministically.
pub fn apply(simulation: &mut Simulation, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::PreviewSpawn { cell } => simulation.preview_spawn(cell, out_events),
        Command::CommitSpawn => simulation.commit_spawn(out_events),
        Command::DispatchAttack {
            troops,
            ratio_percent,
        } => simulation.dispatch_attack(troops, ratio_percent, out_events),
        Command::Deliver { notification } => simulation.inbox.push_back(notification),
        Command::Tick { banked_resource } => simulation.advance(banked_resource, out_events),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_match_the_documented_constants() {
        let config = SimulationConfig::default();
        assert_eq!(config.mirror.per_tick_cap, 20);
        assert_eq!(config.expansion.attempt_factor, 5);
        assert!((config.spawn.seed_radius - 9.77).abs() < f64::EPSILON);
        assert_eq!(config.spawn.search_radius, 100);
    }
}
