#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Frontier-driven territorial expansion.
//!
//! Each entity owns a [`Territory`]: its claimed-cell count and a FIFO
//! [`Frontier`] of owned cells that border unclaimed land. Every tick the
//! engine walks the frontier from the head, claiming unclaimed neighbors in
//! the grid's fixed neighbor order until the per-tick claim budget, the
//! resource, or the safety attempt cap runs out. A head that still borders
//! unclaimed land goes back to the tail, so successive passes sweep the whole
//! frontier instead of draining one region. Entries the grid no longer
//! flags as frontier for the entity are dropped lazily when they reach the
//! head.

mod frontier;

use conquest_core::{CellIndex, EntityId};
use conquest_world::{ClaimEffect, World};
use serde::Deserialize;

pub use frontier::Frontier;

/// Control fraction up to which claims cost the base price.
pub const COST_RAMP_START: f64 = 0.05;
/// Control fraction at which the cost multiplier saturates.
pub const COST_RAMP_END: f64 = 0.30;
/// Cost multiplier applied once the ramp saturates.
pub const MAX_COST_MULTIPLIER: f64 = 1.4;

/// Tuning knobs for resource-driven expansion.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExpansionConfig {
    /// Resource spent per claimed cell before the control multiplier.
    pub base_pixel_cost: f64,
    /// Expansion speed with an empty resource pool.
    pub base_speed: f64,
    /// Expansion speed once the speed multiplier saturates.
    pub max_speed: f64,
    /// Banked resource worth one step of speed multiplier.
    pub resource_per_speed_step: f64,
    /// Upper bound of the speed multiplier.
    pub max_speed_multiplier: f64,
    /// Speed units per claimed cell and tick.
    pub speed_divisor: f64,
    /// Safety cap on head inspections, as a multiple of the per-tick claim budget.
    pub attempt_factor: u32,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            base_pixel_cost: 2.0,
            base_speed: 50.0,
            max_speed: 800.0,
            resource_per_speed_step: 100.0,
            max_speed_multiplier: 8.0,
            speed_divisor: 8.25,
            attempt_factor: 5,
        }
    }
}

impl ExpansionConfig {
    /// Resource cost of claiming one cell for an entity owning `claimed` of
    /// the `claimable` land cells.
    #[must_use]
    pub fn pixel_cost(&self, claimed: u32, claimable: u32) -> f64 {
        let fraction = if claimable == 0 {
            1.0
        } else {
            f64::from(claimed) / f64::from(claimable)
        };
        self.base_pixel_cost * cost_multiplier(fraction)
    }

    /// Number of cells an entity holding `banked` resource may claim per tick.
    #[must_use]
    pub fn claims_per_tick(&self, banked: f64) -> u32 {
        if self.speed_divisor <= 0.0 || self.max_speed_multiplier <= 0.0 {
            return 0;
        }

        let multiplier = (banked / self.resource_per_speed_step)
            .clamp(0.0, self.max_speed_multiplier);
        let speed = (self.base_speed
            + (self.max_speed - self.base_speed) * (multiplier / self.max_speed_multiplier))
            .floor();
        saturating_u32((speed / self.speed_divisor).floor())
    }
}

/// Multiplier applied to the base pixel cost for the given control fraction.
///
/// Flat at 1.0 up to 5 % control, linear up to 1.4 at 30 %, flat afterwards.
#[must_use]
pub fn cost_multiplier(control_fraction: f64) -> f64 {
    if control_fraction <= COST_RAMP_START {
        1.0
    } else if control_fraction >= COST_RAMP_END {
        MAX_COST_MULTIPLIER
    } else {
        1.0 + (MAX_COST_MULTIPLIER - 1.0) * (control_fraction - COST_RAMP_START)
            / (COST_RAMP_END - COST_RAMP_START)
    }
}

fn saturating_u32(value: f64) -> u32 {
    if value.is_nan() || value <= 0.0 {
        0
    } else if value >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        value as u32
    }
}

/// Lifecycle of a territory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TerritoryPhase {
    /// Seeded and not yet expanded.
    Seeded,
    /// Claimed at least one cell through expansion.
    Expanding,
    /// No frontier remains; the territory can never grow again.
    Exhausted,
}

/// Territory owned by a single entity.
#[derive(Clone, Debug)]
pub struct Territory {
    entity: EntityId,
    frontier: Frontier,
    claimed: u32,
    phase: TerritoryPhase,
}

impl Territory {
    /// Creates an empty territory that has not claimed anything yet.
    #[must_use]
    pub fn new(entity: EntityId) -> Self {
        Self {
            entity,
            frontier: Frontier::default(),
            claimed: 0,
            phase: TerritoryPhase::Seeded,
        }
    }

    /// Creates a territory from the result of seeding.
    #[must_use]
    pub fn seeded<I>(entity: EntityId, claimed: u32, frontier_cells: I) -> Self
    where
        I: IntoIterator<Item = CellIndex>,
    {
        let mut frontier = Frontier::default();
        for cell in frontier_cells {
            let _ = frontier.push(cell);
        }

        Self {
            entity,
            frontier,
            claimed,
            phase: TerritoryPhase::Seeded,
        }
    }

    /// Owner of the territory.
    #[must_use]
    pub const fn entity(&self) -> EntityId {
        self.entity
    }

    /// Number of cells claimed so far. Never decreases.
    #[must_use]
    pub const fn claimed(&self) -> u32 {
        self.claimed
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> TerritoryPhase {
        self.phase
    }

    /// Frontier candidates walked by the engine.
    #[must_use]
    pub const fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    /// Drops frontier candidates the grid no longer flags as this entity's
    /// frontier. Returns the number of candidates removed.
    pub fn prune_stale(&mut self, world: &World) -> usize {
        let entity = self.entity;
        let removed = self
            .frontier
            .retain(|cell| world.ownership(cell).is_owned_by(entity) && world.is_frontier(cell));
        if self.frontier.is_empty() {
            self.phase = TerritoryPhase::Exhausted;
        }
        removed
    }

    /// Claims `cell` and keeps the frontier in step with the grid.
    ///
    /// The claimed cell joins the frontier when it borders unclaimed land, and
    /// owned neighbors the claim turned interior leave it.
    pub fn claim(&mut self, world: &mut World, cell: CellIndex) -> Option<ClaimEffect> {
        let effect = world.claim(cell, self.entity)?;
        self.claimed = self.claimed.saturating_add(1);
        if effect.is_frontier() {
            let _ = self.frontier.push(cell);
        }
        for settled in effect.settled() {
            if world.ownership(settled).is_owned_by(self.entity) {
                let _ = self.frontier.remove(settled);
            }
        }
        Some(effect)
    }
}

/// Limits applied to a single expansion pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExpansionBudget {
    max_claims: u32,
    max_attempts: u32,
    resource: f64,
    pixel_cost: f64,
}

impl ExpansionBudget {
    /// Budget for an entity spending banked resource at the current pixel cost.
    #[must_use]
    pub fn for_resource(
        config: &ExpansionConfig,
        banked: f64,
        territory: &Territory,
        claimable: u32,
    ) -> Self {
        let max_claims = config.claims_per_tick(banked);
        Self {
            max_claims,
            max_attempts: max_claims.saturating_mul(config.attempt_factor),
            resource: banked.max(0.0),
            pixel_cost: config.pixel_cost(territory.claimed(), claimable),
        }
    }

    /// Budget for draining a counter of granted pixels, at most `cap` per pass.
    #[must_use]
    pub fn for_pixels(config: &ExpansionConfig, pending: u32, cap: u32) -> Self {
        let max_claims = pending.min(cap);
        Self {
            max_claims,
            max_attempts: max_claims.saturating_mul(config.attempt_factor),
            resource: f64::from(max_claims),
            pixel_cost: 1.0,
        }
    }

    /// Maximum number of cells claimed by the pass.
    #[must_use]
    pub const fn max_claims(&self) -> u32 {
        self.max_claims
    }

    /// Maximum number of frontier-head inspections.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Resource available to the pass.
    #[must_use]
    pub const fn resource(&self) -> f64 {
        self.resource
    }

    /// Resource spent per claimed cell.
    #[must_use]
    pub const fn pixel_cost(&self) -> f64 {
        self.pixel_cost
    }
}

/// Result of a single expansion pass.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ExpansionOutcome {
    /// Cells claimed.
    pub claimed: u32,
    /// Resource spent.
    pub spent: f64,
    /// Resource left after the pass.
    pub remaining: f64,
    /// Frontier-head inspections performed.
    pub attempts: u32,
    /// Stale queue entries discarded.
    pub stale_dropped: u32,
    /// Whether the queue had to be rebuilt from the frontier set.
    pub refilled: bool,
}

/// Runs one expansion pass for `territory` within `budget`.
pub fn expand(
    world: &mut World,
    territory: &mut Territory,
    budget: ExpansionBudget,
) -> ExpansionOutcome {
    let entity = territory.entity;
    let mut outcome = ExpansionOutcome {
        remaining: budget.resource,
        ..ExpansionOutcome::default()
    };

    while outcome.claimed < budget.max_claims
        && outcome.attempts < budget.max_attempts
        && outcome.remaining >= budget.pixel_cost
    {
        if territory.frontier.queue_is_empty() {
            let restored = territory.frontier.refill();
            if restored == 0 {
                break;
            }
            outcome.refilled = true;
            tracing::debug!(
                entity = entity.get(),
                restored,
                "rebuilt frontier queue from frontier set"
            );
        }

        let Some(head) = territory.frontier.front() else {
            break;
        };
        outcome.attempts += 1;

        if !world.ownership(head).is_owned_by(entity) || !world.is_frontier(head) {
            territory.frontier.drop_front();
            outcome.stale_dropped += 1;
            continue;
        }

        let neighbors: Vec<CellIndex> = world.neighbors(head).collect();
        for neighbor in neighbors {
            if outcome.claimed >= budget.max_claims || outcome.remaining < budget.pixel_cost {
                break;
            }
            if !world.ownership(neighbor).is_unclaimed() {
                continue;
            }
            if territory.claim(world, neighbor).is_some() {
                outcome.claimed += 1;
                outcome.spent += budget.pixel_cost;
                outcome.remaining -= budget.pixel_cost;
            }
        }

        if world.is_frontier(head) {
            territory.frontier.rotate_front();
        } else {
            territory.frontier.drop_front();
        }
    }

    if outcome.claimed > 0 {
        territory.phase = TerritoryPhase::Expanding;
    }
    if territory.frontier.is_empty() {
        territory.phase = TerritoryPhase::Exhausted;
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saturating_conversion_handles_extremes() {
        assert_eq!(saturating_u32(f64::NAN), 0);
        assert_eq!(saturating_u32(-3.0), 0);
        assert_eq!(saturating_u32(7.9), 7);
        assert_eq!(saturating_u32(1e20), u32::MAX);
    }

    #[test]
    fn pixel_budget_is_capped() {
        let config = ExpansionConfig::default();
        let budget = ExpansionBudget::for_pixels(&config, 45, 20);
        assert_eq!(budget.max_claims(), 20);
        assert_eq!(budget.max_attempts(), 100);
        assert!((budget.resource() - 20.0).abs() < f64::EPSILON);
        assert!((budget.pixel_cost() - 1.0).abs() < f64::EPSILON);
    }
}
