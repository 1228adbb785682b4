//! Transient markers drawn above the render buffer.
//!
//! Overlays are rebuilt from scratch every frame and never touch the grid's
//! render buffer, so moving the pointer cannot leave residue behind.

use conquest_core::{CellCoord, CellIndex, EntityId, RgbColor, SessionPhase};
use conquest_world::{query, World};

use crate::Color;

/// Side length, in cells, of the placement highlight box.
pub const PLACEMENT_HIGHLIGHT_SPAN: u32 = 3;
/// Radius, in cells, of the spawn selection ring.
pub const SELECTION_RING_RADIUS: f32 = 10.0;
/// Radius, in cells, of a remote spawn marker.
pub const SPAWN_MARKER_RADIUS: f32 = 5.0;

/// Fill tint of a valid placement highlight.
pub const PLACEMENT_VALID: Color = Color::from_rgb_u8(34, 197, 94);
/// Fill tint of an invalid placement highlight.
pub const PLACEMENT_INVALID: Color = Color::from_rgb_u8(239, 68, 68);
/// Stroke of the spawn selection ring.
pub const SELECTION_RING: Color = Color::new(239.0 / 255.0, 68.0 / 255.0, 68.0 / 255.0, 0.5);

/// A single transient marker.
#[derive(Clone, Debug, PartialEq)]
pub enum Overlay {
    /// Box centred on the hovered cell while a placement is armed.
    PlacementHighlight {
        /// Hovered cell.
        center: CellCoord,
        /// Whether the hovered cell belongs to the local entity.
        valid: bool,
    },
    /// Ring around the prospective spawn cell.
    SelectionRing {
        /// Cell the ring is centred on.
        center: CellCoord,
        /// Radius in cells.
        radius: f32,
    },
    /// Dot and label marking where a remote entity spawned.
    SpawnMarker {
        /// Spawn cell.
        center: CellCoord,
        /// Radius in cells.
        radius: f32,
        /// Fill color.
        color: Color,
        /// Text drawn next to the dot.
        label: String,
    },
}

/// Pointer state tracked by the adapter between frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PointerState {
    /// Cell under the pointer.
    pub hovered: Option<CellIndex>,
    /// Cell last clicked during spawn selection.
    pub selected: Option<CellIndex>,
    /// Whether a placement is armed and the highlight should follow the pointer.
    pub placement_armed: bool,
}

/// Spawn of a remote entity as shown to the local player.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RemoteSpawn {
    /// Remote entity.
    pub entity: EntityId,
    /// Cell the entity was seeded at.
    pub cell: CellIndex,
    /// Entity color.
    pub color: RgbColor,
}

/// Session state overlays are derived from.
#[derive(Clone, Copy, Debug)]
pub struct OverlayContext<'a> {
    /// Grid shared by every entity.
    pub world: &'a World,
    /// Current session phase.
    pub phase: SessionPhase,
    /// Local entity.
    pub local: EntityId,
    /// Known remote spawns.
    pub remote_spawns: &'a [RemoteSpawn],
}

/// Builds this frame's overlays in drawing order.
#[must_use]
pub fn build_overlays(context: &OverlayContext<'_>, pointer: &PointerState) -> Vec<Overlay> {
    let world = context.world;
    let mut overlays = Vec::new();
    let selecting = context.phase == SessionPhase::SpawnSelection;

    if pointer.placement_armed {
        if let Some(hovered) = pointer.hovered {
            if let Some(center) = world.coord(hovered) {
                overlays.push(Overlay::PlacementHighlight {
                    center,
                    valid: world.ownership(hovered).is_owned_by(context.local),
                });
            }
        }
    }

    if selecting {
        let target = pointer.selected.or(pointer.hovered);
        if let Some(cell) = target.filter(|cell| query::is_unclaimed_land(world, *cell)) {
            if let Some(center) = world.coord(cell) {
                overlays.push(Overlay::SelectionRing {
                    center,
                    radius: SELECTION_RING_RADIUS,
                });
            }
        }

        for spawn in context.remote_spawns {
            let Some(center) = world.coord(spawn.cell) else {
                continue;
            };
            overlays.push(Overlay::SpawnMarker {
                center,
                radius: SPAWN_MARKER_RADIUS,
                color: Color::from_rgb_u8(spawn.color.red, spawn.color.green, spawn.color.blue),
                label: format!("#{}", spawn.entity.get()),
            });
        }
    }

    overlays
}
