use conquest_core::{CellCoord, CellIndex, EntityId, PackedColor, RgbColor, SessionPhase};
use conquest_rendering::{
    build_overlays, Compositor, Overlay, OverlayContext, PointerState, RemoteSpawn, Surface,
};
use conquest_world::{TerrainRaster, World, DEFAULT_LAND_ALPHA_THRESHOLD};

const LOCAL: EntityId = EntityId::new(1);
const WIDTH: u32 = 12;
const HEIGHT: u32 = 8;

#[derive(Default)]
struct RecordingSurface {
    uploads: Vec<Vec<PackedColor>>,
    overlays: Vec<Overlay>,
}

impl Surface for RecordingSurface {
    fn upload(&mut self, columns: u32, rows: u32, pixels: &[PackedColor]) {
        assert_eq!(pixels.len(), (columns * rows) as usize);
        self.uploads.push(pixels.to_vec());
    }

    fn draw_overlay(&mut self, overlay: &Overlay) {
        self.overlays.push(overlay.clone());
    }
}

#[test]
fn first_frame_flushes_and_idle_frames_do_not() {
    let world = land_world();
    let mut compositor = Compositor::new();
    let mut surface = RecordingSurface::default();

    assert!(compositor.present(&world, &[], &mut surface));
    assert!(!compositor.present(&world, &[], &mut surface));
    assert!(!compositor.present(&world, &[], &mut surface));

    assert_eq!(surface.uploads.len(), 1);
    assert_eq!(compositor.flushes(), 1);
}

#[test]
fn claims_mark_the_next_frame_dirty() {
    let mut world = land_world();
    let mut compositor = Compositor::new();
    let mut surface = RecordingSurface::default();
    let _ = compositor.present(&world, &[], &mut surface);

    assert!(world.claim(CellIndex::new(30), LOCAL).is_some());
    assert!(compositor.is_dirty(&world));
    assert!(compositor.present(&world, &[], &mut surface));

    let latest = surface.uploads.last().expect("flushed");
    assert_eq!(latest[30], world.palette(LOCAL).border());
    assert!(!compositor.is_dirty(&world));
}

#[test]
fn invalidate_forces_a_flush() {
    let world = land_world();
    let mut compositor = Compositor::new();
    let mut surface = RecordingSurface::default();
    let _ = compositor.present(&world, &[], &mut surface);

    compositor.invalidate();
    assert!(compositor.present(&world, &[], &mut surface));
    assert_eq!(surface.uploads.len(), 2);
}

#[test]
fn overlays_are_drawn_every_frame_without_touching_the_buffer() {
    let world = land_world();
    let mut compositor = Compositor::new();
    let mut surface = RecordingSurface::default();
    let overlays = vec![Overlay::SelectionRing {
        center: CellCoord::new(3, 3),
        radius: 10.0,
    }];

    for _ in 0..3 {
        let _ = compositor.present(&world, &overlays, &mut surface);
    }

    assert_eq!(surface.overlays.len(), 3);
    assert_eq!(surface.uploads.len(), 1);
    assert!(!compositor.is_dirty(&world));
}

#[test]
fn selection_ring_follows_the_selected_cell_over_the_hovered_one() {
    let world = land_world();
    let pointer = PointerState {
        hovered: Some(CellIndex::new(5)),
        selected: Some(CellIndex::new(2 * WIDTH + 7)),
        placement_armed: false,
    };

    let overlays = build_overlays(&context(&world, SessionPhase::SpawnSelection, &[]), &pointer);

    assert_eq!(
        overlays,
        vec![Overlay::SelectionRing {
            center: CellCoord::new(7, 2),
            radius: 10.0,
        }]
    );
}

#[test]
fn selection_ring_is_hidden_over_claimed_cells_and_after_selection() {
    let mut world = land_world();
    assert!(world.claim(CellIndex::new(5), LOCAL).is_some());
    let pointer = PointerState {
        hovered: Some(CellIndex::new(5)),
        ..PointerState::default()
    };

    assert!(build_overlays(&context(&world, SessionPhase::SpawnSelection, &[]), &pointer).is_empty());

    let free = PointerState {
        hovered: Some(CellIndex::new(40)),
        ..PointerState::default()
    };
    assert!(build_overlays(&context(&world, SessionPhase::Playing, &[]), &free).is_empty());
}

#[test]
fn placement_highlight_is_valid_only_over_local_territory() {
    let mut world = land_world();
    assert!(world.claim(CellIndex::new(WIDTH + 1), LOCAL).is_some());
    assert!(world.claim(CellIndex::new(WIDTH + 4), EntityId::new(2)).is_some());

    let highlight = |cell: u32| {
        let pointer = PointerState {
            hovered: Some(CellIndex::new(cell)),
            selected: None,
            placement_armed: true,
        };
        build_overlays(&context(&world, SessionPhase::Playing, &[]), &pointer)
    };

    assert_eq!(
        highlight(WIDTH + 1),
        vec![Overlay::PlacementHighlight {
            center: CellCoord::new(1, 1),
            valid: true,
        }]
    );
    assert_eq!(
        highlight(WIDTH + 4),
        vec![Overlay::PlacementHighlight {
            center: CellCoord::new(4, 1),
            valid: false,
        }]
    );
}

#[test]
fn remote_spawn_markers_are_shown_during_selection_only() {
    let world = land_world();
    let spawns = [RemoteSpawn {
        entity: EntityId::new(7),
        cell: CellIndex::new(3 * WIDTH + 9),
        color: RgbColor::new(0x3b, 0x82, 0xf6),
    }];

    let selecting = build_overlays(
        &context(&world, SessionPhase::SpawnSelection, &spawns),
        &PointerState::default(),
    );
    assert_eq!(selecting.len(), 1);
    match &selecting[0] {
        Overlay::SpawnMarker {
            center,
            radius,
            label,
            ..
        } => {
            assert_eq!(*center, CellCoord::new(9, 3));
            assert_eq!(*radius, 5.0);
            assert_eq!(label, "#7");
        }
        other => panic!("unexpected overlay {other:?}"),
    }

    let playing = build_overlays(
        &context(&world, SessionPhase::Playing, &spawns),
        &PointerState::default(),
    );
    assert!(playing.is_empty());
}

fn context<'a>(
    world: &'a World,
    phase: SessionPhase,
    remote_spawns: &'a [RemoteSpawn],
) -> OverlayContext<'a> {
    OverlayContext {
        world,
        phase,
        local: LOCAL,
        remote_spawns,
    }
}

fn land_world() -> World {
    let ocean = TerrainRaster::filled(WIDTH, HEIGHT, PackedColor::opaque(14, 165, 233))
        .expect("ocean raster");
    let land = TerrainRaster::filled(WIDTH, HEIGHT, PackedColor::opaque(120, 180, 90))
        .expect("land raster");
    World::from_rasters(&ocean, &land, DEFAULT_LAND_ALPHA_THRESHOLD).expect("valid map")
}
