#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Macroquad-backed rendering adapter for Conquest.
//!
//! Macroquad's optional audio stack depends on native ALSA development
//! libraries that CI containers do not ship, so the crate is pulled in without
//! its default `audio` feature. The game has no sound; nothing here needs it.
//!
//! The render buffer lives in a single GPU texture sampled with nearest
//! filtering. The texture is only re-uploaded when the compositor flushes;
//! overlays are queued during the frame callback and drawn on top of the
//! texture afterwards.

use anyhow::{Context, Result};
use conquest_core::PackedColor;
use conquest_rendering::{
    overlay::PLACEMENT_HIGHLIGHT_SPAN, Color, FrameInput, Overlay, Presentation, RenderingBackend,
    Surface, Viewport,
};
use glam::Vec2;
use macroquad::{
    input::{is_key_pressed, is_mouse_button_pressed, mouse_position, KeyCode, MouseButton},
    texture::{DrawTextureParams, FilterMode, Image, Texture2D},
};
use std::time::Duration;

const LABEL_FONT_SIZE: f32 = 16.0;
const LABEL_COLOR: Color = Color::from_rgb_u8(255, 255, 255);

/// Snapshot of edge-triggered keyboard shortcuts observed during a single frame.
#[derive(Clone, Copy, Debug, Default)]
struct KeyboardShortcuts {
    /// `Q` or `Escape` to quit the game loop.
    quit_requested: bool,
    /// `Enter` commits the previewed spawn.
    confirm: bool,
    /// `Space` arms or disarms the placement highlight.
    mode_toggle: bool,
}

impl KeyboardShortcuts {
    fn poll() -> Self {
        Self {
            quit_requested: is_key_pressed(KeyCode::Escape) || is_key_pressed(KeyCode::Q),
            confirm: is_key_pressed(KeyCode::Enter),
            mode_toggle: is_key_pressed(KeyCode::Space),
        }
    }
}

/// Rendering backend implemented on top of macroquad.
#[derive(Debug, Default)]
pub struct MacroquadBackend {
    swap_interval: Option<i32>,
    show_fps: bool,
}

impl MacroquadBackend {
    /// Returns a backend that requests the platform's default swap interval.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the backend to either synchronise presentation with the display refresh rate
    /// or render as fast as possible.
    #[must_use]
    pub fn with_vsync(mut self, enabled: bool) -> Self {
        self.swap_interval = if enabled { Some(1) } else { Some(0) };
        self
    }

    /// Configures whether the backend logs frame rate once per second.
    #[must_use]
    pub fn with_show_fps(mut self, show: bool) -> Self {
        self.show_fps = show;
        self
    }
}

#[derive(Debug, Default)]
struct FpsCounter {
    elapsed: Duration,
    frames: u32,
}

impl FpsCounter {
    fn record(&mut self, frame: Duration) -> Option<u32> {
        self.elapsed += frame;
        self.frames += 1;
        if self.elapsed < Duration::from_secs(1) {
            return None;
        }

        let frames = self.frames;
        self.elapsed = Duration::ZERO;
        self.frames = 0;
        Some(frames)
    }
}

/// GPU texture mirroring the grid's render buffer.
struct TextureSurface {
    texture: Texture2D,
    image: Image,
    overlays: Vec<Overlay>,
}

impl TextureSurface {
    fn new(columns: u16, rows: u16) -> Self {
        let image = Image {
            bytes: vec![0; usize::from(columns) * usize::from(rows) * 4],
            width: columns,
            height: rows,
        };
        let texture = Texture2D::from_image(&image);
        texture.set_filter(FilterMode::Nearest);
        Self {
            texture,
            image,
            overlays: Vec::new(),
        }
    }
}

impl Surface for TextureSurface {
    fn upload(&mut self, columns: u32, rows: u32, pixels: &[PackedColor]) {
        if columns != u32::from(self.image.width) || rows != u32::from(self.image.height) {
            tracing::warn!(
                columns,
                rows,
                texture_width = self.image.width,
                texture_height = self.image.height,
                "render buffer does not match the texture, skipping upload"
            );
            return;
        }
        fill_rgba(&mut self.image.bytes, pixels);
        self.texture.update(&self.image);
    }

    fn draw_overlay(&mut self, overlay: &Overlay) {
        self.overlays.push(overlay.clone());
    }
}

impl RenderingBackend for MacroquadBackend {
    fn run<F>(self, presentation: Presentation, mut update_frame: F) -> Result<()>
    where
        F: FnMut(Duration, FrameInput, &Viewport, &mut dyn Surface) + 'static,
    {
        let Self {
            swap_interval,
            show_fps,
        } = self;

        let Presentation {
            window_title,
            clear_color,
            columns,
            rows,
        } = presentation;

        let texture_width = u16::try_from(columns)
            .with_context(|| format!("grid width {columns} exceeds the texture limit"))?;
        let texture_height = u16::try_from(rows)
            .with_context(|| format!("grid height {rows} exceeds the texture limit"))?;

        let mut config = macroquad::window::Conf {
            window_title,
            window_width: 1280,
            window_height: 720,
            ..macroquad::window::Conf::default()
        };
        if let Some(swap_interval) = swap_interval {
            config.platform.swap_interval = Some(swap_interval);
        }

        macroquad::Window::from_config(config, async move {
            let background = to_macroquad_color(clear_color);
            let mut surface = TextureSurface::new(texture_width, texture_height);
            let mut fps_counter = FpsCounter::default();

            loop {
                let keyboard = KeyboardShortcuts::poll();
                if keyboard.quit_requested {
                    break;
                }

                macroquad::window::clear_background(background);

                let screen = Vec2::new(
                    macroquad::window::screen_width(),
                    macroquad::window::screen_height(),
                );
                let viewport = Viewport::fit(screen, columns, rows);
                let dt_seconds = macroquad::time::get_frame_time();
                let frame_dt = Duration::from_secs_f32(dt_seconds.max(0.0));
                let frame_input = gather_frame_input(keyboard);

                surface.overlays.clear();
                update_frame(frame_dt, frame_input, &viewport, &mut surface);

                let size = viewport.size();
                macroquad::texture::draw_texture_ex(
                    surface.texture,
                    viewport.origin().x,
                    viewport.origin().y,
                    macroquad::color::WHITE,
                    DrawTextureParams {
                        dest_size: Some(macroquad::math::Vec2::new(size.x, size.y)),
                        ..DrawTextureParams::default()
                    },
                );
                for overlay in &surface.overlays {
                    for shape in overlay_shapes(overlay, &viewport) {
                        draw_shape(&shape);
                    }
                }

                if show_fps {
                    if let Some(frames) = fps_counter.record(frame_dt) {
                        tracing::info!(fps = frames, "frame rate");
                    }
                }

                macroquad::window::next_frame().await;
            }
        });

        Ok(())
    }
}

fn gather_frame_input(keyboard: KeyboardShortcuts) -> FrameInput {
    let (cursor_x, cursor_y) = mouse_position();
    FrameInput {
        cursor: Some(Vec2::new(cursor_x, cursor_y)),
        primary_click: is_mouse_button_pressed(MouseButton::Left),
        confirm_action: keyboard.confirm,
        mode_toggle: keyboard.mode_toggle,
    }
}

/// Copies packed colors into a tightly packed RGBA8 byte buffer.
fn fill_rgba(bytes: &mut [u8], pixels: &[PackedColor]) {
    for (chunk, pixel) in bytes.chunks_exact_mut(4).zip(pixels) {
        chunk.copy_from_slice(&pixel.to_rgba());
    }
}

/// Screen-space primitive an overlay is drawn with.
#[derive(Clone, Debug, PartialEq)]
enum Shape {
    Rect {
        origin: Vec2,
        size: Vec2,
        fill: Color,
        stroke: Color,
        thickness: f32,
    },
    Ring {
        center: Vec2,
        radius: f32,
        color: Color,
        thickness: f32,
    },
    Disc {
        center: Vec2,
        radius: f32,
        color: Color,
    },
    Text {
        position: Vec2,
        text: String,
        color: Color,
    },
}

fn overlay_shapes(overlay: &Overlay, viewport: &Viewport) -> Vec<Shape> {
    let cell = viewport.cell_size();
    match overlay {
        Overlay::PlacementHighlight { center, valid } => {
            let tint = if *valid {
                conquest_rendering::overlay::PLACEMENT_VALID
            } else {
                conquest_rendering::overlay::PLACEMENT_INVALID
            };
            let half_span = (PLACEMENT_HIGHLIGHT_SPAN / 2) as f32;
            vec![Shape::Rect {
                origin: viewport.cell_origin(*center) - Vec2::splat(half_span * cell),
                size: Vec2::splat(PLACEMENT_HIGHLIGHT_SPAN as f32 * cell),
                fill: tint.with_alpha(0.3),
                stroke: tint,
                thickness: (cell * 0.5).max(1.0),
            }]
        }
        Overlay::SelectionRing { center, radius } => vec![Shape::Ring {
            center: viewport.cell_center(*center),
            radius: radius * cell,
            color: conquest_rendering::overlay::SELECTION_RING,
            thickness: (cell * 2.0).max(1.0),
        }],
        Overlay::SpawnMarker {
            center,
            radius,
            color,
            label,
        } => {
            let dot = viewport.cell_center(*center);
            vec![
                Shape::Disc {
                    center: dot,
                    radius: radius * cell,
                    color: *color,
                },
                Shape::Text {
                    position: dot + Vec2::new(8.0, 4.0) * cell,
                    text: label.clone(),
                    color: LABEL_COLOR,
                },
            ]
        }
    }
}

fn draw_shape(shape: &Shape) {
    match shape {
        Shape::Rect {
            origin,
            size,
            fill,
            stroke,
            thickness,
        } => {
            macroquad::shapes::draw_rectangle(
                origin.x,
                origin.y,
                size.x,
                size.y,
                to_macroquad_color(*fill),
            );
            macroquad::shapes::draw_rectangle_lines(
                origin.x,
                origin.y,
                size.x,
                size.y,
                *thickness,
                to_macroquad_color(*stroke),
            );
        }
        Shape::Ring {
            center,
            radius,
            color,
            thickness,
        } => macroquad::shapes::draw_circle_lines(
            center.x,
            center.y,
            *radius,
            *thickness,
            to_macroquad_color(*color),
        ),
        Shape::Disc {
            center,
            radius,
            color,
        } => macroquad::shapes::draw_circle(center.x, center.y, *radius, to_macroquad_color(*color)),
        Shape::Text {
            position,
            text,
            color,
        } => macroquad::text::draw_text(
            text,
            position.x,
            position.y,
            LABEL_FONT_SIZE,
            to_macroquad_color(*color),
        ),
    }
}

fn to_macroquad_color(color: Color) -> macroquad::color::Color {
    macroquad::color::Color::new(color.red, color.green, color.blue, color.alpha)
}

#[cfg(test)]
mod tests {
    use super::*;
    use conquest_core::CellCoord;

    #[test]
    fn packed_pixels_are_written_as_rgba_bytes() {
        let mut bytes = vec![0; 8];
        fill_rgba(
            &mut bytes,
            &[PackedColor::pack(1, 2, 3, 4), PackedColor::opaque(250, 0, 9)],
        );
        assert_eq!(bytes, vec![1, 2, 3, 4, 250, 0, 9, 255]);
    }

    #[test]
    fn placement_highlight_covers_three_cells_around_the_hovered_one() {
        let viewport = Viewport::new(Vec2::new(10.0, 20.0), 4.0, 50, 50);
        let shapes = overlay_shapes(
            &Overlay::PlacementHighlight {
                center: CellCoord::new(5, 5),
                valid: true,
            },
            &viewport,
        );

        match &shapes[..] {
            [Shape::Rect {
                origin, size, fill, ..
            }] => {
                assert_eq!(*origin, Vec2::new(26.0, 36.0));
                assert_eq!(*size, Vec2::splat(12.0));
                assert_eq!(fill.alpha, 0.3);
            }
            other => panic!("unexpected shapes {other:?}"),
        }
    }

    #[test]
    fn spawn_marker_draws_a_dot_and_an_offset_label() {
        let viewport = Viewport::new(Vec2::ZERO, 2.0, 50, 50);
        let shapes = overlay_shapes(
            &Overlay::SpawnMarker {
                center: CellCoord::new(10, 4),
                radius: 5.0,
                color: Color::from_rgb_u8(59, 130, 246),
                label: "#7".to_owned(),
            },
            &viewport,
        );

        assert_eq!(shapes.len(), 2);
        assert_eq!(
            shapes[0],
            Shape::Disc {
                center: Vec2::new(21.0, 9.0),
                radius: 10.0,
                color: Color::from_rgb_u8(59, 130, 246),
            }
        );
        assert!(matches!(
            &shapes[1],
            Shape::Text { position, text, .. } if *position == Vec2::new(37.0, 17.0) && text == "#7"
        ));
    }

    #[test]
    fn fps_counter_reports_once_per_second() {
        let mut counter = FpsCounter::default();
        for _ in 0..59 {
            assert_eq!(counter.record(Duration::from_millis(16)), None);
        }
        assert_eq!(counter.record(Duration::from_millis(100)), Some(60));
        assert_eq!(counter.record(Duration::from_millis(16)), None);
    }
}
