#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for Conquest adapters.
//!
//! The grid's render buffer is the only persistent picture. A [`Compositor`]
//! flushes it to a [`Surface`] whenever the grid changed since the last
//! flush, then draws the frame's [`Overlay`]s on top every frame.

pub mod overlay;
mod viewport;

pub use overlay::{build_overlays, Overlay, OverlayContext, PointerState, RemoteSpawn};
pub use viewport::Viewport;

use anyhow::Result as AnyResult;
use conquest_core::PackedColor;
use conquest_world::{query, World};
use glam::Vec2;
use std::{error::Error, fmt, time::Duration};

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Converts a packed buffer color.
    #[must_use]
    pub fn from_packed(color: PackedColor) -> Self {
        let [red, green, blue, alpha] = color.to_rgba();
        Self {
            alpha: f32::from(alpha) / 255.0,
            ..Self::from_rgb_u8(red, green, blue)
        }
    }

    /// Returns the same color with a different alpha.
    #[must_use]
    pub const fn with_alpha(self, alpha: f32) -> Self {
        Self { alpha, ..self }
    }
}

/// Input snapshot gathered by adapters before updating the frame.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct FrameInput {
    /// Cursor position in screen space.
    pub cursor: Option<Vec2>,
    /// Whether the primary button was pressed on this frame.
    pub primary_click: bool,
    /// Whether the adapter detected a confirmation on this frame.
    pub confirm_action: bool,
    /// Whether the adapter detected a placement toggle on this frame.
    pub mode_toggle: bool,
}

/// Presentation descriptor consumed by rendering backends.
#[derive(Clone, Debug, PartialEq)]
pub struct Presentation {
    /// Title used by the created window.
    pub window_title: String,
    /// Solid color used to clear each frame.
    pub clear_color: Color,
    /// Grid width in cells.
    pub columns: u32,
    /// Grid height in cells.
    pub rows: u32,
}

impl Presentation {
    /// Constructs a new presentation descriptor.
    pub fn new<T>(
        window_title: T,
        clear_color: Color,
        columns: u32,
        rows: u32,
    ) -> Result<Self, RenderingError>
    where
        T: Into<String>,
    {
        if columns == 0 || rows == 0 {
            return Err(RenderingError::EmptyGrid { columns, rows });
        }

        Ok(Self {
            window_title: window_title.into(),
            clear_color,
            columns,
            rows,
        })
    }
}

/// Output surface a frame is composed onto.
pub trait Surface {
    /// Replaces the persistent picture with `pixels`, stored row-major.
    fn upload(&mut self, columns: u32, rows: u32, pixels: &[PackedColor]);

    /// Draws a transient overlay for the current frame only.
    fn draw_overlay(&mut self, overlay: &Overlay);
}

/// Decides once per frame whether the render buffer must be flushed.
///
/// The grid bumps its revision on every mutation, so the compositor only has
/// to remember the revision it flushed last.
#[derive(Clone, Copy, Debug, Default)]
pub struct Compositor {
    flushed_revision: Option<u64>,
    flushes: u64,
}

impl Compositor {
    /// Creates a compositor that flushes on its first frame.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            flushed_revision: None,
            flushes: 0,
        }
    }

    /// Whether `world` changed since the last flush.
    #[must_use]
    pub fn is_dirty(&self, world: &World) -> bool {
        self.flushed_revision != Some(world.revision())
    }

    /// Forces a flush on the next frame, for example after the surface was recreated.
    pub fn invalidate(&mut self) {
        self.flushed_revision = None;
    }

    /// Number of flushes performed so far.
    #[must_use]
    pub const fn flushes(&self) -> u64 {
        self.flushes
    }

    /// Composes one frame. Returns whether the render buffer was flushed.
    pub fn present<S>(&mut self, world: &World, overlays: &[Overlay], surface: &mut S) -> bool
    where
        S: Surface + ?Sized,
    {
        let flushed = self.is_dirty(world);
        if flushed {
            surface.upload(world.width(), world.height(), query::render_buffer(world));
            self.flushed_revision = Some(world.revision());
            self.flushes += 1;
        }

        for overlay in overlays {
            surface.draw_overlay(overlay);
        }

        flushed
    }
}

/// Rendering backend capable of presenting Conquest sessions.
pub trait RenderingBackend {
    /// Runs the rendering backend until it is requested to exit.
    ///
    /// The `update_frame` closure receives the frame delta, the input captured
    /// by the adapter, the grid's current placement on screen and the surface
    /// to compose onto.
    fn run<F>(self, presentation: Presentation, update_frame: F) -> AnyResult<()>
    where
        F: FnMut(Duration, FrameInput, &Viewport, &mut dyn Surface) + 'static;
}

/// Errors that can occur when constructing rendering descriptors.
#[derive(Debug, PartialEq, Eq)]
pub enum RenderingError {
    /// The grid has no cells to present.
    EmptyGrid {
        /// Requested number of columns.
        columns: u32,
        /// Requested number of rows.
        rows: u32,
    },
}

impl fmt::Display for RenderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyGrid { columns, rows } => {
                write!(f, "cannot present an empty {columns}x{rows} grid")
            }
        }
    }
}

impl Error for RenderingError {}
