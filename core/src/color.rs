//! Packed 32-bit color codec.
//!
//! Every color stored in the grid buffers is a single `u32` laid out as
//! `(alpha << 24) | (blue << 16) | (green << 8) | red`. On little-endian hosts
//! that word is byte-for-byte RGBA, so a buffer of [`PackedColor`] values can be
//! handed to an image surface without swizzling.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Alpha applied to the inner fill of every entity palette.
pub const INNER_ALPHA: u8 = 100;

/// Alpha applied to the border color of every entity palette.
pub const BORDER_ALPHA: u8 = 255;

/// Color packed into a single word with red in the lowest byte.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackedColor(u32);

impl PackedColor {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self(0);

    /// Packs the provided channels into a single word.
    #[must_use]
    pub const fn pack(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self(((alpha as u32) << 24) | ((blue as u32) << 16) | ((green as u32) << 8) | red as u32)
    }

    /// Packs an opaque color.
    #[must_use]
    pub const fn opaque(red: u8, green: u8, blue: u8) -> Self {
        Self::pack(red, green, blue, u8::MAX)
    }

    /// Reinterprets a raw packed word.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw packed representation.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Red channel.
    #[must_use]
    pub const fn red(self) -> u8 {
        (self.0 & 0xff) as u8
    }

    /// Green channel.
    #[must_use]
    pub const fn green(self) -> u8 {
        ((self.0 >> 8) & 0xff) as u8
    }

    /// Blue channel.
    #[must_use]
    pub const fn blue(self) -> u8 {
        ((self.0 >> 16) & 0xff) as u8
    }

    /// Alpha channel.
    #[must_use]
    pub const fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Returns the same color with its alpha channel replaced.
    #[must_use]
    pub const fn with_alpha(self, alpha: u8) -> Self {
        Self::pack(self.red(), self.green(), self.blue(), alpha)
    }

    /// Unpacks the color into `[red, green, blue, alpha]`.
    #[must_use]
    pub const fn to_rgba(self) -> [u8; 4] {
        [self.red(), self.green(), self.blue(), self.alpha()]
    }

    /// Packs a `[red, green, blue, alpha]` quadruple.
    #[must_use]
    pub const fn from_rgba(rgba: [u8; 4]) -> Self {
        Self::pack(rgba[0], rgba[1], rgba[2], rgba[3])
    }
}

impl fmt::Debug for PackedColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [red, green, blue, alpha] = self.to_rgba();
        write!(f, "PackedColor(rgba({red}, {green}, {blue}, {alpha}))")
    }
}

/// Composites `foreground` over `background` using the foreground alpha.
///
/// Each channel is `floor(fg * a + bg * (1 - a))` with `a = alpha / 255`,
/// computed in integers so every client produces the same bytes. The result is
/// always opaque. A fully opaque foreground is returned unchanged.
#[must_use]
pub fn blend(background: PackedColor, foreground: PackedColor) -> PackedColor {
    let alpha = u32::from(foreground.alpha());
    if alpha == u32::from(u8::MAX) {
        return foreground;
    }

    PackedColor::pack(
        mix_channel(foreground.red(), background.red(), alpha),
        mix_channel(foreground.green(), background.green(), alpha),
        mix_channel(foreground.blue(), background.blue(), alpha),
        u8::MAX,
    )
}

fn mix_channel(foreground: u8, background: u8, alpha: u32) -> u8 {
    let mixed = (u32::from(foreground) * alpha + u32::from(background) * (255 - alpha)) / 255;
    u8::try_from(mixed).unwrap_or(u8::MAX)
}

/// Opaque RGB triple, typically parsed from a `#rrggbb` color hint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RgbColor {
    /// Red channel.
    pub red: u8,
    /// Green channel.
    pub green: u8,
    /// Blue channel.
    pub blue: u8,
}

impl RgbColor {
    /// Color used for remote entities that never announced a color hint.
    pub const DEFAULT_REMOTE: Self = Self::new(248, 113, 113);

    /// Creates a new RGB triple.
    #[must_use]
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Parses a `#rrggbb` hex string. The leading `#` is optional.
    pub fn from_hex(hex: &str) -> Result<Self, ColorParseError> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 {
            return Err(ColorParseError::Length {
                length: digits.len(),
            });
        }
        if !digits.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            return Err(ColorParseError::Digit {
                input: hex.to_owned(),
            });
        }

        let channel = |range: std::ops::Range<usize>| {
            digits
                .get(range)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| ColorParseError::Digit {
                    input: hex.to_owned(),
                })
        };

        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    /// Packs the triple with the provided alpha.
    #[must_use]
    pub const fn with_alpha(self, alpha: u8) -> PackedColor {
        PackedColor::pack(self.red, self.green, self.blue, alpha)
    }
}

/// Failure raised when a color hint cannot be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColorParseError {
    /// The hint did not contain exactly six hex digits.
    #[error("expected six hex digits, found {length}")]
    Length {
        /// Number of digits that were supplied.
        length: usize,
    },
    /// The hint contained a character that is not a hex digit.
    #[error("`{input}` is not a valid hex color")]
    Digit {
        /// Offending input.
        input: String,
    },
}

/// Pair of colors used to paint the territory owned by a single entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityPalette {
    inner: PackedColor,
    border: PackedColor,
}

impl EntityPalette {
    /// Palette used for the local player.
    pub const LOCAL: Self = Self::new(
        PackedColor::pack(134, 239, 172, INNER_ALPHA),
        PackedColor::pack(16, 185, 129, BORDER_ALPHA),
    );

    /// Palette used for remote entities without a color hint.
    pub const DEFAULT_REMOTE: Self = Self::from_rgb(RgbColor::DEFAULT_REMOTE);

    /// Creates a palette from explicit inner and border colors.
    #[must_use]
    pub const fn new(inner: PackedColor, border: PackedColor) -> Self {
        Self { inner, border }
    }

    /// Derives a palette from a single hue.
    #[must_use]
    pub const fn from_rgb(color: RgbColor) -> Self {
        Self::new(color.with_alpha(INNER_ALPHA), color.with_alpha(BORDER_ALPHA))
    }

    /// Translucent fill blended over interior cells.
    #[must_use]
    pub const fn inner(&self) -> PackedColor {
        self.inner
    }

    /// Opaque color painted on frontier cells.
    #[must_use]
    pub const fn border(&self) -> PackedColor {
        self.border
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_red_into_the_lowest_byte() {
        let color = PackedColor::pack(0x11, 0x22, 0x33, 0x44);
        assert_eq!(color.bits(), 0x4433_2211);
        assert_eq!(color.to_rgba(), [0x11, 0x22, 0x33, 0x44]);
    }

    #[test]
    fn opaque_foreground_replaces_background() {
        let foreground = PackedColor::opaque(16, 185, 129);
        assert_eq!(blend(PackedColor::opaque(1, 2, 3), foreground), foreground);
    }

    #[test]
    fn half_transparent_white_over_black_is_mid_grey() {
        let blended = blend(
            PackedColor::opaque(0, 0, 0),
            PackedColor::pack(255, 255, 255, 128),
        );
        assert_eq!(blended, PackedColor::pack(128, 128, 128, 255));
    }

    #[test]
    fn transparent_foreground_keeps_background_and_forces_opacity() {
        let background = PackedColor::pack(10, 20, 30, 40);
        let blended = blend(background, PackedColor::TRANSPARENT);
        assert_eq!(blended, PackedColor::pack(10, 20, 30, 255));
    }

    #[test]
    fn blend_floors_each_channel() {
        let blended = blend(
            PackedColor::opaque(0, 0, 0),
            PackedColor::pack(134, 239, 172, INNER_ALPHA),
        );
        // 134 * 100 / 255 = 52.54..., 239 * 100 / 255 = 93.72..., 172 * 100 / 255 = 67.45...
        assert_eq!(blended, PackedColor::pack(52, 93, 67, 255));
    }

    #[test]
    fn parses_hex_hints_with_and_without_hash() {
        assert_eq!(
            RgbColor::from_hex("#ef4444"),
            Ok(RgbColor::new(0xef, 0x44, 0x44))
        );
        assert_eq!(
            RgbColor::from_hex("3b82f6"),
            Ok(RgbColor::new(0x3b, 0x82, 0xf6))
        );
    }

    #[test]
    fn rejects_malformed_hex_hints() {
        assert_eq!(
            RgbColor::from_hex("#fff"),
            Err(ColorParseError::Length { length: 3 })
        );
        assert!(matches!(
            RgbColor::from_hex("#zz0000"),
            Err(ColorParseError::Digit { .. })
        ));
    }

    #[test]
    fn palettes_use_fixed_inner_and_border_alpha() {
        let palette = EntityPalette::from_rgb(RgbColor::new(1, 2, 3));
        assert_eq!(palette.inner(), PackedColor::pack(1, 2, 3, INNER_ALPHA));
        assert_eq!(palette.border(), PackedColor::pack(1, 2, 3, BORDER_ALPHA));
        assert_eq!(
            EntityPalette::DEFAULT_REMOTE.border(),
            PackedColor::opaque(248, 113, 113)
        );
    }
}
