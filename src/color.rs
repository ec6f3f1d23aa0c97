use std::fmt;

use log::warn;
use palette::Srgb;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// Cardinality from which the maximal family is cycled.
pub const PALETTE_THRESHOLD: usize = 11;

// ColorBrewer "Paired": every n-color variant is a prefix of the maximal set.
const FAMILY: [Srgb<u8>; PALETTE_THRESHOLD] = [
    Srgb::new(166, 206, 227),
    Srgb::new(31, 120, 180),
    Srgb::new(178, 223, 138),
    Srgb::new(51, 160, 44),
    Srgb::new(251, 154, 153),
    Srgb::new(227, 26, 28),
    Srgb::new(253, 191, 111),
    Srgb::new(255, 127, 0),
    Srgb::new(202, 178, 214),
    Srgb::new(106, 61, 154),
    Srgb::new(255, 255, 153),
];

const SMALLEST_VARIANT: usize = 3;

/// A display color, rendered as `rgb(r,g,b)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub Srgb<u8>);

impl Color {
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Color(Srgb::new(red, green, blue))
    }

    pub fn components(&self) -> (u8, u8, u8) {
        self.0.into_components()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (red, green, blue) = self.components();
        write!(f, "rgb({red},{green},{blue})")
    }
}

impl std::str::FromStr for Color {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let inner = value
            .trim()
            .strip_prefix("rgb(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| format!("expected rgb(r,g,b), found '{value}'"))?;
        let channels = inner
            .split(',')
            .map(|part| part.trim().parse::<u8>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| format!("invalid channel in '{value}': {err}"))?;
        match channels.as_slice() {
            [red, green, blue] => Ok(Color::rgb(*red, *green, *blue)),
            _ => Err(format!("expected three channels in '{value}'")),
        }
    }
}

impl Serialize for Color {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// The palette variant for `n` colors, before any cycling.
fn variant(n: usize) -> &'static [Srgb<u8>] {
    &FAMILY[..n.clamp(SMALLEST_VARIANT, PALETTE_THRESHOLD)]
}

/// Whether `n` metrics reach the maximal variant, from which colors are
/// cycled and a repeat warning is raised.
pub fn exhausts_palette(n: usize) -> bool {
    n >= PALETTE_THRESHOLD
}

/// Assigns `n` colors deterministically.
///
/// Fewer than three metrics take a prefix of the three-color variant,
/// below the threshold the exact variant is used, and from the threshold
/// on the maximal variant is cycled.
pub fn assign_colors(n: usize) -> Vec<Color> {
    if exhausts_palette(n) {
        warn!("{n} metrics reach the {PALETTE_THRESHOLD}-color palette limit; colors will repeat");
        return FAMILY.iter().cycle().take(n).copied().map(Color).collect();
    }
    variant(n).iter().take(n).copied().map(Color).collect()
}
