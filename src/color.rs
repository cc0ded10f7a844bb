//! Battery zones and the colours they are shown in.

use palette::Srgb;

/// One pixel worth of colour, 8 bits per channel.
pub type ColorSample = Srgb<u8>;

/// Discrete battery level band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum Zone {
    Red = 0,
    Orange = 1,
    Yellow = 2,
    Green = 3,
}

impl Zone {
    /// All zones, lowest first.
    pub const ALL: [Self; 4] = [Self::Red, Self::Orange, Self::Yellow, Self::Green];

    /// Zone for a zone index, saturating at [`Zone::Green`].
    pub const fn from_index(index: u8) -> Self {
        match index {
            0 => Self::Red,
            1 => Self::Orange,
            2 => Self::Yellow,
            _ => Self::Green,
        }
    }

    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Colour the status LED shows for this zone.
    pub const fn color(self) -> ColorSample {
        match self {
            Self::Red => Srgb::new(255, 0, 0),
            Self::Orange => Srgb::new(255, 128, 0),
            Self::Yellow => Srgb::new(255, 255, 0),
            Self::Green => Srgb::new(0, 255, 0),
        }
    }
}

/// Byte order the WS2812 expects on the wire: green, red, blue.
pub const fn wire_bytes(color: ColorSample) -> [u8; 3] {
    [color.green, color.red, color.blue]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_colors_match_table() {
        let expected = [(255, 0, 0), (255, 128, 0), (255, 255, 0), (0, 255, 0)];
        for (zone, (r, g, b)) in Zone::ALL.into_iter().zip(expected) {
            let c = zone.color();
            assert_eq!((c.red, c.green, c.blue), (r, g, b), "zone {:?}", zone);
        }
    }

    #[test]
    fn index_round_trips_for_every_zone() {
        for zone in Zone::ALL {
            assert_eq!(Zone::from_index(zone.index()), zone);
        }
        assert_eq!(Zone::from_index(9), Zone::Green);
    }

    #[test]
    fn wire_order_is_grb() {
        assert_eq!(wire_bytes(Srgb::new(1, 2, 3)), [2, 1, 3]);
        assert_eq!(wire_bytes(Zone::Orange.color()), [128, 255, 0]);
    }
}
