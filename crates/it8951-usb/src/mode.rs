//! IT8951 waveform (refresh) modes
//!
//! The controller selects one of its internal waveform tables per refresh.
//! Only the modes this panel family answers to are modelled; their wire
//! values are not contiguous (there is no mode 3 on this firmware).

use core::fmt;
use core::str::FromStr;
use core::time::Duration;

/// Waveform selection sent with every display-area command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum RefreshMode {
    /// INIT - full clear
    ///
    /// Drives every pixel through black and white. Slowest mode; removes
    /// all ghosting. Used at power-on and for forced redraws.
    Init,

    /// DU - direct update
    ///
    /// Fast, effectively 1-bit. Any non-white/black level snaps to the
    /// nearest extreme.
    Du,

    /// GC16 - 16-level grayscale
    ///
    /// Best quality for photographs. Flashes.
    #[default]
    Gc16,

    /// A2 - fast 2-level
    ///
    /// Quickest mode, accumulates ghosting. Intended for countdowns and
    /// other motion-like sequences followed by a periodic `Init` clear.
    A2,
}

impl RefreshMode {
    /// All supported modes in wire order
    pub const ALL: [RefreshMode; 4] = [Self::Init, Self::Du, Self::Gc16, Self::A2];

    /// Value placed in the wave-mode field
    pub const fn wire_value(self) -> u32 {
        match self {
            Self::Init => 0,
            Self::Du => 1,
            Self::Gc16 => 2,
            Self::A2 => 4,
        }
    }

    /// Lower-case mode name as used on the command line
    pub const fn name(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Du => "du",
            Self::Gc16 => "gc16",
            Self::A2 => "a2",
        }
    }

    /// Typical full-panel refresh time at room temperature
    ///
    /// Rough figures for a 10.3" Carta panel; use them to size timeouts, not
    /// to schedule work.
    pub const fn typical_duration(self) -> Duration {
        match self {
            Self::Init => Duration::from_millis(2000),
            Self::Du => Duration::from_millis(260),
            Self::Gc16 => Duration::from_millis(450),
            Self::A2 => Duration::from_millis(120),
        }
    }
}

impl TryFrom<u32> for RefreshMode {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Init),
            1 => Ok(Self::Du),
            2 => Ok(Self::Gc16),
            4 => Ok(Self::A2),
            other => Err(other),
        }
    }
}

impl fmt::Display for RefreshMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unknown mode name passed to [`RefreshMode::from_str`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown refresh mode `{0}` (expected init, du, gc16 or a2)")]
pub struct ParseModeError(pub String);

impl FromStr for RefreshMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseModeError(s.to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn wire_values_match_controller_table() {
        assert_eq!(RefreshMode::Init.wire_value(), 0);
        assert_eq!(RefreshMode::Du.wire_value(), 1);
        assert_eq!(RefreshMode::Gc16.wire_value(), 2);
        assert_eq!(RefreshMode::A2.wire_value(), 4);
    }

    #[test]
    fn try_from_inverts_wire_value() {
        for mode in RefreshMode::ALL {
            assert_eq!(RefreshMode::try_from(mode.wire_value()), Ok(mode));
        }
        assert_eq!(RefreshMode::try_from(3), Err(3));
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("GC16".parse::<RefreshMode>().unwrap(), RefreshMode::Gc16);
        assert_eq!("a2".parse::<RefreshMode>().unwrap(), RefreshMode::A2);
        assert!("gl16".parse::<RefreshMode>().is_err());
    }

    #[test]
    fn init_is_slowest() {
        let slowest = RefreshMode::ALL.into_iter().max_by_key(|m| m.typical_duration());
        assert_eq!(slowest, Some(RefreshMode::Init));
    }
}
