//! Panel specifications
//!
//! The resolution used when the controller does not answer the system-info
//! query lives here, next to the panel it belongs to.

/// Static description of an IT8951-driven panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PanelSpec {
    /// Marketing name
    #[cfg_attr(feature = "serde", serde(skip, default = "custom_name"))]
    pub name: &'static str,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

#[cfg(feature = "serde")]
fn custom_name() -> &'static str {
    "custom"
}

impl PanelSpec {
    /// Pixels (and raster bytes) for a full frame
    pub fn pixel_count(&self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }
}

/// Waveshare 10.3" e-Paper HAT (IT8951, 1872×1404, 16 gray levels)
pub const WAVESHARE_10_3: PanelSpec = PanelSpec {
    name: "Waveshare 10.3\" IT8951",
    width: 1872,
    height: 1404,
};

/// Resolution assumed when the system-info query fails
///
/// Some firmware revisions ignore the vendor get-system-info command; the
/// panel shipped with them is the 10.3" unit.
pub const FALLBACK_PANEL: PanelSpec = WAVESHARE_10_3;

/// Largest width or height accepted from a system-info response
pub const MAX_PANEL_DIMENSION: u32 = 4096;
