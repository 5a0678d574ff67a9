//! Refresh trigger
//!
//! One display-area command per call. With the wait flag set the controller
//! holds the command until the waveform has finished, so the transport
//! timeout must cover the slowest mode in use.

use tracing::{debug, trace, warn};

use crate::config::DriverConfig;
use crate::error::DriverError;
use crate::geometry::Rect;
use crate::info::DeviceInfo;
use crate::mode::RefreshMode;
use crate::profile::ProtocolProfile;
use crate::transport::{DataPhase, Transport};

/// Show the staged image buffer contents of `rect` using `mode`
///
/// # Errors
///
/// [`DriverError::Size`] when `rect` leaves the panel or does not fit the
/// profile's fields; otherwise the transport error unchanged.
pub fn refresh<T: Transport + ?Sized>(
    transport: &mut T,
    profile: ProtocolProfile,
    info: &DeviceInfo,
    rect: &Rect,
    mode: RefreshMode,
    config: &DriverConfig,
) -> Result<(), DriverError> {
    rect.check_within(info.width, info.height)?;
    let request =
        profile.display_request(info.image_buffer_address, rect, mode, config.wait_for_ready)?;

    if config.wait_for_ready && config.timeout < mode.typical_duration() {
        warn!(
            %mode,
            timeout_ms = config.timeout.as_millis(),
            "timeout is shorter than a typical refresh"
        );
    }
    trace!(cdb = ?request.cdb, "display area");
    transport.send(&request.cdb, DataPhase::ToDevice(&request.payload), config.timeout)?;
    debug!(
        x = rect.x,
        y = rect.y,
        width = rect.width,
        height = rect.height,
        %mode,
        "refreshed"
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use crate::area::DisplayArea;
    use crate::cdb;
    use crate::error::ErrorKind;
    use crate::mock::RecordingTransport;
    use crate::panel::FALLBACK_PANEL;

    fn info() -> DeviceInfo {
        DeviceInfo::fallback(&FALLBACK_PANEL, 0x0011_9F00)
    }

    #[test]
    fn vendor_refresh_sends_one_descriptor() {
        let mut transport = RecordingTransport::new();
        let rect = Rect::new(100, 200, 300, 400);
        refresh(
            &mut transport,
            ProtocolProfile::Vendor,
            &info(),
            &rect,
            RefreshMode::Gc16,
            &DriverConfig::default(),
        )
        .unwrap();

        let transfers = transport.transfers();
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].cdb, cdb::display_area().to_vec());
        let area = DisplayArea::decode(&transfers[0].payload).unwrap();
        assert_eq!(
            area,
            DisplayArea { address: 0x0011_9F00, mode: 2, rect, wait_ready: true }
        );
    }

    #[test]
    fn wait_flag_follows_config() {
        let mut transport = RecordingTransport::new();
        let config = DriverConfig { wait_for_ready: false, ..DriverConfig::default() };
        refresh(
            &mut transport,
            ProtocolProfile::Vendor,
            &info(),
            &Rect::full(1872, 1404),
            RefreshMode::A2,
            &config,
        )
        .unwrap();
        let area = DisplayArea::decode(&transport.transfers()[0].payload).unwrap();
        assert!(!area.wait_ready);
    }

    #[test]
    fn direct_refresh_packs_mode_in_cdb() {
        let mut transport = RecordingTransport::new();
        refresh(
            &mut transport,
            ProtocolProfile::Direct,
            &info(),
            &Rect::full(1872, 1404),
            RefreshMode::Init,
            &DriverConfig::default(),
        )
        .unwrap();
        let transfer = &transport.transfers()[0];
        assert!(transfer.payload.is_empty());
        assert_eq!(transfer.cdb[6], cdb::DISPLAY_AREA);
        assert_eq!(transfer.cdb[15], 0);
        assert_eq!(transfer.rect(), Some(Rect::full(1872, 1404)));
    }

    #[test]
    fn out_of_bounds_refresh_sends_nothing() {
        let mut transport = RecordingTransport::new();
        let err = refresh(
            &mut transport,
            ProtocolProfile::Vendor,
            &info(),
            &Rect::new(0, 1400, 10, 10),
            RefreshMode::Du,
            &DriverConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Size);
        assert!(transport.transfers().is_empty());
    }

    #[test]
    fn timeout_is_reported() {
        let mut transport = RecordingTransport::new().fail_on(0, ErrorKind::Timeout);
        let err = refresh(
            &mut transport,
            ProtocolProfile::Vendor,
            &info(),
            &Rect::full(1872, 1404),
            RefreshMode::Init,
            &DriverConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }
}
