//! Mock transports for host-side testing
//!
//! - [`RecordingTransport`] records every command and answers with scripted
//!   data or injected failures
//! - [`SimulatedPanel`] decodes the commands like a controller would and
//!   keeps a staging buffer plus the visible framebuffer
//!
//! Both run anywhere; neither needs a device node.

use core::time::Duration;

use crate::area::{DisplayArea, LoadArea, LOAD_AREA_LEN};
use crate::cdb;
use crate::error::{DriverError, ErrorKind, IoFailure};
use crate::geometry::Rect;
use crate::info::DeviceInfo;
use crate::mode::RefreshMode;
use crate::profile::ProtocolProfile;
use crate::transport::{DataPhase, Direction, Reconnect, Transport};

/// Byte offset of the sub-opcode in every CDB this driver sends
const SUB_OPCODE: usize = 6;

// ---------------------------------------------------------------------------
// Recording transport
// ---------------------------------------------------------------------------

/// One command as seen by a mock transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    /// Command block
    pub cdb: Vec<u8>,
    /// Data-phase direction
    pub direction: Direction,
    /// Bytes written to the device (empty for reads)
    pub payload: Vec<u8>,
    /// Size of the data phase
    pub requested: usize,
    /// Timeout passed by the caller
    pub timeout: Duration,
}

impl Transfer {
    fn capture(cdb: &[u8], data: &DataPhase<'_>, timeout: Duration) -> Self {
        let payload = match data {
            DataPhase::ToDevice(buf) => buf.to_vec(),
            DataPhase::FromDevice(_) => Vec::new(),
        };
        Self {
            cdb: cdb.to_vec(),
            direction: data.direction(),
            payload,
            requested: data.len(),
            timeout,
        }
    }

    /// Vendor sub-opcode at byte 6
    pub fn sub_opcode(&self) -> Option<u8> {
        self.cdb.get(SUB_OPCODE).copied()
    }

    /// Whether this is a load-image-area command (either profile)
    pub fn is_load(&self) -> bool {
        self.sub_opcode() == Some(cdb::LOAD_IMAGE_AREA)
    }

    /// Whether this is a display-area command (either profile)
    pub fn is_display(&self) -> bool {
        self.sub_opcode() == Some(cdb::DISPLAY_AREA)
    }

    /// Rectangle addressed by a load/display command
    pub fn rect(&self) -> Option<Rect> {
        if self.is_load() && self.cdb_is_direct() {
            direct_rect(&self.cdb)
        } else if self.is_load() {
            LoadArea::decode(&self.payload).map(|area| area.rect)
        } else if self.is_display() && self.cdb_is_direct() {
            direct_rect(&self.cdb)
        } else if self.is_display() {
            DisplayArea::decode(&self.payload).map(|area| area.rect)
        } else {
            None
        }
    }

    /// Pixel bytes carried by a load command
    pub fn pixels(&self) -> Option<&[u8]> {
        if !self.is_load() {
            return None;
        }
        if self.cdb_is_direct() {
            Some(&self.payload)
        } else {
            self.payload.get(LOAD_AREA_LEN..)
        }
    }

    /// Direct-profile commands carry the rectangle in the CDB
    fn cdb_is_direct(&self) -> bool {
        self.cdb.get(7..15).is_some_and(|fields| fields.iter().any(|&b| b != 0))
    }
}

/// Transport that records commands and replays scripted answers
///
/// Without a scripted info response, reads complete with zero bytes, which
/// a real device that ignores the vendor query also does.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    transfers: Vec<Transfer>,
    info_response: Option<Vec<u8>>,
    failures: Vec<(usize, ErrorKind)>,
    reconnects: usize,
}

impl RecordingTransport {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer reads with `response`
    pub fn with_info_response(mut self, response: Vec<u8>) -> Self {
        self.info_response = Some(response);
        self
    }

    /// Fail the `call`-th command (zero-based, counted over the recorder's
    /// lifetime) with `kind`
    ///
    /// `ErrorKind::Timeout` yields [`DriverError::Timeout`]; every other
    /// kind yields [`DriverError::Io`].
    pub fn fail_on(mut self, call: usize, kind: ErrorKind) -> Self {
        self.failures.push((call, kind));
        self
    }

    /// Every command issued so far, failed ones included
    pub fn transfers(&self) -> &[Transfer] {
        &self.transfers
    }

    /// Load commands only
    pub fn loads(&self) -> Vec<&Transfer> {
        self.transfers.iter().filter(|t| t.is_load()).collect()
    }

    /// Display commands only
    pub fn displays(&self) -> Vec<&Transfer> {
        self.transfers.iter().filter(|t| t.is_display()).collect()
    }

    /// Number of [`Reconnect::reconnect`] calls
    pub fn reconnects(&self) -> usize {
        self.reconnects
    }

    /// Forget recorded commands; scripted answers and failures stay
    pub fn clear(&mut self) {
        self.transfers.clear();
    }
}

impl Transport for RecordingTransport {
    fn send(
        &mut self,
        cdb: &[u8],
        data: DataPhase<'_>,
        timeout: Duration,
    ) -> Result<usize, DriverError> {
        let call = self.transfers.len();
        self.transfers.push(Transfer::capture(cdb, &data, timeout));

        if let Some(&(_, kind)) = self.failures.iter().find(|(at, _)| *at == call) {
            return Err(injected(kind, timeout));
        }

        match data {
            DataPhase::ToDevice(buf) => Ok(buf.len()),
            DataPhase::FromDevice(buf) => Ok(self
                .info_response
                .as_deref()
                .map_or(0, |response| copy_prefix(buf, response))),
        }
    }
}

impl Reconnect for RecordingTransport {
    fn reconnect(&mut self) -> Result<(), DriverError> {
        self.reconnects = self.reconnects.saturating_add(1);
        Ok(())
    }
}

fn injected(kind: ErrorKind, timeout: Duration) -> DriverError {
    match kind {
        ErrorKind::Timeout => DriverError::Timeout { timeout },
        other => DriverError::Io(IoFailure::Other(format!("injected {other:?} failure"))),
    }
}

fn copy_prefix(dst: &mut [u8], src: &[u8]) -> usize {
    let n = dst.len().min(src.len());
    if let (Some(d), Some(s)) = (dst.get_mut(..n), src.get(..n)) {
        d.copy_from_slice(s);
    }
    n
}

fn direct_rect(cdb: &[u8]) -> Option<Rect> {
    let field = |at: usize| -> Option<u32> {
        let raw: [u8; 2] = cdb.get(at..at.checked_add(2)?)?.try_into().ok()?;
        Some(u32::from(u16::from_be_bytes(raw)))
    };
    Some(Rect::new(field(7)?, field(9)?, field(11)?, field(13)?))
}

// ---------------------------------------------------------------------------
// Simulated panel
// ---------------------------------------------------------------------------

/// Operation observed by a [`SimulatedPanel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelOp {
    /// System-info query answered
    Info,
    /// Host dropped and re-opened the connection
    Reconnect,
    /// Strip written to the staging buffer
    Load(Rect),
    /// Staging buffer copied to the visible framebuffer
    Refresh {
        /// Refreshed region
        rect: Rect,
        /// Waveform used
        mode: RefreshMode,
        /// Wait flag (always `true` for the direct profile)
        wait_ready: bool,
    },
}

/// In-memory controller speaking one protocol profile
///
/// Loads land in a staging buffer; a refresh copies the addressed region of
/// the staging buffer to the visible framebuffer. Malformed commands fail
/// with [`DriverError::Io`] like a device returning CHECK CONDITION.
#[derive(Debug, Clone)]
pub struct SimulatedPanel {
    profile: ProtocolProfile,
    info: DeviceInfo,
    answers_info: bool,
    staging: Vec<u8>,
    visible: Vec<u8>,
    log: Vec<PanelOp>,
}

impl SimulatedPanel {
    /// Panel with the geometry and buffer address of `info`
    ///
    /// Both buffers start white (0xFF).
    pub fn new(profile: ProtocolProfile, info: DeviceInfo) -> Self {
        let pixels = (info.width as usize).saturating_mul(info.height as usize);
        Self {
            profile,
            info,
            answers_info: true,
            staging: vec![0xFF; pixels],
            visible: vec![0xFF; pixels],
            log: Vec::new(),
        }
    }

    /// Make the system-info query time out, like firmware that ignores it
    pub fn without_info(mut self) -> Self {
        self.answers_info = false;
        self
    }

    /// Panel width
    pub fn width(&self) -> u32 {
        self.info.width
    }

    /// Panel height
    pub fn height(&self) -> u32 {
        self.info.height
    }

    /// Visible framebuffer, row-major, one byte per pixel
    pub fn visible(&self) -> &[u8] {
        &self.visible
    }

    /// Staging buffer as last written by loads
    pub fn staging(&self) -> &[u8] {
        &self.staging
    }

    /// Operations in arrival order
    pub fn log(&self) -> &[PanelOp] {
        &self.log
    }

    fn reject(message: impl Into<String>) -> DriverError {
        DriverError::Io(IoFailure::Other(message.into()))
    }

    fn answer_info(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, DriverError> {
        if !self.answers_info {
            return Err(DriverError::Timeout { timeout });
        }
        self.log.push(PanelOp::Info);
        Ok(copy_prefix(buf, &self.info.encode()))
    }

    fn load(&mut self, cdb: &[u8], payload: &[u8]) -> Result<usize, DriverError> {
        let (rect, pixels) = match self.profile {
            ProtocolProfile::Vendor => {
                let area = LoadArea::decode(payload)
                    .ok_or_else(|| Self::reject("load payload shorter than its descriptor"))?;
                if area.address != self.info.image_buffer_address {
                    return Err(Self::reject(format!(
                        "load to unknown buffer 0x{:08x}",
                        area.address
                    )));
                }
                (area.rect, payload.get(LOAD_AREA_LEN..).unwrap_or_default())
            }
            ProtocolProfile::Direct => {
                let rect = direct_rect(cdb).ok_or_else(|| Self::reject("short direct CDB"))?;
                (rect, payload)
            }
        };
        rect.check_within(self.info.width, self.info.height)
            .map_err(|err| Self::reject(err.to_string()))?;
        rect.check_raster(pixels).map_err(|err| Self::reject(err.to_string()))?;

        blit(&mut self.staging, self.info.width, &rect, pixels)
            .ok_or_else(|| Self::reject("load outside staging buffer"))?;
        self.log.push(PanelOp::Load(rect));
        Ok(payload.len())
    }

    fn display(&mut self, cdb: &[u8], payload: &[u8]) -> Result<usize, DriverError> {
        let (rect, wire_mode, wait_ready) = match self.profile {
            ProtocolProfile::Vendor => {
                let area = DisplayArea::decode(payload)
                    .ok_or_else(|| Self::reject("display payload too short"))?;
                (area.rect, area.mode, area.wait_ready)
            }
            ProtocolProfile::Direct => {
                let rect = direct_rect(cdb).ok_or_else(|| Self::reject("short direct CDB"))?;
                let mode = cdb.get(15).copied().unwrap_or_default();
                (rect, u32::from(mode), true)
            }
        };
        let mode = RefreshMode::try_from(wire_mode)
            .map_err(|value| Self::reject(format!("unknown waveform {value}")))?;
        rect.check_within(self.info.width, self.info.height)
            .map_err(|err| Self::reject(err.to_string()))?;

        copy_region(&self.staging, &mut self.visible, self.info.width, &rect)
            .ok_or_else(|| Self::reject("refresh outside framebuffer"))?;
        self.log.push(PanelOp::Refresh { rect, mode, wait_ready });
        Ok(payload.len())
    }
}

impl Transport for SimulatedPanel {
    fn send(
        &mut self,
        cdb: &[u8],
        data: DataPhase<'_>,
        timeout: Duration,
    ) -> Result<usize, DriverError> {
        if cdb.first() != Some(&cdb::OPCODE_VENDOR) {
            return Err(Self::reject("unsupported opcode"));
        }
        match (cdb.get(SUB_OPCODE).copied(), data) {
            (Some(cdb::GET_SYSTEM_INFO), DataPhase::FromDevice(buf)) => {
                self.answer_info(buf, timeout)
            }
            (Some(cdb::LOAD_IMAGE_AREA), DataPhase::ToDevice(payload)) => self.load(cdb, payload),
            (Some(cdb::DISPLAY_AREA), DataPhase::ToDevice(payload)) => {
                self.display(cdb, payload)
            }
            (sub, _) => Err(Self::reject(format!("unexpected command {sub:02x?}"))),
        }
    }
}

impl Reconnect for SimulatedPanel {
    fn reconnect(&mut self) -> Result<(), DriverError> {
        self.log.push(PanelOp::Reconnect);
        Ok(())
    }
}

/// Write `src` (rows of `rect.width`) into `dst` (rows of `stride`)
fn blit(dst: &mut [u8], stride: u32, rect: &Rect, src: &[u8]) -> Option<()> {
    let width = rect.width as usize;
    if width == 0 {
        return Some(());
    }
    for (row, line) in src.chunks_exact(width).enumerate() {
        let start = row_start(stride, rect, row)?;
        dst.get_mut(start..start.checked_add(width)?)?.copy_from_slice(line);
    }
    Some(())
}

/// Copy `rect` from `src` to `dst`, both rows of `stride`
fn copy_region(src: &[u8], dst: &mut [u8], stride: u32, rect: &Rect) -> Option<()> {
    let width = rect.width as usize;
    for row in 0..rect.height as usize {
        let start = row_start(stride, rect, row)?;
        let range = start..start.checked_add(width)?;
        dst.get_mut(range.clone())?.copy_from_slice(src.get(range)?);
    }
    Some(())
}

fn row_start(stride: u32, rect: &Rect, row: usize) -> Option<usize> {
    (rect.y as usize)
        .checked_add(row)?
        .checked_mul(stride as usize)?
        .checked_add(rect.x as usize)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use crate::panel::FALLBACK_PANEL;

    fn small_info() -> DeviceInfo {
        let mut info = DeviceInfo::fallback(&FALLBACK_PANEL, 0x0011_9F00);
        info.width = 8;
        info.height = 4;
        info
    }

    #[test]
    fn injected_failure_hits_only_that_call() {
        let mut t = RecordingTransport::new().fail_on(1, ErrorKind::Timeout);
        let timeout = Duration::from_millis(5);
        assert!(t.send(&cdb::display_area(), DataPhase::ToDevice(&[0; 28]), timeout).is_ok());
        let err = t
            .send(&cdb::display_area(), DataPhase::ToDevice(&[0; 28]), timeout)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(t.send(&cdb::display_area(), DataPhase::ToDevice(&[0; 28]), timeout).is_ok());
        assert_eq!(t.transfers().len(), 3);
    }

    #[test]
    fn transfer_decodes_direct_rect() {
        let rect = Rect::new(0, 32, 1872, 32);
        let mut t = RecordingTransport::new();
        t.send(
            &cdb::direct_load_image(&rect).unwrap(),
            DataPhase::ToDevice(&[1, 2]),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(t.transfers()[0].rect(), Some(rect));
        assert_eq!(t.transfers()[0].pixels(), Some(&[1u8, 2][..]));
    }

    #[test]
    fn panel_shows_staged_region_after_refresh() {
        let mut panel = SimulatedPanel::new(ProtocolProfile::Vendor, small_info());
        let rect = Rect::new(2, 1, 2, 2);
        let req = ProtocolProfile::Vendor
            .load_request(0x0011_9F00, &rect, &[0x00; 4])
            .unwrap();
        panel
            .send(&req.cdb, DataPhase::ToDevice(&req.payload), Duration::from_secs(1))
            .unwrap();
        assert!(panel.visible().iter().all(|&b| b == 0xFF));
        assert_eq!(panel.staging()[8 + 2], 0x00);

        let req = ProtocolProfile::Vendor
            .display_request(0x0011_9F00, &rect, RefreshMode::Du, true)
            .unwrap();
        panel
            .send(&req.cdb, DataPhase::ToDevice(&req.payload), Duration::from_secs(1))
            .unwrap();
        assert_eq!(panel.visible()[8 + 2], 0x00);
        assert_eq!(panel.visible()[2 * 8 + 3], 0x00);
        assert_eq!(panel.visible()[0], 0xFF);
        assert_eq!(
            panel.log(),
            &[
                PanelOp::Load(rect),
                PanelOp::Refresh { rect, mode: RefreshMode::Du, wait_ready: true }
            ]
        );
    }

    #[test]
    fn panel_rejects_wrong_buffer_address() {
        let mut panel = SimulatedPanel::new(ProtocolProfile::Vendor, small_info());
        let req = ProtocolProfile::Vendor
            .load_request(0xDEAD, &Rect::new(0, 0, 1, 1), &[0])
            .unwrap();
        let err = panel
            .send(&req.cdb, DataPhase::ToDevice(&req.payload), Duration::from_secs(1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn silent_panel_times_out_info_query() {
        let mut panel = SimulatedPanel::new(ProtocolProfile::Vendor, small_info()).without_info();
        let mut buf = [0u8; 112];
        let err = panel
            .send(&cdb::get_system_info(), DataPhase::FromDevice(&mut buf), Duration::from_secs(1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }
}
