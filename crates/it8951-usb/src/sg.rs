//! Linux SCSI generic transport
//!
//! Commands go through the `SG_IO` ioctl on the device node (`/dev/sgN` or
//! the block node of the bridge). The header layout mirrors
//! `<scsi/sg.h>` field for field.

use core::ffi::c_void;
use core::time::Duration;
use std::fs::{File, OpenOptions};
use std::os::fd::AsRawFd;
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

use libc::{c_int, c_uchar, c_uint, c_ushort};
use nix::errno::Errno;
use tracing::{debug, info};

use crate::error::{DriverError, IoFailure, OpenFailure};
use crate::transport::{DataPhase, Reconnect, Transport};

const SG_INTERFACE_ID: c_int = b'S' as c_int;

const SG_DXFER_NONE: c_int = -1;
const SG_DXFER_TO_DEV: c_int = -2;
const SG_DXFER_FROM_DEV: c_int = -3;

const SG_INFO_OK_MASK: c_uint = 0x1;
const SG_INFO_OK: c_uint = 0x0;

const DID_TIME_OUT: c_ushort = 0x03;
const DRIVER_TIMEOUT: c_ushort = 0x06;
const DRIVER_STATUS_MASK: c_ushort = 0x0f;

const SENSE_LEN: usize = 32;
const SENSE_LEN_U8: c_uchar = 32;

/// `struct sg_io_hdr` from `<scsi/sg.h>`
#[repr(C)]
#[derive(Debug)]
struct SgIoHdr {
    interface_id: c_int,
    dxfer_direction: c_int,
    cmd_len: c_uchar,
    mx_sb_len: c_uchar,
    iovec_count: c_ushort,
    dxfer_len: c_uint,
    dxferp: *mut c_void,
    cmdp: *const c_uchar,
    sbp: *mut c_uchar,
    timeout: c_uint,
    flags: c_uint,
    pack_id: c_int,
    usr_ptr: *mut c_void,
    status: c_uchar,
    masked_status: c_uchar,
    msg_status: c_uchar,
    sb_len_wr: c_uchar,
    host_status: c_ushort,
    driver_status: c_ushort,
    resid: c_int,
    duration: c_uint,
    info: c_uint,
}

mod ioctl {
    use super::{c_int, SgIoHdr};

    nix::ioctl_readwrite_bad!(sg_io, 0x2285, SgIoHdr);
    nix::ioctl_read_bad!(scsi_get_bus_number, 0x5386, c_int);
}

/// `SG_IO` transport on an open device node
#[derive(Debug)]
pub struct SgTransport {
    /// `None` between the close and reopen halves of a reconnect
    file: Option<File>,
    path: PathBuf,
}

impl SgTransport {
    /// Open `path` and verify it answers SCSI ioctls
    ///
    /// # Errors
    ///
    /// [`DriverError::Open`] when the node cannot be opened, is not a block
    /// or character device, or rejects the SCSI bus-number probe.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DriverError> {
        let path = path.as_ref();
        let fail = |reason| DriverError::Open { path: path.to_path_buf(), reason };

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
            .map_err(|err| fail(OpenFailure::Io(err)))?;

        let file_type = file.metadata().map_err(|err| fail(OpenFailure::Io(err)))?.file_type();
        if !file_type.is_block_device() && !file_type.is_char_device() {
            return Err(fail(OpenFailure::NotDevice));
        }

        let mut bus: c_int = 0;
        // SAFETY: `file` is open for the duration of the call and `bus` is a
        // valid, writable c_int as SCSI_IOCTL_GET_BUS_NUMBER expects.
        unsafe { ioctl::scsi_get_bus_number(file.as_raw_fd(), &mut bus) }
            .map_err(|errno| fail(OpenFailure::NotScsi(errno.into())))?;

        info!(path = %path.display(), bus, "opened SCSI generic device");
        Ok(Self { file: Some(file), path: path.to_path_buf() })
    }

    /// Device node this transport was opened on
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Transport for SgTransport {
    fn send(
        &mut self,
        cdb: &[u8],
        data: DataPhase<'_>,
        timeout: Duration,
    ) -> Result<usize, DriverError> {
        let fd = self
            .file
            .as_ref()
            .map(AsRawFd::as_raw_fd)
            .ok_or_else(|| IoFailure::Other(format!("{} is not connected", self.path.display())))?;
        let cmd_len = c_uchar::try_from(cdb.len())
            .map_err(|_| IoFailure::Other(format!("CDB of {} bytes", cdb.len())))?;
        let requested = data.len();
        let dxfer_len = c_uint::try_from(requested)
            .map_err(|_| IoFailure::Other(format!("transfer of {requested} bytes")))?;
        let timeout_ms = timeout_millis(timeout);

        let (direction, dxferp) = match data {
            DataPhase::ToDevice([]) => (SG_DXFER_NONE, core::ptr::null_mut()),
            // The kernel only reads from the buffer for TO_DEV transfers.
            DataPhase::ToDevice(buf) => (SG_DXFER_TO_DEV, buf.as_ptr().cast_mut().cast()),
            DataPhase::FromDevice(buf) => (SG_DXFER_FROM_DEV, buf.as_mut_ptr().cast()),
        };

        let mut sense = [0u8; SENSE_LEN];
        let mut hdr = SgIoHdr {
            interface_id: SG_INTERFACE_ID,
            dxfer_direction: direction,
            cmd_len,
            mx_sb_len: SENSE_LEN_U8,
            iovec_count: 0,
            dxfer_len,
            dxferp,
            cmdp: cdb.as_ptr(),
            sbp: sense.as_mut_ptr(),
            timeout: timeout_ms,
            flags: 0,
            pack_id: 0,
            usr_ptr: core::ptr::null_mut(),
            status: 0,
            masked_status: 0,
            msg_status: 0,
            sb_len_wr: 0,
            host_status: 0,
            driver_status: 0,
            resid: 0,
            duration: 0,
            info: 0,
        };

        // SAFETY: every pointer in `hdr` refers to a live buffer of the
        // advertised length (`cdb`, the data phase buffer, `sense`) that
        // outlives this blocking call, and the fd stays open throughout.
        let result = unsafe { ioctl::sg_io(fd, &mut hdr) };
        match result {
            Ok(_) => {}
            Err(Errno::ETIMEDOUT) => return Err(DriverError::Timeout { timeout }),
            Err(errno) => return Err(IoFailure::Ioctl(errno.into()).into()),
        }
        if let Err(err) = classify(&hdr, timeout) {
            let written = usize::from(hdr.sb_len_wr).min(SENSE_LEN);
            debug!(
                status = hdr.status,
                host_status = hdr.host_status,
                driver_status = hdr.driver_status,
                sense = ?sense.get(..written),
                "SG_IO check condition"
            );
            return Err(err);
        }

        let resid = usize::try_from(hdr.resid).unwrap_or(0);
        Ok(requested.saturating_sub(resid))
    }
}

/// Map a completed `SG_IO` header to the transfer outcome
fn classify(hdr: &SgIoHdr, timeout: Duration) -> Result<(), DriverError> {
    if hdr.info & SG_INFO_OK_MASK == SG_INFO_OK {
        return Ok(());
    }
    if hdr.host_status == DID_TIME_OUT
        || hdr.driver_status & DRIVER_STATUS_MASK == DRIVER_TIMEOUT
    {
        return Err(DriverError::Timeout { timeout });
    }
    Err(IoFailure::Status {
        status: hdr.status,
        host_status: hdr.host_status,
        driver_status: hdr.driver_status,
    }
    .into())
}

/// Whole milliseconds for the header, rounded up
///
/// The sg driver reads a zero timeout as "use the default", so a
/// sub-millisecond deadline must not truncate to zero.
fn timeout_millis(timeout: Duration) -> c_uint {
    c_uint::try_from(timeout.as_micros().div_ceil(1000)).unwrap_or(c_uint::MAX)
}

impl Reconnect for SgTransport {
    fn reconnect(&mut self) -> Result<(), DriverError> {
        // Some bridges accept a single opener: close before reopening.
        drop(self.file.take());
        info!(path = %self.path.display(), "closed SCSI generic device for reconnect");
        self.file = Self::open(&self.path)?.file;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn header_matches_kernel_layout() {
        assert_eq!(core::mem::size_of::<SgIoHdr>(), 88);
        assert_eq!(core::mem::offset_of!(SgIoHdr, dxferp), 16);
        assert_eq!(core::mem::offset_of!(SgIoHdr, usr_ptr), 56);
        assert_eq!(core::mem::offset_of!(SgIoHdr, info), 80);
    }

    fn completed(
        info: c_uint,
        status: c_uchar,
        host_status: c_ushort,
        driver_status: c_ushort,
    ) -> SgIoHdr {
        SgIoHdr {
            interface_id: SG_INTERFACE_ID,
            dxfer_direction: SG_DXFER_TO_DEV,
            cmd_len: 16,
            mx_sb_len: SENSE_LEN_U8,
            iovec_count: 0,
            dxfer_len: 0,
            dxferp: core::ptr::null_mut(),
            cmdp: core::ptr::null(),
            sbp: core::ptr::null_mut(),
            timeout: 10_000,
            flags: 0,
            pack_id: 0,
            usr_ptr: core::ptr::null_mut(),
            status,
            masked_status: 0,
            msg_status: 0,
            sb_len_wr: 0,
            host_status,
            driver_status,
            resid: 0,
            duration: 0,
            info,
        }
    }

    const TIMEOUT: Duration = Duration::from_secs(10);

    #[test]
    fn ok_info_is_success() {
        assert!(classify(&completed(SG_INFO_OK, 0, 0, 0), TIMEOUT).is_ok());
    }

    #[test]
    fn check_condition_is_status_failure() {
        let err = classify(&completed(0x1, 0x02, 0, 0x08), TIMEOUT).unwrap_err();
        assert!(matches!(
            err,
            DriverError::Io(IoFailure::Status { status: 0x02, host_status: 0, driver_status: 0x08 })
        ));
    }

    #[test]
    fn host_timeout_is_timeout() {
        let err = classify(&completed(0x1, 0, DID_TIME_OUT, 0), TIMEOUT).unwrap_err();
        assert!(matches!(err, DriverError::Timeout { timeout } if timeout == TIMEOUT));
    }

    #[test]
    fn driver_timeout_is_timeout() {
        // suggest bits in the upper nibble do not hide the timeout
        let err = classify(&completed(0x1, 0, 0, 0x26), TIMEOUT).unwrap_err();
        assert!(matches!(err, DriverError::Timeout { .. }));
        let err = classify(&completed(0x1, 0, 0, DRIVER_TIMEOUT), TIMEOUT).unwrap_err();
        assert!(matches!(err, DriverError::Timeout { .. }));
    }

    #[test]
    fn timeout_rounds_up_to_whole_milliseconds() {
        assert_eq!(timeout_millis(Duration::from_micros(1)), 1);
        assert_eq!(timeout_millis(Duration::from_micros(1500)), 2);
        assert_eq!(timeout_millis(Duration::from_secs(10)), 10_000);
        assert_eq!(timeout_millis(Duration::from_secs(u64::MAX)), c_uint::MAX);
    }

    #[test]
    fn regular_file_is_not_a_device() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = SgTransport::open(file.path()).unwrap_err();
        assert!(matches!(
            err,
            DriverError::Open { reason: OpenFailure::NotDevice, .. }
        ));
    }
}
