//! Transport abstraction
//!
//! This module provides the [`Transport`] trait: one blocking SCSI command
//! with an optional data phase. [`SgTransport`](crate::sg::SgTransport)
//! implements it over Linux `SG_IO`; [`mock`](crate::mock) provides
//! recording and simulating implementations for host-side tests.
//!
//! No retries happen at this layer. A transport reports exactly what the
//! device did and leaves policy to the facade's caller.

use core::time::Duration;

use crate::error::DriverError;

/// Direction of a command's data phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Host writes the payload to the device
    ToDevice,
    /// Device fills the host buffer
    FromDevice,
}

/// Data phase of a command; the buffer kind fixes the direction
#[derive(Debug)]
pub enum DataPhase<'a> {
    /// Payload written to the device (may be empty)
    ToDevice(&'a [u8]),
    /// Buffer the device reads into
    FromDevice(&'a mut [u8]),
}

impl DataPhase<'_> {
    /// Direction implied by the buffer
    pub fn direction(&self) -> Direction {
        match self {
            Self::ToDevice(_) => Direction::ToDevice,
            Self::FromDevice(_) => Direction::FromDevice,
        }
    }

    /// Number of bytes requested for transfer
    pub fn len(&self) -> usize {
        match self {
            Self::ToDevice(buf) => buf.len(),
            Self::FromDevice(buf) => buf.len(),
        }
    }

    /// Whether the command carries no data
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One-command-at-a-time channel to the controller
///
/// ## Implementing
///
/// Implementations must block until the device completes the command or
/// `timeout` elapses, and must map the outcome to:
/// - `Ok(n)` with `n` bytes actually transferred
/// - [`DriverError::Timeout`] when the deadline passed
/// - [`DriverError::Io`] for any other failure, including a non-zero
///   SCSI/host/driver status
pub trait Transport {
    /// Issue `cdb` with the given data phase
    fn send(
        &mut self,
        cdb: &[u8],
        data: DataPhase<'_>,
        timeout: Duration,
    ) -> Result<usize, DriverError>;
}

/// Transport that can drop and re-establish its connection in place
///
/// Used by [`It8951::reset`](crate::It8951::reset) to recover a controller
/// that stopped answering.
pub trait Reconnect: Transport {
    /// Close the underlying channel and open it again
    fn reconnect(&mut self) -> Result<(), DriverError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(
        &mut self,
        cdb: &[u8],
        data: DataPhase<'_>,
        timeout: Duration,
    ) -> Result<usize, DriverError> {
        (**self).send(cdb, data, timeout)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(
        &mut self,
        cdb: &[u8],
        data: DataPhase<'_>,
        timeout: Duration,
    ) -> Result<usize, DriverError> {
        (**self).send(cdb, data, timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_phase_reports_direction_and_len() {
        let out = [1u8, 2, 3];
        let phase = DataPhase::ToDevice(&out);
        assert_eq!(phase.direction(), Direction::ToDevice);
        assert_eq!(phase.len(), 3);

        let mut inbuf = [0u8; 112];
        let phase = DataPhase::FromDevice(&mut inbuf);
        assert_eq!(phase.direction(), Direction::FromDevice);
        assert_eq!(phase.len(), 112);

        assert!(DataPhase::ToDevice(&[]).is_empty());
    }
}
