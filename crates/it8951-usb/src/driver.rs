//! Driver facade
//!
//! [`It8951`] owns the transport and the geometry discovered at open time.
//! Its lifecycle is `Open -> Closed`: every operation except
//! [`close`](It8951::close) requires an open handle and returns
//! [`DriverError::Closed`] otherwise. A failed operation leaves the handle
//! open so the caller may retry.
//!
//! # Concurrency
//!
//! The controller has no request/response correlation, so two interleaved
//! uploads would corrupt each other's area descriptors. Every operation takes
//! `&mut self` and the handle is deliberately `!Sync`; sharing one across
//! threads requires an external lock such as `Mutex<It8951<_>>`.

use core::cell::Cell;
use core::marker::PhantomData;

use tracing::{debug, info, warn};

use crate::config::DriverConfig;
use crate::error::DriverError;
use crate::geometry::Rect;
use crate::info::{query_info, DeviceInfo, InfoSource};
use crate::mode::RefreshMode;
use crate::refresh::refresh;
use crate::transport::{Reconnect, Transport};
use crate::upload::upload;

/// White in the controller's 8-bit grayscale
pub const WHITE: u8 = 0xFF;
/// Black in the controller's 8-bit grayscale
pub const BLACK: u8 = 0x00;

/// Handle to one IT8951 controller
#[derive(Debug)]
pub struct It8951<T: Transport> {
    transport: Option<T>,
    info: DeviceInfo,
    source: InfoSource,
    config: DriverConfig,
    /// Opts out of `Sync`; see the module docs
    _not_sync: PhantomData<Cell<()>>,
}

impl<T: Transport> It8951<T> {
    /// Wrap an already connected transport and discover the panel geometry
    ///
    /// With [`ProtocolProfile::Vendor`](crate::ProtocolProfile::Vendor) the
    /// controller is queried; if the query fails the configured fallback
    /// resolution is used instead. The direct profile always uses the
    /// fallback.
    ///
    /// # Errors
    ///
    /// [`DriverError::Config`] if `config` fails
    /// [`DriverConfig::validate`]; nothing is sent in that case.
    pub fn new(mut transport: T, config: DriverConfig) -> Result<Self, DriverError> {
        config.validate()?;
        let (info, source) = discover(&mut transport, &config);
        info!(
            width = info.width,
            height = info.height,
            image_buffer = format_args!("0x{:08x}", info.image_buffer_address),
            source = ?source,
            profile = %config.profile,
            "display ready"
        );
        Ok(Self {
            transport: Some(transport),
            info,
            source,
            config,
            _not_sync: PhantomData,
        })
    }

    /// Release the transport; further calls are no-ops
    pub fn close(&mut self) {
        if self.transport.take().is_some() {
            info!("display closed");
        }
    }

    /// Whether the handle still owns its transport
    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    /// Geometry and buffer layout in use
    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Panel width in pixels
    pub fn width(&self) -> u32 {
        self.info.width
    }

    /// Panel height in pixels
    pub fn height(&self) -> u32 {
        self.info.height
    }

    /// Whether the geometry was queried or assumed
    pub fn info_source(&self) -> InfoSource {
        self.source
    }

    /// Configuration the handle was opened with
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Underlying transport, `None` once closed
    pub fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }

    /// Consume the handle and return the transport, if still open
    pub fn into_transport(self) -> Option<T> {
        self.transport
    }

    /// Rectangle covering the whole panel
    pub fn full_rect(&self) -> Rect {
        Rect::full(self.info.width, self.info.height)
    }

    /// Upload `raster` to `rect` and refresh the same region with `mode`
    ///
    /// Not atomic: if the refresh fails the device keeps the uploaded pixels
    /// staged but the panel shows the previous image.
    ///
    /// # Errors
    ///
    /// [`DriverError::Closed`], [`DriverError::Size`] before any transfer,
    /// or the first transport failure.
    pub fn display(
        &mut self,
        raster: &[u8],
        rect: Rect,
        mode: RefreshMode,
    ) -> Result<(), DriverError> {
        let transport = self.transport.as_mut().ok_or(DriverError::Closed)?;
        upload(transport, self.config.profile, &self.info, &rect, raster, &self.config)?;
        refresh(transport, self.config.profile, &self.info, &rect, mode, &self.config)
    }

    /// [`display`](Self::display) over the whole panel
    pub fn display_full(&mut self, raster: &[u8], mode: RefreshMode) -> Result<(), DriverError> {
        let rect = self.full_rect();
        self.display(raster, rect, mode)
    }

    /// Fill the panel with white using `mode`
    pub fn clear(&mut self, mode: RefreshMode) -> Result<(), DriverError> {
        self.fill(WHITE, mode)
    }

    /// Drive every pixel black then white with `Init` to remove ghosting
    pub fn full_init(&mut self) -> Result<(), DriverError> {
        debug!("full init");
        self.fill(BLACK, RefreshMode::Init)?;
        self.fill(WHITE, RefreshMode::Init)
    }

    fn fill(&mut self, level: u8, mode: RefreshMode) -> Result<(), DriverError> {
        if !self.is_open() {
            return Err(DriverError::Closed);
        }
        let raster = vec![level; self.full_rect().area()];
        self.display_full(&raster, mode)
    }
}

impl<T: Reconnect> It8951<T> {
    /// Re-open the connection, rediscover the geometry and clear with `Init`
    ///
    /// Recovers a controller that stopped answering.
    pub fn reset(&mut self) -> Result<(), DriverError> {
        let transport = self.transport.as_mut().ok_or(DriverError::Closed)?;
        transport.reconnect()?;
        let (info, source) = discover(transport, &self.config);
        self.info = info;
        self.source = source;
        info!(width = info.width, height = info.height, source = ?source, "display reset");
        self.clear(RefreshMode::Init)
    }
}

#[cfg(target_os = "linux")]
impl It8951<crate::sg::SgTransport> {
    /// Open the SCSI generic node at `path`
    ///
    /// # Errors
    ///
    /// [`DriverError::Config`] for an invalid `config`, checked before the
    /// node is touched. [`DriverError::Open`] if the node cannot be opened or
    /// is not a SCSI block/character device. A failing info query does not
    /// fail `open`.
    pub fn open(
        path: impl AsRef<std::path::Path>,
        config: DriverConfig,
    ) -> Result<Self, DriverError> {
        config.validate()?;
        let transport = crate::sg::SgTransport::open(path)?;
        Self::new(transport, config)
    }
}

fn discover<T: Transport + ?Sized>(
    transport: &mut T,
    config: &DriverConfig,
) -> (DeviceInfo, InfoSource) {
    let fallback = || {
        DeviceInfo::fallback(&config.fallback, config.fallback_image_buffer_address)
    };
    if !config.profile.queries_info() {
        debug!(profile = %config.profile, "using static resolution");
        return (fallback(), InfoSource::Fallback);
    }
    match query_info(transport, config.timeout) {
        Ok(info) => (info, InfoSource::Queried),
        Err(err) => {
            warn!(
                error = %err,
                width = config.fallback.width,
                height = config.fallback.height,
                "system info query failed, using fallback resolution"
            );
            (fallback(), InfoSource::Fallback)
        }
    }
}
