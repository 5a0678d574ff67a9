//! Device backends: a real SCSI generic node or an in-memory panel

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use it8951_usb::mock::SimulatedPanel;
use it8951_usb::{DataPhase, DeviceInfo, DriverConfig, DriverError, It8951, Reconnect, Transport};

/// Transport selected on the command line
pub enum Backend {
    /// `SG_IO` on a device node
    #[cfg(target_os = "linux")]
    Sg(it8951_usb::SgTransport),
    /// Simulated controller; the visible framebuffer is saved on exit
    Simulated {
        panel: SimulatedPanel,
        output: PathBuf,
    },
}

impl Transport for Backend {
    fn send(
        &mut self,
        cdb: &[u8],
        data: DataPhase<'_>,
        timeout: Duration,
    ) -> Result<usize, DriverError> {
        match self {
            #[cfg(target_os = "linux")]
            Self::Sg(sg) => sg.send(cdb, data, timeout),
            Self::Simulated { panel, .. } => panel.send(cdb, data, timeout),
        }
    }
}

impl Reconnect for Backend {
    fn reconnect(&mut self) -> Result<(), DriverError> {
        match self {
            #[cfg(target_os = "linux")]
            Self::Sg(sg) => sg.reconnect(),
            Self::Simulated { panel, .. } => panel.reconnect(),
        }
    }
}

/// Open the display named by `device`, or a simulated one when `simulate`
/// holds an output path
pub fn open(
    device: &Path,
    simulate: Option<&Path>,
    config: DriverConfig,
) -> Result<It8951<Backend>> {
    let backend = match simulate {
        Some(output) => {
            let info = DeviceInfo::fallback(&config.fallback, config.fallback_image_buffer_address);
            Backend::Simulated {
                panel: SimulatedPanel::new(config.profile, info),
                output: output.to_path_buf(),
            }
        }
        None => open_device(device)?,
    };
    It8951::new(backend, config).context("opening display")
}

#[cfg(target_os = "linux")]
fn open_device(device: &Path) -> Result<Backend> {
    let sg = it8951_usb::SgTransport::open(device)
        .with_context(|| format!("opening display at {}", device.display()))?;
    Ok(Backend::Sg(sg))
}

#[cfg(not(target_os = "linux"))]
fn open_device(device: &Path) -> Result<Backend> {
    anyhow::bail!(
        "{}: SCSI generic devices are only supported on Linux; use --simulate",
        device.display()
    )
}

/// Close the display, writing the simulated framebuffer if there is one
pub fn finish(mut display: It8951<Backend>) -> Result<()> {
    if let Some(Backend::Simulated { panel, output }) = display.transport() {
        save_framebuffer(panel, output)?;
    }
    display.close();
    Ok(())
}

fn save_framebuffer(panel: &SimulatedPanel, output: &Path) -> Result<()> {
    let image = image::GrayImage::from_raw(panel.width(), panel.height(), panel.visible().to_vec())
        .context("framebuffer size does not match panel geometry")?;
    image
        .save(output)
        .with_context(|| format!("writing {}", output.display()))?;
    tracing::info!(path = %output.display(), "saved simulated framebuffer");
    Ok(())
}
