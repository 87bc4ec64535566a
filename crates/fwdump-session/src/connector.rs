use std::io::{Read, Write};
use std::time::Duration;

#[cfg(unix)]
use std::path::Path;

use fwdump_transport::{reset_device, ControlLines, ResetConfig};
#[cfg(unix)]
use fwdump_transport::SerialPort;
use tracing::info;

use crate::error::Result;
use crate::session::{Session, SessionConfig};

/// Everything needed to bring a device connection up.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Line speed. Default: 115200.
    pub baud_rate: u32,
    /// Bound on every blocking read. `None` waits forever. Default: 5s.
    pub read_timeout: Option<Duration>,
    pub reset: ResetConfig,
    pub session: SessionConfig,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            read_timeout: Some(Duration::from_secs(5)),
            reset: ResetConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

/// Reset the device over `writer`'s control lines and complete the handshake.
///
/// The returned session is [`Ready`](crate::SessionState::Ready).
pub fn establish<R, W>(
    reader: R,
    mut writer: W,
    reset: &ResetConfig,
    config: SessionConfig,
) -> Result<Session<R, W>>
where
    R: Read,
    W: Write + ControlLines,
{
    reset_device(&mut writer, reset)?;
    let mut session = Session::with_config(reader, writer, config);
    let banner = session.handshake()?.banner.clone();
    info!(%banner, "session established");
    Ok(session)
}

/// Open a serial device with default settings, reset it and handshake.
#[cfg(unix)]
pub fn connect(path: impl AsRef<Path>) -> Result<Session<SerialPort, SerialPort>> {
    connect_with_config(path, &ConnectConfig::default())
}

/// Open a serial device, reset it and handshake.
#[cfg(unix)]
pub fn connect_with_config(
    path: impl AsRef<Path>,
    config: &ConnectConfig,
) -> Result<Session<SerialPort, SerialPort>> {
    let mut port = SerialPort::open(path, config.baud_rate)?;
    port.set_read_timeout(config.read_timeout);
    let reader = port.try_clone()?;
    establish(reader, port, &config.reset, config.session.clone())
}
