use std::io::{Read, Write};
use std::time::Duration;

use crate::error::Result;

/// A connected radar link. Implements `Read + Write`.
///
/// This is the fundamental I/O type handed to the module session.
/// One handle is cloned for the receive loop, one is kept for the command
/// path, and a third may be kept purely to [`shutdown`](Self::shutdown) the
/// link from another thread.
pub struct RadarStream {
    inner: RadarStreamInner,
}

enum RadarStreamInner {
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
    #[cfg(feature = "serial")]
    Serial(Box<dyn serialport::SerialPort>),
}

impl Read for RadarStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            RadarStreamInner::Unix(stream) => stream.read(buf),
            #[cfg(feature = "serial")]
            RadarStreamInner::Serial(port) => port.read(buf),
        }
    }
}

impl Write for RadarStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            RadarStreamInner::Unix(stream) => stream.write(buf),
            #[cfg(feature = "serial")]
            RadarStreamInner::Serial(port) => port.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            RadarStreamInner::Unix(stream) => stream.flush(),
            #[cfg(feature = "serial")]
            RadarStreamInner::Serial(port) => port.flush(),
        }
    }
}

impl RadarStream {
    /// Wrap a connected Unix domain socket stream.
    #[cfg(unix)]
    pub fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: RadarStreamInner::Unix(stream),
        }
    }

    /// Wrap an already opened serial port.
    #[cfg(feature = "serial")]
    pub fn from_serial(port: Box<dyn serialport::SerialPort>) -> Self {
        Self {
            inner: RadarStreamInner::Serial(port),
        }
    }

    /// Set read timeout on the underlying stream.
    ///
    /// Serial ports have no "block forever" mode; `None` maps to one hour.
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            RadarStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            #[cfg(feature = "serial")]
            RadarStreamInner::Serial(port) => port
                .set_timeout(timeout.unwrap_or(Duration::from_secs(3600)))
                .map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying stream.
    ///
    /// Serial ports share one timeout for both directions, so this is a no-op
    /// there; the read timeout governs.
    pub fn set_write_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            RadarStreamInner::Unix(stream) => {
                stream.set_write_timeout(timeout).map_err(Into::into)
            }
            #[cfg(feature = "serial")]
            RadarStreamInner::Serial(_) => {
                let _ = timeout;
                Ok(())
            }
        }
    }

    /// Try to clone this stream (creates a new OS handle to the same link).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            #[cfg(unix)]
            RadarStreamInner::Unix(stream) => {
                let cloned = stream.try_clone()?;
                Ok(Self::from_unix(cloned))
            }
            #[cfg(feature = "serial")]
            RadarStreamInner::Serial(port) => {
                let cloned = port.try_clone()?;
                Ok(Self::from_serial(cloned))
            }
        }
    }

    /// Shut the link down so that blocked reads on other handles return.
    ///
    /// Sockets are shut down in both directions. Serial ports cannot be
    /// interrupted; readers observe the close on their next read timeout.
    pub fn shutdown(&self) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            RadarStreamInner::Unix(stream) => match stream.shutdown(std::net::Shutdown::Both) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotConnected => Ok(()),
                Err(err) => Err(err.into()),
            },
            #[cfg(feature = "serial")]
            RadarStreamInner::Serial(_) => Ok(()),
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            #[cfg(unix)]
            RadarStreamInner::Unix(_) => "unix-domain-socket",
            #[cfg(feature = "serial")]
            RadarStreamInner::Serial(_) => "serial",
        }
    }
}

impl std::fmt::Debug for RadarStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            #[cfg(unix)]
            RadarStreamInner::Unix(_) => f
                .debug_struct("RadarStream")
                .field("type", &"unix")
                .finish(),
            #[cfg(feature = "serial")]
            RadarStreamInner::Serial(port) => f
                .debug_struct("RadarStream")
                .field("type", &"serial")
                .field("port", &port.name())
                .finish(),
        }
    }
}
