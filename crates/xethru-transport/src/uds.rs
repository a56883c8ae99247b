use std::os::unix::net::UnixStream;
use std::path::Path;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::stream::RadarStream;

impl RadarStream {
    /// Connect to a listening Unix domain socket (blocking).
    ///
    /// Module simulators and serial-to-socket bridges expose the radar link
    /// this way.
    pub fn connect_unix(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path).map_err(|e| TransportError::Connect {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!(?path, "connected to unix domain socket");
        Ok(Self::from_unix(stream))
    }

    /// Create a connected in-process pair. One end plays the host, the other
    /// the module.
    pub fn unix_pair() -> Result<(Self, Self)> {
        let (left, right) = UnixStream::pair()?;
        Ok((Self::from_unix(left), Self::from_unix(right)))
    }
}
