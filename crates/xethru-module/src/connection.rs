use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info};
use xethru_frame::{FrameReader, FrameWriter};
use xethru_transport::RadarStream;

use crate::command::CommandChannel;
use crate::config::ModuleConfig;
use crate::dispatcher::{self, ConnectionStats, Shared};
use crate::error::{ModuleError, Result};
use crate::queue::DataQueues;

/// A live link to a module: the command channel, the receive loop, and the
/// data queues it fills.
///
/// Closing (explicitly or on drop) fails any pending command, wakes every
/// blocked queue reader, and stops the receive loop.
pub struct Connection {
    shared: Arc<Shared>,
    commands: CommandChannel,
    // Behind a mutex so the connection stays `Sync` when the link is a
    // serial port.
    link: Mutex<RadarStream>,
    receiver: Mutex<Option<JoinHandle<()>>>,
    config: ModuleConfig,
}

impl Connection {
    /// Start a session over an already connected link.
    pub fn open(stream: RadarStream, config: ModuleConfig) -> Result<Self> {
        let frame_config = config.frame_config();
        let link = stream.try_clone()?;
        let writer = FrameWriter::over_link(stream.try_clone()?, frame_config.clone())?;
        let reader = FrameReader::over_link(stream, frame_config)?;

        let shared = Arc::new(Shared::new(config.queue_capacity));
        let receiver = dispatcher::spawn(reader, Arc::clone(&shared))?;
        info!(transport = link.transport_name(), "module connection opened");

        Ok(Self {
            shared,
            commands: CommandChannel::new(writer),
            link: Mutex::new(link),
            receiver: Mutex::new(Some(receiver)),
            config,
        })
    }

    /// Connect to a module exposed on a Unix domain socket.
    #[cfg(unix)]
    pub fn connect_unix(path: impl AsRef<std::path::Path>, config: ModuleConfig) -> Result<Self> {
        Self::open(RadarStream::connect_unix(path)?, config)
    }

    /// Open a module on a serial port.
    #[cfg(feature = "serial")]
    pub fn open_serial(serial: &xethru_transport::SerialConfig, config: ModuleConfig) -> Result<Self> {
        Self::open(RadarStream::open_serial(serial)?, config)
    }

    /// Send a command and wait up to the configured timeout for its response.
    ///
    /// Returns the response data after the status byte.
    pub fn call(&self, code: u8, payload: &[u8]) -> Result<Bytes> {
        self.call_with_timeout(code, payload, self.config.command_timeout)
    }

    pub fn call_with_timeout(&self, code: u8, payload: &[u8], timeout: Duration) -> Result<Bytes> {
        if self.is_closed() {
            return Err(ModuleError::Closed);
        }
        self.commands.call(&self.shared.slot, code, payload, timeout)
    }

    pub fn queues(&self) -> &DataQueues {
        &self.shared.queues
    }

    pub fn stats(&self) -> ConnectionStats {
        self.shared.counters.snapshot()
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Tear the connection down. Safe to call more than once.
    pub fn close(&self) {
        let was_open = !self.shared.closed.swap(true, Ordering::AcqRel);
        self.shared.shut_endpoints();
        let shutdown = self
            .link
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .shutdown();
        if let Err(err) = shutdown {
            debug!(error = %err, "link shutdown failed");
        }

        let receiver = self
            .receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(receiver) = receiver {
            if receiver.join().is_err() {
                debug!("receive loop panicked");
            }
        }
        if was_open {
            info!("module connection closed");
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("link", &*self.link.lock().unwrap_or_else(PoisonError::into_inner))
            .field("closed", &self.is_closed())
            .field("stats", &self.stats())
            .finish()
    }
}
