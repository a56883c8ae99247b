//! Scripted stand-in for a module on the far end of a socket pair.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use xethru_frame::{response_code, Frame, FrameReader, FrameWriter};
use xethru_module::{ModuleConfig, X4M200};
use xethru_transport::RadarStream;

pub struct FakeModule {
    received: Arc<Mutex<Vec<Frame>>>,
    writer: Arc<Mutex<FrameWriter<RadarStream>>>,
}

impl FakeModule {
    /// Serve `link`: every command frame is recorded and answered with the
    /// frames `respond` returns.
    pub fn spawn<F>(link: RadarStream, mut respond: F) -> Self
    where
        F: FnMut(&Frame) -> Vec<Frame> + Send + 'static,
    {
        let received = Arc::new(Mutex::new(Vec::new()));
        let writer = Arc::new(Mutex::new(FrameWriter::new(link.try_clone().unwrap())));
        let mut reader = FrameReader::new(link);

        {
            let received = Arc::clone(&received);
            let writer = Arc::clone(&writer);
            thread::spawn(move || {
                while let Ok(frame) = reader.read_frame() {
                    received.lock().unwrap().push(frame.clone());
                    for reply in respond(&frame) {
                        if writer.lock().unwrap().write_frame(&reply).is_err() {
                            return;
                        }
                    }
                }
            });
        }

        Self { received, writer }
    }

    /// Push an unsolicited frame toward the host.
    pub fn send(&self, code: u8, payload: &[u8]) {
        self.writer.lock().unwrap().send(code, payload).unwrap();
    }

    /// Push raw bytes toward the host, bypassing the encoder.
    pub fn send_raw(&self, bytes: &[u8]) {
        use std::io::Write;
        let mut writer = self.writer.lock().unwrap();
        writer.get_mut().write_all(bytes).unwrap();
    }

    pub fn received(&self) -> Vec<Frame> {
        self.received.lock().unwrap().clone()
    }

    pub fn received_codes(&self) -> Vec<u8> {
        self.received().iter().map(|f| f.code).collect()
    }
}

/// Successful response to `command` carrying `data`.
pub fn ok(command: u8, data: &[u8]) -> Frame {
    let mut payload = vec![0u8];
    payload.extend_from_slice(data);
    Frame::new(response_code(command), payload)
}

/// Failed response to `command`.
pub fn rejected(command: u8, status: u8) -> Frame {
    Frame::new(response_code(command), vec![status])
}

/// Answers every command with an empty success.
pub fn always_ok(frame: &Frame) -> Vec<Frame> {
    vec![ok(frame.code, &[])]
}

pub fn fast_config() -> ModuleConfig {
    ModuleConfig {
        command_timeout: Duration::from_millis(500),
        read_poll_interval: Duration::from_millis(10),
        ..ModuleConfig::default()
    }
}

/// A driver wired to a fake module.
pub fn radar_with<F>(respond: F) -> (X4M200, FakeModule)
where
    F: FnMut(&Frame) -> Vec<Frame> + Send + 'static,
{
    radar_with_config(fast_config(), respond)
}

pub fn radar_with_config<F>(config: ModuleConfig, respond: F) -> (X4M200, FakeModule)
where
    F: FnMut(&Frame) -> Vec<Frame> + Send + 'static,
{
    let (host, module) = RadarStream::unix_pair().unwrap();
    let fake = FakeModule::spawn(module, respond);
    let radar = X4M200::open(host, config).unwrap();
    (radar, fake)
}

/// Poll until `cond` holds or a second passes.
pub fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    cond()
}
