#![cfg(all(unix, feature = "cli"))]

use std::os::unix::net::UnixListener;
use std::path::PathBuf;
use std::process::Command;
use std::thread::{self, JoinHandle};

use xethru_frame::codes::{
    GET_DETECTION_ZONE, GET_PROFILE_ID, GET_SENSOR_MODE, GET_SYSTEM_INFO, PING,
};
use xethru_frame::{response_code, Frame, FrameReader, FrameWriter};
use xethru_transport::RadarStream;

fn unique_socket(tag: &str) -> (PathBuf, PathBuf) {
    let dir = PathBuf::from(format!(
        "/tmp/xethru-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    let sock = dir.join("module.sock");
    (dir, sock)
}

/// Accept one host connection and answer like an idle X4M200. Returns the
/// command codes it saw once the host hangs up.
fn serve_module(listener: UnixListener) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let (stream, _) = listener.accept().expect("host should connect");
        let link = RadarStream::from_unix(stream);
        let mut writer = FrameWriter::new(link.try_clone().expect("clone"));
        let mut reader = FrameReader::new(link);
        let mut seen = Vec::new();

        while let Ok(frame) = reader.read_frame() {
            seen.push(frame.code);
            let mut payload = vec![0u8];
            match frame.code {
                PING => payload.extend_from_slice(&0xAAEE_AEEAu32.to_le_bytes()),
                GET_SYSTEM_INFO => payload.extend_from_slice(b"X4M200\0"),
                GET_PROFILE_ID => payload.extend_from_slice(&[0, 0, 0, 0]),
                GET_SENSOR_MODE => payload.push(0x13),
                GET_DETECTION_ZONE => payload[0] = 1,
                _ => {}
            }
            let reply = Frame::new(response_code(frame.code), payload);
            if writer.write_frame(&reply).is_err() {
                break;
            }
        }
        seen
    })
}

fn xethru() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_xethru"));
    cmd.env_remove("XETHRU_PORT")
        .env_remove("XETHRU_SOCKET")
        .args(["--log-level", "error"]);
    cmd
}

#[test]
fn ping_reports_ready_module() {
    let (dir, sock) = unique_socket("ping");
    let module = serve_module(UnixListener::bind(&sock).expect("bind"));

    let output = xethru()
        .args(["--format", "json", "ping", "--socket"])
        .arg(&sock)
        .output()
        .expect("ping should run");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("ping prints json");
    assert_eq!(json["ready"], true);
    assert_eq!(json["pong"], "0xaaeeaeea");
    assert_eq!(module.join().unwrap(), vec![PING]);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn info_marks_rejected_queries_unavailable() {
    let (dir, sock) = unique_socket("info");
    let module = serve_module(UnixListener::bind(&sock).expect("bind"));

    let output = xethru()
        .env("XETHRU_SOCKET", &sock)
        .args(["--format", "json", "info"])
        .output()
        .expect("info should run");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("info prints json");
    assert_eq!(json["system"]["serial_number"], "X4M200");
    assert_eq!(json["sensor_mode"], "stopped");
    assert!(json["profile_id"].is_null());
    assert!(json["detection_zone"].is_null());

    let seen = module.join().unwrap();
    assert_eq!(seen.iter().filter(|c| **c == GET_SYSTEM_INFO).count(), 7);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn no_link_is_a_usage_error() {
    let output = xethru().arg("ping").output().expect("ping should run");
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn missing_socket_is_a_transport_error() {
    let (dir, sock) = unique_socket("missing");

    let output = xethru()
        .args(["ping", "--socket"])
        .arg(&sock)
        .output()
        .expect("ping should run");

    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("connect failed"));

    let _ = std::fs::remove_dir_all(&dir);
}
