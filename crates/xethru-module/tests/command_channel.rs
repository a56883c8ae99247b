mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use common::{always_ok, ok, radar_with, radar_with_config, rejected, FakeModule};
use xethru_frame::codes::{
    GET_SENSOR_MODE, GET_SYSTEM_INFO, PING, SET_DEBUG_LEVEL, SET_PARAMETER_FILE,
};
use xethru_frame::{response_code, Frame};
use xethru_module::{Connection, ModuleConfig, ModuleError, Pong, SystemInfoCode};
use xethru_transport::RadarStream;

#[test]
fn ping_roundtrip() {
    let (radar, fake) = radar_with(|frame| match frame.code {
        PING => vec![ok(PING, &Pong::READY.to_le_bytes())],
        _ => vec![],
    });

    let pong = radar.ping().unwrap();
    assert!(pong.is_ready());
    assert_eq!(fake.received_codes(), vec![PING]);
}

#[test]
fn system_info_text() {
    let (radar, fake) = radar_with(|frame| match frame.code {
        GET_SYSTEM_INFO => vec![ok(GET_SYSTEM_INFO, b"X4M200\0")],
        _ => vec![],
    });

    let text = radar.get_system_info(SystemInfoCode::SerialNumber).unwrap();
    assert_eq!(text, "X4M200");
    assert_eq!(fake.received()[0].payload.as_ref(), &[0x06]);
}

#[test]
fn nonzero_status_surfaces_unchanged() {
    let (radar, _fake) = radar_with(|frame| vec![rejected(frame.code, 0x2A)]);

    let err = radar.set_debug_level(3).unwrap_err();
    assert!(matches!(
        err,
        ModuleError::DeviceRejected {
            code: SET_DEBUG_LEVEL,
            status: 0x2A
        }
    ));
}

#[test]
fn malformed_response_reported() {
    let (radar, _fake) = radar_with(|frame| vec![ok(frame.code, &[1, 2])]);

    let err = radar.ping().unwrap_err();
    assert!(matches!(err, ModuleError::MalformedResponse { code: PING, .. }));
}

#[test]
fn silent_module_times_out_within_bound() {
    let config = ModuleConfig {
        command_timeout: Duration::from_millis(50),
        read_poll_interval: Duration::from_millis(10),
        ..ModuleConfig::default()
    };
    let (radar, _fake) = radar_with_config(config, |_| vec![]);

    let started = Instant::now();
    let err = radar.ping().unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, ModuleError::Timeout(t) if t == Duration::from_millis(50)));
    assert!(elapsed >= Duration::from_millis(50));
    assert!(elapsed < Duration::from_millis(500), "took {elapsed:?}");
}

#[test]
fn explicit_timeout_per_call() {
    let (host, module) = RadarStream::unix_pair().unwrap();
    let _fake = FakeModule::spawn(module, |_| vec![]);
    let conn = Connection::open(host, common::fast_config()).unwrap();

    let started = Instant::now();
    let err = conn
        .call_with_timeout(PING, &[], Duration::from_millis(30))
        .unwrap_err();
    assert!(matches!(err, ModuleError::Timeout(_)));
    assert!(started.elapsed() < Duration::from_millis(400));
}

/// Run `f` on a helper thread and fail the test if it does not finish in time.
fn finishes_within<T: Send + 'static>(limit: Duration, f: impl FnOnce() -> T + Send + 'static) -> T {
    let (tx, rx) = std::sync::mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(f());
    });
    rx.recv_timeout(limit).expect("call did not return in time")
}

#[test]
fn stalled_link_fails_every_call_with_timeout() {
    // The module end stays open but never reads, so the socket buffer fills.
    let (host, _module) = RadarStream::unix_pair().unwrap();
    let config = ModuleConfig {
        command_timeout: Duration::from_millis(50),
        read_poll_interval: Duration::from_millis(10),
        ..ModuleConfig::default()
    };
    let conn = Arc::new(Connection::open(host, config).unwrap());
    let payload = vec![0x11u8; 60_000];

    for _ in 0..8 {
        let conn = Arc::clone(&conn);
        let payload = payload.clone();
        let (result, elapsed) = finishes_within(Duration::from_secs(2), move || {
            let started = Instant::now();
            let result = conn.call(SET_PARAMETER_FILE, &payload);
            (result, started.elapsed())
        });
        assert!(matches!(result, Err(ModuleError::Timeout(_))), "{result:?}");
        assert!(elapsed < Duration::from_millis(500), "took {elapsed:?}");
    }
}

#[test]
fn per_call_timeout_also_bounds_the_write() {
    let (host, _module) = RadarStream::unix_pair().unwrap();
    let config = ModuleConfig {
        command_timeout: Duration::from_secs(2),
        read_poll_interval: Duration::from_millis(10),
        ..ModuleConfig::default()
    };
    let conn = Arc::new(Connection::open(host, config).unwrap());

    // Fill the buffer with short-deadline writes first.
    let filler = vec![0x11u8; 60_000];
    for _ in 0..8 {
        let _ = conn.call_with_timeout(SET_PARAMETER_FILE, &filler, Duration::from_millis(30));
    }

    let started = Instant::now();
    let result = finishes_within(Duration::from_secs(3), {
        let conn = Arc::clone(&conn);
        move || conn.call_with_timeout(PING, &[], Duration::from_millis(30))
    });
    assert!(matches!(result, Err(ModuleError::Timeout(t)) if t == Duration::from_millis(30)));
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[test]
fn second_command_waits_for_first_response() {
    let (host, module) = RadarStream::unix_pair().unwrap();
    let module_reader = module.try_clone().unwrap();
    let overlap = Arc::new(AtomicBool::new(false));

    // Hand-rolled module: after receiving PING it checks that nothing else
    // is on the wire before answering late.
    let module_thread = {
        let overlap = Arc::clone(&overlap);
        thread::spawn(move || {
            let mut reader = xethru_frame::FrameReader::over_link(
                module_reader,
                xethru_frame::FrameConfig {
                    read_timeout: Some(Duration::from_millis(100)),
                    ..xethru_frame::FrameConfig::default()
                },
            )
            .unwrap();
            let mut writer = xethru_frame::FrameWriter::new(module);
            let mut order = Vec::new();
            for _ in 0..2 {
                let frame = loop {
                    match reader.read_frame() {
                        Ok(frame) => break frame,
                        Err(xethru_frame::FrameError::Io(_)) => continue,
                        Err(err) => panic!("module read failed: {err}"),
                    }
                };
                order.push(frame.code);
                if frame.code == PING {
                    // Anything arriving now would be a second command in flight.
                    if reader.read_frame().is_ok() {
                        overlap.store(true, Ordering::SeqCst);
                    }
                    writer
                        .write_frame(&ok(PING, &Pong::READY.to_le_bytes()))
                        .unwrap();
                } else {
                    writer.write_frame(&ok(frame.code, &[0x11])).unwrap();
                }
            }
            order
        })
    };

    let radar = Arc::new(xethru_module::X4M200::open(host, common::fast_config()).unwrap());
    let barrier = Arc::new(Barrier::new(2));

    let first = {
        let radar = Arc::clone(&radar);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            radar.ping()
        })
    };
    barrier.wait();
    thread::sleep(Duration::from_millis(50));
    let mode = radar.get_sensor_mode().unwrap();

    assert!(first.join().unwrap().unwrap().is_ready());
    assert_eq!(mode, xethru_module::SensorMode::Idle);
    assert_eq!(module_thread.join().unwrap(), vec![PING, GET_SENSOR_MODE]);
    assert!(!overlap.load(Ordering::SeqCst));
}

#[test]
fn stale_response_is_counted_not_matched() {
    let (radar, fake) = radar_with(always_ok);

    // Unsolicited response before any command is pending.
    fake.send(response_code(PING), &[0]);
    assert!(common::eventually(|| radar.stats().stale_responses == 1));

    // Later commands still correlate normally.
    radar.set_debug_level(1).unwrap();
    assert_eq!(radar.stats().stale_responses, 1);
}

#[test]
fn concurrent_callers_all_complete() {
    let (radar, fake) = radar_with(|frame| match frame.code {
        PING => vec![ok(PING, &Pong::READY.to_le_bytes())],
        code => vec![ok(code, &[])],
    });
    let radar = Arc::new(radar);

    let workers: Vec<_> = (0..4)
        .map(|i| {
            let radar = Arc::clone(&radar);
            thread::spawn(move || {
                for _ in 0..10 {
                    if i % 2 == 0 {
                        radar.ping().unwrap();
                    } else {
                        radar.set_debug_level(2).unwrap();
                    }
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(fake.received().len(), 40);
    assert_eq!(radar.stats().stale_responses, 0);
}

#[test]
fn closed_connection_rejects_calls() {
    let (radar, _fake) = radar_with(always_ok);
    radar.close();
    assert!(radar.is_closed());
    assert!(matches!(radar.ping(), Err(ModuleError::Closed)));
}

#[test]
fn peer_hangup_closes_connection() {
    let (host, module) = RadarStream::unix_pair().unwrap();
    let radar = xethru_module::X4M200::open(host, common::fast_config()).unwrap();
    drop(module);

    assert!(common::eventually(|| radar.is_closed()));
    assert!(matches!(radar.ping(), Err(ModuleError::Closed)));
    assert!(matches!(radar.sleep().read(), Err(ModuleError::Closed)));
}

#[test]
fn response_frames_are_plain_frames() {
    // Sanity check on the helpers used throughout these tests.
    let frame: Frame = ok(PING, &[1, 2]);
    assert_eq!(frame.code, 0x83);
    assert_eq!(frame.payload.as_ref(), &[0, 1, 2]);
}
