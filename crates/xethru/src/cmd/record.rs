use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};
use xethru_module::{DataMessage, OutputControl, OutputFeature, SensorMode, X4M200};

use crate::cmd::{connect, parse_duration, RecordArgs, RecordOutput};
use crate::exit::{module_error, CliError, CliResult, INTERNAL, SUCCESS, TIMEOUT};
use crate::output::{MessagePrinter, OutputFormat};

/// How long one queue read blocks before Ctrl-C is checked again.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

impl RecordOutput {
    pub fn feature(self) -> OutputFeature {
        match self {
            RecordOutput::Respiration => OutputFeature::RespirationStatus,
            RecordOutput::Sleep => OutputFeature::SleepStatus,
            RecordOutput::MovingList => OutputFeature::RespirationMovingList,
            RecordOutput::DetectionList => OutputFeature::RespirationDetectionList,
            RecordOutput::BasebandAp => OutputFeature::BasebandAmplitudePhase,
            RecordOutput::BasebandIq => OutputFeature::BasebandIq,
            RecordOutput::PulseDopplerFloat => OutputFeature::PulseDopplerFloat,
            RecordOutput::PulseDopplerByte => OutputFeature::PulseDopplerByte,
            RecordOutput::NoisemapFloat => OutputFeature::NoisemapFloat,
            RecordOutput::NoisemapByte => OutputFeature::NoisemapByte,
        }
    }

    fn next(self, radar: &X4M200, timeout: Duration) -> xethru_module::Result<Option<DataMessage>> {
        let message = match self {
            RecordOutput::Respiration => radar
                .respiration_legacy()
                .read_timeout(timeout)?
                .map(DataMessage::RespirationLegacy),
            RecordOutput::Sleep => radar.sleep().read_timeout(timeout)?.map(DataMessage::Sleep),
            RecordOutput::MovingList => radar
                .respiration_moving_list()
                .read_timeout(timeout)?
                .map(DataMessage::RespirationMovingList),
            RecordOutput::DetectionList => radar
                .respiration_detection_list()
                .read_timeout(timeout)?
                .map(DataMessage::RespirationDetectionList),
            RecordOutput::BasebandAp => radar
                .baseband_ap()
                .read_timeout(timeout)?
                .map(DataMessage::BasebandAmplitudePhase),
            RecordOutput::BasebandIq => radar
                .baseband_iq()
                .read_timeout(timeout)?
                .map(DataMessage::BasebandIq),
            RecordOutput::PulseDopplerFloat => radar
                .pulse_doppler_float()
                .read_timeout(timeout)?
                .map(DataMessage::PulseDopplerFloat),
            RecordOutput::PulseDopplerByte => radar
                .pulse_doppler_byte()
                .read_timeout(timeout)?
                .map(DataMessage::PulseDopplerByte),
            RecordOutput::NoisemapFloat => radar
                .noisemap_float()
                .read_timeout(timeout)?
                .map(DataMessage::NoisemapFloat),
            RecordOutput::NoisemapByte => radar
                .noisemap_byte()
                .read_timeout(timeout)?
                .map(DataMessage::NoisemapByte),
        };
        Ok(message)
    }
}

pub fn run(args: RecordArgs, format: OutputFormat) -> CliResult<i32> {
    let data_timeout = parse_duration(&args.data_timeout)?;
    let radar = connect(&args.link)?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(Arc::clone(&running))?;

    let result = start(&radar, &args)
        .and_then(|()| stream(&radar, &args, data_timeout, &running, format));

    // The sensor keeps streaming after we disconnect unless told otherwise.
    if !radar.is_closed() {
        if let Err(err) = radar.set_sensor_mode(SensorMode::Stopped, 0) {
            warn!(error = %err, "failed to stop the sensor");
        }
    }
    let stats = radar.stats();
    radar.close();
    info!(
        corrupt_frames = stats.corrupt_frames,
        discarded_bytes = stats.discarded_bytes,
        "recording stopped"
    );

    result.map(|()| SUCCESS)
}

fn start(radar: &X4M200, args: &RecordArgs) -> CliResult<()> {
    radar
        .load_profile(args.profile.id())
        .map_err(|err| module_error("load profile failed", err))?;
    if let Some(sensitivity) = args.sensitivity {
        radar
            .set_sensitivity(sensitivity)
            .map_err(|err| module_error("set sensitivity failed", err))?;
    }
    if let (Some(start), Some(end)) = (args.zone_start, args.zone_end) {
        radar
            .set_detection_zone(start, end)
            .map_err(|err| module_error("set detection zone failed", err))?;
    }
    radar
        .set_output_control(args.output.feature(), OutputControl::ENABLE)
        .map_err(|err| module_error("enable output failed", err))?;
    radar
        .set_sensor_mode(SensorMode::Running, 0)
        .map_err(|err| module_error("run failed", err))?;
    info!(profile = ?args.profile, output = ?args.output, "recording");
    Ok(())
}

fn stream(
    radar: &X4M200,
    args: &RecordArgs,
    data_timeout: Duration,
    running: &AtomicBool,
    format: OutputFormat,
) -> CliResult<()> {
    let mut printer = MessagePrinter::new(format);
    let mut printed = 0usize;
    let mut last_message = Instant::now();

    while running.load(Ordering::SeqCst) {
        let next = args
            .output
            .next(radar, POLL_INTERVAL.min(data_timeout))
            .map_err(|err| module_error("receive failed", err));
        let message = match next {
            Ok(message) => message,
            Err(err) => {
                printer.finish();
                return Err(err);
            }
        };

        let Some(message) = message else {
            if last_message.elapsed() >= data_timeout {
                printer.finish();
                return Err(CliError::new(
                    TIMEOUT,
                    format!("no data received for {data_timeout:?}"),
                ));
            }
            continue;
        };

        printer.print(&message);
        printed = printed.saturating_add(1);
        last_message = Instant::now();
        if args.count.is_some_and(|count| printed >= count) {
            break;
        }
    }

    printer.finish();
    Ok(())
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
