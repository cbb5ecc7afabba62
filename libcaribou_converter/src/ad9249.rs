//! Converter for the AD9249 16-channel, 65 MSPS digitizer read out through Caribou.
//!
//! Block 0 of a raw event holds a 4 byte event header (2 reserved bytes and the burst
//! length), then one sub-block per ADC half. Each sub-block starts with an 8 byte header
//! whose last 4 bytes are the little-endian size of the sample data that follows. Samples
//! are interleaved over the 8 channels of the half; channel 7 of each half carries only
//! status bits, which encode the trigger timestamp.
use byteorder::{ByteOrder, LittleEndian};
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::bit_reader::{to_bit_string, SampleReader};
use super::calibration::CalibrationFunction;
use super::channel_map::{calibration_key, channels};
use super::config::Configuration;
use super::constants::*;
use super::converter::{Converter, StreamContext};
use super::error::{ConfigError, ConverterError};
use super::raw_event::RawEvent;
use super::standard_event::{StandardEvent, StandardPlane};
use super::waveform::{PulseWindows, Waveform};

// Defaults for the configuration parameters
const DEFAULT_BL_START: i64 = 150;
const DEFAULT_BL_END: i64 = 80;
const DEFAULT_AMP_START: i64 = 170;
const DEFAULT_AMP_END: i64 = 270;
const DEFAULT_CALIB_RANGE_MIN: f64 = 0.0;
const DEFAULT_CALIB_RANGE_MAX: f64 = 16384.0;
const DEFAULT_CALIBRATION: &str = "x";

/// Convert a timestamp in 65 MHz clock cycles to picoseconds, rounding down.
///
/// Above about 1.2e15 cycles the result no longer fits a u64 and saturates at `u64::MAX`.
pub fn clock_to_picoseconds(cycles: u64) -> u64 {
    let picoseconds = cycles as u128 * PICOSECONDS_PER_MICROSECOND as u128
        / CLOCK_FREQUENCY_MHZ as u128;
    u64::try_from(picoseconds).unwrap_or(u64::MAX)
}

/// Size in bytes a block must at least have for a given burst length
pub fn expected_block_size(burst_length: u16) -> usize {
    burst_length as usize * SAMPLES_PER_BURST * BYTES_PER_SAMPLE * NUMBER_OF_CHANNELS
        + EVENT_TRAILER_SIZE
}

/// AD9249Settings are the converter parameters, captured from the Configuration on the
/// first event of a stream.
#[derive(Debug, Clone)]
pub struct AD9249Settings {
    pub windows: PulseWindows,
    pub calib_range_min: f64,
    pub calib_range_max: f64,
    pub waveform_filename: Option<PathBuf>,
    pub zero_suppression: bool,
    calibrations: Vec<CalibrationFunction>,
}

impl AD9249Settings {
    /// Read and validate the settings
    pub fn from_configuration(conf: &Configuration) -> Result<Self, ConverterError> {
        let bl_start = conf.get("blStart", DEFAULT_BL_START);
        let bl_end = conf.get("blEnd", DEFAULT_BL_END);
        let amp_start = conf.get("ampStart", DEFAULT_AMP_START);
        let amp_end = conf.get("ampEnd", DEFAULT_AMP_END);
        let calib_range_min = conf.get("calib_range_min", DEFAULT_CALIB_RANGE_MIN);
        let calib_range_max = conf.get("calib_range_max", DEFAULT_CALIB_RANGE_MAX);
        let waveform_filename = conf.get_string("waveform_filename", "");
        let zero_suppression = conf.get("zero_suppression", true);

        if bl_end < 0 || bl_start <= bl_end {
            return Err(ConfigError::InvalidWindow(format!(
                "baseline window needs 0 <= blEnd < blStart, got blStart = {bl_start}, blEnd = {bl_end}"
            ))
            .into());
        }
        if amp_start < 0 || amp_start >= amp_end {
            return Err(ConfigError::InvalidWindow(format!(
                "amplitude window needs 0 <= ampStart < ampEnd, got ampStart = {amp_start}, ampEnd = {amp_end}"
            ))
            .into());
        }

        let mut calibrations = Vec::with_capacity(NUMBER_OF_CHANNELS);
        for (_, (column, row)) in channels() {
            let name = calibration_key(column, row);
            let formula = conf.get_string(&name, DEFAULT_CALIBRATION);
            calibrations.push(CalibrationFunction::new(
                &name,
                &formula,
                calib_range_min,
                calib_range_max,
            )?);
        }

        let settings = Self {
            windows: PulseWindows {
                bl_start: bl_start as usize,
                bl_end: bl_end as usize,
                amp_start: amp_start as usize,
                amp_end: amp_end as usize,
            },
            calib_range_min,
            calib_range_max,
            waveform_filename: if waveform_filename.is_empty() {
                None
            } else {
                Some(PathBuf::from(waveform_filename))
            },
            zero_suppression,
            calibrations,
        };
        settings.log();
        Ok(settings)
    }

    /// Calibration function of a digitizer channel
    pub fn calibration(&self, channel: usize) -> Option<&CalibrationFunction> {
        self.calibrations.get(channel)
    }

    fn log(&self) {
        spdlog::debug!("Using configuration:");
        spdlog::debug!(" blStart   = {}", self.windows.bl_start);
        spdlog::debug!(" blEnd     = {}", self.windows.bl_end);
        spdlog::debug!(" ampStart  = {}", self.windows.amp_start);
        spdlog::debug!(" ampEnd    = {}", self.windows.amp_end);
        spdlog::debug!(" calib_range_min = {}", self.calib_range_min);
        spdlog::debug!(" calib_range_max = {}", self.calib_range_max);
        spdlog::debug!(" zero_suppression = {}", self.zero_suppression);
        if let Some(path) = &self.waveform_filename {
            spdlog::debug!(" waveform_filename = {}", path.to_string_lossy());
        }
        spdlog::debug!("Calibration functions: ");
        for calib in self.calibrations.iter() {
            spdlog::debug!("{} {}", calib.name(), calib.formula());
        }
    }
}

/// AD9249State is everything the converter carries from one event of a stream to the next
#[derive(Debug)]
pub struct AD9249State {
    settings: AD9249Settings,
    trigger: u64,
    run_start_time: u64,
}

impl AD9249State {
    fn new(settings: AD9249Settings) -> Self {
        Self {
            settings,
            trigger: 0,
            run_start_time: 0,
        }
    }

    pub fn settings(&self) -> &AD9249Settings {
        &self.settings
    }

    /// Number of events processed so far (the trigger number of the next event)
    pub fn trigger(&self) -> u64 {
        self.trigger
    }

    /// Timestamp (ps) that converted event times are relative to
    pub fn run_start_time(&self) -> u64 {
        self.run_start_time
    }
}

/// The result of demultiplexing one ADC half
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HalfStatus {
    /// Timestamp in picoseconds
    pub timestamp: u64,
    /// Raw timestamp in clock cycles, before conversion
    pub raw_timestamp: u64,
    /// A trigger flag was seen on the status channel
    pub trigger_seen: bool,
}

/// A decoded data block: one waveform per digitizer channel plus the status of each half
#[derive(Debug, Clone)]
pub struct DecodedBlock {
    pub burst_length: u16,
    pub waveforms: Vec<Waveform>,
    pub halves: [HalfStatus; NUMBER_OF_ADC_HALVES],
}

impl DecodedBlock {
    /// The event timestamp. Both halves carry one; half 0 is used.
    pub fn timestamp(&self) -> u64 {
        self.halves[0].timestamp
    }
}

/// Demultiplex the samples of one ADC half into `samples` and reconstruct its timestamp.
///
/// Every data channel word contributes its 2 status bits to the timestamp, least
/// significant first, until 28 fields are collected. While fewer than 8 fields are
/// collected, a status channel word without the start flag restarts the field index; the
/// value collected so far is kept.
fn decode_half(half: usize, data: &[u8], samples: &mut [Vec<i16>]) -> HalfStatus {
    let mut ts_index = 0;
    let mut raw_timestamp: u64 = 0;
    let mut trigger_seen = false;

    let reader = SampleReader::new(data);
    if reader.is_empty() {
        spdlog::debug!("ADC half {} has no samples", half);
    }

    for (idx, word) in reader.words().enumerate() {
        let channel = idx % CHANNELS_PER_HALF;
        samples[half * CHANNELS_PER_HALF + channel].push(word.magnitude as i16);

        if channel == STATUS_CHANNEL && word.is_trigger() {
            trigger_seen = true;
        }

        if ts_index >= TIMESTAMP_FIELDS {
            continue;
        }

        if channel == STATUS_CHANNEL {
            if ts_index < TIMESTAMP_START_WINDOW && !word.is_timestamp_start() {
                ts_index = 0;
            }
        } else {
            raw_timestamp =
                raw_timestamp.wrapping_add((word.status as u64) << (STATUS_BITS * ts_index));
            ts_index += 1;
        }
    }

    spdlog::trace!(
        "ADC half {} timestamp bits {}",
        half,
        to_bit_string(raw_timestamp, STATUS_BITS * TIMESTAMP_FIELDS)
    );

    HalfStatus {
        timestamp: clock_to_picoseconds(raw_timestamp),
        raw_timestamp,
        trigger_seen,
    }
}

/// Size field of the sub-block whose header starts at `header_start`
fn read_sub_block_size(data: &[u8], header_start: usize) -> Option<usize> {
    let start = header_start.checked_add(SUB_BLOCK_SIZE_OFFSET)?;
    let field = data.get(start..start + 4)?;
    Some(LittleEndian::read_u32(field) as usize)
}

/// Decode an AD9249 data block.
///
/// Returns None if the block is shorter than its burst length requires, or if a sub-block
/// size points past the end of the block.
pub fn decode_block(data: &[u8]) -> Option<DecodedBlock> {
    let burst_length =
        LittleEndian::read_u16(data.get(BURST_LENGTH_OFFSET..BURST_LENGTH_OFFSET + 2)?);
    if data.len() < expected_block_size(burst_length) {
        return None;
    }

    let size0 = read_sub_block_size(data, 0)?;
    let start0 = SUB_BLOCK_HEADER_SIZE;
    let end0 = start0.checked_add(size0)?;
    let size1 = read_sub_block_size(data, end0)?;
    let start1 = end0 + SUB_BLOCK_HEADER_SIZE;
    let end1 = start1.checked_add(size1)?;
    let sub_blocks = [data.get(start0..end0)?, data.get(start1..end1)?];

    let mut samples: Vec<Vec<i16>> = vec![Vec::new(); NUMBER_OF_CHANNELS];
    let halves = [
        decode_half(0, sub_blocks[0], &mut samples),
        decode_half(1, sub_blocks[1], &mut samples),
    ];

    let waveforms = samples
        .into_iter()
        .enumerate()
        .map(|(channel, data)| {
            Waveform::new(data, (channel / CHANNELS_PER_HALF) as u32).with_scale(
                1.0 / CLOCK_FREQUENCY_MHZ,
                0.0,
                1.0,
                0.0,
            )
        })
        .collect();

    Some(DecodedBlock {
        burst_length,
        waveforms,
        halves,
    })
}

/// Append the waveforms of one event to a text file, one line per channel:
/// `<trigger> <channel> <column> <row> : <samples...>`
fn dump_waveforms(path: &Path, trigger: u64, waveforms: &[Waveform]) -> Result<(), std::io::Error> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = BufWriter::new(file);
    for (waveform, (channel, (column, row))) in waveforms.iter().zip(channels()) {
        write!(writer, "{trigger} {channel} {column} {row} : ")?;
        for sample in waveform.samples().iter() {
            write!(writer, "{sample} ")?;
        }
        writeln!(writer)?;
    }
    writer.flush()
}

/// AD9249Converter turns Caribou AD9249 raw events into a single 4x4 plane of calibrated
/// pulse amplitudes.
#[derive(Debug, Clone, Copy, Default)]
pub struct AD9249Converter;

impl AD9249Converter {
    /// Registry factory
    pub fn factory() -> Box<dyn Converter> {
        Box::new(Self)
    }
}

impl Converter for AD9249Converter {
    fn name(&self) -> &'static str {
        AD9249_EVENT_NAME
    }

    fn convert(
        &self,
        raw: &RawEvent,
        event: &mut StandardEvent,
        conf: &Configuration,
        ctx: &mut StreamContext,
    ) -> Result<bool, ConverterError> {
        let state = ctx.state_or_try_init(|| {
            Ok(AD9249State::new(AD9249Settings::from_configuration(conf)?))
        })?;

        spdlog::debug!(
            "Decoding AD event {} trig {}",
            raw.event_number(),
            state.trigger
        );

        let block = match raw.block(0) {
            Some(block) => block,
            None => {
                spdlog::debug!("Event {} has no data block", raw.event_number());
                return Ok(false);
            }
        };

        let decoded = match decode_block(block) {
            Some(decoded) => decoded,
            None => {
                spdlog::debug!(
                    "Event {} with {} bytes is not a complete AD9249 block",
                    raw.event_number(),
                    block.len()
                );
                return Ok(false);
            }
        };
        spdlog::debug!("Burst: {}", decoded.burst_length);
        if decoded.halves[0].trigger_seen {
            spdlog::debug!("Trigger flag seen in event {}", raw.event_number());
        }

        let timestamp = decoded.timestamp();
        if state.trigger <= 1 {
            state.run_start_time = timestamp;
        }

        // Dump mode never produces standard events
        if let Some(path) = &state.settings.waveform_filename {
            dump_waveforms(path, state.trigger, &decoded.waveforms)?;
            state.trigger += 1;
            return Ok(false);
        }

        let settings = &state.settings;
        let mut plane = StandardPlane::new(0, CARIBOU_SYSTEM_NAME, AD9249_DETECTOR_TYPE);
        plane.set_size_zs(MATRIX_COLUMNS, MATRIX_ROWS, 0);

        for (waveform, (channel, (column, row))) in decoded.waveforms.iter().zip(channels()) {
            let Some(calib) = settings.calibration(channel) else {
                continue;
            };
            let pulse = match waveform.find_pulse(&settings.windows) {
                Some(pulse) => pulse,
                None => {
                    spdlog::debug!("  Skipping channel {} max too early", channel);
                    continue;
                }
            };
            let amplitude = calib.eval_clipped(pulse.amplitude());
            if settings.zero_suppression && amplitude == 0.0 {
                continue;
            }
            plane.push_pixel(column, row, amplitude, timestamp);
        }

        event.add_plane(plane);

        // Unsigned wrapping difference, read as signed: events before the run start are negative
        let relative_time = timestamp.wrapping_sub(state.run_start_time) as i64;
        event.set_time_begin(relative_time);
        event.set_time_end(relative_time);
        event.set_trigger_number(state.trigger);
        state.trigger += 1;

        event.set_detector_type(AD9249_DETECTOR_TYPE);
        Ok(true)
    }
}
