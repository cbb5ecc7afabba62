use std::sync::mpsc::Sender;

use super::config::Config;
use super::converter::StreamContext;
use super::detector_id::DetectorId;
use super::error::ProcessorError;
use super::event_writer::EventWriter;
use super::raw_stack::RawStack;
use super::registry::ConverterRegistry;
use super::standard_event::StandardEvent;
use super::worker_status::{WorkerStage, WorkerStatus};

/// Tally of a finished conversion stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    /// Raw events read from the stack
    pub events_read: u64,
    /// Events converted and written
    pub events_converted: u64,
    /// Events the converter declined (truncated data, dump mode)
    pub events_dropped: u64,
    /// Size of the raw data
    pub total_bytes: u64,
}

/// The main loop of caribou_converter.
///
/// Streams every raw event of the configured directory through the converter for the
/// configured detector type, with one StreamContext for the whole stream, and writes the
/// converted events. Progress is reported through `tx`.
pub fn process_stream(
    config: &Config,
    registry: &ConverterRegistry,
    tx: &Sender<WorkerStatus>,
) -> Result<ProcessSummary, ProcessorError> {
    if registry.is_empty() {
        spdlog::warn!("No converters are registered");
    } else {
        spdlog::debug!(
            "{} converters registered: {}",
            registry.len(),
            registry.names().join(", ")
        );
    }
    let converter = registry.resolve(DetectorId::from_name(&config.detector_type))?;
    let conf = config.converter_configuration()?;
    let mut stack = RawStack::new(&config.raw_path, &config.detector_type)?;
    let mut writer = EventWriter::new(&config.output_path)?;
    spdlog::debug!("Writing events to {}", writer.path().to_string_lossy());
    let mut ctx = StreamContext::new();

    let mut summary = ProcessSummary {
        total_bytes: stack.total_stack_size_bytes,
        ..Default::default()
    };
    spdlog::info!(
        "Converting {} events ({}) with {}",
        stack.remaining(),
        human_bytes::human_bytes(summary.total_bytes as f64),
        converter.name()
    );

    let flush_frac: f32 = 0.01;
    let flush_val = (summary.total_bytes as f64 * flush_frac as f64) as u64;
    let mut count: u64 = 0;
    let mut bytes_done: u64 = 0;

    tx.send(WorkerStatus::new(0.0, 0, WorkerStage::Starting))?;
    while let Some(raw) = stack.get_next_event()? {
        summary.events_read += 1;
        let size = raw.size_bytes() as u64;
        count += size;
        bytes_done += size;
        if count > flush_val {
            count = 0;
            tx.send(WorkerStatus::new(
                bytes_done as f32 / summary.total_bytes.max(1) as f32,
                summary.events_read,
                WorkerStage::Converting,
            ))?;
        }

        let mut event = StandardEvent::new();
        if converter.convert(&raw, &mut event, &conf, &mut ctx)? {
            writer.write_event(&event)?;
            summary.events_converted += 1;
        } else {
            summary.events_dropped += 1;
        }
    }
    writer.close()?;

    tx.send(WorkerStatus::new(
        1.0,
        summary.events_read,
        WorkerStage::Finished,
    ))?;
    spdlog::info!(
        "Done: {} events read, {} converted, {} dropped.",
        summary.events_read,
        summary.events_converted,
        summary.events_dropped
    );
    Ok(summary)
}

/// The function to be called by a separate thread (typically the CLI).
/// Uses the converters shipped with this library.
pub fn process(config: Config, tx: Sender<WorkerStatus>) -> Result<ProcessSummary, ProcessorError> {
    let registry = ConverterRegistry::with_builtin_converters()?;
    process_stream(&config, &registry, &tx)
}
