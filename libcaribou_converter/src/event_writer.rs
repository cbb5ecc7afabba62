use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::error::EventWriterError;
use super::standard_event::StandardEvent;

const DOCUMENT_SEPARATOR: &str = "---\n";

/// A simple struct which writes converted StandardEvents to a YAML stream.
///
/// Each event is its own YAML document, so the output can be read back lazily with any
/// multi-document YAML reader.
#[derive(Debug)]
pub struct EventWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    events_written: u64,
    bytes_written: u64,
    first_time: Option<i64>,
    last_time: i64,
}

impl EventWriter {
    /// Create the writer, truncating any file already at path
    pub fn new(path: &Path) -> Result<Self, EventWriterError> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            events_written: 0,
            bytes_written: 0,
            first_time: None,
            last_time: 0,
        })
    }

    /// Append an event as a new YAML document
    pub fn write_event(&mut self, event: &StandardEvent) -> Result<(), EventWriterError> {
        let document = serde_yaml::to_string(event)?;
        self.writer.write_all(DOCUMENT_SEPARATOR.as_bytes())?;
        self.writer.write_all(document.as_bytes())?;
        self.bytes_written += (DOCUMENT_SEPARATOR.len() + document.len()) as u64;

        if self.first_time.is_none() {
            self.first_time = Some(event.time_begin());
        }
        self.last_time = event.time_end();
        self.events_written += 1;
        Ok(())
    }

    pub fn events_written(&self) -> u64 {
        self.events_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush everything to disk and report, consume the writer
    pub fn close(mut self) -> Result<u64, EventWriterError> {
        self.writer.flush()?;
        spdlog::info!(
            "{} events written to {} ({}).",
            self.events_written,
            self.path.to_string_lossy(),
            human_bytes::human_bytes(self.bytes_written as f64)
        );
        if let Some(first_time) = self.first_time {
            spdlog::info!(
                "Events span {} us.",
                self.last_time.saturating_sub(first_time) / 1_000_000 // Event times are in ps
            );
        }
        Ok(self.events_written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::standard_event::StandardPlane;
    use serde::Deserialize;

    #[test]
    fn test_documents_read_back() {
        let path = std::env::temp_dir().join(format!("caribou_writer_{}.yml", std::process::id()));
        let mut writer = EventWriter::new(&path).unwrap();
        for trigger in 0..3 {
            let mut event = StandardEvent::new();
            let mut plane = StandardPlane::new(0, "Caribou", "AD9249");
            plane.set_size_zs(4, 4, 0);
            plane.push_pixel(1, 0, 1000.0, 42);
            event.add_plane(plane);
            event.set_trigger_number(trigger);
            event.set_time_begin(trigger as i64 * 5_000_000);
            event.set_time_end(trigger as i64 * 5_000_000);
            writer.write_event(&event).unwrap();
        }
        assert_eq!(writer.close().unwrap(), 3);

        let text = std::fs::read_to_string(&path).unwrap();
        let events: Vec<StandardEvent> = serde_yaml::Deserializer::from_str(&text)
            .map(|doc| StandardEvent::deserialize(doc).unwrap())
            .collect();
        assert_eq!(events.len(), 3);
        assert_eq!(events[2].trigger_number(), 2);
        assert_eq!(events[1].planes()[0].pixels()[0].value, 1000.0);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_close_with_extreme_times() {
        let path = std::env::temp_dir().join(format!(
            "caribou_writer_extreme_{}.yml",
            std::process::id()
        ));
        let mut writer = EventWriter::new(&path).unwrap();
        for time in [i64::MIN, i64::MAX] {
            let mut event = StandardEvent::new();
            event.set_time_begin(time);
            event.set_time_end(time);
            writer.write_event(&event).unwrap();
        }
        assert_eq!(writer.events_written(), 2);
        assert_eq!(writer.close().unwrap(), 2);
        let _ = std::fs::remove_file(&path);
    }
}
