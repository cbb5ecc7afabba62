use super::error::RawStackError;
use super::raw_event::RawEvent;

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

const RAW_EXTENSION: &str = "raw";

/// RawStacks are the source of raw events for a stream.
///
/// The raw data directory holds one file per event, each file being the payload of the
/// event's first data block. The stack is the sorted collection of all of them, read one
/// at a time and tagged with the detector type they were recorded with.
#[derive(Debug)]
pub struct RawStack {
    pub file_stack: VecDeque<PathBuf>,
    pub total_stack_size_bytes: u64,
    detector_type: String,
    event_counter: u32,
}

impl RawStack {
    /// Create a new RawStack for a raw data directory
    pub fn new(path: &Path, detector_type: &str) -> Result<Self, RawStackError> {
        if !path.is_dir() {
            return Err(RawStackError::BadFilePath(path.to_path_buf()));
        }
        let (file_stack, total_stack_size_bytes) = Self::get_file_stack(path)?;
        Ok(Self {
            file_stack,
            total_stack_size_bytes,
            detector_type: detector_type.to_string(),
            event_counter: 0,
        })
    }

    /// Get the next raw event in the stack
    ///
    /// Returns a `Result<Option<RawEvent>>`. The Option is None if the stack has
    /// no more data.
    pub fn get_next_event(&mut self) -> Result<Option<RawEvent>, RawStackError> {
        let Some(file_path) = self.file_stack.pop_front() else {
            return Ok(None);
        };
        let block = std::fs::read(&file_path)?;
        let event = RawEvent::new(self.event_counter, &self.detector_type, vec![block]);
        self.event_counter += 1;
        Ok(Some(event))
    }

    /// Number of events left in the stack
    pub fn remaining(&self) -> usize {
        self.file_stack.len()
    }

    /// Get all of the .raw files and put them in the stack
    fn get_file_stack(parent_path: &Path) -> Result<(VecDeque<PathBuf>, u64), RawStackError> {
        let mut file_list: Vec<PathBuf> = Vec::new();
        let mut total_stack_size_bytes = 0;
        for item in parent_path.read_dir()? {
            let item = item?;
            let item_path = item.path();
            if item_path.extension().is_some_and(|ext| ext == RAW_EXTENSION) {
                total_stack_size_bytes += item.metadata()?.len();
                file_list.push(item_path);
            }
        }

        if file_list.is_empty() {
            return Err(RawStackError::NoMatchingFiles);
        }

        file_list.sort(); // Event files are numbered, so the standard sort gives the order
        Ok((file_list.into(), total_stack_size_bytes))
    }
}
