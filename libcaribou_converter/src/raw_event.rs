use super::detector_id::DetectorId;

/// RawEvent is the detector output for a single trigger, as delivered by a producer.
///
/// It is an ordered list of opaque binary blocks plus the event number and the
/// detector-type tag. Once constructed it is never modified; converters only read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    event_number: u32,
    detector_type: String,
    blocks: Vec<Vec<u8>>,
}

impl RawEvent {
    /// Create a new RawEvent
    pub fn new(event_number: u32, detector_type: &str, blocks: Vec<Vec<u8>>) -> Self {
        Self {
            event_number,
            detector_type: detector_type.to_string(),
            blocks,
        }
    }

    pub fn event_number(&self) -> u32 {
        self.event_number
    }

    pub fn detector_type(&self) -> &str {
        &self.detector_type
    }

    /// The registry identifier for this event's detector type
    pub fn detector_id(&self) -> DetectorId {
        DetectorId::from_name(&self.detector_type)
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Get a block by index. Returns None if the event has fewer blocks
    pub fn block(&self, index: usize) -> Option<&[u8]> {
        self.blocks.get(index).map(|b| b.as_slice())
    }

    /// Total size of all blocks in bytes
    pub fn size_bytes(&self) -> usize {
        self.blocks.iter().map(|b| b.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_access() {
        let raw = RawEvent::new(3, "CaribouAD9249Event", vec![vec![1, 2, 3], vec![4]]);
        assert_eq!(raw.event_number(), 3);
        assert_eq!(raw.num_blocks(), 2);
        assert_eq!(raw.block(1), Some([4u8].as_slice()));
        assert_eq!(raw.block(2), None);
        assert_eq!(raw.size_bytes(), 4);
        assert_eq!(
            raw.detector_id(),
            DetectorId::from_name("CaribouAD9249Event")
        );
    }
}
