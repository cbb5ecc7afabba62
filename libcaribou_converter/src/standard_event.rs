use serde::{Deserialize, Serialize};

/// A single hit in a StandardPlane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pixel {
    pub column: u32,
    pub row: u32,
    pub value: f64,
    pub timestamp: Option<u64>,
}

/// StandardPlane holds the data of one physical sensor within a StandardEvent.
///
/// Pixels are stored sparsely (zero-suppressed). The plane also declares its
/// addressable size so downstream tools can book histograms without looking at data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardPlane {
    id: u32,
    system: String,
    sensor: String,
    x_size: u32,
    y_size: u32,
    n_frames: u32,
    pixels: Vec<Pixel>,
}

impl StandardPlane {
    /// Create an empty plane for a sensor
    pub fn new(id: u32, system: &str, sensor: &str) -> Self {
        Self {
            id,
            system: system.to_string(),
            sensor: sensor.to_string(),
            x_size: 0,
            y_size: 0,
            n_frames: 0,
            pixels: Vec::new(),
        }
    }

    /// Declare the zero-suppressed size of the plane
    pub fn set_size_zs(&mut self, x_size: u32, y_size: u32, n_frames: u32) {
        self.x_size = x_size;
        self.y_size = y_size;
        self.n_frames = n_frames;
    }

    /// Append a hit with a per-pixel timestamp
    pub fn push_pixel(&mut self, column: u32, row: u32, value: f64, timestamp: u64) {
        self.pixels.push(Pixel {
            column,
            row,
            value,
            timestamp: Some(timestamp),
        });
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn sensor(&self) -> &str {
        &self.sensor
    }

    pub fn x_size(&self) -> u32 {
        self.x_size
    }

    pub fn y_size(&self) -> u32 {
        self.y_size
    }

    pub fn n_frames(&self) -> u32 {
        self.n_frames
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    pub fn hit_pixels(&self) -> usize {
        self.pixels.len()
    }
}

/// StandardEvent is the detector-agnostic target of every converter.
///
/// Converters append planes and set the trigger and timing fields. They never remove
/// planes that another converter already added.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardEvent {
    detector_type: String,
    time_begin: i64,
    time_end: i64,
    trigger_number: u64,
    planes: Vec<StandardPlane>,
}

impl StandardEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_plane(&mut self, plane: StandardPlane) {
        self.planes.push(plane);
    }

    pub fn set_detector_type(&mut self, detector_type: &str) {
        self.detector_type = detector_type.to_string();
    }

    pub fn set_time_begin(&mut self, time: i64) {
        self.time_begin = time;
    }

    pub fn set_time_end(&mut self, time: i64) {
        self.time_end = time;
    }

    pub fn set_trigger_number(&mut self, trigger: u64) {
        self.trigger_number = trigger;
    }

    pub fn detector_type(&self) -> &str {
        &self.detector_type
    }

    pub fn time_begin(&self) -> i64 {
        self.time_begin
    }

    pub fn time_end(&self) -> i64 {
        self.time_end
    }

    pub fn trigger_number(&self) -> u64 {
        self.trigger_number
    }

    pub fn planes(&self) -> &[StandardPlane] {
        &self.planes
    }

    pub fn num_planes(&self) -> usize {
        self.planes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planes_accumulate() {
        let mut event = StandardEvent::new();
        let mut first = StandardPlane::new(0, "Caribou", "AD9249");
        first.set_size_zs(4, 4, 0);
        first.push_pixel(1, 2, 10.0, 99);
        event.add_plane(first);
        event.add_plane(StandardPlane::new(1, "Caribou", "CLICTD"));

        assert_eq!(event.num_planes(), 2);
        let plane = &event.planes()[0];
        assert_eq!((plane.x_size(), plane.y_size(), plane.n_frames()), (4, 4, 0));
        assert_eq!(
            plane.pixels()[0],
            Pixel {
                column: 1,
                row: 2,
                value: 10.0,
                timestamp: Some(99)
            }
        );
        assert_eq!(event.planes()[1].sensor(), "CLICTD");
    }
}
