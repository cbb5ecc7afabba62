// Registry names
pub const AD9249_EVENT_NAME: &str = "CaribouAD9249Event";
pub const AD9249_DETECTOR_TYPE: &str = "AD9249";
pub const CARIBOU_SYSTEM_NAME: &str = "Caribou";

// AD9249 block layout
pub const BURST_LENGTH_OFFSET: usize = 2;
pub const SUB_BLOCK_SIZE_OFFSET: usize = 4;
pub const SUB_BLOCK_HEADER_SIZE: usize = 8;
pub const SAMPLES_PER_BURST: usize = 128;
pub const BYTES_PER_SAMPLE: usize = 2;
pub const EVENT_TRAILER_SIZE: usize = 16;

// AD9249 electronics
pub const NUMBER_OF_ADC_HALVES: usize = 2;
pub const CHANNELS_PER_HALF: usize = 8;
pub const NUMBER_OF_CHANNELS: usize = NUMBER_OF_ADC_HALVES * CHANNELS_PER_HALF;
pub const STATUS_CHANNEL: usize = 7; // within each half, carries status bits only
pub const MAGNITUDE_BITS: usize = 14;
pub const STATUS_BITS: usize = 2;
pub const TIMESTAMP_FIELDS: usize = 28;
pub const TIMESTAMP_START_WINDOW: usize = 8;
pub const CLOCK_FREQUENCY_MHZ: f64 = 65.0;
pub const PICOSECONDS_PER_MICROSECOND: f64 = 1e6;

// Pixel matrix
pub const MATRIX_COLUMNS: u32 = 4;
pub const MATRIX_ROWS: u32 = 4;
