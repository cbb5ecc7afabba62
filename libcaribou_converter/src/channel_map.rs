// The AD9249 readout order does not follow the pixel matrix. ADC half 0 carries the
// A1 C1 E1 ... channels and half 1 the B1 D1 F1 ... channels, which are wired to the 4x4
// matrix as:
//
// A2, H2, F2, H1
// C1, A1, D2, F1
// C2, E1, B1, B2
// E2, G1, G2, D1
//
// The table below is indexed by digitizer channel (half * 8 + channel) and gives the
// (column, row) of the pixel. It is fixed by the hardware and shared by every event.
use super::constants::NUMBER_OF_CHANNELS;

const PIXEL_MAP: [(u32, u32); NUMBER_OF_CHANNELS] = [
    (1, 2),
    (0, 2),
    (1, 1),
    (1, 0),
    (0, 3),
    (0, 1),
    (0, 0),
    (2, 0),
    (2, 1),
    (3, 0),
    (3, 2),
    (3, 3),
    (3, 1),
    (2, 2),
    (2, 3),
    (1, 3),
];

/// The configuration key of the calibration formula for the pixel at (column, row),
/// e.g. `calibration_px12`
pub fn calibration_key(column: u32, row: u32) -> String {
    format!("calibration_px{column}{row}")
}

/// Iterate over all (channel, (column, row)) pairs in channel order
pub fn channels() -> impl Iterator<Item = (usize, (u32, u32))> {
    PIXEL_MAP.iter().copied().enumerate()
}
