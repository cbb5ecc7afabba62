//! Bit level access to digitizer sample words.
//!
//! The AD9249 readout packs each sample into a little-endian 16-bit word whose low 14 bits
//! are the ADC magnitude and whose top 2 bits are status flags. The fields are not byte
//! aligned and are read through a `bitvec` view of the raw bytes.
use bitvec::prelude::*;

use super::constants::{BYTES_PER_SAMPLE, MAGNITUDE_BITS, STATUS_BITS};

const WORD_BITS: usize = BYTES_PER_SAMPLE * 8;

/// Status flag: start of a timestamp frame
pub const STATUS_TIMESTAMP_START: u8 = 0b01;
/// Status flag: trigger seen
pub const STATUS_TRIGGER: u8 = 0b10;

/// One decoded sample word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleWord {
    pub magnitude: u16,
    pub status: u8,
}

impl SampleWord {
    pub fn is_timestamp_start(&self) -> bool {
        self.status & STATUS_TIMESTAMP_START != 0
    }

    pub fn is_trigger(&self) -> bool {
        self.status & STATUS_TRIGGER != 0
    }
}

/// SampleReader is a read-only view of a byte sequence as a series of sample words.
///
/// A trailing odd byte is not part of any word and is ignored.
#[derive(Debug, Clone, Copy)]
pub struct SampleReader<'a> {
    bits: &'a BitSlice<u8, Lsb0>,
}

impl<'a> SampleReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            bits: data.view_bits::<Lsb0>(),
        }
    }

    /// Number of complete sample words
    pub fn len(&self) -> usize {
        self.bits.len() / WORD_BITS
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The 14-bit magnitude of word `index`
    pub fn magnitude(&self, index: usize) -> Option<u16> {
        let start = index * WORD_BITS;
        self.bits
            .get(start..start + MAGNITUDE_BITS)
            .map(|field| field.load_le::<u16>())
    }

    /// The 2 status bits of word `index`
    pub fn status(&self, index: usize) -> Option<u8> {
        let start = index * WORD_BITS + MAGNITUDE_BITS;
        self.bits
            .get(start..start + STATUS_BITS)
            .map(|field| field.load_le::<u8>())
    }

    pub fn word(&self, index: usize) -> Option<SampleWord> {
        Some(SampleWord {
            magnitude: self.magnitude(index)?,
            status: self.status(index)?,
        })
    }

    /// Iterate over all complete words in order
    pub fn words(&self) -> impl Iterator<Item = SampleWord> + 'a {
        let reader = *self;
        (0..reader.len()).filter_map(move |index| reader.word(index))
    }
}

/// Render the low `length` bits of `value`, most significant first. Used for debug output
/// of status streams.
pub fn to_bit_string(value: u64, length: usize) -> String {
    let length = length.min(u64::BITS as usize);
    value.view_bits::<Lsb0>()[..length]
        .iter()
        .rev()
        .map(|bit| if *bit { '1' } else { '0' })
        .collect()
}
