//! # caribou_converter
//!
//! caribou_converter turns raw detector data recorded with the Caribou DAQ into a
//! detector-agnostic standard event model, written in Rust. Raw events are dispatched to a
//! converter by the hash of their detector-type name; each converter appends planes of
//! pixel hits to a StandardEvent. The library ships a converter for the AD9249 16-channel
//! 65 MSPS waveform digitizer.
//!
//! ## Installation
//!
//! Currently the only method of install is from source. If you have not used Rust before,
//! see the [Rust docs](https://www.rust-lang.org/tools/install) for installing the tool
//! chain.
//!
//! To build and install the CLI use `cargo install --path ./caribou_converter_cli` from the
//! top level repository. It can be uninstalled with `cargo uninstall caribou_converter_cli`.
//!
//! ## Configuration
//!
//! The CLI reads a YAML configuration. A template can be generated with
//! `caribou_converter_cli -p config.yml new`:
//!
//! ```yml
//! raw_path: None
//! output_path: None
//! detector_type: CaribouAD9249Event
//! parameters:
//!   ampEnd: 270
//!   ampStart: 170
//!   blEnd: 80
//!   blStart: 150
//!   calib_range_max: 16384.0
//!   calib_range_min: 0.0
//!   waveform_filename: ''
//!   zero_suppression: true
//! ```
//!
//! - `raw_path`: directory of raw event files (`*.raw`, one event per file)
//! - `output_path`: file the converted events are written to
//! - `detector_type`: name the raw data was recorded under
//! - `parameters`: converter parameters, see below
//!
//! ### AD9249 parameters
//!
//! - `blStart`, `blEnd`: the baseline is averaged over `[peak - blStart, peak - blEnd)`
//! - `ampStart`, `ampEnd`: the peak is searched in `[ampStart, ampEnd)`
//! - `calib_range_min`, `calib_range_max`: calibrated amplitudes above the maximum are
//! clamped to it, below the minimum they are set to zero
//! - `calibration_px<x><y>`: calibration formula in `x` for the pixel at column x, row y.
//! Defaults to `x`. Supports `+ - * / ^`, `pi`, `e` and the usual functions (`sqrt`, `exp`,
//! `log`, `log10`, `abs`, `sin`, `cos`, `tan`, `pow`, `min`, `max`).
//! - `zero_suppression`: drop pixels with a calibrated amplitude of zero
//! - `waveform_filename`: if set, no events are converted; instead every waveform is
//! appended to this text file as `<trigger> <channel> <x> <y> : <samples...>`
//!
//! ## Output
//!
//! Converted events are written as a stream of YAML documents, one per event:
//!
//! ```text
//! ---
//! detector_type: AD9249
//! time_begin: 0       (ps, relative to the run start)
//! time_end: 0
//! trigger_number: 0
//! planes:
//! - id: 0
//!   system: Caribou
//!   sensor: AD9249
//!   x_size: 4
//!   y_size: 4
//!   n_frames: 0
//!   pixels:
//!   - column: 1
//!     row: 0
//!     value: 1000.0
//!     timestamp: 15384
//! ```
pub mod ad9249;
pub mod bit_reader;
pub mod calibration;
pub mod channel_map;
pub mod config;
pub mod constants;
pub mod converter;
pub mod detector_id;
pub mod error;
pub mod event_writer;
pub mod process;
pub mod raw_event;
pub mod raw_stack;
pub mod registry;
pub mod standard_event;
pub mod waveform;
pub mod worker_status;
