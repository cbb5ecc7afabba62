use ndarray::{s, Array1};

/// Sample windows, relative to the waveform start, used to extract a pulse amplitude.
///
/// The amplitude window `[amp_start, amp_end)` is searched for the peak. The baseline is
/// averaged over `[peak - bl_start, peak - bl_end)`, so `bl_start > bl_end` always.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseWindows {
    pub bl_start: usize,
    pub bl_end: usize,
    pub amp_start: usize,
    pub amp_end: usize,
}

/// A pulse found in a waveform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pulse {
    pub peak_position: usize,
    pub peak: i16,
    pub baseline: f64,
}

impl Pulse {
    /// Raw (uncalibrated) amplitude above baseline
    pub fn amplitude(&self) -> f64 {
        self.peak as f64 - self.baseline
    }
}

/// Waveform is one channel's samples for one event, plus the scale information needed to
/// put it on physical axes (time = x0 + i*dx, value = y0 + sample*dy).
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Array1<i16>,
    pub segment: u32,
    pub dx: f64,
    pub x0: f64,
    pub dy: f64,
    pub y0: f64,
}

impl Waveform {
    /// Create a waveform with unit scale
    pub fn new(samples: Vec<i16>, segment: u32) -> Self {
        Self {
            samples: Array1::from(samples),
            segment,
            dx: 1.0,
            x0: 0.0,
            dy: 1.0,
            y0: 0.0,
        }
    }

    pub fn with_scale(mut self, dx: f64, x0: f64, dy: f64, y0: f64) -> Self {
        self.dx = dx;
        self.x0 = x0;
        self.dy = dy;
        self.y0 = y0;
        self
    }

    pub fn points(&self) -> usize {
        self.samples.len()
    }

    pub fn samples(&self) -> &Array1<i16> {
        &self.samples
    }

    /// Position and value of the first maximum in `[start, end)`.
    ///
    /// Returns None if the range is empty or not contained in the waveform
    pub fn peak(&self, start: usize, end: usize) -> Option<(usize, i16)> {
        if start >= end || end > self.samples.len() {
            return None;
        }
        self.samples
            .slice(s![start..end])
            .iter()
            .enumerate()
            .fold(None, |best, (idx, &value)| match best {
                Some((_, max)) if max >= value => best,
                _ => Some((start + idx, value)),
            })
    }

    /// Mean of the samples in `[start, end)`.
    ///
    /// Returns None if the range is empty or not contained in the waveform
    pub fn baseline(&self, start: usize, end: usize) -> Option<f64> {
        if start >= end || end > self.samples.len() {
            return None;
        }
        self.samples.slice(s![start..end]).mapv(f64::from).mean()
    }

    /// Find the pulse in this waveform.
    ///
    /// Returns None when the peak sits too early for a full baseline window in front of it,
    /// which happens for noise-only channels.
    pub fn find_pulse(&self, windows: &PulseWindows) -> Option<Pulse> {
        let (peak_position, peak) = self.peak(windows.amp_start, windows.amp_end)?;
        if peak_position < windows.bl_start {
            return None;
        }
        let baseline = self.baseline(
            peak_position - windows.bl_start,
            peak_position.checked_sub(windows.bl_end)?,
        )?;
        Some(Pulse {
            peak_position,
            peak,
            baseline,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn windows() -> PulseWindows {
        PulseWindows {
            bl_start: 100,
            bl_end: 50,
            amp_start: 170,
            amp_end: 270,
        }
    }

    fn flat_with_spike(level: i16, position: usize, height: i16) -> Waveform {
        let mut samples = vec![level; 512];
        samples[position] = height;
        Waveform::new(samples, 0)
    }

    #[test]
    fn test_first_maximum_wins() {
        let mut samples = vec![0i16; 20];
        samples[5] = 7;
        samples[9] = 7;
        let wave = Waveform::new(samples, 0);
        assert_eq!(wave.peak(0, 20), Some((5, 7)));
        assert_eq!(wave.peak(6, 20), Some((9, 7)));
        assert_eq!(wave.peak(10, 10), None);
        assert_eq!(wave.peak(10, 21), None);
    }

    #[test]
    fn test_pulse_over_flat_baseline() {
        let wave = flat_with_spike(20, 200, 1020);
        let pulse = wave.find_pulse(&windows()).unwrap();
        assert_eq!(pulse.peak_position, 200);
        assert_eq!(pulse.peak, 1020);
        assert!((pulse.baseline - 20.0).abs() < 1e-9);
        assert!((pulse.amplitude() - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_baseline_is_mean_of_window() {
        let mut samples = vec![0i16; 300];
        // baseline window for a peak at 200 is [100, 150)
        for (i, sample) in samples.iter_mut().enumerate().take(150).skip(100) {
            *sample = if i % 2 == 0 { 10 } else { 20 };
        }
        samples[200] = 500;
        let wave = Waveform::new(samples, 0);
        let pulse = wave.find_pulse(&windows()).unwrap();
        assert!((pulse.baseline - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_early_peak_is_skipped() {
        let wave = flat_with_spike(0, 190, 100);
        let early = PulseWindows {
            bl_start: 195,
            ..windows()
        };
        assert_eq!(wave.find_pulse(&early), None);
    }

    #[test]
    fn test_short_waveform_is_skipped() {
        let wave = Waveform::new(vec![0i16; 128], 0);
        assert_eq!(wave.find_pulse(&windows()), None);
    }

    #[test]
    fn test_scale() {
        let wave = Waveform::new(vec![1, 2, 3], 1).with_scale(1.0 / 65.0, 0.0, 1.0, 0.0);
        assert_eq!(wave.points(), 3);
        assert_eq!(wave.segment, 1);
        assert!((wave.dx - 0.015384615).abs() < 1e-6);
    }
}
