use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// One acquisition cycle worth of raw multi-channel samples.
///
/// `samples[i]` holds every channel value of sample `i`, stamped with
/// `timestamps[i]` (seconds, source clock). An empty chunk means the source
/// delivered nothing within the pull timeout.
///
/// # Example
/// ```
/// use nf_core::signal::SampleChunk;
/// let chunk = SampleChunk::new(vec![vec![1.0, 2.0], vec![3.0, 4.0]], vec![0.0, 0.008]);
/// assert_eq!(chunk.len(), 2);
/// assert_eq!(chunk.channel(1), Some(vec![2.0, 4.0]));
/// assert_eq!(chunk.channel(2), None);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleChunk {
    /// Samples, each a vector of channel values.
    pub samples: Vec<Vec<f64>>,
    /// One timestamp per sample.
    pub timestamps: Vec<f64>,
}

impl SampleChunk {
    /// Build a chunk from samples and their timestamps.
    #[must_use]
    pub fn new(samples: Vec<Vec<f64>>, timestamps: Vec<f64>) -> Self {
        debug_assert_eq!(samples.len(), timestamps.len(), "one timestamp per sample");
        Self {
            samples,
            timestamps,
        }
    }

    /// An empty chunk (no data within the timeout).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of samples in the chunk.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// `true` when the source had nothing to deliver.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Append every sample of `other` to this chunk.
    pub fn extend(&mut self, other: SampleChunk) {
        self.samples.extend(other.samples);
        self.timestamps.extend(other.timestamps);
    }

    /// Split off the samples after `at`, keeping the first `at` here.
    #[must_use]
    pub fn split_off(&mut self, at: usize) -> SampleChunk {
        let at = at.min(self.len());
        SampleChunk {
            samples: self.samples.split_off(at),
            timestamps: self.timestamps.split_off(at),
        }
    }

    /// Extract one channel as a scalar series.
    ///
    /// Returns `None` if any sample lacks the requested channel.
    #[must_use]
    pub fn channel(&self, index: usize) -> Option<Vec<f64>> {
        self.samples.iter().map(|s| s.get(index).copied()).collect()
    }
}

/// Power spectral density estimate: uniformly spaced bins with their power.
///
/// Invariant: `frequencies.len() == power.len()` and both are non-empty.
///
/// # Example
/// ```
/// use nf_core::signal::Spectrum;
/// let s = Spectrum::new(vec![0.0, 1.0, 2.0], vec![0.5, 2.0, 0.5], 1.0).unwrap();
/// assert_eq!(s.len(), 3);
/// assert!(Spectrum::new(vec![0.0], vec![], 1.0).is_err());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Spectrum {
    frequencies: Vec<f64>,
    power: Vec<f64>,
    resolution_hz: f64,
}

impl Spectrum {
    /// Build a spectrum, enforcing the paired-length invariant.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidSpectrum`] if the sequences differ in
    /// length or are empty.
    pub fn new(frequencies: Vec<f64>, power: Vec<f64>, resolution_hz: f64) -> Result<Self, CoreError> {
        if frequencies.is_empty() || frequencies.len() != power.len() {
            return Err(CoreError::InvalidSpectrum {
                frequencies: frequencies.len(),
                power: power.len(),
            });
        }
        Ok(Self {
            frequencies,
            power,
            resolution_hz,
        })
    }

    /// Bin centre frequencies in Hz.
    #[must_use]
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// Power value per bin.
    #[must_use]
    pub fn power(&self) -> &[f64] {
        &self.power
    }

    /// Spacing between adjacent bins, in Hz.
    #[must_use]
    pub fn resolution_hz(&self) -> f64 {
        self.resolution_hz
    }

    /// Number of bins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.power.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.power.is_empty()
    }
}

/// A named frequency band, bounds inclusive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Band {
    /// Display name ("alpha", "beta").
    pub name: String,
    /// Lower bound in Hz.
    pub low_hz: f64,
    /// Upper bound in Hz.
    pub high_hz: f64,
}

impl Band {
    /// Build a band.
    #[must_use]
    pub fn new(name: &str, low_hz: f64, high_hz: f64) -> Self {
        Self {
            name: name.to_string(),
            low_hz,
            high_hz,
        }
    }

    /// `true` if `freq` lies within the band (inclusive).
    #[inline]
    #[must_use]
    pub fn contains(&self, freq: f64) -> bool {
        freq >= self.low_hz && freq <= self.high_hz
    }
}

/// How a band score was normalised.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PowerKind {
    /// Raw integrated power (µV²).
    Absolute,
    /// Band power divided by whole-spectrum power.
    Relative,
}

/// Integrated power of one band.
#[derive(Clone, Debug, PartialEq)]
pub struct BandScore {
    /// The band that was integrated.
    pub band: Band,
    /// Normalisation used.
    pub kind: PowerKind,
    /// Score value (non-negative).
    pub value: f64,
}

/// Spectral peaks kept by non-maximum suppression. Display only.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Peaks {
    /// Bin indices, strictly increasing.
    pub indices: Vec<usize>,
    /// Frequency of each kept peak.
    pub frequencies: Vec<f64>,
    /// Power of each kept peak.
    pub power: Vec<f64>,
}

impl Peaks {
    /// Gather peak frequencies and powers for the given bin indices.
    #[must_use]
    pub fn from_indices(spectrum: &Spectrum, indices: Vec<usize>) -> Self {
        let frequencies = indices.iter().map(|&i| spectrum.frequencies()[i]).collect();
        let power = indices.iter().map(|&i| spectrum.power()[i]).collect();
        Self {
            indices,
            frequencies,
            power,
        }
    }
}
