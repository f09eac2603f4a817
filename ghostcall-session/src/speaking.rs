/// Edge-triggered voice activity approximation.
///
/// Each sample is a frequency-magnitude distribution (one byte per bin).
/// The mean magnitude is compared against a fixed threshold and only a
/// change of the classification produces an event.
#[derive(Debug, Clone)]
pub struct SpeakingDetector {
    threshold: f32,
    speaking: bool,
    muted: bool,
}

impl SpeakingDetector {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            speaking: false,
            muted: false,
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Returns the new state only when it differs from the previous one.
    pub fn sample(&mut self, bins: &[u8]) -> Option<bool> {
        if self.muted {
            return None;
        }

        let speaking = mean_magnitude(bins) > self.threshold;
        self.transition(speaking)
    }

    /// Muting clears the speaking state right away and silences `sample`
    /// until unmuted.
    pub fn set_muted(&mut self, muted: bool) -> Option<bool> {
        self.muted = muted;
        if muted { self.transition(false) } else { None }
    }

    /// Forget everything, e.g. when the capture device is released.
    pub fn reset(&mut self) {
        self.speaking = false;
        self.muted = false;
    }

    fn transition(&mut self, speaking: bool) -> Option<bool> {
        if speaking == self.speaking {
            return None;
        }
        self.speaking = speaking;
        Some(speaking)
    }
}

fn mean_magnitude(bins: &[u8]) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    let sum: u64 = bins.iter().map(|b| u64::from(*b)).sum();
    sum as f32 / bins.len() as f32
}
