use std::time::Duration;

/// Derives audio frame timestamps from a base timestamp and a running
/// sample count, so they do not drift the way summed per-frame durations do.
///
/// Timestamps are in microseconds.
///
/// ```
/// use mp2t::av::AudioTimestampHelper;
///
/// let mut helper = AudioTimestampHelper::new(48_000);
/// assert_eq!(helper.timestamp(), None);
/// helper.set_base_timestamp(1_000);
/// helper.add_frames(48_000);
/// assert_eq!(helper.timestamp(), Some(1_001_000));
/// ```
#[derive(Debug, Clone)]
pub struct AudioTimestampHelper {
    samples_per_second: u32,
    base_timestamp: Option<i64>,
    frame_count: i64,
}

impl AudioTimestampHelper {
    /// Creates a helper with no base timestamp.
    pub fn new(samples_per_second: u32) -> Self {
        Self {
            samples_per_second: samples_per_second.max(1),
            base_timestamp: None,
            frame_count: 0,
        }
    }

    /// Anchors the timeline and clears the frame count.
    pub fn set_base_timestamp(&mut self, base_timestamp: i64) {
        self.base_timestamp = Some(base_timestamp);
        self.frame_count = 0;
    }

    /// The anchor set by the last `set_base_timestamp`.
    pub fn base_timestamp(&self) -> Option<i64> {
        self.base_timestamp
    }

    /// Samples counted since the anchor.
    pub fn frame_count(&self) -> i64 {
        self.frame_count
    }

    /// Sample rate the timeline runs at.
    pub fn samples_per_second(&self) -> u32 {
        self.samples_per_second
    }

    /// Advances the position by `frame_count` samples.
    pub fn add_frames(&mut self, frame_count: i64) {
        self.frame_count += frame_count;
    }

    /// Timestamp of the current position, `None` until a base is set.
    pub fn timestamp(&self) -> Option<i64> {
        self.base_timestamp
            .map(|base| base + self.offset_of(self.frame_count))
    }

    /// Duration of the next `frame_count` samples from the current position.
    pub fn frame_duration(&self, frame_count: i64) -> Duration {
        let start = self.offset_of(self.frame_count);
        let end = self.offset_of(self.frame_count + frame_count);
        Duration::from_micros((end - start).max(0) as u64)
    }

    fn offset_of(&self, frame_count: i64) -> i64 {
        (frame_count as i128 * 1_000_000 / self.samples_per_second as i128) as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_durations_do_not_drift() {
        let mut helper = AudioTimestampHelper::new(44_100);
        helper.set_base_timestamp(0);
        let mut total = Duration::ZERO;
        for _ in 0..441 {
            total += helper.frame_duration(100);
            helper.add_frames(100);
        }
        assert_eq!(total, Duration::from_secs(1));
        assert_eq!(helper.timestamp(), Some(1_000_000));
    }

    #[test]
    fn test_rebase_clears_frames() {
        let mut helper = AudioTimestampHelper::new(48_000);
        helper.set_base_timestamp(10);
        helper.add_frames(1024);
        assert_eq!(helper.timestamp(), Some(10 + 21_333));
        helper.set_base_timestamp(500);
        assert_eq!(helper.frame_count(), 0);
        assert_eq!(helper.timestamp(), Some(500));
    }
}
