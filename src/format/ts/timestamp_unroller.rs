/// PES timestamps carry 33 bits.
const TIMESTAMP_BITS: u32 = 33;
const TIMESTAMP_MASK: i64 = (1 << TIMESTAMP_BITS) - 1;

/// Turns wrapping 33-bit PES timestamps into a continuous 64-bit timeline.
///
/// Each timestamp is placed in the 2^33 epoch of the previous one, or the
/// epoch just before or after it, whichever lands closest. Equal distances
/// keep the earlier candidate in the order same, previous, next.
///
/// ```
/// use mp2t::format::ts::TimestampUnroller;
///
/// let mut unroller = TimestampUnroller::new();
/// assert_eq!(unroller.unrolled_timestamp((1 << 33) - 10), (1 << 33) - 10);
/// assert_eq!(unroller.unrolled_timestamp(5), (1 << 33) + 5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TimestampUnroller {
    previous: Option<i64>,
}

impl TimestampUnroller {
    /// An unroller with no history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Unrolls `timestamp`, of which only the low 33 bits are used.
    pub fn unrolled_timestamp(&mut self, timestamp: i64) -> i64 {
        let timestamp = timestamp & TIMESTAMP_MASK;

        let Some(previous) = self.previous else {
            self.previous = Some(timestamp);
            return timestamp;
        };

        let time0 = ((previous >> TIMESTAMP_BITS) << TIMESTAMP_BITS) | timestamp;
        let time1 = time0 - (1 << TIMESTAMP_BITS);
        let time2 = time0 + (1 << TIMESTAMP_BITS);

        let mut time = time0;
        if (time1 - previous).abs() < (time - previous).abs() {
            time = time1;
        }
        if (time2 - previous).abs() < (time - previous).abs() {
            time = time2;
        }

        self.previous = Some(time);
        time
    }

    /// Forgets the previous timestamp.
    pub fn reset(&mut self) {
        self.previous = None;
    }
}
