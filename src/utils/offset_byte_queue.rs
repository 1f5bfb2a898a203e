use bytes::{Buf, BytesMut};

/// A byte buffer addressed by absolute stream offsets.
///
/// Bytes are appended at the tail and dropped from the head. Offsets keep
/// counting across pops, so a position recorded when some bytes were pushed
/// stays meaningful until those bytes are popped.
///
/// ```
/// use mp2t::utils::OffsetByteQueue;
///
/// let mut queue = OffsetByteQueue::new();
/// queue.push(&[1, 2, 3, 4]);
/// queue.pop(2);
/// assert_eq!(queue.head(), 2);
/// assert_eq!(queue.peek_at(3), &[4]);
/// assert!(!queue.trim(10));
/// assert_eq!(queue.tail(), 10);
/// ```
#[derive(Debug, Default)]
pub struct OffsetByteQueue {
    buf: BytesMut,
    head: i64,
}

impl OffsetByteQueue {
    /// Creates an empty queue starting at offset 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empties the queue and rewinds the head to offset 0.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.head = 0;
    }

    /// Appends bytes at the tail.
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Returns every buffered byte. The first one sits at [`head`](Self::head).
    pub fn peek(&self) -> &[u8] {
        &self.buf
    }

    /// Drops `count` bytes from the front. Popping past the tail empties the queue.
    pub fn pop(&mut self, count: usize) {
        let count = count.min(self.buf.len());
        self.buf.advance(count);
        self.head += count as i64;
    }

    /// Returns the bytes starting at `offset`, empty when `offset` is at or
    /// beyond the tail.
    pub fn peek_at(&self, offset: i64) -> &[u8] {
        debug_assert!(offset >= self.head, "peek behind the queue head");
        if offset < self.head || offset >= self.tail() {
            return &[];
        }
        &self.buf[(offset - self.head) as usize..]
    }

    /// Drops everything before `max_offset`.
    ///
    /// Returns false when `max_offset` lies beyond the tail; the queue is then
    /// emptied and its head moved to `max_offset`.
    pub fn trim(&mut self, max_offset: i64) -> bool {
        if max_offset <= self.head {
            return true;
        }
        if max_offset > self.tail() {
            self.buf.clear();
            self.head = max_offset;
            return false;
        }
        self.pop((max_offset - self.head) as usize);
        true
    }

    /// Offset of the first buffered byte.
    pub fn head(&self) -> i64 {
        self.head
    }

    /// Offset one past the last buffered byte.
    pub fn tail(&self) -> i64 {
        self.head + self.buf.len() as i64
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true when nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
