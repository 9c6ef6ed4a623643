//! Fixed-capacity circular byte buffer backing the rolling window.
//!
//! Writes and reads are strict FIFO. Overfilling or draining an empty buffer
//! is a caller bug and panics. [`RingBuffer::peek`] copies buffered bytes out
//! without consuming them, which lets the matcher hash the current window
//! while the rolling checksum state stays untouched.

#[derive(Debug, Clone)]
pub struct RingBuffer {
    data: Vec<u8>,
    /// Index of the oldest buffered byte.
    head: usize,
    len: usize,
}

impl RingBuffer {
    /// Create an empty buffer holding at most `capacity` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be non-zero");
        Self {
            data: vec![0; capacity],
            head: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of bytes currently buffered
    pub fn available(&self) -> usize {
        self.len
    }

    /// Number of bytes that can still be written before the buffer is full
    pub fn remaining(&self) -> usize {
        self.data.len() - self.len
    }

    pub fn is_full(&self) -> bool {
        self.len == self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append a byte at the tail.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is full.
    pub fn write(&mut self, byte: u8) {
        assert!(
            !self.is_full(),
            "write to full ring buffer (capacity {})",
            self.data.len()
        );
        let pos = (self.head + self.len) % self.data.len();
        self.data[pos] = byte;
        self.len += 1;
    }

    /// Remove and return the oldest byte.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is empty.
    pub fn read(&mut self) -> u8 {
        assert!(!self.is_empty(), "read from empty ring buffer");
        let byte = self.data[self.head];
        self.head = (self.head + 1) % self.data.len();
        self.len -= 1;
        byte
    }

    /// Copy up to `length` buffered bytes, oldest first, into
    /// `dst[offset..]` without consuming them. Returns the number of bytes
    /// copied, which is also bounded by the space left in `dst`.
    pub fn peek(&self, dst: &mut [u8], offset: usize, length: usize) -> usize {
        let count = length
            .min(self.len)
            .min(dst.len().saturating_sub(offset));
        if count == 0 {
            return 0;
        }

        let first = count.min(self.data.len() - self.head);
        dst[offset..offset + first].copy_from_slice(&self.data[self.head..self.head + first]);
        let rest = count - first;
        if rest > 0 {
            dst[offset + first..offset + count].copy_from_slice(&self.data[..rest]);
        }
        count
    }

    /// Drop all buffered bytes.
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_fill_and_drain() {
        for capacity in (1..600).step_by(7) {
            let mut rb = RingBuffer::new(capacity);
            for round in 0..3 {
                for j in 0..capacity {
                    assert_eq!(rb.remaining(), capacity - j);
                    assert_eq!(rb.available(), j);
                    rb.write((j + round) as u8);
                }
                assert!(rb.is_full());
                assert_eq!(rb.remaining(), 0);

                for j in 0..capacity {
                    assert_eq!(rb.remaining(), j);
                    assert_eq!(rb.available(), capacity - j);
                    assert_eq!(rb.read(), (j + round) as u8);
                }
                assert!(rb.is_empty());
            }
        }
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut rng = rand::thread_rng();
        let mut rb = RingBuffer::new(100);
        let mut buf = [0u8; 100];

        // Interleave writes and reads so the head wraps around repeatedly
        for _ in 0..50 {
            for j in 0..100 {
                for _ in 0..j {
                    rb.write(rng.gen());
                }
                assert_eq!(rb.peek(&mut buf, 0, j), j);
                for (k, expected) in buf.iter().enumerate().take(j) {
                    assert_eq!(rb.read(), *expected, "j = {}, k = {}", j, k);
                }
                assert!(rb.is_empty());
            }
        }
    }

    #[test]
    fn test_peek_with_offset_and_short_destination() {
        let mut rb = RingBuffer::new(8);
        for b in 1..=6u8 {
            rb.write(b);
        }

        let mut dst = [0u8; 5];
        assert_eq!(rb.peek(&mut dst, 2, 10), 3);
        assert_eq!(dst, [0, 0, 1, 2, 3]);

        // Asking for more than is buffered copies what is there
        let mut dst = [0u8; 16];
        assert_eq!(rb.peek(&mut dst, 0, 16), 6);
        assert_eq!(&dst[..6], &[1, 2, 3, 4, 5, 6]);
        assert_eq!(rb.available(), 6);
    }

    #[test]
    fn test_clear() {
        let mut rb = RingBuffer::new(4);
        rb.write(1);
        rb.write(2);
        rb.read();
        rb.clear();
        assert!(rb.is_empty());
        assert_eq!(rb.remaining(), 4);
        rb.write(9);
        assert_eq!(rb.read(), 9);
    }

    #[test]
    #[should_panic(expected = "write to full ring buffer")]
    fn test_write_full_panics() {
        let mut rb = RingBuffer::new(2);
        rb.write(1);
        rb.write(2);
        rb.write(3);
    }

    #[test]
    #[should_panic(expected = "read from empty ring buffer")]
    fn test_read_empty_panics() {
        let mut rb = RingBuffer::new(2);
        rb.read();
    }

    #[test]
    #[should_panic]
    fn test_zero_capacity_panics() {
        RingBuffer::new(0);
    }
}
