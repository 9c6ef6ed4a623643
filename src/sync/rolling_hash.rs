//! Rolling weak checksum for block matching
//!
//! Adler-32 over a fixed-size sliding window, updated in O(1) per byte
//! regardless of the window size. The bytes in the window are kept in a
//! [`RingBuffer`] so the oldest byte can be evicted when a new one arrives.

use crate::sync::ring_buffer::RingBuffer;

const MOD_ADLER: i64 = 65521;

/// Number of updates between modular reductions of the accumulators.
const NORMALIZE_INTERVAL: u32 = 4096;

/// Trait for rolling checksum implementations
pub trait RollingChecksum {
    /// Push one byte into the window, evicting the oldest if the window is full.
    ///
    /// Must be called exactly once per byte of the stream being rolled over.
    fn update(&mut self, byte: u8);

    /// Push every byte of `data` in order
    fn update_slice(&mut self, data: &[u8]) {
        for &byte in data {
            self.update(byte);
        }
    }

    /// Checksum of the bytes currently in the window
    fn value(&self) -> u32;

    /// Clear the window and accumulators
    fn reset(&mut self);

    /// Maximum number of bytes in the window
    fn frame_size(&self) -> usize;
}

/// Adler-32 rolling checksum
///
/// `value()` always equals the standard Adler-32 of the bytes currently held
/// in the window, so a freshly filled window and a window reached by rolling
/// produce the same value.
///
/// The accumulators hold the raw byte sum (`a`) and the sum of prefix sums
/// (`b`); the Adler "+1" seed is folded in when the value is read.
#[derive(Debug, Clone)]
pub struct RollingAdler32 {
    a: i64,
    b: i64,
    window: RingBuffer,
    since_normalize: u32,
}

impl RollingAdler32 {
    /// Create a checksum over a window of `frame_size` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `frame_size` is zero.
    pub fn new(frame_size: usize) -> Self {
        Self {
            a: 0,
            b: 0,
            window: RingBuffer::new(frame_size),
            since_normalize: 0,
        }
    }

    /// Number of bytes currently in the window
    pub fn window_len(&self) -> usize {
        self.window.available()
    }

    pub fn is_window_full(&self) -> bool {
        self.window.is_full()
    }

    /// Copy the window content, oldest byte first, into `dst`.
    /// Returns the number of bytes copied.
    pub fn peek_window(&self, dst: &mut [u8]) -> usize {
        self.window.peek(dst, 0, dst.len())
    }

    /// One-shot Adler-32 of `data`
    pub fn checksum(data: &[u8]) -> u32 {
        let mut a: u32 = 1;
        let mut b: u32 = 0;

        for &byte in data {
            a = (a + byte as u32) % MOD_ADLER as u32;
            b = (b + a) % MOD_ADLER as u32;
        }

        (b << 16) | a
    }

    fn normalize(&mut self) {
        self.a = self.a.rem_euclid(MOD_ADLER);
        self.b = self.b.rem_euclid(MOD_ADLER);
        self.since_normalize = 0;
    }
}

impl RollingChecksum for RollingAdler32 {
    fn update(&mut self, byte: u8) {
        let nb = byte as i64;

        if self.window.is_full() {
            let fb = self.window.read() as i64;
            let n = self.window.capacity() as i64;
            self.a += nb - fb;
            self.b += self.a - n * fb;
        } else {
            self.a += nb;
            self.b += self.a;
        }
        self.window.write(byte);

        self.since_normalize += 1;
        if self.since_normalize >= NORMALIZE_INTERVAL {
            self.normalize();
        }
    }

    fn value(&self) -> u32 {
        let len = self.window.available() as i64;
        let a = (1 + self.a).rem_euclid(MOD_ADLER);
        let b = (self.b + len).rem_euclid(MOD_ADLER);
        ((b << 16) | a) as u32
    }

    fn reset(&mut self) {
        self.a = 0;
        self.b = 0;
        self.since_normalize = 0;
        self.window.clear();
    }

    fn frame_size(&self) -> usize {
        self.window.capacity()
    }
}
