use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RangeState {
    /// Not present yet and not requested
    Needed,
    /// Requested from a peer, not received yet
    Pending,
    /// Present in the destination
    Available,
}

/// Half-open byte range `[start, end)`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// # Panics
    ///
    /// Panics if `end < start`.
    pub fn new(start: u64, end: u64) -> Self {
        assert!(start <= end, "range end {} before start {}", end, start);
        Self { start, end }
    }

    pub fn by_length(start: u64, length: u64) -> Self {
        Self::new(start, start + length)
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `other` lies entirely within this range
    pub fn contains(&self, other: &ByteRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn contains_offset(&self, offset: u64) -> bool {
        self.start <= offset && offset < self.end
    }

    pub fn intersects(&self, other: &ByteRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn intersection(&self, other: &ByteRange) -> Option<ByteRange> {
        if self.intersects(other) {
            Some(ByteRange::new(
                self.start.max(other.start),
                self.end.min(other.end),
            ))
        } else {
            None
        }
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_relations() {
        let a = ByteRange::new(0, 1000);
        let b = ByteRange::new(500, 1500);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.contains(&b));
        assert!(!b.contains(&a));
        assert!(a.contains(&a));
        assert_eq!(a.intersection(&b), Some(ByteRange::new(500, 1000)));

        let c = ByteRange::new(500, 1000);
        assert!(a.contains(&c));

        // Touching ranges do not intersect
        let d = ByteRange::new(1000, 1200);
        assert!(!a.intersects(&d));
        assert_eq!(a.intersection(&d), None);
    }

    #[test]
    fn test_by_length() {
        let r = ByteRange::by_length(100, 50);
        assert_eq!(r, ByteRange::new(100, 150));
        assert_eq!(r.len(), 50);
        assert!(r.contains_offset(149));
        assert!(!r.contains_offset(150));
        assert!(ByteRange::by_length(7, 0).is_empty());
        assert_eq!(r.to_string(), "100..150");
    }

    #[test]
    #[should_panic]
    fn test_inverted_range_panics() {
        ByteRange::new(10, 5);
    }
}
