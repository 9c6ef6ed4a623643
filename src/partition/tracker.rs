use crate::partition::error::{PartitionError, PartitionResult};
use crate::partition::types::{ByteRange, RangeState};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Partition of `[0, length)` into NEEDED / PENDING / AVAILABLE ranges
///
/// Stored ranges are contiguous, never overlap and always cover the whole
/// interval. Neighbours never share a state; they are merged on every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeStateTracker {
    length: u64,
    /// start -> (end, state)
    segments: BTreeMap<u64, (u64, RangeState)>,
}

impl RangeStateTracker {
    /// Create a tracker where every byte is NEEDED
    pub fn new(length: u64) -> Self {
        Self::with_state(length, RangeState::Needed)
    }

    pub fn with_state(length: u64, state: RangeState) -> Self {
        let mut segments = BTreeMap::new();
        if length > 0 {
            segments.insert(0, (length, state));
        }
        Self { length, segments }
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    /// Number of stored ranges
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Set the state of exactly `range`
    pub fn insert(&mut self, range: ByteRange, state: RangeState) -> PartitionResult<()> {
        if range.end > self.length {
            return Err(PartitionError::OutOfBounds {
                start: range.start,
                end: range.end,
                length: self.length,
            });
        }
        if range.is_empty() {
            return Ok(());
        }

        self.split_at(range.start);
        self.split_at(range.end);

        let covered: Vec<u64> = self
            .segments
            .range(range.start..range.end)
            .map(|(&start, _)| start)
            .collect();
        for start in covered {
            self.segments.remove(&start);
        }

        self.segments.insert(range.start, (range.end, state));
        self.merge_around(range.start);
        Ok(())
    }

    /// First range inside `range` whose state is `state`, clipped to `range`
    pub fn search(&self, range: ByteRange, state: RangeState) -> Option<ByteRange> {
        let query = range.intersection(&ByteRange::new(0, self.length))?;

        // Start from the segment containing the query start
        let first = self
            .segments
            .range(..=query.start)
            .next_back()
            .map(|(&start, _)| start)?;

        self.segments
            .range(first..query.end)
            .filter(|(_, (_, s))| *s == state)
            .find_map(|(&start, &(end, _))| query.intersection(&ByteRange::new(start, end)))
    }

    /// Turn every PENDING range back into NEEDED
    pub fn purge_pending(&mut self) {
        let old = std::mem::take(&mut self.segments);
        let mut last: Option<(u64, u64, RangeState)> = None;

        for (start, (end, state)) in old {
            let state = match state {
                RangeState::Pending => RangeState::Needed,
                other => other,
            };
            last = match last {
                Some((s, _, st)) if st == state => Some((s, end, st)),
                Some((s, e, st)) => {
                    self.segments.insert(s, (e, st));
                    Some((start, end, state))
                }
                None => Some((start, end, state)),
            };
        }
        if let Some((s, e, st)) = last {
            self.segments.insert(s, (e, st));
        }
    }

    /// Whether every byte is AVAILABLE
    pub fn is_completed(&self) -> bool {
        match self.segments.len() {
            0 => true,
            1 => self
                .segments
                .values()
                .all(|&(_, state)| state == RangeState::Available),
            _ => false,
        }
    }

    /// Total bytes in `state`
    pub fn count(&self, state: RangeState) -> u64 {
        self.segments
            .iter()
            .filter(|(_, (_, s))| *s == state)
            .map(|(&start, &(end, _))| end - start)
            .sum()
    }

    /// Stored ranges in offset order
    pub fn ranges(&self) -> impl Iterator<Item = (ByteRange, RangeState)> + '_ {
        self.segments
            .iter()
            .map(|(&start, &(end, state))| (ByteRange::new(start, end), state))
    }

    /// Split the segment strictly containing `pos` into two with the same state
    fn split_at(&mut self, pos: u64) {
        let containing = self
            .segments
            .range(..pos)
            .next_back()
            .map(|(&start, &(end, state))| (start, end, state));

        if let Some((start, end, state)) = containing {
            if end > pos {
                self.segments.insert(start, (pos, state));
                self.segments.insert(pos, (end, state));
            }
        }
    }

    /// Merge the segment starting at `start` with same-state neighbours
    fn merge_around(&mut self, mut start: u64) {
        let Some((mut end, state)) = self.segments.get(&start).copied() else {
            return;
        };

        let prev = self
            .segments
            .range(..start)
            .next_back()
            .map(|(&prev_start, &(prev_end, prev_state))| (prev_start, prev_end, prev_state));
        if let Some((prev_start, prev_end, prev_state)) = prev {
            if prev_end == start && prev_state == state {
                self.segments.remove(&start);
                start = prev_start;
                self.segments.insert(start, (end, state));
            }
        }

        if let Some((next_end, next_state)) = self.segments.get(&end).copied() {
            if next_state == state {
                self.segments.remove(&end);
                end = next_end;
                self.segments.insert(start, (end, state));
            }
        }
    }
}

/// Tracker shared between the component writing bytes and the scheduler
/// requesting missing ranges. Every call takes the lock.
#[derive(Debug, Clone)]
pub struct SharedRangeTracker {
    inner: Arc<Mutex<RangeStateTracker>>,
}

impl SharedRangeTracker {
    pub fn new(length: u64) -> Self {
        Self::from_tracker(RangeStateTracker::new(length))
    }

    pub fn from_tracker(tracker: RangeStateTracker) -> Self {
        Self {
            inner: Arc::new(Mutex::new(tracker)),
        }
    }

    pub fn length(&self) -> u64 {
        self.inner.lock().length()
    }

    pub fn insert(&self, range: ByteRange, state: RangeState) -> PartitionResult<()> {
        self.inner.lock().insert(range, state)
    }

    pub fn search(&self, range: ByteRange, state: RangeState) -> Option<ByteRange> {
        self.inner.lock().search(range, state)
    }

    pub fn purge_pending(&self) {
        self.inner.lock().purge_pending();
    }

    pub fn is_completed(&self) -> bool {
        self.inner.lock().is_completed()
    }

    pub fn count(&self, state: RangeState) -> u64 {
        self.inner.lock().count(state)
    }

    /// Find the next NEEDED span inside `range`, at most `max_len` bytes
    /// long, and mark it PENDING in the same critical section.
    ///
    /// Never returns an empty range; `max_len == 0` yields `None`.
    pub fn find_and_mark_pending(
        &self,
        range: ByteRange,
        max_len: u64,
    ) -> PartitionResult<Option<ByteRange>> {
        if max_len == 0 {
            return Ok(None);
        }

        let mut tracker = self.inner.lock();
        let Some(found) = tracker.search(range, RangeState::Needed) else {
            return Ok(None);
        };

        let request = ByteRange::by_length(found.start, found.len().min(max_len));
        tracker.insert(request, RangeState::Pending)?;
        Ok(Some(request))
    }

    /// Run `f` with exclusive access to the tracker
    pub fn with<R>(&self, f: impl FnOnce(&mut RangeStateTracker) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> RangeStateTracker {
        self.inner.lock().clone()
    }
}
