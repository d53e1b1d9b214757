//! A fixed-capacity ring buffer of recent samples.

/// A fixed-capacity circular buffer holding the most recent samples pushed
/// into it.
///
/// Once the buffer is full, pushing a new sample overwrites the oldest one.
/// Iteration always proceeds from the oldest to the newest retained sample.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryBuffer<T> {
    samples: Vec<T>,
    capacity: usize,
    idx_of_oldest: usize,
}

impl<T> HistoryBuffer<T> {
    /// Creates a new empty buffer that will retain at most `capacity`
    /// samples. A capacity of zero gives a buffer that discards everything.
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            idx_of_oldest: 0,
        }
    }

    /// Returns the maximum number of samples the buffer can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of samples currently in the buffer.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the buffer contains no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Whether the next push will overwrite the oldest sample.
    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    /// Adds the given sample as the newest one, overwriting the oldest sample
    /// if the buffer is full.
    pub fn push(&mut self, sample: T) {
        if self.capacity == 0 {
            return;
        }
        if self.is_full() {
            self.samples[self.idx_of_oldest] = sample;
            self.idx_of_oldest = (self.idx_of_oldest + 1) % self.capacity;
        } else {
            self.samples.push(sample);
        }
    }

    /// Returns the most recently pushed sample, or [`None`] if the buffer is
    /// empty.
    pub fn latest(&self) -> Option<&T> {
        if self.samples.is_empty() {
            None
        } else if self.idx_of_oldest == 0 {
            self.samples.last()
        } else {
            self.samples.get(self.idx_of_oldest - 1)
        }
    }

    /// Returns an iterator over the retained samples from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let (newer, older) = self.samples.split_at(self.idx_of_oldest);
        older.iter().chain(newer)
    }

    /// Removes all samples while keeping the capacity.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.idx_of_oldest = 0;
    }
}

impl<T: Clone> HistoryBuffer<T> {
    /// Returns the retained samples from oldest to newest.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn new_buffer_is_empty() {
        let buffer = HistoryBuffer::<f64>::new(3);
        assert!(buffer.is_empty());
        assert!(!buffer.is_full());
        assert_eq!(buffer.capacity(), 3);
        assert_eq!(buffer.latest(), None);
        assert_eq!(buffer.iter().count(), 0);
    }

    #[test]
    fn pushing_below_capacity_keeps_all_samples_in_order() {
        let mut buffer = HistoryBuffer::new(4);
        buffer.push(1);
        buffer.push(2);
        buffer.push(3);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.to_vec(), vec![1, 2, 3]);
        assert_eq!(buffer.latest(), Some(&3));
    }

    #[test]
    fn pushing_beyond_capacity_overwrites_oldest_samples() {
        let mut buffer = HistoryBuffer::new(3);
        for sample in 1..=5 {
            buffer.push(sample);
        }
        assert!(buffer.is_full());
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.to_vec(), vec![3, 4, 5]);
        assert_eq!(buffer.latest(), Some(&5));
    }

    #[test]
    fn zero_capacity_buffer_discards_samples() {
        let mut buffer = HistoryBuffer::new(0);
        buffer.push(1.0);
        assert!(buffer.is_empty());
        assert_eq!(buffer.latest(), None);
    }

    #[test]
    fn clearing_buffer_restarts_ordering() {
        let mut buffer = HistoryBuffer::new(2);
        buffer.push(1);
        buffer.push(2);
        buffer.push(3);
        buffer.clear();
        buffer.push(4);
        assert_eq!(buffer.to_vec(), vec![4]);
    }

    proptest! {
        #[test]
        fn buffer_always_holds_the_newest_samples(
            capacity in 1_usize..20,
            samples in prop::collection::vec(any::<i32>(), 0..100),
        ) {
            let mut buffer = HistoryBuffer::new(capacity);
            for &sample in &samples {
                buffer.push(sample);
            }
            let n_retained = samples.len().min(capacity);
            let expected = samples[samples.len() - n_retained..].to_vec();
            prop_assert_eq!(buffer.to_vec(), expected);
            prop_assert_eq!(buffer.latest(), samples.last());
        }
    }
}
