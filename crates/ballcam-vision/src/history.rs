use std::collections::VecDeque;

use ballcam_core::PositionSample;

/// A fixed-capacity, insertion-ordered buffer of recent ball positions. When full, pushing
/// a sample evicts the oldest one.
#[derive(Debug, Clone)]
pub struct PositionHistory {
    samples: VecDeque<PositionSample>,
    capacity: usize,
}

impl PositionHistory {
    /// Create an empty history. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: PositionSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn oldest(&self) -> Option<&PositionSample> {
        self.samples.front()
    }

    pub fn newest(&self) -> Option<&PositionSample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PositionSample> {
        self.samples.iter()
    }

    /// Mean pixel distance between consecutive samples, `None` with fewer than two
    /// samples.
    pub fn mean_step_px(&self) -> Option<f64> {
        if self.samples.len() < 2 {
            return None;
        }
        let steps = self.samples.len() - 1;
        let total: f64 = self
            .samples
            .iter()
            .zip(self.samples.iter().skip(1))
            .map(|(a, b)| (b.position - a.position).norm())
            .sum();
        Some(total / steps as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_evicts_oldest_when_full() {
        let mut history = PositionHistory::new(10);
        for i in 0..11 {
            history.push(PositionSample::new(i as f64, i as f64, 0.0));
        }

        assert_eq!(history.len(), 10);
        assert_eq!(history.oldest().unwrap().timestamp, 1.0);
        assert_eq!(history.newest().unwrap().timestamp, 10.0);
        let timestamps: Vec<f64> = history.iter().map(|s| s.timestamp).collect();
        assert_eq!(timestamps, (1..11).map(|i| i as f64).collect::<Vec<_>>());
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut history = PositionHistory::new(3);
        for i in 0..100 {
            history.push(PositionSample::new(i as f64, 0.0, 0.0));
            assert!(history.len() <= 3);
        }
    }

    #[test]
    fn test_zero_capacity() {
        let mut history = PositionHistory::new(0);
        history.push(PositionSample::new(0.0, 0.0, 0.0));
        history.push(PositionSample::new(1.0, 0.0, 0.0));
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_mean_step() {
        let mut history = PositionHistory::new(10);
        assert!(history.mean_step_px().is_none());
        history.push(PositionSample::new(0.0, 0.0, 0.0));
        assert!(history.mean_step_px().is_none());
        history.push(PositionSample::new(1.0, 3.0, 4.0));
        history.push(PositionSample::new(2.0, 3.0, 5.0));
        assert_relative_eq!(history.mean_step_px().unwrap(), 3.0);
    }
}
