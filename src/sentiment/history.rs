// =============================================================================
// Rolling Meter History: bounded FIFO sequences for the dashboard chart
// =============================================================================

use std::collections::VecDeque;

use serde::Serialize;

use super::status::StatusClassification;

/// Bounded FIFO: pushing past capacity evicts from the front.
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> RollingWindow<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, item: T) {
        self.items.push_back(item);
        while self.items.len() > self.capacity {
            self.items.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }

    /// Oldest first.
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

/// One evaluation snapshot of both futures meters.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryPoint {
    /// IST `HH:MM`, the chart's x-axis label.
    pub timestamp: String,
    /// IST `YYYY-MM-DD HH:MM:SS`.
    pub time_full: String,
    pub nifty_meter: f64,
    pub bank_meter: f64,
    pub nifty_impact: StatusClassification,
    pub bank_impact: StatusClassification,
}

/// Per-basket history sequences. Each append lands in both.
#[derive(Debug, Clone)]
pub struct MeterHistory {
    nifty: RollingWindow<HistoryPoint>,
    bank: RollingWindow<HistoryPoint>,
}

impl MeterHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            nifty: RollingWindow::new(capacity),
            bank: RollingWindow::new(capacity),
        }
    }

    pub fn append(&mut self, point: HistoryPoint) {
        self.nifty.push(point.clone());
        self.bank.push(point);
    }

    pub fn nifty(&self) -> Vec<HistoryPoint> {
        self.nifty.to_vec()
    }

    pub fn bank(&self) -> Vec<HistoryPoint> {
        self.bank.to_vec()
    }

    pub fn len(&self) -> usize {
        self.nifty.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentiment::status::classify;

    fn point(i: usize) -> HistoryPoint {
        HistoryPoint {
            timestamp: format!("{i}"),
            time_full: format!("p{i}"),
            nifty_meter: i as f64 / 1000.0,
            bank_meter: -(i as f64) / 1000.0,
            nifty_impact: classify(0.0),
            bank_impact: classify(0.0),
        }
    }

    #[test]
    fn window_evicts_oldest_first() {
        let mut w = RollingWindow::new(100);
        for i in 0..105 {
            w.push(i);
        }
        assert_eq!(w.len(), 100);
        let items = w.to_vec();
        assert_eq!(items.first(), Some(&5));
        assert_eq!(items.last(), Some(&104));
        assert!(items.windows(2).all(|p| p[0] + 1 == p[1]));
        assert_eq!(w.latest(), Some(&104));
    }

    #[test]
    fn window_under_capacity_keeps_everything() {
        let mut w = RollingWindow::new(3);
        assert!(w.is_empty());
        w.push("a");
        w.push("b");
        assert_eq!(w.to_vec(), vec!["a", "b"]);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut w = RollingWindow::new(0);
        w.push(1);
        w.push(2);
        assert_eq!(w.to_vec(), vec![2]);
    }

    #[test]
    fn history_appends_to_both_sequences() {
        let mut h = MeterHistory::new(100);
        for i in 0..105 {
            h.append(point(i));
        }
        assert_eq!(h.len(), 100);
        assert_eq!(h.nifty().len(), 100);
        assert_eq!(h.bank().len(), 100);
        assert_eq!(h.nifty()[0].time_full, "p5");
        assert_eq!(h.bank()[99].time_full, "p104");
    }
}
