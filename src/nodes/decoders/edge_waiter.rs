//! Edge waiter: advances a pin stream to the next sample matching a wait set
//!
//! This is the decoder's only suspension point. Each call resumes just after
//! the last consumed sample and never re-delivers a sample. One sample of
//! look-back is kept so edges are detected across calls (and across the block
//! frames a [`BlockSource`](crate::nodes::BlockSource) is built from).
//! Matches carry the capture position reported by the source; when positions
//! jump the look-back is dropped, so no edge is reported across missing samples.

use super::types::EdgeCondition;
use crate::nodes::pin_source::PinSource;
use crate::runtime::PinVector;
use tracing::{debug, trace, warn};

/// Result of a successful [`EdgeWaiter::wait`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitMatch {
    /// Sample position of the match
    pub position: u64,
    /// Pin states at that sample
    pub pins: PinVector,
    /// One flag per condition of the wait set
    pub matched: Vec<bool>,
}

impl WaitMatch {
    /// Whether condition `index` of the wait set fired
    pub fn fired(&self, index: usize) -> bool {
        self.matched.get(index).copied().unwrap_or(false)
    }
}

pub struct EdgeWaiter<S> {
    source: S,
    /// Last consumed sample and its position
    previous: Option<(u64, PinVector)>,
    consumed: u64,
}

impl<S: PinSource> EdgeWaiter<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            previous: None,
            consumed: 0,
        }
    }

    /// Number of samples consumed from the source so far
    pub fn samples_consumed(&self) -> u64 {
        self.consumed
    }

    /// Give the source back (e.g. to inspect its remaining samples)
    pub fn into_inner(self) -> S {
        self.source
    }

    /// Advance to the first sample at which any condition holds.
    ///
    /// Returns `None` when the source is exhausted first; this is the
    /// normal end of input.
    pub fn wait(&mut self, conditions: &[EdgeCondition]) -> Option<WaitMatch> {
        if conditions.is_empty() {
            warn!("wait() called with an empty wait set");
            return None;
        }

        loop {
            let (position, pins) = self.source.next_pins()?;
            self.consumed += 1;

            // Only an adjacent sample can serve as look-back
            let previous = match &self.previous {
                Some((prev_position, prev)) if prev_position + 1 == position => Some(prev),
                Some((prev_position, _)) => {
                    debug!(
                        "Discontinuity {} -> {}, no edges on sample {}",
                        prev_position, position, position
                    );
                    None
                }
                None => None,
            };

            let matched: Vec<bool> = conditions
                .iter()
                .map(|condition| Self::evaluate(condition, previous, &pins))
                .collect();

            if matched.iter().any(|&m| m) {
                trace!("Match {:?} at sample {}: {}", matched, position, pins);
                self.previous = Some((position, pins.clone()));
                return Some(WaitMatch {
                    position,
                    pins,
                    matched,
                });
            }

            self.previous = Some((position, pins));
        }
    }

    /// All terms of a condition must hold; an empty condition matches any sample
    fn evaluate(condition: &EdgeCondition, previous: Option<&PinVector>, current: &PinVector) -> bool {
        condition.terms().iter().all(|&(channel, transition)| {
            let prev = previous.and_then(|p| p.get(channel));
            transition.matches(prev, current.get(channel))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::decoders::types::Transition;
    use crate::nodes::pin_source::{BlockSource, MemorySource};
    use crate::runtime::{BlockFrame, SampleBlock, bounded};

    fn waiter(traces: &[(usize, &[bool])]) -> EdgeWaiter<MemorySource> {
        EdgeWaiter::new(MemorySource::from_traces(4, traces))
    }

    #[test]
    fn test_falling_edge_position() {
        let mut w = waiter(&[(0, &[true, true, false, false, true, false])]);
        let cond = [EdgeCondition::single(0, Transition::Falling)];

        let m = w.wait(&cond).unwrap();
        assert_eq!(m.position, 2);
        assert_eq!(m.matched, vec![true]);

        let m = w.wait(&cond).unwrap();
        assert_eq!(m.position, 5);

        assert!(w.wait(&cond).is_none());
        assert_eq!(w.samples_consumed(), 6);
    }

    #[test]
    fn test_no_edge_at_first_sample() {
        // Channel starts high: no previous sample, so no rising edge at 0
        let mut w = waiter(&[(0, &[true, true])]);
        assert!(w.wait(&[EdgeCondition::single(0, Transition::Rising)]).is_none());
    }

    #[test]
    fn test_level_condition_matches_first_and_repeats() {
        let mut w = waiter(&[(1, &[true, true, false])]);
        let cond = [EdgeCondition::single(1, Transition::High)];
        assert_eq!(w.wait(&cond).map(|m| m.position), Some(0));
        assert_eq!(w.wait(&cond).map(|m| m.position), Some(1));
        assert!(w.wait(&cond).is_none());
    }

    #[test]
    fn test_reports_every_matching_condition() {
        let mut w = waiter(&[(0, &[true, false]), (1, &[false, true])]);
        let conds = [
            EdgeCondition::single(0, Transition::Falling),
            EdgeCondition::single(1, Transition::Rising),
            EdgeCondition::single(1, Transition::Falling),
        ];
        let m = w.wait(&conds).unwrap();
        assert_eq!(m.position, 1);
        assert_eq!(m.matched, vec![true, true, false]);
        assert!(m.fired(0) && m.fired(1) && !m.fired(2) && !m.fired(9));
    }

    #[test]
    fn test_multi_term_condition_requires_all_terms() {
        let mut w = waiter(&[(0, &[true, false, true, false]), (1, &[true, true, false, false])]);
        let cond = [EdgeCondition::single(0, Transition::Falling).with(1, Transition::Low)];
        assert_eq!(w.wait(&cond).map(|m| m.position), Some(3));
    }

    #[test]
    fn test_unwired_channel_never_matches() {
        let mut w = waiter(&[(0, &[false, true, false])]);
        let cond = [
            EdgeCondition::single(3, Transition::Either),
            EdgeCondition::single(3, Transition::Low),
        ];
        assert!(w.wait(&cond).is_none());
    }

    #[test]
    fn test_edges_seen_across_calls() {
        // The sample consumed by one wait is the look-back for the next
        let mut w = waiter(&[(0, &[false, true, false]), (1, &[false, true, true])]);
        let m = w.wait(&[EdgeCondition::single(1, Transition::Rising)]).unwrap();
        assert_eq!(m.position, 1);
        let m = w.wait(&[EdgeCondition::single(0, Transition::Falling)]).unwrap();
        assert_eq!(m.position, 2);
    }

    #[test]
    fn test_empty_wait_set_returns_none() {
        let mut w = waiter(&[(0, &[true])]);
        assert!(w.wait(&[]).is_none());
        assert_eq!(w.samples_consumed(), 0);
    }

    #[test]
    fn test_empty_condition_matches_next_sample() {
        let mut w = waiter(&[(0, &[true, false])]);
        assert_eq!(w.wait(&[EdgeCondition::new()]).map(|m| m.position), Some(0));
        assert_eq!(w.wait(&[EdgeCondition::new()]).map(|m| m.position), Some(1));
    }

    fn gapped_source(frames: &[(u64, &[bool])]) -> BlockSource {
        let (tx, rx) = bounded::<BlockFrame>(frames.len() + 1);
        for &(start, levels) in frames {
            let block = SampleBlock::from_levels(levels, start);
            tx.send(BlockFrame::new(start, levels.len(), vec![Some(block)]))
                .unwrap();
        }
        tx.close();
        BlockSource::new(rx)
    }

    #[test]
    fn test_positions_follow_capture_after_gap() {
        let mut w = EdgeWaiter::new(gapped_source(&[(0, &[false, false]), (10, &[false, true])]));
        let m = w.wait(&[EdgeCondition::single(0, Transition::Rising)]).unwrap();
        assert_eq!(m.position, 11);
        assert_eq!(w.samples_consumed(), 4);
    }

    #[test]
    fn test_no_edge_across_gap() {
        // Low before the gap, high after it: the change happened somewhere unseen
        let mut w = EdgeWaiter::new(gapped_source(&[(0, &[false, false]), (10, &[true, true])]));
        assert!(w.wait(&[EdgeCondition::single(0, Transition::Rising)]).is_none());
    }

    #[test]
    fn test_level_matches_right_after_gap() {
        let mut w = EdgeWaiter::new(gapped_source(&[(0, &[false]), (5, &[true])]));
        let m = w.wait(&[EdgeCondition::single(0, Transition::High)]).unwrap();
        assert_eq!(m.position, 5);
    }
}
