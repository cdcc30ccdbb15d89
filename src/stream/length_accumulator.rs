use tracing::{trace, warn};

use crate::channel::BoundedChannel;
use crate::stream::beat::Beat;

/// Counts a frame's valid bytes while mirroring its beats into the payload
///  channel, publishing the total to the length channel on the terminal beat.
///
/// Length and payload are written on the same cycle, so a consumer that sees
///  a frame's length is guaranteed the whole frame is already buffered
///  (provided the payload channel is deep enough, which is a configuration
///  obligation, not something checked here).
pub struct FrameLengthAccumulator {
    running_total: u16,
}

impl FrameLengthAccumulator {
    pub fn new() -> FrameLengthAccumulator {
        FrameLengthAccumulator { running_total: 0 }
    }

    /// One synchronous step. Returns true iff the offered beat was accepted;
    ///  ready means the payload channel has space for it.
    ///
    /// Frame lengths wrap at 16 bits - bounding frame size is the producer's
    ///  responsibility.
    pub fn step<const W: usize>(
        &mut self,
        offer: Option<Beat<W>>,
        payload: &mut BoundedChannel<Beat<W>>,
        lengths: &mut BoundedChannel<u16>,
    ) -> bool {
        let Some(beat) = offer else {
            return false;
        };
        if payload.is_full() {
            return false;
        }

        self.running_total = self.running_total.wrapping_add(beat.valid_bytes() as u16);
        if beat.last {
            trace!("frame complete: {} bytes", self.running_total);
            if lengths.try_push(self.running_total).is_err() {
                debug_assert!(false, "length channel full on a frame boundary - channel sizing violation");
                warn!("length channel full, dropping frame length {}", self.running_total);
            }
            self.running_total = 0;
        }

        let pushed = payload.try_push(beat);
        debug_assert!(pushed.is_ok());
        true
    }

    pub fn reset(&mut self) {
        self.running_total = 0;
    }
}


#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::*;

    fn beat(valid_bytes: usize, last: bool) -> Beat<16> {
        Beat::partial([0xaa; 16], valid_bytes, last)
    }

    #[rstest]
    #[case::single_full(vec![(16, true)], 16)]
    #[case::single_partial(vec![(5, true)], 5)]
    #[case::multi(vec![(16, false), (16, false), (3, true)], 35)]
    #[case::empty_terminator(vec![(16, false), (0, true)], 16)]
    #[case::zero_length_frame(vec![(0, true)], 0)]
    fn test_length_accuracy(#[case] beats: Vec<(usize, bool)>, #[case] expected: u16) {
        let mut accumulator = FrameLengthAccumulator::new();
        let mut payload = BoundedChannel::new(8);
        let mut lengths = BoundedChannel::new(4);

        for (valid_bytes, last) in &beats {
            assert!(accumulator.step(Some(beat(*valid_bytes, *last)), &mut payload, &mut lengths));
        }

        assert_eq!(lengths.try_pop(), Some(expected));
        assert!(lengths.is_empty());
        assert_eq!(payload.occupancy(), beats.len());
    }

    #[test]
    fn test_consecutive_frames() {
        let mut accumulator = FrameLengthAccumulator::new();
        let mut payload = BoundedChannel::new(8);
        let mut lengths = BoundedChannel::new(4);

        assert!(accumulator.step(Some(beat(16, false)), &mut payload, &mut lengths));
        assert!(accumulator.step(Some(beat(7, true)), &mut payload, &mut lengths));
        assert!(accumulator.step(Some(beat(2, true)), &mut payload, &mut lengths));

        assert_eq!(lengths.try_pop(), Some(23));
        assert_eq!(lengths.try_pop(), Some(2));
    }

    #[test]
    fn test_not_ready_when_payload_channel_full() {
        let mut accumulator = FrameLengthAccumulator::new();
        let mut payload = BoundedChannel::new(1);
        let mut lengths = BoundedChannel::new(4);

        assert!(accumulator.step(Some(beat(16, false)), &mut payload, &mut lengths));
        // channel full: the terminal beat is refused, the total untouched
        assert!(!accumulator.step(Some(beat(4, true)), &mut payload, &mut lengths));
        assert!(lengths.is_empty());

        payload.try_pop().unwrap();
        assert!(accumulator.step(Some(beat(4, true)), &mut payload, &mut lengths));
        assert_eq!(lengths.try_pop(), Some(20));
    }

    #[test]
    fn test_idle_cycle() {
        let mut accumulator = FrameLengthAccumulator::new();
        let mut payload: BoundedChannel<Beat<16>> = BoundedChannel::new(8);
        let mut lengths = BoundedChannel::new(4);

        assert!(!accumulator.step(None, &mut payload, &mut lengths));
        assert!(payload.is_empty());
        assert!(lengths.is_empty());
    }

    #[test]
    fn test_reset_clears_running_total() {
        let mut accumulator = FrameLengthAccumulator::new();
        let mut payload = BoundedChannel::new(8);
        let mut lengths = BoundedChannel::new(4);

        assert!(accumulator.step(Some(beat(16, false)), &mut payload, &mut lengths));
        accumulator.reset();

        assert!(accumulator.step(Some(beat(4, true)), &mut payload, &mut lengths));
        assert_eq!(lengths.try_pop(), Some(4));
    }
}
