use tracing::trace;

use crate::stream::beat::Beat;

/// Trailing bytes carried from one cycle into the low lanes of the next
///  output unit. Only the first `header_len` lanes are meaningful.
#[derive(Clone, Copy)]
struct Held<const W: usize> {
    data: [u8; W],
    keep: u64,
}

#[derive(Clone, Copy)]
enum RepackerState<const W: usize> {
    AwaitHeader,
    Stream { held: Held<W> },
    Flush { held: Held<W> },
}

/// Byte-realignment state machine: turns the splicer's sparse output (whose
///  header unit leaves `W - H` lanes unused, shifting every later unit out of
///  alignment) into a dense stream where every unit except possibly a
///  frame's last is fully byte-packed.
///
/// Per frame, the emitted valid bytes are exactly the header bytes followed
///  by the original payload bytes - nothing duplicated, dropped or
///  reordered.
pub struct Repacker<const W: usize> {
    header_len: usize,
    state: RepackerState<W>,
}

impl<const W: usize> Repacker<W> {
    pub fn new(header_len: usize) -> Repacker<W> {
        assert!(header_len > 0 && header_len <= W, "header must fit in one transfer unit");
        Repacker {
            header_len,
            state: RepackerState::AwaitHeader,
        }
    }

    /// True iff an input unit offered this cycle would be consumed. Input
    ///  and output handshake on the same cycle, so readiness follows the
    ///  downstream's - except while flushing, where no input is taken until
    ///  the final partial unit is accepted.
    pub fn input_ready(&self, out_ready: bool) -> bool {
        match self.state {
            RepackerState::Flush { .. } => false,
            _ => out_ready,
        }
    }

    /// One synchronous step. `input` must only be Some on a cycle where
    ///  `input_ready` holds; returns the unit emitted this cycle, if any.
    pub fn step(&mut self, input: Option<Beat<W>>, out_ready: bool) -> Option<Beat<W>> {
        if !out_ready {
            debug_assert!(input.is_none(), "input offered on a cycle without downstream readiness");
            return None;
        }

        let h = self.header_len;
        let r = W - h;

        match self.state {
            RepackerState::AwaitHeader => {
                let unit = input?;
                // the header occupies lanes 0..H; lanes H..W are the padding
                //  this stage exists to remove
                let mut held = Held { data: [0u8; W], keep: Beat::<W>::keep_for(h) };
                held.data[..h].copy_from_slice(&unit.data[..h]);

                if unit.last {
                    // zero-payload frame: the header is the whole frame
                    trace!("repacked zero-payload frame");
                    return Some(Beat { data: held.data, keep: held.keep, last: true });
                }
                self.state = RepackerState::Stream { held };
                None
            }

            RepackerState::Stream { held } => {
                let unit = input?;
                // low lanes: bytes held from the previous cycle; high lanes:
                //  the leading R bytes of this unit
                let mut data = [0u8; W];
                data[..h].copy_from_slice(&held.data[..h]);
                data[h..].copy_from_slice(&unit.data[..r]);

                let lead_valid = unit.valid_bytes().min(r);
                let trail_valid = unit.valid_bytes() - lead_valid;
                let out_keep = Beat::<W>::keep_for(h + lead_valid);

                let mut next_held = Held { data: [0u8; W], keep: Beat::<W>::keep_for(trail_valid) };
                next_held.data[..h].copy_from_slice(&unit.data[r..]);

                if unit.last {
                    if trail_valid == 0 {
                        // the terminator fits entirely alongside the held
                        //  bytes: this output ends the frame
                        self.state = RepackerState::AwaitHeader;
                        return Some(Beat { data, keep: out_keep, last: true });
                    }
                    self.state = RepackerState::Flush { held: next_held };
                    Some(Beat { data, keep: out_keep, last: false })
                } else {
                    self.state = RepackerState::Stream { held: next_held };
                    Some(Beat { data, keep: out_keep, last: false })
                }
            }

            RepackerState::Flush { held } => {
                // leftover trailing bytes become the frame's final, partial unit
                self.state = RepackerState::AwaitHeader;
                Some(Beat { data: held.data, keep: held.keep, last: true })
            }
        }
    }

    /// External reset: back to the initial state, held bytes discarded.
    pub fn reset(&mut self) {
        self.state = RepackerState::AwaitHeader;
    }
}
