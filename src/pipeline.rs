use std::sync::Arc;

use anyhow::ensure;

use crate::channel::BoundedChannel;
use crate::config::EncapConfig;
use crate::stream::beat::{Beat, FrameMeta};
use crate::stream::length_accumulator::FrameLengthAccumulator;
use crate::stream::repacker::Repacker;
use crate::stream::splicer::Splicer;

/// Everything that happened in one global cycle.
#[derive(Debug)]
pub struct Tick<const W: usize> {
    /// the offered payload beat was consumed this cycle
    pub input_accepted: bool,
    /// the offered metadata record was consumed this cycle
    pub meta_accepted: bool,
    /// dense, wire-ready transfer unit emitted this cycle (only ever Some
    ///  when the cycle's `out_ready` was true)
    pub output: Option<Beat<W>>,
}

/// The complete encapsulation pipeline: length accumulator, splicer and
///  repacker, decoupled by the payload, length and metadata channels.
///
/// All stages share a single discrete time step. Each call to
///  [Encapsulator::step] advances every stage exactly once; downstream
///  stages run first, so whatever a producer writes to a channel in a cycle
///  becomes visible to its consumer on the next one (register semantics).
///  In particular a frame's length is never seen by the splicer before the
///  frame's payload is fully buffered.
pub struct Encapsulator<const W: usize> {
    config: Arc<EncapConfig>,
    payload: BoundedChannel<Beat<W>>,
    lengths: BoundedChannel<u16>,
    metas: BoundedChannel<FrameMeta>,
    accumulator: FrameLengthAccumulator,
    splicer: Splicer<W>,
    repacker: Repacker<W>,
}

impl<const W: usize> Encapsulator<W> {
    pub fn new(config: EncapConfig) -> anyhow::Result<Encapsulator<W>> {
        config.validate()?;
        ensure!(
            config.header_len() <= W,
            "header ({} bytes) does not fit the transfer width ({} bytes)",
            config.header_len(),
            W,
        );

        let config = Arc::new(config);
        Ok(Encapsulator {
            payload: BoundedChannel::new(config.payload_depth),
            lengths: BoundedChannel::new(config.length_depth),
            metas: BoundedChannel::new(config.meta_depth),
            accumulator: FrameLengthAccumulator::new(),
            splicer: Splicer::new(config.clone()),
            repacker: Repacker::new(config.header_len()),
            config,
        })
    }

    pub fn config(&self) -> &EncapConfig {
        &self.config
    }

    /// Advances the whole pipeline by one cycle.
    ///
    /// `input` is the upstream producer's offered payload beat, `meta` its
    ///  offered per-frame metadata record (both re-offered next cycle if not
    ///  accepted), `out_ready` the downstream consumer's readiness.
    pub fn step(&mut self, input: Option<Beat<W>>, meta: Option<FrameMeta>, out_ready: bool) -> Tick<W> {
        let splice_ready = self.repacker.input_ready(out_ready);
        let spliced = self.splicer.step(&mut self.lengths, &mut self.metas, &mut self.payload, splice_ready);
        let output = self.repacker.step(spliced, out_ready);

        let meta_accepted = match meta {
            Some(meta) => self.metas.try_push(meta).is_ok(),
            None => false,
        };
        let input_accepted = self.accumulator.step(input, &mut self.payload, &mut self.lengths);

        Tick {
            input_accepted,
            meta_accepted,
            output,
        }
    }

    /// External reset: every state machine back to its initial state, all
    ///  buffered and in-flight data discarded.
    pub fn reset(&mut self) {
        self.payload.clear();
        self.lengths.clear();
        self.metas.clear();
        self.accumulator.reset();
        self.splicer.reset();
        self.repacker.reset();
    }
}
