use std::sync::Arc;

use tracing::{debug, trace};

use crate::channel::BoundedChannel;
use crate::config::EncapConfig;
use crate::header::FrameHeader;
use crate::stream::beat::{Beat, FrameMeta};

enum SplicerState {
    AwaitFrame,
    EmitPayload,
}

/// Framing state machine: emits one synthesized header unit per frame,
///  followed by the frame's buffered payload beats verbatim.
///
/// Length and metadata are consumed in lockstep, one of each per frame, in
///  FIFO order. Metadata is captured into a holding register the moment it
///  shows up (the channel item is transient and must not be re-read); the
///  header is only built and emitted once the frame length is available and
///  the downstream is ready, so a stalled cycle never loses anything.
pub struct Splicer<const W: usize> {
    config: Arc<EncapConfig>,
    state: SplicerState,
    held_meta: Option<FrameMeta>,
}

impl<const W: usize> Splicer<W> {
    pub fn new(config: Arc<EncapConfig>) -> Splicer<W> {
        assert!(config.header_len() <= W, "header must fit in one transfer unit");
        Splicer {
            config,
            state: SplicerState::AwaitFrame,
            held_meta: None,
        }
    }

    /// One synchronous step; returns the transfer unit emitted this cycle,
    ///  if any. Must only return a unit when `out_ready` is true.
    pub fn step(
        &mut self,
        lengths: &mut BoundedChannel<u16>,
        metas: &mut BoundedChannel<FrameMeta>,
        payload: &mut BoundedChannel<Beat<W>>,
        out_ready: bool,
    ) -> Option<Beat<W>> {
        match self.state {
            SplicerState::AwaitFrame => self.step_await_frame(lengths, metas, payload, out_ready),
            SplicerState::EmitPayload => self.step_emit_payload(payload, out_ready),
        }
    }

    fn step_await_frame(
        &mut self,
        lengths: &mut BoundedChannel<u16>,
        metas: &mut BoundedChannel<FrameMeta>,
        payload: &mut BoundedChannel<Beat<W>>,
        out_ready: bool,
    ) -> Option<Beat<W>> {
        // capture metadata for the upcoming frame independent of downstream
        //  readiness - it may arrive any number of cycles before the length
        if self.held_meta.is_none() {
            self.held_meta = metas.try_pop();
            if let Some(meta) = &self.held_meta {
                trace!("captured metadata for upcoming frame: {:?}", meta);
            }
        }

        if !out_ready {
            return None;
        }
        let meta = self.held_meta?;
        let &frame_len = lengths.peek()?;
        if frame_len == 0 && payload.is_empty() {
            // the zero-length frame's terminator beat is not buffered yet
            return None;
        }
        lengths.try_pop();

        let header = FrameHeader::new(frame_len, &meta, &self.config);
        debug!("splicing frame: {} payload bytes, header {:?}", frame_len, header);

        let wire = header.wire_bytes();
        let mut data = [0u8; W];
        data[..wire.len()].copy_from_slice(&wire);
        let keep = Beat::<W>::keep_for(wire.len());

        if frame_len == 0 {
            // the frame is just its header; consume and drop the empty
            //  terminator beat so it cannot leak into the next frame
            let dropped = payload.try_pop();
            debug_assert!(
                matches!(dropped, Some(beat) if beat.last && beat.valid_bytes() == 0),
                "zero-length frame must be terminated by an empty beat"
            );
            self.held_meta = None;
            Some(Beat { data, keep, last: true })
        } else {
            self.state = SplicerState::EmitPayload;
            Some(Beat { data, keep, last: false })
        }
    }

    fn step_emit_payload(&mut self, payload: &mut BoundedChannel<Beat<W>>, out_ready: bool) -> Option<Beat<W>> {
        if !out_ready {
            return None;
        }
        let beat = payload.try_pop()?;
        if beat.last {
            trace!("frame passthrough complete");
            self.state = SplicerState::AwaitFrame;
            self.held_meta = None;
        }
        Some(beat)
    }

    /// External reset: back to the initial state, in-flight registers cleared.
    pub fn reset(&mut self) {
        self.state = SplicerState::AwaitFrame;
        self.held_meta = None;
    }
}
