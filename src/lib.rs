//! Streaming encapsulation of a bulk-transfer payload stream into
//!  network-framed packets (Ethernet + IPv4 + UDP + an application header
//!  carrying a target address and burst length), modeled as a synchronous
//!  pipeline of ready/valid state machines.
//!
//! The pipeline has three cooperating stages, decoupled by bounded FIFO
//!  channels:
//! * the [frame-length accumulator](stream::length_accumulator) counts the
//!   valid bytes of every frame while buffering its beats, and publishes the
//!   total once per frame
//! * the [splicer](stream::splicer) synthesizes one protocol header per frame
//!   and emits it ahead of the frame's buffered payload beats
//! * the [repacker](stream::repacker) removes the padding that the
//!   header/payload width mismatch introduces, so every emitted transfer unit
//!   is fully byte-packed (except possibly a frame's last)
//!
//! All stages advance in lock step, one logical cycle at a time; see
//!  [pipeline::Encapsulator] for the global schedule. There is no transport
//!  below framing here - no ARP, no retransmission, no fragmentation - and no
//!  recovery beyond a full external reset.

pub mod channel;
pub mod config;
pub mod header;
pub mod pipeline;
pub mod stream;
