pub mod beat;
pub mod length_accumulator;
pub mod repacker;
pub mod splicer;
