use std::fmt::{Debug, Formatter};

/// One fixed-width transfer unit of the synchronous stream.
///
/// Byte 0 is the low-order lane, the first byte on the wire. Valid bytes are
///  left-justified: `keep` covers a contiguous run of lanes starting at 0,
///  and only a frame's terminal beat may have fewer than `W` valid bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Beat<const W: usize> {
    pub data: [u8; W],
    /// per-byte valid mask; bit `n` covers `data[n]`
    pub keep: u64,
    /// true only on the terminal beat of a frame
    pub last: bool,
}

impl<const W: usize> Beat<W> {
    pub const FULL_KEEP: u64 = {
        assert!(W <= 64, "transfer width is limited to 64 bytes");
        if W == 64 { u64::MAX } else { (1u64 << W) - 1 }
    };

    /// Left-justified mask covering the first `valid_bytes` lanes.
    pub fn keep_for(valid_bytes: usize) -> u64 {
        assert!(valid_bytes <= W);
        if valid_bytes == 64 { u64::MAX } else { (1u64 << valid_bytes) - 1 }
    }

    /// A fully valid, non-terminal beat.
    pub fn full(data: [u8; W]) -> Beat<W> {
        Beat {
            data,
            keep: Self::FULL_KEEP,
            last: false,
        }
    }

    /// A beat with the first `valid_bytes` lanes valid.
    pub fn partial(data: [u8; W], valid_bytes: usize, last: bool) -> Beat<W> {
        Beat {
            data,
            keep: Self::keep_for(valid_bytes),
            last,
        }
    }

    /// The terminal beat of a zero-length frame: no valid bytes at all.
    pub fn empty_last() -> Beat<W> {
        Beat {
            data: [0; W],
            keep: 0,
            last: true,
        }
    }

    pub fn valid_bytes(&self) -> usize {
        self.keep.count_ones() as usize
    }

    /// The meaningful prefix of this beat (valid bytes are contiguous from
    ///  lane 0 by contract).
    pub fn valid_data(&self) -> &[u8] {
        &self.data[..self.valid_bytes()]
    }
}

impl<const W: usize> Debug for Beat<W> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "BEAT{{{}/{}B{}}}", self.valid_bytes(), W, if self.last { ",LAST" } else { "" })
    }
}


/// Out-of-band per-frame metadata, delivered through its own channel in the
///  same relative order as the frames themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameMeta {
    /// 8-byte target address of the remote write
    pub target_addr: u64,
    /// burst length; serialized only in the 51-byte header variant
    pub burst_len: u8,
}
