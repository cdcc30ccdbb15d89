use std::net::Ipv4Addr;

use anyhow::ensure;

use crate::header::frame_header;

/// First five bytes of the source MAC address; the last byte comes from
///  [EncapConfig::mac_suffix] so several encapsulator instances can share a
///  network segment.
pub const SRC_MAC_PREFIX: [u8; 5] = [0x00, 0x0a, 0x35, 0x02, 0x00];

/// Static session configuration, loaded once and shared by all stages.
#[derive(Debug, Clone)]
pub struct EncapConfig {
    /// last byte of the source MAC address (prefix is [SRC_MAC_PREFIX])
    pub mac_suffix: u8,
    pub dst_mac: [u8; 6],

    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    pub src_port: u16,
    pub dst_port: u16,

    /// payload channel depth in beats - must cover the largest expected
    ///  frame, so that a frame is always fully buffered before its length
    ///  becomes visible downstream
    pub payload_depth: usize,
    pub length_depth: usize,
    pub meta_depth: usize,

    /// selects the 51-byte header variant carrying a burst-length byte in
    ///  the application extension (the 50-byte variant omits it)
    pub include_burst_len: bool,
}

impl EncapConfig {
    pub fn new() -> EncapConfig {
        EncapConfig {
            mac_suffix: 0x01,
            dst_mac: [0xff; 6],
            src_ip: Ipv4Addr::new(192, 168, 1, 10),
            dst_ip: Ipv4Addr::new(192, 168, 1, 20),
            src_port: 0x4321,
            dst_port: 0x1234,
            payload_depth: 512,
            length_depth: 16,
            meta_depth: 16,
            include_burst_len: true,
        }
    }

    pub fn src_mac(&self) -> [u8; 6] {
        let mut mac = [0u8; 6];
        mac[..5].copy_from_slice(&SRC_MAC_PREFIX);
        mac[5] = self.mac_suffix;
        mac
    }

    /// Total synthesized header length in bytes (50 or 51 depending on the
    ///  burst-length variant).
    pub fn header_len(&self) -> usize {
        frame_header::header_len(self.include_burst_len)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.payload_depth > 0, "payload channel depth must be positive");
        ensure!(self.length_depth > 0, "length channel depth must be positive");
        ensure!(self.meta_depth > 0, "metadata channel depth must be positive");
        Ok(())
    }
}

impl Default for EncapConfig {
    fn default() -> Self {
        EncapConfig::new()
    }
}
