use std::fmt::{Debug, Formatter};
use std::net::Ipv4Addr;

use bitflags::bitflags;
use bytes::{Buf, BufMut, BytesMut};

use crate::config::EncapConfig;
use crate::header::checksum::ipv4_header_checksum;
use crate::stream::beat::FrameMeta;

pub const ETH_HEADER_LEN: usize = 14;
pub const IP_HEADER_LEN: usize = 20;
pub const UDP_HEADER_LEN: usize = 8;
/// application extension: 8-byte target address (+ optional burst-length byte)
pub const TARGET_ADDR_LEN: usize = 8;

pub const ETHERTYPE_IPV4: u16 = 0x0800;
pub const IP_VERSION_IHL: u8 = 0x45;
pub const IP_TTL: u8 = 0x40;
pub const IP_PROTO_UDP: u8 = 0x11;

bitflags! {
    /// IPv4 flags plus fragment offset, packed as one 16-bit header word.
    #[derive(Debug, PartialEq, Eq, Copy, Clone)]
    pub struct IpFragment: u16 {
        const DONT_FRAGMENT = 0x4000;
        const MORE_FRAGMENTS = 0x2000;
    }
}

/// Synthesized header length in bytes: 51 with the burst-length byte, 50
///  without.
pub const fn header_len(include_burst_len: bool) -> usize {
    ETH_HEADER_LEN + IP_HEADER_LEN + UDP_HEADER_LEN + TARGET_ADDR_LEN + include_burst_len as usize
}

/// One frame's complete protocol header, immutable once computed.
///
/// Length fields are derived from the frame's payload length; everything else
///  comes from static configuration and the frame's out-of-band metadata.
///  Field values are held in their natural (network byte order) layout;
///  [FrameHeader::wire_bytes] produces the byte-reversed form that the
///  splicer places into the header transfer unit.
#[derive(Clone, Eq, PartialEq)]
pub struct FrameHeader {
    pub dst_mac: [u8; 6],
    pub src_mac: [u8; 6],
    pub ethertype: u16,

    pub ip_version_ihl: u8,
    pub ip_dscp_ecn: u8,
    pub ip_total_len: u16,
    pub ip_id: u16,
    pub ip_fragment: IpFragment,
    pub ip_ttl: u8,
    pub ip_protocol: u8,
    pub ip_checksum: u16,
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,

    pub src_port: u16,
    pub dst_port: u16,
    pub udp_len: u16,
    pub udp_checksum: u16,

    pub target_addr: u64,
    pub burst_len: Option<u8>,
}

impl Debug for FrameHeader {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "HDR{{ip_len={},udp_len={},target={:016x}}}", self.ip_total_len, self.udp_len, self.target_addr)
    }
}

impl FrameHeader {
    /// Builds the header for one frame. Frame lengths that overflow the
    ///  16-bit length fields wrap; bounding frame size below
    ///  `65535 - fixed header bytes` is the caller's responsibility.
    pub fn new(frame_len: u16, meta: &FrameMeta, config: &EncapConfig) -> FrameHeader {
        let ext_len = TARGET_ADDR_LEN + config.include_burst_len as usize;

        let mut header = FrameHeader {
            dst_mac: config.dst_mac,
            src_mac: config.src_mac(),
            ethertype: ETHERTYPE_IPV4,
            ip_version_ihl: IP_VERSION_IHL,
            ip_dscp_ecn: 0,
            ip_total_len: ((IP_HEADER_LEN + UDP_HEADER_LEN + ext_len) as u16).wrapping_add(frame_len),
            ip_id: 0,
            ip_fragment: IpFragment::DONT_FRAGMENT,
            ip_ttl: IP_TTL,
            ip_protocol: IP_PROTO_UDP,
            ip_checksum: 0,
            src_ip: config.src_ip,
            dst_ip: config.dst_ip,
            src_port: config.src_port,
            dst_port: config.dst_port,
            udp_len: ((UDP_HEADER_LEN + ext_len) as u16).wrapping_add(frame_len),
            udp_checksum: 0,
            target_addr: meta.target_addr,
            burst_len: config.include_burst_len.then_some(meta.burst_len),
        };
        header.ip_checksum = header.checksum_ip();
        header
    }

    pub fn len(&self) -> usize {
        header_len(self.burst_len.is_some())
    }

    fn checksum_ip(&self) -> u16 {
        let mut buf = BytesMut::with_capacity(IP_HEADER_LEN);
        self.ser_ip(&mut buf, 0);
        ipv4_header_checksum(&buf)
    }

    fn ser_ip(&self, buf: &mut impl BufMut, checksum: u16) {
        buf.put_u8(self.ip_version_ihl);
        buf.put_u8(self.ip_dscp_ecn);
        buf.put_u16(self.ip_total_len);
        buf.put_u16(self.ip_id);
        buf.put_u16(self.ip_fragment.bits());
        buf.put_u8(self.ip_ttl);
        buf.put_u8(self.ip_protocol);
        buf.put_u16(checksum);
        buf.put_u32(self.src_ip.to_bits());
        buf.put_u32(self.dst_ip.to_bits());
    }

    /// Serializes the header in its natural big-endian field layout.
    pub fn ser(&self, buf: &mut impl BufMut) {
        buf.put_slice(&self.dst_mac);
        buf.put_slice(&self.src_mac);
        buf.put_u16(self.ethertype);

        self.ser_ip(buf, self.ip_checksum);

        buf.put_u16(self.src_port);
        buf.put_u16(self.dst_port);
        buf.put_u16(self.udp_len);
        buf.put_u16(self.udp_checksum);

        buf.put_u64(self.target_addr);
        if let Some(burst_len) = self.burst_len {
            buf.put_u8(burst_len);
        }
    }

    /// Header bytes as they occupy the header transfer unit: the natural
    ///  big-endian record reversed, so that byte 0 of the unit is the least
    ///  significant byte of the logical header structure.
    pub fn wire_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(self.len());
        self.ser(&mut buf);
        let mut bytes = buf.to_vec();
        bytes.reverse();
        bytes
    }

    /// Reads back a header in its natural field layout, validating the fixed
    ///  protocol constants.
    pub fn try_parse(buf: &mut impl Buf, include_burst_len: bool) -> anyhow::Result<FrameHeader> {
        let mut dst_mac = [0u8; 6];
        buf.try_copy_to_slice(&mut dst_mac)?;
        let mut src_mac = [0u8; 6];
        buf.try_copy_to_slice(&mut src_mac)?;

        let ethertype = buf.try_get_u16()?;
        if ethertype != ETHERTYPE_IPV4 {
            return Err(anyhow::anyhow!("unsupported ethertype {:#06x}", ethertype));
        }
        let ip_version_ihl = buf.try_get_u8()?;
        if ip_version_ihl != IP_VERSION_IHL {
            return Err(anyhow::anyhow!("unsupported IP version/IHL {:#04x}", ip_version_ihl));
        }

        Ok(FrameHeader {
            dst_mac,
            src_mac,
            ethertype,
            ip_version_ihl,
            ip_dscp_ecn: buf.try_get_u8()?,
            ip_total_len: buf.try_get_u16()?,
            ip_id: buf.try_get_u16()?,
            ip_fragment: IpFragment::from_bits_retain(buf.try_get_u16()?),
            ip_ttl: buf.try_get_u8()?,
            ip_protocol: buf.try_get_u8()?,
            ip_checksum: buf.try_get_u16()?,
            src_ip: Ipv4Addr::from_bits(buf.try_get_u32()?),
            dst_ip: Ipv4Addr::from_bits(buf.try_get_u32()?),
            src_port: buf.try_get_u16()?,
            dst_port: buf.try_get_u16()?,
            udp_len: buf.try_get_u16()?,
            udp_checksum: buf.try_get_u16()?,
            target_addr: buf.try_get_u64()?,
            burst_len: if include_burst_len { Some(buf.try_get_u8()?) } else { None },
        })
    }
}


#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::*;

    fn config(include_burst_len: bool) -> EncapConfig {
        let mut config = EncapConfig::new();
        config.include_burst_len = include_burst_len;
        config
    }

    fn meta() -> FrameMeta {
        FrameMeta {
            target_addr: 0x1122_3344_5566_7788,
            burst_len: 0x42,
        }
    }

    #[rstest]
    #[case::with_burst_len(true, 51)]
    #[case::without_burst_len(false, 50)]
    fn test_serialized_len(#[case] include_burst_len: bool, #[case] expected: usize) {
        let header = FrameHeader::new(100, &meta(), &config(include_burst_len));
        assert_eq!(header.len(), expected);

        let mut buf = BytesMut::new();
        header.ser(&mut buf);
        assert_eq!(buf.len(), expected);
    }

    #[test]
    fn test_field_layout() {
        let header = FrameHeader::new(0x0100, &meta(), &config(true));
        let mut buf = BytesMut::new();
        header.ser(&mut buf);

        assert_eq!(&buf[0..6], &[0xff; 6]);                    // dst mac
        assert_eq!(&buf[6..12], &header.src_mac);              // src mac
        assert_eq!(&buf[12..14], &[0x08, 0x00]);               // ethertype
        assert_eq!(buf[14], 0x45);                             // version/IHL
        // ip total length = 20 + 8 + 9 + 0x100
        assert_eq!(&buf[16..18], &(37u16 + 0x100).to_be_bytes());
        assert_eq!(&buf[20..22], &[0x40, 0x00]);               // DF, no fragment offset
        assert_eq!(buf[22], 0x40);                             // ttl
        assert_eq!(buf[23], 0x11);                             // protocol = UDP
        assert_eq!(&buf[26..30], &[192, 168, 1, 10]);          // src ip
        assert_eq!(&buf[30..34], &[192, 168, 1, 20]);          // dst ip
        assert_eq!(&buf[34..36], &0x4321u16.to_be_bytes());    // src port
        assert_eq!(&buf[36..38], &0x1234u16.to_be_bytes());    // dst port
        // udp length = 8 + 9 + 0x100
        assert_eq!(&buf[38..40], &(17u16 + 0x100).to_be_bytes());
        assert_eq!(&buf[40..42], &[0, 0]);                     // udp checksum unused
        assert_eq!(&buf[42..50], &0x1122_3344_5566_7788u64.to_be_bytes());
        assert_eq!(buf[50], 0x42);                             // burst length
    }

    #[rstest]
    #[case::empty(0)]
    #[case::small(13)]
    #[case::large(1400)]
    #[case::max(u16::MAX)]
    fn test_ip_checksum_folds_to_all_ones(#[case] frame_len: u16) {
        let header = FrameHeader::new(frame_len, &meta(), &config(true));
        let mut buf = BytesMut::new();
        header.ser(&mut buf);

        // sum all IP header words including the stored checksum
        let mut sum = 0u32;
        for word in buf[ETH_HEADER_LEN..ETH_HEADER_LEN + IP_HEADER_LEN].chunks_exact(2) {
            sum += u32::from(u16::from_be_bytes([word[0], word[1]]));
        }
        while sum > 0xffff {
            sum = (sum & 0xffff) + (sum >> 16);
        }
        assert_eq!(sum, 0xffff);
    }

    #[test]
    fn test_wire_bytes_are_reversed() {
        let header = FrameHeader::new(77, &meta(), &config(true));
        let mut buf = BytesMut::new();
        header.ser(&mut buf);

        let wire = header.wire_bytes();
        assert_eq!(wire.len(), buf.len());
        for (n, byte) in wire.iter().enumerate() {
            assert_eq!(*byte, buf[buf.len() - 1 - n]);
        }
        // byte 0 of the unit = least significant byte of the record = burst length
        assert_eq!(wire[0], 0x42);
    }

    #[rstest]
    #[case::with_burst_len(true, 0)]
    #[case::with_burst_len_large(true, 9999)]
    #[case::without_burst_len(false, 512)]
    fn test_ser_parse_round_trip(#[case] include_burst_len: bool, #[case] frame_len: u16) {
        let header = FrameHeader::new(frame_len, &meta(), &config(include_burst_len));
        let mut buf = BytesMut::new();
        header.ser(&mut buf);

        let mut b: &[u8] = &buf;
        let parsed = FrameHeader::try_parse(&mut b, include_burst_len).unwrap();
        assert!(b.is_empty());
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_parse_rejects_wrong_ethertype() {
        let header = FrameHeader::new(10, &meta(), &config(true));
        let mut buf = BytesMut::new();
        header.ser(&mut buf);
        buf[12] = 0x86; // pretend IPv6

        let mut b: &[u8] = &buf;
        assert!(FrameHeader::try_parse(&mut b, true).is_err());
    }
}
