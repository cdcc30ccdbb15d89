/// Ones'-complement checksum over the IPv4 header (RFC 1071): sum all 16-bit
///  big-endian words with the checksum field zeroed, fold the carries back
///  into the low 16 bits, complement.
///
/// The caller passes the serialized header with the checksum bytes set to 0.
pub fn ipv4_header_checksum(header: &[u8]) -> u16 {
    let mut sum = 0u32;

    let mut words = header.chunks_exact(2);
    for word in &mut words {
        sum += u32::from(u16::from_be_bytes([word[0], word[1]]));
    }
    if let Some(&odd) = words.remainder().first() {
        sum += u32::from(odd) << 8;
    }

    while sum > 0xffff {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}
