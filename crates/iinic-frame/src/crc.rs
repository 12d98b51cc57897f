/// Generator polynomial with the implicit x^8 term.
const DIVISOR: u16 = 0x100 | 0xD5;

/// CRC-8 with polynomial 0xD5, MSB first, zero initial value.
///
/// Each input byte is shifted in and the running value is reduced by long
/// division; the residue after the last byte is the checksum.
pub fn crc8(data: &[u8]) -> u8 {
    let mut x: u16 = 0;
    for &byte in data {
        x = (x << 8) | u16::from(byte);
        for i in (0..8).rev() {
            if x >> (i + 8) != 0 {
                x ^= DIVISOR << i;
            }
        }
    }
    x as u8
}
