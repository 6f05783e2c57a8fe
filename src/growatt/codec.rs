//! Register codec
//!
//! Pure conversions from raw 16-bit register values to scaled quantities and
//! text. Indices are zero-based positions inside one register block; callers
//! guarantee the block is long enough (see [`check_len`](crate::modbus::client::check_len)).

/// Default divisor applied to Growatt measurements
pub const DEFAULT_SCALE: f64 = 10.0;

/// `block[index] / scale`
pub fn decode_scaled_single(block: &[u16], index: usize, scale: f64) -> f64 {
    f64::from(block[index]) / scale
}

/// Big-endian 32-bit value from `block[index]` (high) and `block[index + 1]` (low)
pub fn decode_u32(block: &[u16], index: usize) -> u32 {
    (u32::from(block[index]) << 16) | u32::from(block[index + 1])
}

/// `((block[index] << 16) | block[index + 1]) / scale`
pub fn decode_scaled_double(block: &[u16], index: usize, scale: f64) -> f64 {
    f64::from(decode_u32(block, index)) / scale
}

/// Two characters per register, high byte first.
pub fn decode_ascii_text(block: &[u16], start: usize, count: usize) -> String {
    block[start..start + count]
        .iter()
        .flat_map(|reg| reg.to_be_bytes())
        .map(char::from)
        .collect()
}

/// Model code as `T{n} Q{n} P{n} U{n} M{n} S{n}` from the low six nibbles of
/// the 32-bit value at `high_index`.
pub fn decode_model_code(block: &[u16], high_index: usize) -> String {
    let mo = decode_u32(block, high_index);
    let nibble = |shift: u32| (mo >> shift) & 0xF;
    format!(
        "T{} Q{} P{} U{} M{} S{}",
        nibble(20),
        nibble(16),
        nibble(12),
        nibble(8),
        nibble(4),
        nibble(0)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_register_scaling() {
        assert_eq!(decode_scaled_single(&[2305], 0, DEFAULT_SCALE), 230.5);
        assert_eq!(decode_scaled_single(&[0, 5000], 1, 100.0), 50.0);
        assert_eq!(decode_scaled_single(&[u16::MAX], 0, 1.0), 65535.0);
    }

    #[test]
    fn test_double_register_reassembly() {
        assert_eq!(decode_u32(&[0x0001, 0x0002], 0), 0x0001_0002);
        assert_eq!(decode_u32(&[0xFFFF, 0xFFFF], 0), u32::MAX);
        assert_eq!(decode_scaled_double(&[0, 1500], 0, DEFAULT_SCALE), 150.0);
        assert_eq!(
            decode_scaled_double(&[9, 0x0001, 0x86A0], 1, DEFAULT_SCALE),
            10_000.0
        );
    }

    #[test]
    fn test_double_register_matches_formula() {
        let samples = [(0u16, 0u16), (1, 0), (0x7FFF, 0xFFFF), (0xABCD, 0x1234)];
        for (hi, lo) in samples {
            for scale in [1.0, 2.0, 10.0, 7200.0] {
                let expected = f64::from((u32::from(hi) << 16) | u32::from(lo)) / scale;
                assert_eq!(decode_scaled_double(&[hi, lo], 0, scale), expected);
            }
        }
    }

    #[test]
    fn test_ascii_text() {
        assert_eq!(decode_ascii_text(&[0x4142, 0x4344], 0, 2), "ABCD");
        assert_eq!(decode_ascii_text(&[0x3031, 0x2E32, 0x2E33], 0, 3), "01.2.3");
        assert_eq!(decode_ascii_text(&[0, 0x4142, 0x4344, 0], 1, 2), "ABCD");
        assert_eq!(decode_ascii_text(&[0x4142], 0, 0), "");
    }

    #[test]
    fn test_model_code() {
        assert_eq!(decode_model_code(&[0x0012, 0x3456], 0), "T1 Q2 P3 U4 M5 S6");
        assert_eq!(decode_model_code(&[0, 0], 0), "T0 Q0 P0 U0 M0 S0");
        // Bits above the sixth nibble are ignored.
        assert_eq!(
            decode_model_code(&[0, 0xFFFF, 0x0A0B], 1),
            "T15 Q15 P0 U10 M0 S11"
        );
    }
}
