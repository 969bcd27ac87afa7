//! String seeding

/// Fold a string into a 32-bit seed
///
/// Each UTF-16 code unit is xor-mixed into the state with a multiply and a
/// 13-bit rotation, then the state is finalized with a multiply-xor-shift
/// avalanche. Fast and well distributed, not cryptographic.
pub fn string_hash(input: &str) -> u32 {
    let units: Vec<u16> = input.encode_utf16().collect();
    let mut h = 1_779_033_703u32 ^ units.len() as u32;
    for unit in units {
        h = (h ^ u32::from(unit)).wrapping_mul(3_432_918_353);
        h = h.rotate_left(13);
    }
    h = (h ^ (h >> 16)).wrapping_mul(2_246_822_507);
    h = (h ^ (h >> 13)).wrapping_mul(3_266_489_909);
    h ^ (h >> 16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_values() {
        assert_eq!(string_hash("abc"), 1_792_905_582);
        assert_eq!(string_hash(""), 167_010_153);
    }

    #[test]
    fn test_distinguishes_inputs() {
        assert_ne!(string_hash("abc"), string_hash("abd"));
        assert_ne!(string_hash("ab"), string_hash("ba"));
    }
}
