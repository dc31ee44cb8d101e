//! Number-set ⇄ bitmask packing shared by roulette and keno
//!
//! Number `offset + i` maps to bit `i`. Roulette packs 0..=36 with offset 0,
//! keno packs 1..=N with offset 1.

use crate::errors::DecodeError;

/// Pack `numbers` into a mask of `width` bits. Duplicates collapse, order is irrelevant.
pub fn pack(numbers: &[u8], offset: u8, width: u32) -> Result<u64, DecodeError> {
    if numbers.is_empty() {
        return Err(DecodeError::EmptySelection);
    }
    let mut mask = 0u64;
    for &number in numbers {
        let bit = number
            .checked_sub(offset)
            .map(u32::from)
            .filter(|bit| *bit < width)
            .ok_or_else(|| DecodeError::ValueOutOfRange {
                what: "selected number",
                value: number.to_string(),
            })?;
        mask |= 1u64 << bit;
    }
    Ok(mask)
}

/// Unpack a mask into its ascending number list, rejecting bits beyond `width`
pub fn unpack(mask: u64, offset: u8, width: u32) -> Result<Vec<u8>, DecodeError> {
    if width < 64 && mask >> width != 0 {
        let bit = 63 - mask.leading_zeros();
        return Err(DecodeError::MaskOutOfRange { bit, width });
    }
    Ok((0..width)
        .filter(|bit| mask & (1u64 << bit) != 0)
        .map(|bit| offset + bit as u8)
        .collect())
}

/// Number of selected entries
pub fn count(mask: u64) -> usize {
    mask.count_ones() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_is_order_independent_and_deduplicates() {
        let a = pack(&[5, 0, 36, 5], 0, 37).unwrap();
        let b = pack(&[36, 5, 0], 0, 37).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, 1 | (1 << 5) | (1 << 36));
    }

    #[test]
    fn test_unpack_sorted() {
        let mask = pack(&[30, 2, 17], 0, 37).unwrap();
        assert_eq!(unpack(mask, 0, 37).unwrap(), vec![2, 17, 30]);
    }

    #[test]
    fn test_one_indexed_packing() {
        let mask = pack(&[1, 40], 1, 40).unwrap();
        assert_eq!(mask, 1 | (1 << 39));
        assert_eq!(unpack(mask, 1, 40).unwrap(), vec![1, 40]);
    }

    #[test]
    fn test_out_of_range_numbers() {
        assert!(matches!(
            pack(&[37], 0, 37),
            Err(DecodeError::ValueOutOfRange { .. })
        ));
        assert!(matches!(
            pack(&[0], 1, 40),
            Err(DecodeError::ValueOutOfRange { .. })
        ));
        assert_eq!(pack(&[], 0, 37), Err(DecodeError::EmptySelection));
    }

    #[test]
    fn test_unpack_rejects_high_bits() {
        assert_eq!(
            unpack(1 << 37, 0, 37),
            Err(DecodeError::MaskOutOfRange { bit: 37, width: 37 })
        );
        assert_eq!(unpack(0, 0, 37).unwrap(), Vec::<u8>::new());
    }
}
