//! One-byte Pearson hash stored beside each archive entry.
//!
//! Detects accidental corruption only. The permutation is generated at compile
//! time from a fixed xorshift seed so every build agrees on it.

const fn permutation() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = i as u8;
        i += 1;
    }
    let mut state: u32 = 0x9E37_79B9;
    let mut i = 255;
    while i > 0 {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let j = (state % (i as u32 + 1)) as usize;
        let tmp = table[i];
        table[i] = table[j];
        table[j] = tmp;
        i -= 1;
    }
    table
}

static TABLE: [u8; 256] = permutation();

/// Order-sensitive hash of `data`. The empty slice hashes to 0.
pub fn pearson(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |h, &b| TABLE[(h ^ b) as usize])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_a_permutation() {
        let mut seen = [false; 256];
        for &v in TABLE.iter() {
            assert!(!seen[v as usize]);
            seen[v as usize] = true;
        }
    }

    #[test]
    fn empty_is_zero() {
        assert_eq!(pearson(&[]), 0);
    }

    #[test]
    fn single_bytes_are_distinct() {
        let mut seen = [false; 256];
        for b in 0..=255u8 {
            let h = pearson(&[b]);
            assert!(!seen[h as usize]);
            seen[h as usize] = true;
        }
    }

    #[test]
    fn swapping_bytes_usually_changes_hash() {
        let mut differing = 0;
        let mut total = 0;
        for a in 0..16u8 {
            for b in (a + 1)..16u8 {
                total += 1;
                if pearson(&[a, b]) != pearson(&[b, a]) {
                    differing += 1;
                }
            }
        }
        assert!(differing * 10 >= total * 9, "{differing}/{total}");
    }
}
