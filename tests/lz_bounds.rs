use easy::lz::{self, LengthBits, Token, Tokens};
use proptest::prelude::*;

proptest! {
    #[test]
    fn output_never_exceeds_bound(data in prop::collection::vec(any::<u8>(), 0..4096), n in 1u8..=7) {
        let bits = LengthBits::new(n).unwrap();
        let frame = lz::encode(&data, bits).unwrap();
        prop_assert!(frame.len() <= lz::max_encoded_len(data.len()));
        let raw = lz::encode_raw(&data, bits);
        prop_assert!(raw.len() <= lz::max_raw_encoded_len(data.len()));
    }

    #[test]
    fn matches_stay_inside_window(data in prop::collection::vec(0u8..3, 0..2048), n in 1u8..=7) {
        let bits = LengthBits::new(n).unwrap();
        let raw = lz::encode_raw(&data, bits);
        let mut covered = 0usize;
        for token in Tokens::new(&raw).unwrap() {
            match token {
                Token::Literal(_) => covered += 1,
                Token::Match { length, distance } => {
                    prop_assert!((2..=bits.max_match_len()).contains(&length));
                    prop_assert!((1..=bits.max_offset()).contains(&distance));
                    prop_assert!(distance <= covered);
                    covered += length;
                }
            }
        }
        prop_assert_eq!(covered, data.len());
    }
}

#[test]
fn stats_match_token_stream() {
    let data: Vec<u8> = b"abcabcabcabcxyzxyzxyzabc".repeat(20);
    let bits = LengthBits::new(3).unwrap();
    let (raw, stats) = lz::encode_raw_with_stats(&data, bits);
    let tokens: Vec<Token> = Tokens::new(&raw).unwrap().collect();
    let literals = tokens.iter().filter(|t| matches!(t, Token::Literal(_))).count();
    assert_eq!(stats.literals as usize, literals);
    assert_eq!(stats.matches as usize, tokens.len() - literals);
    assert_eq!(stats.tokens() as usize, tokens.len());
    assert_eq!(stats.input_bytes as usize, data.len());
    assert_eq!((stats.literals + stats.matched_bytes) as usize, data.len());
}

#[test]
fn incompressible_input_hits_the_bound() {
    // no repeated 2-byte prefix, so every token is a literal
    let data: Vec<u8> = (0..=255u8).collect();
    let raw = lz::encode_raw(&data, LengthBits::DEFAULT);
    assert_eq!(raw.len(), lz::max_raw_encoded_len(data.len()));
}
