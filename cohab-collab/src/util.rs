use rand::{thread_rng, Rng};

/// Symbols allowed in invite codes. Visually ambiguous characters
/// (`0`/`O`, `1`/`I`) are excluded.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Draws a code of the given length uniformly from [CODE_ALPHABET]
pub fn random_code(length: usize) -> String {
    let mut rng = thread_rng();

    std::iter::repeat(())
        .map(|_| {
            let index = rng.gen_range(0..CODE_ALPHABET.len());
            CODE_ALPHABET[index] as char
        })
        .take(length)
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_random_code_stays_in_alphabet() {
        for _ in 0..200 {
            let code = random_code(6);

            assert_eq!(code.len(), 6);
            assert!(code.bytes().all(|c| CODE_ALPHABET.contains(&c)));
        }
    }

    #[test]
    fn test_random_code_varies() {
        let codes: Vec<_> = (0..50).map(|_| random_code(6)).collect();

        assert!(
            codes.iter().any(|c| c != &codes[0]),
            "50 draws should not all be identical"
        );
    }
}
