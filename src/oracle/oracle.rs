//! The mutation oracle: an opaque byte-sequence mutator consulted for
//! unstructured string corruption and whole-document mode.

use crate::JfuzzResult;

/// Accepts an arbitrary payload and returns a mutated one. Output need not
/// be deterministic across calls.
pub trait MutationOracle {
    fn mutate(&mut self, input: &[u8]) -> JfuzzResult<Vec<u8>>;
}

impl<F> MutationOracle for F
where
    F: FnMut(&[u8]) -> Vec<u8>,
{
    fn mutate(&mut self, input: &[u8]) -> JfuzzResult<Vec<u8>> {
        Ok(self(input))
    }
}

/// Renders oracle output as ASCII text: bytes outside `0x20..=0x7E` become
/// literal `\u00xx` sequences.
pub fn escape_unprintable(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        if (0x20..=0x7E).contains(&b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("\\u00{b:02x}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_keeps_printable_ascii() {
        assert_eq!(escape_unprintable(b"hello world ~!"), "hello world ~!");
    }

    #[test]
    fn escape_encodes_control_and_high_bytes() {
        assert_eq!(escape_unprintable(&[b'a', 0x00, b'\n', 0xff]), r"a\u0000\u000a\u00ff");
    }

    #[test]
    fn closures_are_oracles() {
        let mut calls = 0;
        let mut oracle = |input: &[u8]| {
            calls += 1;
            input.iter().rev().copied().collect::<Vec<u8>>()
        };
        let out = MutationOracle::mutate(&mut oracle, b"abc").expect("mutate");
        assert_eq!(out, b"cba");
        assert_eq!(calls, 1);
    }
}
