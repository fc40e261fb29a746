//! In-process byte mutator, used when no external oracle is installed.

use rand_chacha::ChaCha20Rng;
use rand_core::RngCore as _;

use crate::{rng_from_seed, JfuzzResult, MutationOracle};

const MAX_ROUNDS: u64 = 4;

#[derive(Debug, Clone)]
pub struct BuiltinOracle {
    rng: ChaCha20Rng,
    max_len: usize,
}

impl BuiltinOracle {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: rng_from_seed(seed),
            max_len: 1024 * 1024,
        }
    }

    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }
}

impl MutationOracle for BuiltinOracle {
    fn mutate(&mut self, input: &[u8]) -> JfuzzResult<Vec<u8>> {
        let mut buf = input.to_vec();
        let rounds = 1 + self.rng.next_u64() % MAX_ROUNDS;
        for _ in 0..rounds {
            mutate_bytes(&mut buf, &mut self.rng, self.max_len);
        }
        Ok(buf)
    }
}

fn mutate_bytes(buf: &mut Vec<u8>, rng: &mut ChaCha20Rng, max_len: usize) {
    match rng.next_u64() % 4 {
        0 => bitflip(buf, rng),
        1 => insert_byte(buf, rng, max_len),
        2 => delete_byte(buf, rng),
        _ => overwrite_byte(buf, rng),
    }
}

fn bitflip(buf: &mut [u8], rng: &mut ChaCha20Rng) {
    if buf.is_empty() {
        return;
    }
    let idx = (rng.next_u64() as usize) % buf.len();
    let bit = 1u8 << ((rng.next_u64() as usize) % 8);
    buf[idx] ^= bit;
}

fn insert_byte(buf: &mut Vec<u8>, rng: &mut ChaCha20Rng, max_len: usize) {
    if buf.len() >= max_len {
        return;
    }
    let idx = (rng.next_u64() as usize) % (buf.len() + 1);
    buf.insert(idx, (rng.next_u64() & 0xFF) as u8);
}

fn delete_byte(buf: &mut Vec<u8>, rng: &mut ChaCha20Rng) {
    if buf.is_empty() {
        return;
    }
    let idx = (rng.next_u64() as usize) % buf.len();
    buf.remove(idx);
}

fn overwrite_byte(buf: &mut Vec<u8>, rng: &mut ChaCha20Rng) {
    if buf.is_empty() {
        buf.push((rng.next_u64() & 0xFF) as u8);
        return;
    }
    let idx = (rng.next_u64() as usize) % buf.len();
    buf[idx] = (rng.next_u64() & 0xFF) as u8;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_oracle_is_reproducible() {
        let mut a = BuiltinOracle::new(11);
        let mut b = BuiltinOracle::new(11);
        for _ in 0..32 {
            assert_eq!(
                a.mutate(b"{\"user\":\"admin\"}").expect("a"),
                b.mutate(b"{\"user\":\"admin\"}").expect("b")
            );
        }
    }

    #[test]
    fn length_changes_by_at_most_the_round_count() {
        let mut oracle = BuiltinOracle::new(3);
        let input = b"0123456789abcdef";
        for _ in 0..200 {
            let out = oracle.mutate(input).expect("mutate");
            assert!(out.len().abs_diff(input.len()) <= MAX_ROUNDS as usize);
        }
    }

    #[test]
    fn max_len_caps_growth() {
        let mut oracle = BuiltinOracle::new(5).with_max_len(4);
        for _ in 0..200 {
            let out = oracle.mutate(b"abcd").expect("mutate");
            assert!(out.len() <= 4);
        }
    }

    #[test]
    fn empty_input_still_yields_bytes_sometimes() {
        let mut oracle = BuiltinOracle::new(8);
        let produced = (0..100).any(|_| !oracle.mutate(b"").expect("mutate").is_empty());
        assert!(produced);
    }
}
