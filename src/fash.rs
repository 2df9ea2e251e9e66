// Copyright (C) 2020-2026 Andy Kurnia.

// Fast insecure non-cryptographic hash, tuned for short ascii words.
// Never let iteration order of these maps reach the output.

#[derive(Default)]
pub struct WordHasher(u64);

const SEED: u64 = 0x51_7c_c1_b7_27_22_0a_95;

impl std::hash::Hasher for WordHasher {
    #[inline(always)]
    fn finish(&self) -> u64 {
        self.0
    }

    #[inline(always)]
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = (self.0.rotate_left(5) ^ b as u64).wrapping_mul(SEED);
        }
    }

    #[inline(always)]
    fn write_u32(&mut self, i: u32) {
        self.0 = (self.0.rotate_left(5) ^ i as u64).wrapping_mul(SEED);
    }
}

pub type WordHasherDefault = std::hash::BuildHasherDefault<WordHasher>;
pub type WordHashMap<K, V> = std::collections::HashMap<K, V, WordHasherDefault>;
