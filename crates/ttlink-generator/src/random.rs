use crate::KeyGenerator;
use rand::distr::Alphanumeric;
use rand::Rng;
use ttlink_core::ShortKey;

/// Draws keys uniformly from `[a-zA-Z0-9]`.
///
/// Uses the thread-local generator from `rand`, a ChaCha-based CSPRNG
/// periodically reseeded from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomKeyGenerator;

impl RandomKeyGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl KeyGenerator for RandomKeyGenerator {
    fn generate(&self, length: usize) -> ShortKey {
        assert!(length > 0, "short key length must be positive");

        let key: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(length)
            .map(char::from)
            .collect();
        ShortKey::new_unchecked(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn produces_requested_length() {
        let generator = RandomKeyGenerator::new();
        for length in [1, 6, 10, 32] {
            assert_eq!(generator.generate(length).len(), length);
        }
    }

    #[test]
    fn uses_alphanumeric_alphabet_only() {
        let generator = RandomKeyGenerator::new();
        for _ in 0..200 {
            let key = generator.generate(12);
            assert!(key.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn keys_do_not_repeat_in_practice() {
        let generator = RandomKeyGenerator::new();
        let keys: HashSet<_> = (0..1_000).map(|_| generator.generate(10)).collect();
        assert_eq!(keys.len(), 1_000);
    }

    #[test]
    #[should_panic(expected = "must be positive")]
    fn zero_length_panics() {
        RandomKeyGenerator::new().generate(0);
    }

    #[test]
    fn generator_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RandomKeyGenerator>();
    }
}
