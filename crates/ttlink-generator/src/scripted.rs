use crate::KeyGenerator;
use std::collections::VecDeque;
use std::sync::Mutex;
use ttlink_core::ShortKey;

pub const DEFAULT_FALLBACK: &str = "ZZZZZZ";

/// A generator that hands out a fixed sequence of keys.
///
/// Once the queue is drained every call returns the fallback key. The
/// requested length is ignored, which lets tests force collisions and
/// exhaustion deterministically.
#[derive(Debug)]
pub struct ScriptedGenerator {
    queue: Mutex<VecDeque<String>>,
    fallback: String,
}

impl ScriptedGenerator {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_fallback(keys, DEFAULT_FALLBACK)
    }

    pub fn with_fallback<I, S>(keys: I, fallback: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queue: Mutex::new(keys.into_iter().map(Into::into).collect()),
            fallback: fallback.into(),
        }
    }

    /// Keys not handed out yet.
    pub fn remaining(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl KeyGenerator for ScriptedGenerator {
    fn generate(&self, length: usize) -> ShortKey {
        assert!(length > 0, "short key length must be positive");

        let next = self
            .queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();
        ShortKey::new_unchecked(next.unwrap_or_else(|| self.fallback.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_keys_in_order() {
        let generator = ScriptedGenerator::new(["KEY111", "KEY222", "KEY111"]);

        assert_eq!(generator.generate(6).as_str(), "KEY111");
        assert_eq!(generator.generate(6).as_str(), "KEY222");
        assert_eq!(generator.generate(6).as_str(), "KEY111");
        assert_eq!(generator.remaining(), 0);
    }

    #[test]
    fn falls_back_once_drained() {
        let generator = ScriptedGenerator::with_fallback(["A1"], "DUP");

        assert_eq!(generator.generate(6).as_str(), "A1");
        assert_eq!(generator.generate(6).as_str(), "DUP");
        assert_eq!(generator.generate(9).as_str(), "DUP");
    }

    #[test]
    fn default_fallback() {
        let generator = ScriptedGenerator::new(Vec::<String>::new());
        assert_eq!(generator.generate(6).as_str(), DEFAULT_FALLBACK);
    }
}
