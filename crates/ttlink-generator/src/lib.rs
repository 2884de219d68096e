pub mod random;
pub mod scripted;

pub use random::RandomKeyGenerator;
pub use scripted::ScriptedGenerator;

use ttlink_core::ShortKey;

/// Trait for generating short keys.
///
/// Implementations are pure generators that don't interact with storage;
/// the caller checks candidates against the repository and asks again on a
/// collision.
pub trait KeyGenerator: Send + Sync + 'static {
    /// Generates a candidate key of exactly `length` characters.
    ///
    /// # Panics
    ///
    /// Implementations panic when `length` is zero.
    fn generate(&self, length: usize) -> ShortKey;
}
