/// Supplies the identity on whose behalf front ends act.
///
/// The core treats the returned value as an opaque owner id and only ever
/// compares it for equality.
pub trait IdentityProvider: Send + Sync + 'static {
    fn current_owner(&self) -> String;
}
