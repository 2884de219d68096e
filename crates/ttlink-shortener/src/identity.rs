use std::collections::BTreeSet;
use std::sync::{PoisonError, RwLock};
use thiserror::Error;
use tracing::info;
use ttlink_core::IdentityProvider;
use uuid::Uuid;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("user id must not be blank")]
    Blank,

    #[error("'{0}' is not a valid UUID")]
    Malformed(String),

    #[error("unknown user {0}; use 'new-user' to create one")]
    Unknown(String),
}

/// Identities known to one console session.
///
/// A fresh random user is created on construction and becomes the current
/// owner. Nothing is persisted; the set of users lives as long as the
/// session does.
#[derive(Debug)]
pub struct SessionIdentity {
    state: RwLock<SessionState>,
}

#[derive(Debug)]
struct SessionState {
    current: String,
    known: BTreeSet<String>,
}

impl SessionIdentity {
    pub fn new() -> Self {
        Self::with_user(Uuid::new_v4())
    }

    pub fn with_user(user: Uuid) -> Self {
        let current = user.to_string();
        Self {
            state: RwLock::new(SessionState {
                known: BTreeSet::from([current.clone()]),
                current,
            }),
        }
    }

    /// Creates a new random user and makes it current.
    pub fn create_new_user(&self) -> String {
        let user = Uuid::new_v4().to_string();
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.known.insert(user.clone());
        state.current = user.clone();

        info!(user = %user, "created new user");
        user
    }

    /// Makes `user` current. It must be a UUID this session has seen.
    pub fn switch_user(&self, user: &str) -> Result<String, IdentityError> {
        let user = user.trim();
        if user.is_empty() {
            return Err(IdentityError::Blank);
        }

        let canonical = Uuid::parse_str(user)
            .map_err(|_| IdentityError::Malformed(user.to_string()))?
            .to_string();

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if !state.known.contains(&canonical) {
            return Err(IdentityError::Unknown(canonical));
        }
        state.current = canonical.clone();

        info!(user = %canonical, "switched user");
        Ok(canonical)
    }

    pub fn known_users(&self) -> Vec<String> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.known.iter().cloned().collect()
    }
}

impl Default for SessionIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for SessionIdentity {
    fn current_owner(&self) -> String {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_one_known_user() {
        let identity = SessionIdentity::new();
        let current = identity.current_owner();

        assert!(Uuid::parse_str(&current).is_ok());
        assert_eq!(identity.known_users(), vec![current]);
    }

    #[test]
    fn new_user_becomes_current() {
        let identity = SessionIdentity::new();
        let first = identity.current_owner();
        let second = identity.create_new_user();

        assert_ne!(first, second);
        assert_eq!(identity.current_owner(), second);
        assert_eq!(identity.known_users().len(), 2);
    }

    #[test]
    fn switch_back_to_known_user() {
        let identity = SessionIdentity::new();
        let first = identity.current_owner();
        identity.create_new_user();

        let switched = identity.switch_user(&first.to_uppercase()).unwrap();
        assert_eq!(switched, first);
        assert_eq!(identity.current_owner(), first);
    }

    #[test]
    fn switch_rejects_bad_input() {
        let identity = SessionIdentity::new();
        let current = identity.current_owner();

        assert_eq!(identity.switch_user("  "), Err(IdentityError::Blank));
        assert_eq!(
            identity.switch_user("not-a-uuid"),
            Err(IdentityError::Malformed("not-a-uuid".to_string()))
        );

        let stranger = Uuid::new_v4().to_string();
        assert_eq!(
            identity.switch_user(&stranger),
            Err(IdentityError::Unknown(stranger.clone()))
        );
        assert_eq!(identity.current_owner(), current);
    }
}
