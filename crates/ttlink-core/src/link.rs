use crate::error::{LinkError, ValidationError};
use crate::shortkey::ShortKey;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Lifecycle state of a short link.
///
/// `Active` is the only state a link is created in. Every other state is
/// one-way: a link never returns to `Active`. `Deleted` is terminal and can
/// be reached from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkStatus {
    Active,
    ExpiredByTtl,
    ExpiredByClicks,
    Deleted,
}

impl LinkStatus {
    /// Compact label used in tabular output.
    pub fn short_label(&self) -> &'static str {
        match self {
            LinkStatus::Active => "ACTIVE",
            LinkStatus::ExpiredByTtl => "TTL",
            LinkStatus::ExpiredByClicks => "CLICKS",
            LinkStatus::Deleted => "DELETED",
        }
    }
}

impl Display for LinkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LinkStatus::Active => "ACTIVE",
            LinkStatus::ExpiredByTtl => "EXPIRED_BY_TTL",
            LinkStatus::ExpiredByClicks => "EXPIRED_BY_CLICKS",
            LinkStatus::Deleted => "DELETED",
        };
        f.write_str(name)
    }
}

/// Result of a click that was honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The click was counted and quota remains.
    Honored,
    /// The click was counted and used up the quota; the link is now
    /// `ExpiredByClicks`.
    LastClick,
}

/// A short link owned by a single identity.
///
/// Key, target, owner and both timestamps are fixed at construction. Only
/// `max_clicks`, `clicks` and `status` change afterwards, and only through the
/// transition methods below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortLink {
    short_key: ShortKey,
    original_url: String,
    owner_id: String,
    created_at: Timestamp,
    expires_at: Timestamp,
    max_clicks: u32,
    clicks: u32,
    status: LinkStatus,
}

impl ShortLink {
    /// Creates an active link with no clicks.
    pub fn new(
        short_key: ShortKey,
        original_url: impl Into<String>,
        owner_id: impl Into<String>,
        created_at: Timestamp,
        expires_at: Timestamp,
        max_clicks: u32,
    ) -> Self {
        Self {
            short_key,
            original_url: original_url.into(),
            owner_id: owner_id.into(),
            created_at,
            expires_at,
            max_clicks,
            clicks: 0,
            status: LinkStatus::Active,
        }
    }

    pub fn short_key(&self) -> &ShortKey {
        &self.short_key
    }

    pub fn original_url(&self) -> &str {
        &self.original_url
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn expires_at(&self) -> Timestamp {
        self.expires_at
    }

    pub fn max_clicks(&self) -> u32 {
        self.max_clicks
    }

    pub fn clicks(&self) -> u32 {
        self.clicks
    }

    pub fn status(&self) -> LinkStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == LinkStatus::Active
    }

    pub fn is_owned_by(&self, owner_id: &str) -> bool {
        self.owner_id == owner_id
    }

    /// Whether the TTL deadline has passed at `now`.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        now > self.expires_at
    }

    /// Moves an active link to `ExpiredByTtl`.
    ///
    /// Returns `false` (and changes nothing) when the link already left
    /// `Active`.
    pub fn mark_expired_by_ttl(&mut self) -> bool {
        self.transition_from_active(LinkStatus::ExpiredByTtl)
    }

    /// Moves an active link to `ExpiredByClicks`.
    ///
    /// Returns `false` (and changes nothing) when the link already left
    /// `Active`.
    pub fn mark_expired_by_clicks(&mut self) -> bool {
        self.transition_from_active(LinkStatus::ExpiredByClicks)
    }

    pub fn mark_deleted(&mut self) {
        self.status = LinkStatus::Deleted;
    }

    /// Runs the resolve state machine for one click at `now`.
    ///
    /// Refusals may still change the status (TTL or quota expiry); the caller
    /// is expected to keep the mutated link either way.
    pub fn register_click(&mut self, now: Timestamp) -> Result<ClickOutcome, ValidationError> {
        if self.is_expired_at(now) {
            self.mark_expired_by_ttl();
            return Err(ValidationError::ExpiredByTtl);
        }

        if !self.is_active() {
            return Err(ValidationError::NotActive {
                status: self.status,
            });
        }

        if self.clicks >= self.max_clicks {
            self.mark_expired_by_clicks();
            return Err(ValidationError::ExpiredByClicks);
        }

        // clicks < max_clicks here, so this cannot overflow
        self.clicks += 1;

        if self.clicks >= self.max_clicks {
            self.mark_expired_by_clicks();
            return Ok(ClickOutcome::LastClick);
        }

        Ok(ClickOutcome::Honored)
    }

    /// Replaces the click quota on behalf of `owner_id`.
    ///
    /// Lowering the quota to or below the clicks already consumed expires the
    /// link immediately; the return value tells whether that happened. A
    /// refused call leaves the link untouched.
    pub fn change_max_clicks(&mut self, owner_id: &str, new_max: u32) -> Result<bool, LinkError> {
        if !self.is_owned_by(owner_id) {
            return Err(LinkError::AccessDenied(self.short_key.to_string()));
        }

        if !self.is_active() {
            return Err(ValidationError::NotActive {
                status: self.status,
            }
            .into());
        }

        if new_max == 0 {
            return Err(ValidationError::InvalidMaxClicks(0).into());
        }

        self.max_clicks = new_max;

        if self.clicks >= self.max_clicks {
            return Ok(self.mark_expired_by_clicks());
        }

        Ok(false)
    }

    fn transition_from_active(&mut self, next: LinkStatus) -> bool {
        if self.status != LinkStatus::Active {
            return false;
        }
        self.status = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::SignedDuration;

    fn base() -> Timestamp {
        "2026-01-06T10:00:00Z".parse().unwrap()
    }

    fn link(max_clicks: u32) -> ShortLink {
        ShortLink::new(
            ShortKey::new_unchecked("ABC123"),
            "https://example.com",
            "owner-a",
            base(),
            base() + SignedDuration::from_hours(1),
            max_clicks,
        )
    }

    #[test]
    fn new_link_is_active_without_clicks() {
        let link = link(3);
        assert_eq!(link.status(), LinkStatus::Active);
        assert_eq!(link.clicks(), 0);
        assert_eq!(link.max_clicks(), 3);
        assert!(link.is_owned_by("owner-a"));
    }

    #[test]
    fn exactly_max_clicks_are_honored() {
        let mut link = link(2);
        let now = base();

        assert_eq!(link.register_click(now), Ok(ClickOutcome::Honored));
        assert_eq!(link.register_click(now), Ok(ClickOutcome::LastClick));
        assert_eq!(link.status(), LinkStatus::ExpiredByClicks);

        let err = link.register_click(now).unwrap_err();
        assert_eq!(
            err,
            ValidationError::NotActive {
                status: LinkStatus::ExpiredByClicks
            }
        );
        assert_eq!(link.clicks(), 2);
    }

    #[test]
    fn ttl_wins_over_remaining_quota() {
        let mut link = link(100);
        let late = base() + SignedDuration::from_hours(2);

        assert_eq!(link.register_click(late), Err(ValidationError::ExpiredByTtl));
        assert_eq!(link.status(), LinkStatus::ExpiredByTtl);
        assert_eq!(link.clicks(), 0);
    }

    #[test]
    fn ttl_deadline_itself_is_still_valid() {
        let mut link = link(1);
        let deadline = link.expires_at();
        assert_eq!(link.register_click(deadline), Ok(ClickOutcome::LastClick));
    }

    #[test]
    fn ttl_refusal_keeps_clicks_status() {
        let mut link = link(1);
        link.register_click(base()).unwrap();

        let late = base() + SignedDuration::from_hours(2);
        assert_eq!(link.register_click(late), Err(ValidationError::ExpiredByTtl));
        assert_eq!(link.status(), LinkStatus::ExpiredByClicks);
    }

    #[test]
    fn status_never_returns_to_active() {
        let mut link = link(5);
        assert!(link.mark_expired_by_ttl());
        assert!(!link.mark_expired_by_clicks());
        assert!(!link.mark_expired_by_ttl());
        assert_eq!(link.status(), LinkStatus::ExpiredByTtl);

        link.mark_deleted();
        assert_eq!(link.status(), LinkStatus::Deleted);
        assert!(!link.mark_expired_by_ttl());
    }

    #[test]
    fn lowering_quota_below_clicks_expires() {
        let mut link = link(10);
        link.register_click(base()).unwrap();
        link.register_click(base()).unwrap();

        assert_eq!(link.change_max_clicks("owner-a", 1), Ok(true));
        assert_eq!(link.max_clicks(), 1);
        assert_eq!(link.status(), LinkStatus::ExpiredByClicks);
    }

    #[test]
    fn raising_quota_keeps_link_active() {
        let mut link = link(2);
        link.register_click(base()).unwrap();

        assert_eq!(link.change_max_clicks("owner-a", 50), Ok(false));
        assert_eq!(link.max_clicks(), 50);
        assert!(link.is_active());
    }

    #[test]
    fn foreign_owner_cannot_change_quota() {
        let mut link = link(3);
        let before = link.clone();

        let err = link.change_max_clicks("owner-b", 10).unwrap_err();
        assert!(matches!(err, LinkError::AccessDenied(_)));
        assert_eq!(link, before);
    }

    #[test]
    fn inactive_link_refuses_quota_change() {
        let mut link = link(3);
        link.mark_expired_by_ttl();

        let err = link.change_max_clicks("owner-a", 10).unwrap_err();
        assert!(matches!(
            err,
            LinkError::Validation(ValidationError::NotActive { .. })
        ));
        assert_eq!(link.max_clicks(), 3);
    }

    #[test]
    fn serializes_status_in_screaming_snake_case() {
        let mut link = link(1);
        link.register_click(base()).unwrap();

        let json = serde_json::to_value(&link).unwrap();
        assert_eq!(json["status"], "EXPIRED_BY_CLICKS");
        assert_eq!(json["short_key"], "ABC123");
        assert_eq!(json["clicks"], 1);
    }
}
