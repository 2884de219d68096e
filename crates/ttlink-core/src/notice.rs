use crate::link::LinkStatus;
use crate::shortkey::ShortKey;
use std::fmt::Display;

/// An event worth telling the operator about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A resolve consumed the last click of a link's quota.
    ClickQuotaExhausted { key: ShortKey, max_clicks: u32 },
    /// The expiry sweep removed a link.
    Evicted {
        key: ShortKey,
        status: LinkStatus,
        owner_id: String,
    },
}

impl Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::ClickQuotaExhausted { key, max_clicks } => write!(
                f,
                "Link {} expired: click limit reached ({})",
                key, max_clicks
            ),
            Notice::Evicted {
                key,
                status,
                owner_id,
            } => write!(
                f,
                "[CLEANUP] Deleted expired link: {} status={} owner={}",
                key, status, owner_id
            ),
        }
    }
}

/// Receives one [`Notice`] per event.
pub trait NoticeSink: Send + Sync + 'static {
    fn notify(&self, notice: &Notice);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eviction_line_names_status_and_owner() {
        let notice = Notice::Evicted {
            key: ShortKey::new_unchecked("abc123"),
            status: LinkStatus::ExpiredByTtl,
            owner_id: "owner-a".to_string(),
        };
        assert_eq!(
            notice.to_string(),
            "[CLEANUP] Deleted expired link: abc123 status=EXPIRED_BY_TTL owner=owner-a"
        );
    }

    #[test]
    fn quota_line_names_limit() {
        let notice = Notice::ClickQuotaExhausted {
            key: ShortKey::new_unchecked("abc123"),
            max_clicks: 3,
        };
        assert_eq!(
            notice.to_string(),
            "Link abc123 expired: click limit reached (3)"
        );
    }
}
