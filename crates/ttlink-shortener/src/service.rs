use crate::notice::TracingNoticeSink;
use std::sync::Arc;
use tracing::{debug, info, trace};
use ttlink_core::error::Result;
use ttlink_core::{
    ClickOutcome, Clock, LinkError, LinkRepository, LinkSettings, Notice, NoticeSink, ShortKey,
    ShortLink, StorageError, SystemClock, ValidationError,
};
use ttlink_generator::KeyGenerator;
use url::Url;

pub const MAX_URL_LENGTH: usize = 2048;

/// Creates, resolves and manages short links on behalf of their owners.
///
/// This service wraps a `LinkRepository` and a `KeyGenerator` to handle:
/// - input validation (URL, owner, click quota)
/// - unique key acquisition with adaptive length growth
/// - the TTL / click-quota state machine on resolve
/// - owner-only updates and deletes
///
/// Every read-modify-write goes through [`LinkRepository::modify`], so the
/// service never holds a link that another caller could be changing.
pub struct LinkService<R, G, C = SystemClock> {
    repository: Arc<R>,
    generator: Arc<G>,
    clock: C,
    notices: Arc<dyn NoticeSink>,
    settings: LinkSettings,
}

impl<R, G, C: Clone> Clone for LinkService<R, G, C> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            generator: Arc::clone(&self.generator),
            clock: self.clock.clone(),
            notices: Arc::clone(&self.notices),
            settings: self.settings.clone(),
        }
    }
}

impl<R: LinkRepository, G: KeyGenerator> LinkService<R, G, SystemClock> {
    /// Creates a service backed by the real system clock.
    ///
    /// Fails with a validation error when `settings` are out of range.
    pub fn new(repository: Arc<R>, generator: G, settings: LinkSettings) -> Result<Self> {
        Self::with_clock(repository, generator, settings, SystemClock)
    }
}

impl<R: LinkRepository, G: KeyGenerator, C: Clock> LinkService<R, G, C> {
    pub fn with_clock(
        repository: Arc<R>,
        generator: G,
        settings: LinkSettings,
        clock: C,
    ) -> Result<Self> {
        settings.validate()?;

        Ok(Self {
            repository,
            generator: Arc::new(generator),
            clock,
            notices: Arc::new(TracingNoticeSink),
            settings,
        })
    }

    /// Routes quota-exhaustion notices to `sink` instead of the log.
    pub fn with_notice_sink(mut self, sink: Arc<dyn NoticeSink>) -> Self {
        self.notices = sink;
        self
    }

    pub fn settings(&self) -> &LinkSettings {
        &self.settings
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Shortens `url` for `owner_id`.
    ///
    /// `max_clicks` falls back to the configured default when `None`.
    pub async fn create(
        &self,
        url: &str,
        owner_id: &str,
        max_clicks: Option<u32>,
    ) -> Result<ShortLink> {
        let url = validate_url(url)?;
        validate_owner(owner_id)?;
        let max_clicks = max_clicks.unwrap_or(self.settings.default_max_clicks);
        validate_max_clicks(max_clicks)?;

        let created_at = self.clock.now();
        let expires_at = created_at.checked_add(self.settings.ttl()).map_err(|e| {
            ValidationError::InvalidSettings(format!("ttl overflows the timestamp range: {}", e))
        })?;

        let link = self
            .insert_with_unique_key(|key| {
                ShortLink::new(
                    key,
                    url.as_str(),
                    owner_id,
                    created_at,
                    expires_at,
                    max_clicks,
                )
            })
            .await?;

        info!(
            key = %link.short_key(),
            owner = %owner_id,
            max_clicks,
            expires_at = %expires_at,
            "short link created"
        );
        Ok(link)
    }

    /// Counts one click on `key` and returns the target URL.
    ///
    /// The click that uses up the quota is still honored; the one after it is
    /// refused. A link past its TTL is refused regardless of its quota.
    pub async fn resolve(&self, key: &str) -> Result<String> {
        let key = ShortKey::parse(key)?;
        let now = self.clock.now();
        trace!(key = %key, "resolving short key");

        let outcome = self
            .repository
            .modify(&key, |link| {
                link.register_click(now)
                    .map(|outcome| (outcome, link.original_url().to_owned(), link.max_clicks()))
            })
            .await?
            .ok_or_else(|| LinkError::NotFound(key.to_string()))?;

        match outcome {
            Ok((ClickOutcome::Honored, url, _)) => {
                debug!(key = %key, "resolved short key");
                Ok(url)
            }
            Ok((ClickOutcome::LastClick, url, max_clicks)) => {
                debug!(key = %key, max_clicks, "resolved the last allowed click");
                self.notices.notify(&Notice::ClickQuotaExhausted {
                    key: key.clone(),
                    max_clicks,
                });
                Ok(url)
            }
            Err(reason) => {
                debug!(key = %key, reason = %reason, "resolve refused");
                Err(reason.into())
            }
        }
    }

    /// Replaces the click quota of `key`; only its owner may do so.
    ///
    /// A quota at or below the clicks already used expires the link at once.
    /// The updated link is returned either way.
    pub async fn update_max_clicks(
        &self,
        key: &str,
        owner_id: &str,
        new_max_clicks: u32,
    ) -> Result<ShortLink> {
        let key = ShortKey::parse(key)?;
        validate_owner(owner_id)?;
        validate_max_clicks(new_max_clicks)?;

        let (expired, link) = self
            .repository
            .modify(&key, |link| {
                link.change_max_clicks(owner_id, new_max_clicks)
                    .map(|expired| (expired, link.clone()))
            })
            .await?
            .ok_or_else(|| LinkError::NotFound(key.to_string()))??;

        if expired {
            info!(
                key = %key,
                clicks = link.clicks(),
                max_clicks = new_max_clicks,
                "link expired by lowered click limit"
            );
        } else {
            debug!(key = %key, max_clicks = new_max_clicks, "click limit updated");
        }

        Ok(link)
    }

    /// Deletes `key` on behalf of its owner.
    ///
    /// The ownership check and the removal happen under one store lock, so a
    /// link the expiry sweep removed first is reported as `NotFound`.
    pub async fn delete_by_owner(&self, key: &str, owner_id: &str) -> Result<bool> {
        let key = ShortKey::parse(key)?;
        validate_owner(owner_id)?;

        self.repository
            .modify(&key, |link| {
                if !link.is_owned_by(owner_id) {
                    return Err(LinkError::AccessDenied(link.short_key().to_string()));
                }
                link.mark_deleted();
                Ok(())
            })
            .await?
            .ok_or_else(|| LinkError::NotFound(key.to_string()))??;

        info!(key = %key, owner = %owner_id, "short link deleted by owner");
        Ok(true)
    }

    /// Links owned by `owner_id`, ordered by key.
    pub async fn links_of(&self, owner_id: &str) -> Result<Vec<ShortLink>> {
        Ok(self.repository.find_by_owner(owner_id).await?)
    }

    /// Every stored link, ordered by owner and key.
    pub async fn all_links(&self) -> Result<Vec<ShortLink>> {
        Ok(self.repository.find_all().await?)
    }

    /// Draws candidates from `initial_key_length` up to `max_key_length`,
    /// `attempts_per_length` at each length, and inserts the first one the
    /// repository accepts. The insert itself is the uniqueness check, so two
    /// concurrent creates can never claim the same key.
    async fn insert_with_unique_key<F>(&self, build: F) -> Result<ShortLink>
    where
        F: Fn(ShortKey) -> ShortLink,
    {
        let settings = &self.settings;

        for length in settings.initial_key_length..=settings.max_key_length {
            for attempt in 1..=settings.attempts_per_length {
                let link = build(self.generator.generate(length));

                match self.repository.insert(link.clone()).await {
                    Ok(()) => return Ok(link),
                    Err(StorageError::Conflict(key)) => {
                        debug!(key = %key, length, attempt, "short key collision");
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            if length < settings.max_key_length {
                info!(length, next = length + 1, "no free short key at this length");
            }
        }

        Err(LinkError::KeyspaceExhausted {
            initial_length: settings.initial_key_length,
            max_length: settings.max_key_length,
            attempts_per_length: settings.attempts_per_length,
        })
    }
}

/// Validates and normalizes a target URL.
///
/// The URL must be an absolute `http`/`https` URL no longer than
/// [`MAX_URL_LENGTH`] whose host, as written, is `localhost`, a dotted IPv4
/// address or a dotted domain name. Surrounding whitespace is dropped.
pub fn validate_url(url: &str) -> std::result::Result<String, ValidationError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ValidationError::InvalidUrl(
            "URL must not be empty".to_string(),
        ));
    }

    if url.chars().count() > MAX_URL_LENGTH {
        return Err(ValidationError::InvalidUrl(format!(
            "URL is too long (max {} characters)",
            MAX_URL_LENGTH
        )));
    }

    let parsed = Url::parse(url)
        .map_err(|e| ValidationError::InvalidUrl(format!("invalid URL format: {}", e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ValidationError::InvalidUrl(format!(
            "URL must start with http:// or https://, got scheme '{}'",
            parsed.scheme()
        )));
    }

    // The parser normalizes hosts (`http://1` becomes `0.0.0.1`), so the host
    // check runs on the text the caller wrote.
    let host = written_host(url)
        .filter(|host| !host.is_empty())
        .ok_or_else(|| ValidationError::InvalidUrl("URL must contain a host".to_string()))?;

    if !is_acceptable_host(host) {
        return Err(ValidationError::InvalidUrl(format!(
            "host must be a valid domain, localhost, or IPv4 address: '{}'",
            host
        )));
    }

    Ok(url.to_owned())
}

fn written_host(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next().unwrap_or("");
    let host_port = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host_port)| host_port);

    if host_port.starts_with('[') {
        return host_port.find(']').map(|end| &host_port[..=end]);
    }

    Some(host_port.split_once(':').map_or(host_port, |(host, _)| host))
}

fn is_acceptable_host(host: &str) -> bool {
    host.eq_ignore_ascii_case("localhost") || is_dotted_ipv4(host) || host.contains('.')
}

fn is_dotted_ipv4(host: &str) -> bool {
    let octets: Vec<&str> = host.split('.').collect();
    octets.len() == 4
        && octets
            .iter()
            .all(|octet| (1..=3).contains(&octet.len()) && octet.bytes().all(|b| b.is_ascii_digit()))
}

fn validate_owner(owner_id: &str) -> std::result::Result<(), ValidationError> {
    if owner_id.trim().is_empty() {
        return Err(ValidationError::BlankOwner);
    }
    Ok(())
}

fn validate_max_clicks(max_clicks: u32) -> std::result::Result<(), ValidationError> {
    if max_clicks == 0 {
        return Err(ValidationError::InvalidMaxClicks(0));
    }
    Ok(())
}
