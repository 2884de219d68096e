//! Core types and traits for the ttlink URL shortener.
//!
//! This crate holds the link entity and its status state machine, the
//! repository contract, settings, and the collaborator traits (clock,
//! identity provider, notice sink) shared by the storage backend and the
//! link service.

pub mod clock;
pub mod error;
pub mod identity;
pub mod link;
pub mod notice;
pub mod repository;
pub mod settings;
pub mod shortkey;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ErrorKind, LinkError, StorageError, ValidationError};
pub use identity::IdentityProvider;
pub use link::{ClickOutcome, LinkStatus, ShortLink};
pub use notice::{Notice, NoticeSink};
pub use repository::{LinkRepository, ReadRepository};
pub use settings::LinkSettings;
pub use shortkey::ShortKey;
