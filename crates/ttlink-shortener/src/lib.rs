//! URL shortener service implementation.
//!
//! This crate wires the core types into a running shortener: the
//! [`LinkService`] that creates and resolves links, the background
//! [`ExpirySweeper`], and the per-session identity used by the console.

pub mod identity;
pub mod notice;
pub mod service;
pub mod sweeper;

pub use identity::{IdentityError, SessionIdentity};
pub use notice::TracingNoticeSink;
pub use service::{validate_url, LinkService, MAX_URL_LENGTH};
pub use sweeper::{ExpirySweeper, SweepReport, SweeperHandle};
