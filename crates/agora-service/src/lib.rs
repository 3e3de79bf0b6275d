//! # agora-service — Consultation Domain Services
//!
//! The operations of the intake stack, one service per concern, all
//! backend-agnostic over [`agora_store::ConsultationStore`]:
//!
//! - [`IdentityRegistry`] — idempotent participant registration keyed by
//!   the national ID digest; the only module that seals or reveals
//!   sensitive fields.
//! - [`ContributionIntake`] — submission and the owner/public listings;
//!   the public path never exposes anything that is not APPROVED.
//! - [`ModerationEngine`] — exactly-once decisions with an append-only
//!   audit trail; reviewer races degrade to benign skips.
//! - [`ProtocolIssuer`] — finalization receipts with dense per-document
//!   sequence numbers, safe under concurrency, plus post-commit
//!   confirmation through the [`NotificationSender`] seam.
//!
//! Transport concerns (status codes, auth, serialization shapes) stay
//! above this crate; storage concerns stay below it. Every operation
//! returns [`ServiceError`], which maps 1:1 onto the HTTP error
//! taxonomy.

pub mod contribution;
pub mod error;
pub mod moderation;
pub mod paging;
pub mod protocol;
pub mod registry;

pub use contribution::{ContributionIntake, NewContribution, PublicContribution};
pub use error::ServiceError;
pub use moderation::{BatchOutcome, Moderated, ModerationEngine};
pub use paging::{PageRequest, Paged, DEFAULT_PER_PAGE, MAX_PER_PAGE};
pub use protocol::{
    LogNotifier, NotificationDetails, NotificationError, NotificationSender, ProtocolIssuer,
    ProtocolView, MAX_ISSUE_ATTEMPTS,
};
pub use registry::{
    IdentityRegistry, NewIndividual, NewOrganization, Registration, RevealedIdentity,
};
