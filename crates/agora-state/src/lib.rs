//! # agora-state — Moderation State Machine
//!
//! The pure moderation lifecycle for contributions, with no storage or
//! transport concerns.
//!
//! ## States
//!
//! ```text
//!              ┌──▶ Approved (terminal)
//! Pending ─────┤
//!              └──▶ Rejected (terminal, carries reason)
//! ```
//!
//! Each contribution is decided exactly once. [`ModerationState::apply`]
//! is the only transition: it consumes a reviewer [`Decision`] and either
//! produces the new state together with the matching append-only
//! [`ModerationRecord`], or rejects the attempt with
//! [`ModerationError::AlreadyDecided`]. Callers that want race-tolerant
//! no-op semantics (two reviewers clicking the same row) translate that
//! error at the service layer; the machine itself never silently accepts
//! a second decision.
//!
//! ## Design
//!
//! The decided states carry their evidence in the variant —
//! `Rejected { by, at, reason }` — so an approved contribution with a
//! stale rejection reason, or a decided contribution with no reviewer,
//! cannot be represented at all. The flat [`ModerationStatus`] enum is
//! derived from the state for wire formats and storage columns.

pub mod moderation;

pub use moderation::{
    Decided, Decision, ModerationAction, ModerationError, ModerationRecord, ModerationState,
    ModerationStatus, RejectionReason,
};
