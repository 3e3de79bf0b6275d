//! # Contribution Moderation Lifecycle
//!
//! Models the review lifecycle of a submitted contribution:
//!
//! ```text
//! Pending ──▶ Approved (terminal)
//!    │
//!    └──────▶ Rejected (terminal)
//! ```
//!
//! ## Design Decision
//!
//! With one non-terminal state and two terminal ones, a typestate encoding
//! would buy nothing over an enum with a guarded transition. The enum
//! approach keeps the decided states self-evidencing: reviewer and
//! timestamp live inside the `Approved` and `Rejected` variants, and the
//! rejection reason exists only inside `Rejected`. A contribution that is
//! decided but unattributed is unrepresentable.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use agora_core::{ContributionId, ReviewerId, Timestamp, ValidationError};

// ─── Flat Status ─────────────────────────────────────────────────────

/// The moderation status of a contribution, as stored and served.
///
/// This is the flat projection of [`ModerationState`] used in storage
/// columns, query filters, and API payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModerationStatus {
    /// Awaiting review. The only state a contribution can be decided from.
    Pending,
    /// Accepted for publication. Terminal.
    Approved,
    /// Declined with a mandatory reason. Terminal.
    Rejected,
}

impl ModerationStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [ModerationStatus; 3] = [Self::Pending, Self::Approved, Self::Rejected];

    /// The canonical wire string for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Whether this status admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for ModerationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ModerationStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            other => Err(ValidationError::InvalidModerationStatus(other.to_string())),
        }
    }
}

// ─── Rejection Reason ────────────────────────────────────────────────

/// A reviewer-supplied rejection reason.
///
/// Mandatory for every rejection; bounds are enforced at construction so
/// a [`Decision::Reject`] always carries a usable reason.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RejectionReason(String);

impl RejectionReason {
    /// Minimum accepted length, in characters.
    pub const MIN_LEN: usize = 10;
    /// Maximum accepted length, in characters.
    pub const MAX_LEN: usize = 1000;

    /// Create a rejection reason, validating length bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TextLength`] when the reason is shorter
    /// than [`Self::MIN_LEN`] or longer than [`Self::MAX_LEN`] characters.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let len = value.chars().count();
        if !(Self::MIN_LEN..=Self::MAX_LEN).contains(&len) {
            return Err(ValidationError::TextLength {
                field: "rejection_reason",
                min: Self::MIN_LEN,
                max: Self::MAX_LEN,
                len,
            });
        }
        Ok(Self(value))
    }

    /// Access the reason text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RejectionReason {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

// ─── Decision ────────────────────────────────────────────────────────

/// A reviewer's decision over a pending contribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Accept the contribution for publication.
    Approve,
    /// Decline the contribution with a reason.
    Reject {
        /// Why the contribution was declined.
        reason: RejectionReason,
    },
}

impl Decision {
    /// Build a rejection decision from a raw reason string.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TextLength`] when the reason violates
    /// the `10..=1000` character bounds.
    pub fn reject(reason: impl Into<String>) -> Result<Self, ValidationError> {
        Ok(Self::Reject {
            reason: RejectionReason::new(reason)?,
        })
    }

    /// The audit action this decision records.
    pub fn action(&self) -> ModerationAction {
        match self {
            Self::Approve => ModerationAction::Approve,
            Self::Reject { .. } => ModerationAction::Reject,
        }
    }
}

// ─── Audit Action ────────────────────────────────────────────────────

/// The action recorded in the append-only moderation history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModerationAction {
    /// The contribution was approved.
    Approve,
    /// The contribution was rejected.
    Reject,
}

impl ModerationAction {
    /// The canonical wire string for this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "APPROVE",
            Self::Reject => "REJECT",
        }
    }
}

impl std::fmt::Display for ModerationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ModerationAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "APPROVE" => Ok(Self::Approve),
            "REJECT" => Ok(Self::Reject),
            other => Err(ValidationError::InvalidModerationAction(other.to_string())),
        }
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors from the moderation state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModerationError {
    /// The contribution has already been decided and cannot transition
    /// again.
    #[error("contribution already decided: status is {current}")]
    AlreadyDecided {
        /// The terminal status the contribution is in.
        current: ModerationStatus,
    },
}

// ─── Moderation Record ───────────────────────────────────────────────

/// One entry in the append-only moderation history.
///
/// Written atomically with the status transition that produced it; never
/// updated or deleted afterwards. A contribution currently accumulates at
/// most one record, but the history stays a list so a future re-opening
/// flow can append further transitions without a schema break.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationRecord {
    /// The contribution that was decided.
    pub contribution_id: ContributionId,
    /// The reviewer who decided it.
    pub reviewer_id: ReviewerId,
    /// What was decided.
    pub action: ModerationAction,
    /// The rejection reason; present iff `action` is [`ModerationAction::Reject`].
    pub reason: Option<RejectionReason>,
    /// When the decision was recorded. Equal to the `at` of the state it
    /// accompanies.
    pub recorded_at: Timestamp,
}

// ─── Moderation State ────────────────────────────────────────────────

/// The full moderation state of a contribution, evidence included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModerationState {
    /// Awaiting review.
    Pending,
    /// Accepted for publication.
    Approved {
        /// The reviewer who approved.
        by: ReviewerId,
        /// When the approval was recorded.
        at: Timestamp,
    },
    /// Declined.
    Rejected {
        /// The reviewer who rejected.
        by: ReviewerId,
        /// When the rejection was recorded.
        at: Timestamp,
        /// Why the contribution was declined.
        reason: RejectionReason,
    },
}

impl ModerationState {
    /// The flat status projection of this state.
    pub fn status(&self) -> ModerationStatus {
        match self {
            Self::Pending => ModerationStatus::Pending,
            Self::Approved { .. } => ModerationStatus::Approved,
            Self::Rejected { .. } => ModerationStatus::Rejected,
        }
    }

    /// Whether the contribution is still awaiting review.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// The reviewer who decided, if decided.
    pub fn decided_by(&self) -> Option<ReviewerId> {
        match self {
            Self::Pending => None,
            Self::Approved { by, .. } | Self::Rejected { by, .. } => Some(*by),
        }
    }

    /// When the decision was recorded, if decided.
    pub fn decided_at(&self) -> Option<Timestamp> {
        match self {
            Self::Pending => None,
            Self::Approved { at, .. } | Self::Rejected { at, .. } => Some(*at),
        }
    }

    /// The rejection reason, if rejected.
    pub fn rejection_reason(&self) -> Option<&RejectionReason> {
        match self {
            Self::Rejected { reason, .. } => Some(reason),
            _ => None,
        }
    }

    /// Apply a reviewer decision.
    ///
    /// The single transition of the machine. Succeeds only from
    /// [`ModerationState::Pending`]; the new state and its audit record
    /// share one timestamp, captured here.
    ///
    /// # Errors
    ///
    /// Returns [`ModerationError::AlreadyDecided`] with the current
    /// terminal status when the contribution was decided earlier.
    pub fn apply(
        &self,
        contribution_id: ContributionId,
        reviewer_id: ReviewerId,
        decision: Decision,
    ) -> Result<Decided, ModerationError> {
        if !self.is_pending() {
            return Err(ModerationError::AlreadyDecided {
                current: self.status(),
            });
        }

        let at = Timestamp::now();
        let action = decision.action();
        let (state, reason) = match decision {
            Decision::Approve => (
                Self::Approved {
                    by: reviewer_id,
                    at,
                },
                None,
            ),
            Decision::Reject { reason } => (
                Self::Rejected {
                    by: reviewer_id,
                    at,
                    reason: reason.clone(),
                },
                Some(reason),
            ),
        };

        Ok(Decided {
            state,
            record: ModerationRecord {
                contribution_id,
                reviewer_id,
                action,
                reason,
                recorded_at: at,
            },
        })
    }
}

/// The outcome of a successful [`ModerationState::apply`]: the new state
/// and the audit record to append, which must be persisted together.
#[derive(Debug, Clone)]
pub struct Decided {
    /// The terminal state to store.
    pub state: ModerationState,
    /// The history record to append.
    pub record: ModerationRecord,
}

// ─── Tests ───────────────────────────────────────────────────────────
