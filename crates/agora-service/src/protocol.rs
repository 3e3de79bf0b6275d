//! # Protocol Issuance
//!
//! Finalization mints the participant's receipt: a protocol row with a
//! unique `CP-<DOC>-<YYYY>-<NNNNNN>` number and the frozen list of
//! contribution IDs it covers. Issuance is independent of moderation —
//! a pending or rejected contribution still counts toward the receipt.
//!
//! ## Number assignment
//!
//! Sequences are dense per `(document, year)`, so two finalize calls can
//! race for the same next number. The store's uniqueness constraint is
//! the arbiter: the issuer computes max + 1, inserts, and on a duplicate
//! re-reads and tries again, up to [`MAX_ISSUE_ATTEMPTS`] times. A loser
//! of every round surfaces [`ServiceError::IssuanceConflict`], which is
//! safe to retry from the client.
//!
//! ## Notification
//!
//! Confirmation is sent synchronously after the protocol is committed,
//! through the [`NotificationSender`] seam. Delivery failure is logged
//! and swallowed; the committed protocol stands and `notified_at` stays
//! unset for a later [`ProtocolIssuer::mark_notified`].

use std::sync::Arc;

use chrono::{DateTime, Datelike, FixedOffset, Utc};
use thiserror::Error;
use tracing::{info, warn};

use agora_core::{
    brasilia_now, DocumentCode, IdentityId, ProtocolId, ProtocolNumber, Timestamp,
};
use agora_crypto::FieldCipher;
use agora_store::{
    ConsultationStore, ContributionRecord, ContributorRef, IdentityRecord, ProtocolRecord,
    StoreError,
};

use crate::error::ServiceError;

/// Retry budget for the number-assignment race.
pub const MAX_ISSUE_ATTEMPTS: usize = 5;

/// What a confirmation message carries besides the number.
#[derive(Debug, Clone)]
pub struct NotificationDetails {
    /// The participant's display name.
    pub display_name: String,
    /// The consultation document the protocol covers.
    pub document: DocumentCode,
    /// How many contributions the protocol froze.
    pub total_contributions: u32,
    /// Issuance instant in Brasília local time.
    pub issued_at_local: DateTime<FixedOffset>,
}

/// Outbound confirmation delivery failed.
#[derive(Debug, Error)]
#[error("notification delivery failed: {0}")]
pub struct NotificationError(pub String);

/// Outbound confirmation channel.
///
/// The decrypted recipient address exists only for the duration of this
/// call; implementations must not retain it. An SMTP or queue-backed
/// sender plugs in here.
pub trait NotificationSender: Send + Sync {
    /// Deliver a protocol confirmation to `recipient`.
    fn send(
        &self,
        recipient: &str,
        number: &ProtocolNumber,
        details: &NotificationDetails,
    ) -> Result<(), NotificationError>;
}

/// Default sender: logs the confirmation instead of delivering it.
///
/// The recipient address is masked in the log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl NotificationSender for LogNotifier {
    fn send(
        &self,
        recipient: &str,
        number: &ProtocolNumber,
        details: &NotificationDetails,
    ) -> Result<(), NotificationError> {
        info!(
            recipient = %mask_email(recipient),
            number = %number,
            document = %details.document,
            total_contributions = details.total_contributions,
            "protocol confirmation"
        );
        Ok(())
    }
}

/// Mask an email for logging: first character of the local part, then
/// the domain. `ana@example.org` becomes `a***@example.org`.
fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let head: String = local.chars().take(1).collect();
            format!("{head}***@{domain}")
        }
        None => "***".to_string(),
    }
}

/// A protocol joined with its public context: the contributor's display
/// fields and the contributions the number covers. Never carries a
/// national ID, email, or ciphertext.
#[derive(Debug, Clone)]
pub struct ProtocolView {
    pub protocol: ProtocolRecord,
    pub contributor: ContributorRef,
    pub contributions: Vec<ContributionRecord>,
}

/// Finalization, lookup, and notification of protocols.
#[derive(Clone)]
pub struct ProtocolIssuer {
    store: ConsultationStore,
    cipher: FieldCipher,
    notifier: Arc<dyn NotificationSender>,
}

impl ProtocolIssuer {
    /// Build an issuer over a store, cipher, and confirmation channel.
    pub fn new(
        store: ConsultationStore,
        cipher: FieldCipher,
        notifier: Arc<dyn NotificationSender>,
    ) -> Self {
        Self {
            store,
            cipher,
            notifier,
        }
    }

    /// Finalize an identity's contributions on one document, minting a
    /// new protocol.
    ///
    /// Repeated calls are legal and mint further protocols; each freezes
    /// the contribution set as of its own call.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`] for an unknown identity;
    /// [`ServiceError::NoContributions`] when the identity has nothing
    /// on the document; [`ServiceError::IssuanceConflict`] when every
    /// retry lost the sequence race.
    pub async fn finalize(
        &self,
        identity_id: IdentityId,
        document: DocumentCode,
    ) -> Result<ProtocolRecord, ServiceError> {
        let identity = self
            .store
            .identity_by_id(identity_id)
            .await?
            .ok_or(ServiceError::NotFound("identity"))?;

        let contribution_ids = self
            .store
            .contribution_ids_for(identity_id, document)
            .await?;
        if contribution_ids.is_empty() {
            return Err(ServiceError::NoContributions);
        }
        let total = contribution_ids.len() as u32;

        let mut issued = None;
        for attempt in 1..=MAX_ISSUE_ATTEMPTS {
            // Local time is captured per attempt so a retry across
            // midnight on New Year's Eve lands in the right year.
            let local = brasilia_now();
            let year = local.year();
            let sequence = self.store.max_protocol_sequence(document, year).await? + 1;
            let number = ProtocolNumber::new(document, year, sequence)?;

            let candidate = ProtocolRecord {
                id: ProtocolId::new(),
                number,
                identity_id,
                document,
                contribution_ids: contribution_ids.clone(),
                total_contributions: total,
                created_at_local: local,
                created_at_utc: Timestamp::from_utc(local.with_timezone(&Utc)),
                notified_at: None,
            };
            match self.store.insert_protocol(candidate.clone()).await {
                Ok(()) => {
                    issued = Some(candidate);
                    break;
                }
                Err(StoreError::DuplicateProtocolNumber) => {
                    warn!(%number, attempt, "protocol number taken, re-reading sequence");
                }
                Err(err) => return Err(err.into()),
            }
        }
        let Some(mut record) = issued else {
            return Err(ServiceError::IssuanceConflict);
        };
        info!(
            number = %record.number,
            %identity_id,
            total_contributions = total,
            "protocol issued"
        );

        record.notified_at = self.notify_after_commit(&identity, &record).await;
        Ok(record)
    }

    /// Public lookup of a protocol by its number.
    pub async fn lookup_by_number(
        &self,
        number: &ProtocolNumber,
    ) -> Result<ProtocolView, ServiceError> {
        let protocol = self
            .store
            .protocol_by_number(number)
            .await?
            .ok_or(ServiceError::NotFound("protocol"))?;
        let identity = self
            .store
            .identity_by_id(protocol.identity_id)
            .await?
            .ok_or_else(|| {
                StoreError::corrupt("protocol", "references an identity that does not exist")
            })?;
        let contributions = self
            .store
            .contributions_by_ids(&protocol.contribution_ids)
            .await?;
        Ok(ProtocolView {
            contributor: identity.public_ref(),
            protocol,
            contributions,
        })
    }

    /// Record that the participant was notified.
    ///
    /// Idempotent: if `notified_at` is already set, the existing
    /// timestamp is returned unchanged.
    pub async fn mark_notified(&self, id: ProtocolId) -> Result<Timestamp, ServiceError> {
        self.store
            .mark_notified(id, Timestamp::now())
            .await?
            .ok_or(ServiceError::NotFound("protocol"))
    }

    /// Send the confirmation and stamp `notified_at`, post-commit.
    ///
    /// Every failure path logs and returns `None`; the caller's protocol
    /// is already durable and must not unwind.
    async fn notify_after_commit(
        &self,
        identity: &IdentityRecord,
        record: &ProtocolRecord,
    ) -> Option<Timestamp> {
        let recipient = match self.cipher.reveal(&identity.email) {
            Ok(email) => email,
            Err(err) => {
                warn!(
                    number = %record.number,
                    error = %err,
                    "recipient email unreadable, skipping confirmation"
                );
                return None;
            }
        };
        let details = NotificationDetails {
            display_name: identity.display_name.clone(),
            document: record.document,
            total_contributions: record.total_contributions,
            issued_at_local: record.created_at_local,
        };
        if let Err(err) = self.notifier.send(&recipient, &record.number, &details) {
            warn!(number = %record.number, error = %err, "confirmation not delivered");
            return None;
        }
        match self.store.mark_notified(record.id, Timestamp::now()).await {
            Ok(at) => at,
            Err(err) => {
                warn!(
                    number = %record.number,
                    error = %err,
                    "confirmation sent but notified_at not recorded"
                );
                None
            }
        }
    }
}
