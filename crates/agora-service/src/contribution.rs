//! # Contribution Intake
//!
//! Submission and listing of structured comments. Submissions are frozen
//! in content once accepted; only their moderation state moves
//! afterwards. The public listing is the one read path exposed without
//! authentication and therefore never returns anything that is not
//! APPROVED, and never any provenance or sealed field.

use serde::Serialize;

use agora_core::{
    check_text_bounds, ContributionId, ContributionKind, DocumentCode, IdentityId, RegionCode,
    Timestamp,
};
use agora_state::ModerationState;
use agora_store::{ConsultationStore, ContributionRecord, PublicEntry, PublicFilter};

use crate::error::ServiceError;
use crate::paging::{PageRequest, Paged};

/// A contribution submission, field-validated at the transport edge for
/// shape and here for bounds.
#[derive(Debug, Clone)]
pub struct NewContribution {
    pub identity_id: IdentityId,
    pub document: DocumentCode,
    pub chapter_title: String,
    pub section: Option<String>,
    pub article: String,
    pub sub_item: Option<String>,
    pub kind: ContributionKind,
    pub proposed_text: String,
    pub rationale: String,
    pub source_ip: String,
    pub user_agent: Option<String>,
}

impl NewContribution {
    fn check_bounds(&self) -> Result<(), ServiceError> {
        check_text_bounds("chapter_title", &self.chapter_title, 3, 500)?;
        if let Some(section) = &self.section {
            check_text_bounds("section", section, 1, 500)?;
        }
        check_text_bounds("article", &self.article, 1, 100)?;
        if let Some(sub_item) = &self.sub_item {
            check_text_bounds("sub_item", sub_item, 1, 200)?;
        }
        check_text_bounds("proposed_text", &self.proposed_text, 10, 5000)?;
        check_text_bounds("rationale", &self.rationale, 10, 5000)?;
        check_text_bounds("source_ip", &self.source_ip, 1, 45)?;
        Ok(())
    }
}

/// One entry of the public consultation listing.
///
/// Carries the contributor's display name and region and nothing else
/// about them.
#[derive(Debug, Clone, Serialize)]
pub struct PublicContribution {
    pub id: ContributionId,
    pub document: DocumentCode,
    pub kind: ContributionKind,
    /// Present location parts joined with `" - "`.
    pub location: String,
    pub proposed_text: String,
    pub rationale: String,
    pub contributor_name: String,
    pub contributor_region: RegionCode,
    pub created_at: Timestamp,
}

impl From<PublicEntry> for PublicContribution {
    fn from(entry: PublicEntry) -> Self {
        let location = entry.contribution.location_label();
        Self {
            id: entry.contribution.id,
            document: entry.contribution.document,
            kind: entry.contribution.kind,
            location,
            proposed_text: entry.contribution.proposed_text,
            rationale: entry.contribution.rationale,
            contributor_name: entry.contributor.display_name,
            contributor_region: entry.contributor.region,
            created_at: entry.contribution.created_at,
        }
    }
}

/// Submission and listing of contributions.
#[derive(Clone)]
pub struct ContributionIntake {
    store: ConsultationStore,
}

impl ContributionIntake {
    /// Build an intake over a store.
    pub fn new(store: ConsultationStore) -> Self {
        Self { store }
    }

    /// Accept a new contribution, persisting it as PENDING.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Validation`] when a text bound is violated;
    /// [`ServiceError::NotFound`] when the owning identity does not
    /// exist.
    pub async fn submit(&self, new: NewContribution) -> Result<ContributionRecord, ServiceError> {
        new.check_bounds()?;
        if self.store.identity_by_id(new.identity_id).await?.is_none() {
            return Err(ServiceError::NotFound("identity"));
        }

        let record = ContributionRecord {
            id: ContributionId::new(),
            identity_id: new.identity_id,
            document: new.document,
            chapter_title: new.chapter_title,
            section: new.section,
            article: new.article,
            sub_item: new.sub_item,
            kind: new.kind,
            proposed_text: new.proposed_text,
            rationale: new.rationale,
            moderation: ModerationState::Pending,
            source_ip: new.source_ip,
            user_agent: new.user_agent,
            created_at: Timestamp::now(),
        };
        self.store.insert_contribution(record.clone()).await?;
        Ok(record)
    }

    /// The owner's view: every contribution of one identity, any status,
    /// newest first, optionally narrowed to a document.
    pub async fn list_by_identity(
        &self,
        identity_id: IdentityId,
        document: Option<DocumentCode>,
    ) -> Result<Vec<ContributionRecord>, ServiceError> {
        if self.store.identity_by_id(identity_id).await?.is_none() {
            return Err(ServiceError::NotFound("identity"));
        }
        Ok(self
            .store
            .contributions_by_identity(identity_id, document)
            .await?)
    }

    /// The public read path: APPROVED contributions only, newest first.
    pub async fn list_public(
        &self,
        filter: PublicFilter,
        page: PageRequest,
    ) -> Result<Paged<PublicContribution>, ServiceError> {
        let listed = self
            .store
            .list_public(&filter, page.limit(), page.offset())
            .await?;
        Ok(Paged::from_page(listed, page).map(PublicContribution::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::{Cpf, EmailAddress, IndividualCategory, ReviewerId, ValidationError};
    use agora_crypto::FieldCipher;
    use agora_state::Decision;

    use crate::registry::{IdentityRegistry, NewIndividual};

    async fn seeded_identity(store: &ConsultationStore) -> IdentityId {
        let cipher = FieldCipher::new("0123456789abcdef0123456789abcdef", "intake-tests").unwrap();
        let registry = IdentityRegistry::new(store.clone(), cipher);
        registry
            .register_individual(NewIndividual {
                cpf: Cpf::new("111.444.777-35").unwrap(),
                email: EmailAddress::new("a@b.com").unwrap(),
                display_name: "Ana Souza".into(),
                region: RegionCode::new("SP").unwrap(),
                category: IndividualCategory::DentalSurgeon,
                source_ip: "203.0.113.10".into(),
                user_agent: None,
            })
            .await
            .unwrap()
            .into_record()
            .id
    }

    fn draft(identity_id: IdentityId, article: &str) -> NewContribution {
        NewContribution {
            identity_id,
            document: DocumentCode::Ceo,
            chapter_title: "Professional conduct".into(),
            section: Some("General duties".into()),
            article: article.into(),
            sub_item: None,
            kind: ContributionKind::Amend,
            proposed_text: "Replace the notice period with thirty days.".into(),
            rationale: "The current period is too short for patients.".into(),
            source_ip: "203.0.113.10".into(),
            user_agent: None,
        }
    }

    async fn approve(store: &ConsultationStore, id: ContributionId) {
        let decided = ModerationState::Pending
            .apply(id, ReviewerId::new(), Decision::Approve)
            .unwrap();
        assert!(store.apply_decision(&decided).await.unwrap());
    }

    #[tokio::test]
    async fn submit_requires_existing_identity() {
        let intake = ContributionIntake::new(ConsultationStore::memory());
        let err = intake
            .submit(draft(IdentityId::new(), "Art. 1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("identity")));
    }

    #[tokio::test]
    async fn submit_enforces_text_bounds() {
        let store = ConsultationStore::memory();
        let identity_id = seeded_identity(&store).await;
        let intake = ContributionIntake::new(store);

        let mut short = draft(identity_id, "Art. 1");
        short.proposed_text = "too short".into();
        let err = intake.submit(short).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::TextLength {
                field: "proposed_text",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn submitted_contribution_starts_pending() {
        let store = ConsultationStore::memory();
        let identity_id = seeded_identity(&store).await;
        let intake = ContributionIntake::new(store.clone());

        let record = intake.submit(draft(identity_id, "Art. 5")).await.unwrap();
        assert!(record.moderation.is_pending());

        let stored = store.contribution_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(stored.proposed_text, record.proposed_text);
    }

    #[tokio::test]
    async fn owner_listing_is_complete_and_filterable() {
        let store = ConsultationStore::memory();
        let identity_id = seeded_identity(&store).await;
        let intake = ContributionIntake::new(store);

        let first = intake.submit(draft(identity_id, "Art. 1")).await.unwrap();
        let mut cpeo = draft(identity_id, "Art. 2");
        cpeo.document = DocumentCode::Cpeo;
        let second = intake.submit(cpeo).await.unwrap();

        let all = intake.list_by_identity(identity_id, None).await.unwrap();
        let ids: Vec<_> = all.iter().map(|c| c.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&first.id));
        assert!(ids.contains(&second.id));

        let ceo_only = intake
            .list_by_identity(identity_id, Some(DocumentCode::Ceo))
            .await
            .unwrap();
        assert_eq!(ceo_only.len(), 1);
        assert_eq!(ceo_only[0].id, first.id);

        let err = intake
            .list_by_identity(IdentityId::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("identity")));
    }

    #[tokio::test]
    async fn public_listing_shows_only_approved() {
        let store = ConsultationStore::memory();
        let identity_id = seeded_identity(&store).await;
        let intake = ContributionIntake::new(store.clone());

        let visible = intake.submit(draft(identity_id, "Art. 7")).await.unwrap();
        let _hidden = intake.submit(draft(identity_id, "Art. 8")).await.unwrap();
        approve(&store, visible.id).await;

        let page = intake
            .list_public(PublicFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, visible.id);
        assert_eq!(page.items[0].contributor_name, "Ana Souza");
        assert_eq!(page.items[0].contributor_region.as_str(), "SP");
        assert_eq!(
            page.items[0].location,
            "Professional conduct - General duties - Art. 7"
        );
    }

    #[tokio::test]
    async fn public_entries_never_carry_sensitive_fields() {
        let store = ConsultationStore::memory();
        let identity_id = seeded_identity(&store).await;
        let intake = ContributionIntake::new(store.clone());

        let record = intake.submit(draft(identity_id, "Art. 9")).await.unwrap();
        approve(&store, record.id).await;

        let page = intake
            .list_public(PublicFilter::default(), PageRequest::default())
            .await
            .unwrap();
        let rendered = serde_json::to_string(&page.items[0]).unwrap();
        for needle in ["national_id", "email", "source_ip", "user_agent", "digest"] {
            assert!(!rendered.contains(needle), "leaked field: {needle}");
        }
    }

    #[tokio::test]
    async fn public_listing_paginates_with_totals() {
        let store = ConsultationStore::memory();
        let identity_id = seeded_identity(&store).await;
        let intake = ContributionIntake::new(store.clone());

        for n in 0..3 {
            let record = intake
                .submit(draft(identity_id, &format!("Art. {n}")))
                .await
                .unwrap();
            approve(&store, record.id).await;
        }

        let page = intake
            .list_public(PublicFilter::default(), PageRequest::new(Some(1), Some(2)))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);

        let last = intake
            .list_public(PublicFilter::default(), PageRequest::new(Some(2), Some(2)))
            .await
            .unwrap();
        assert_eq!(last.items.len(), 1);
    }
}
