//! # Identity Registry
//!
//! Registration and lookup of consultation participants. Registration is
//! idempotent on the national ID: submitting the same CPF or CNPJ twice
//! returns the original identity unchanged, with no new row and no
//! re-encryption. The registry is also the only place plaintext
//! identifiers are sealed, and [`IdentityRegistry::reveal`] the only
//! path that unseals them.

use agora_core::{
    check_text_bounds, Cnpj, Cpf, EmailAddress, IdentityId, IndividualCategory,
    OrganizationNature, ParticipantKind, RegionCode, Timestamp, ValidationError,
};
use agora_crypto::FieldCipher;
use agora_store::{ConsultationStore, IdentityRecord, StoreError};

use crate::error::ServiceError;

/// Bounds on the participant display name.
const NAME_MIN: usize = 3;
const NAME_MAX: usize = 255;
/// Longest accepted source address (an RFC 4291 IPv6 literal fits).
const SOURCE_IP_MAX: usize = 45;

/// A new individual participant, field-validated at the transport edge.
#[derive(Debug, Clone)]
pub struct NewIndividual {
    pub cpf: Cpf,
    pub email: EmailAddress,
    pub display_name: String,
    pub region: RegionCode,
    pub category: IndividualCategory,
    pub source_ip: String,
    pub user_agent: Option<String>,
}

/// A new organization participant.
#[derive(Debug, Clone)]
pub struct NewOrganization {
    pub cnpj: Cnpj,
    /// CPF of the legal representative; sealed but never indexed.
    pub representative_cpf: Cpf,
    pub email: EmailAddress,
    pub display_name: String,
    pub region: RegionCode,
    pub nature: OrganizationNature,
    pub source_ip: String,
    pub user_agent: Option<String>,
}

/// The outcome of a registration call.
#[derive(Debug, Clone)]
pub enum Registration {
    /// A new identity was created.
    Created(IdentityRecord),
    /// An identity with this national ID already existed and is returned
    /// unchanged.
    Existing(IdentityRecord),
}

impl Registration {
    /// The registered identity, new or pre-existing.
    pub fn record(&self) -> &IdentityRecord {
        match self {
            Self::Created(record) | Self::Existing(record) => record,
        }
    }

    /// Consume the outcome, keeping the identity.
    pub fn into_record(self) -> IdentityRecord {
        match self {
            Self::Created(record) | Self::Existing(record) => record,
        }
    }

    /// Whether this call created the identity.
    pub fn is_new(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// An identity with its sealed identifiers decrypted, for the privileged
/// display path.
#[derive(Debug, Clone)]
pub struct RevealedIdentity {
    pub identity: IdentityRecord,
    /// Decrypted CPF or CNPJ, digits only.
    pub national_id: String,
    /// Decrypted contact email.
    pub email: String,
}

/// Participant registration and lookup.
#[derive(Clone)]
pub struct IdentityRegistry {
    store: ConsultationStore,
    cipher: FieldCipher,
}

impl IdentityRegistry {
    /// Build a registry over a store and cipher.
    pub fn new(store: ConsultationStore, cipher: FieldCipher) -> Self {
        Self { store, cipher }
    }

    /// Register an individual, or return the existing identity for this
    /// CPF.
    pub async fn register_individual(
        &self,
        new: NewIndividual,
    ) -> Result<Registration, ServiceError> {
        check_text_bounds("display_name", &new.display_name, NAME_MIN, NAME_MAX)?;
        check_text_bounds("source_ip", &new.source_ip, 1, SOURCE_IP_MAX)?;

        let digest = self.cipher.digest(new.cpf.as_str());
        if let Some(existing) = self
            .store
            .identity_by_digest(ParticipantKind::Individual, &digest)
            .await?
        {
            return Ok(Registration::Existing(existing));
        }

        let now = Timestamp::now();
        let record = IdentityRecord {
            id: IdentityId::new(),
            kind: ParticipantKind::Individual,
            national_id: self.cipher.seal(new.cpf.as_str())?,
            representative_id: None,
            email: self.cipher.seal(new.email.as_str())?,
            display_name: new.display_name,
            region: new.region,
            category: Some(new.category),
            nature: None,
            consent_at: now,
            source_ip: new.source_ip,
            user_agent: new.user_agent,
            created_at: now,
        };

        self.insert_or_existing(record, ParticipantKind::Individual, &digest)
            .await
    }

    /// Register an organization, or return the existing identity for
    /// this CNPJ.
    pub async fn register_organization(
        &self,
        new: NewOrganization,
    ) -> Result<Registration, ServiceError> {
        check_text_bounds("display_name", &new.display_name, NAME_MIN, NAME_MAX)?;
        check_text_bounds("source_ip", &new.source_ip, 1, SOURCE_IP_MAX)?;

        let digest = self.cipher.digest(new.cnpj.as_str());
        if let Some(existing) = self
            .store
            .identity_by_digest(ParticipantKind::Organization, &digest)
            .await?
        {
            return Ok(Registration::Existing(existing));
        }

        let now = Timestamp::now();
        let record = IdentityRecord {
            id: IdentityId::new(),
            kind: ParticipantKind::Organization,
            national_id: self.cipher.seal(new.cnpj.as_str())?,
            representative_id: Some(self.cipher.seal(new.representative_cpf.as_str())?),
            email: self.cipher.seal(new.email.as_str())?,
            display_name: new.display_name,
            region: new.region,
            category: None,
            nature: Some(new.nature),
            consent_at: now,
            source_ip: new.source_ip,
            user_agent: new.user_agent,
            created_at: now,
        };

        self.insert_or_existing(record, ParticipantKind::Organization, &digest)
            .await
    }

    /// Insert the record, falling back to lookup when a concurrent
    /// registration won the digest uniqueness race.
    async fn insert_or_existing(
        &self,
        record: IdentityRecord,
        kind: ParticipantKind,
        digest: &agora_crypto::FieldDigest,
    ) -> Result<Registration, ServiceError> {
        match self.store.insert_identity(record.clone()).await {
            Ok(()) => Ok(Registration::Created(record)),
            Err(StoreError::DuplicateIdentityDigest) => {
                let existing = self
                    .store
                    .identity_by_digest(kind, digest)
                    .await?
                    .ok_or_else(|| {
                        StoreError::corrupt("identity", "digest conflict reported but row absent")
                    })?;
                Ok(Registration::Existing(existing))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Look an identity up by plaintext national ID.
    ///
    /// The input is normalized and check-digit validated before
    /// digesting, so a formatted `111.444.777-35` finds a record
    /// registered as `11144477735`.
    pub async fn find_by_national_id(
        &self,
        national_id: &str,
        kind: ParticipantKind,
    ) -> Result<Option<IdentityRecord>, ServiceError> {
        let canonical = match kind {
            ParticipantKind::Individual => Cpf::new(national_id)?.as_str().to_owned(),
            ParticipantKind::Organization => Cnpj::new(national_id)?.as_str().to_owned(),
        };
        let digest = self.cipher.digest(&canonical);
        Ok(self.store.identity_by_digest(kind, &digest).await?)
    }

    /// Fetch an identity by ID.
    pub async fn get(&self, id: IdentityId) -> Result<IdentityRecord, ServiceError> {
        self.store
            .identity_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound("identity"))
    }

    /// Decrypt an identity's sealed identifiers for authorized display.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`] for an unknown ID;
    /// [`ServiceError::Crypto`] when a stored ciphertext is unreadable
    /// with the current key — surfaced to operators, never to clients.
    pub async fn reveal(&self, id: IdentityId) -> Result<RevealedIdentity, ServiceError> {
        let identity = self.get(id).await?;
        let national_id = self.cipher.reveal(&identity.national_id)?;
        let email = self.cipher.reveal(&identity.email)?;
        Ok(RevealedIdentity {
            identity,
            national_id,
            email,
        })
    }
}
