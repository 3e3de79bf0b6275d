//! # Participant Classification
//!
//! Closed enums describing who is contributing: individual or organization,
//! and the self-declared category/nature captured at registration. These
//! feed public display and reporting; they carry no sensitive data.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Whether a participant registered as an individual or an organization.
///
/// Determines which national registry the sensitive identifier belongs to:
/// CPF for individuals, CNPJ for organizations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantKind {
    /// A natural person, identified by CPF.
    Individual,
    /// A legal entity, identified by CNPJ.
    Organization,
}

impl ParticipantKind {
    /// The wire/storage name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Individual => "INDIVIDUAL",
            Self::Organization => "ORGANIZATION",
        }
    }
}

impl std::fmt::Display for ParticipantKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ParticipantKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INDIVIDUAL" => Ok(Self::Individual),
            "ORGANIZATION" => Ok(Self::Organization),
            other => Err(ValidationError::InvalidParticipantKind(other.to_string())),
        }
    }
}

/// Self-declared category of an individual participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndividualCategory {
    /// Licensed dental surgeon.
    DentalSurgeon,
    /// Oral-health technician or assistant.
    TechnicalAssistant,
    /// Student of the profession.
    Student,
    /// Academic researcher.
    Researcher,
    /// Member of the general public.
    Citizen,
    /// None of the above.
    Other,
}

impl IndividualCategory {
    /// The wire/storage name for this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DentalSurgeon => "DENTAL_SURGEON",
            Self::TechnicalAssistant => "TECHNICAL_ASSISTANT",
            Self::Student => "STUDENT",
            Self::Researcher => "RESEARCHER",
            Self::Citizen => "CITIZEN",
            Self::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for IndividualCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IndividualCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DENTAL_SURGEON" => Ok(Self::DentalSurgeon),
            "TECHNICAL_ASSISTANT" => Ok(Self::TechnicalAssistant),
            "STUDENT" => Ok(Self::Student),
            "RESEARCHER" => Ok(Self::Researcher),
            "CITIZEN" => Ok(Self::Citizen),
            "OTHER" => Ok(Self::Other),
            other => Err(ValidationError::InvalidCategory(other.to_string())),
        }
    }
}

/// Self-declared nature of an organization participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrganizationNature {
    /// Regional professional council.
    RegionalCouncil,
    /// Professional class association.
    ClassAssociation,
    /// Labor union.
    Union,
    /// Educational institution.
    EducationalInstitution,
    /// Research center.
    ResearchCenter,
    /// Private company.
    PrivateCompany,
    /// Public body or agency.
    PublicBody,
    /// Non-governmental organization.
    Ngo,
    /// None of the above.
    Other,
}

impl OrganizationNature {
    /// The wire/storage name for this nature.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RegionalCouncil => "REGIONAL_COUNCIL",
            Self::ClassAssociation => "CLASS_ASSOCIATION",
            Self::Union => "UNION",
            Self::EducationalInstitution => "EDUCATIONAL_INSTITUTION",
            Self::ResearchCenter => "RESEARCH_CENTER",
            Self::PrivateCompany => "PRIVATE_COMPANY",
            Self::PublicBody => "PUBLIC_BODY",
            Self::Ngo => "NGO",
            Self::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for OrganizationNature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrganizationNature {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REGIONAL_COUNCIL" => Ok(Self::RegionalCouncil),
            "CLASS_ASSOCIATION" => Ok(Self::ClassAssociation),
            "UNION" => Ok(Self::Union),
            "EDUCATIONAL_INSTITUTION" => Ok(Self::EducationalInstitution),
            "RESEARCH_CENTER" => Ok(Self::ResearchCenter),
            "PRIVATE_COMPANY" => Ok(Self::PrivateCompany),
            "PUBLIC_BODY" => Ok(Self::PublicBody),
            "NGO" => Ok(Self::Ngo),
            "OTHER" => Ok(Self::Other),
            other => Err(ValidationError::InvalidNature(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_wire_form_is_screaming() {
        assert_eq!(
            serde_json::to_string(&ParticipantKind::Individual).unwrap(),
            "\"INDIVIDUAL\""
        );
        assert_eq!(
            serde_json::to_string(&ParticipantKind::Organization).unwrap(),
            "\"ORGANIZATION\""
        );
    }

    #[test]
    fn kind_parses_wire_form() {
        let kind: ParticipantKind = "ORGANIZATION".parse().unwrap();
        assert_eq!(kind, ParticipantKind::Organization);
        assert!("COMPANY".parse::<ParticipantKind>().is_err());
    }

    #[test]
    fn category_and_nature_parse_wire_form() {
        let category: IndividualCategory = "DENTAL_SURGEON".parse().unwrap();
        assert_eq!(category, IndividualCategory::DentalSurgeon);
        assert!("DENTIST".parse::<IndividualCategory>().is_err());

        let nature: OrganizationNature = "REGIONAL_COUNCIL".parse().unwrap();
        assert_eq!(nature, OrganizationNature::RegionalCouncil);
        assert!("GUILD".parse::<OrganizationNature>().is_err());
    }

    #[test]
    fn category_serde_matches_as_str() {
        for cat in [
            IndividualCategory::DentalSurgeon,
            IndividualCategory::TechnicalAssistant,
            IndividualCategory::Student,
            IndividualCategory::Researcher,
            IndividualCategory::Citizen,
            IndividualCategory::Other,
        ] {
            let json = serde_json::to_string(&cat).unwrap();
            assert_eq!(json, format!("\"{}\"", cat.as_str()));
        }
    }

    #[test]
    fn nature_serde_matches_as_str() {
        for nature in [
            OrganizationNature::RegionalCouncil,
            OrganizationNature::ClassAssociation,
            OrganizationNature::Union,
            OrganizationNature::EducationalInstitution,
            OrganizationNature::ResearchCenter,
            OrganizationNature::PrivateCompany,
            OrganizationNature::PublicBody,
            OrganizationNature::Ngo,
            OrganizationNature::Other,
        ] {
            let json = serde_json::to_string(&nature).unwrap();
            assert_eq!(json, format!("\"{}\"", nature.as_str()));
        }
    }
}
