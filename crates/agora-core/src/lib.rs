//! # agora-core — Foundational Types for the Agora Stack
//!
//! This crate is the bedrock of the Agora public-consultation stack. It
//! defines the domain primitives every other crate builds on: validated
//! national identifiers, the closed document and region sets, the protocol
//! number format (a bit-exact external contract), reviewer capabilities,
//! and UTC-only temporal types. Every other crate in the workspace depends
//! on `agora-core`; it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** `IdentityId`,
//!    `ContributionId`, `Cpf`, `Cnpj`, `EmailAddress`, `RegionCode` — all
//!    newtypes with validated constructors. No bare strings for identifiers.
//!
//! 2. **Validation at construction.** A `Cpf` that exists has passed both
//!    check digits; a `RegionCode` that exists is one of the 27 federative
//!    units. Downstream code never re-validates.
//!
//! 3. **Closed enums for closed sets.** Document codes, contribution kinds,
//!    participant categories, and reviewer roles are exhaustive enums with
//!    SCREAMING_CASE wire forms. Adding a variant forces every consumer to
//!    handle it.
//!
//! 4. **UTC-only timestamps.** The `Timestamp` type enforces UTC with Z
//!    suffix and seconds precision. Brasília local time is derived from it
//!    through a fixed offset, never stored as a second source of truth.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `agora-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - All public types derive `Debug`, `Clone`, and implement
//!   `Serialize`/`Deserialize`.

pub mod contribution;
pub mod document;
pub mod error;
pub mod identity;
pub mod participant;
pub mod protocol;
pub mod region;
pub mod role;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use contribution::ContributionKind;
pub use document::DocumentCode;
pub use error::{check_text_bounds, ValidationError};
pub use identity::{Cnpj, ContributionId, Cpf, EmailAddress, IdentityId, ProtocolId, ReviewerId};
pub use participant::{IndividualCategory, OrganizationNature, ParticipantKind};
pub use protocol::ProtocolNumber;
pub use region::RegionCode;
pub use role::{PrivilegedOp, ReviewerRole};
pub use temporal::{brasilia_now, brasilia_offset, Timestamp};
