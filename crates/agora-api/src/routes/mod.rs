//! # Route Modules
//!
//! One module per resource:
//! - [`identities`]: participant registration, lookup, privileged
//!   reveal.
//! - [`contributions`]: submission, per-identity listing, the public
//!   read path.
//! - [`moderation`]: the reviewer surface — decisions, batches, queue,
//!   audit history. Entirely privileged.
//! - [`protocols`]: finalization, number lookup, notification receipt.

pub mod contributions;
pub mod identities;
pub mod moderation;
pub mod protocols;
