//! Verifier side of the protocol.
//!
//! - [`single::SingleVerifier`]: checks one proof package, optionally
//!   with Merkle inclusion against the data root.
//! - [`aggregate::AggregateVerifier`]: checks credential-list continuity
//!   and spot-checks individual segments.
//!
//! Both return `Result<(), ValidationError>`; a failure is a policy
//! verdict, not a fault.

pub mod aggregate;
pub mod single;

pub use aggregate::AggregateVerifier;
pub use single::{InclusionEvidence, SingleVerifier};
