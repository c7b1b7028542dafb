//! Contract layer.
//!
//! - [`reputation::ReputationContract`]: owns per-node scores and the
//!   bump / penalty rule.
//! - [`verification::VerificationContract`]: runs the verifiers for
//!   submitted proofs and credentials and feeds the outcome back into
//!   the reputation registry.
//!
//! Both are plain owned objects; share them with `Arc` where several
//! submitters need them.

pub mod reputation;
pub mod verification;

pub use reputation::{ReputationContract, ReputationUpdate, Verdict};
pub use verification::VerificationContract;
