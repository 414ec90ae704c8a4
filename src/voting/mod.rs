//! The scoring core: admitting judges' vote batches and ranking candidates.
//!
//! Submissions run in three stages. [`BatchContext::fetch`] reads what a batch
//! refers to, [`validate_batch`] decides on it without touching the store, and
//! [`EntityStore::create_votes`] writes it atomically. [`submit_votes`] chains
//! them. Results are computed by [`compute_results`] from already-fetched data.

mod aggregate;
mod bounds;
#[cfg(test)]
mod memory;
mod rejection;
mod store;
mod submit;
mod validator;

pub use aggregate::{compute_results, round2, CandidateResult};
pub use bounds::ScoreBounds;
#[cfg(test)]
pub use memory::MemoryStore;
pub use rejection::{RejectionKind, VoteRejection};
pub use store::{EntityStore, MongoStore, VoteFilter};
pub use submit::{amend_score, event_results, submit_votes};
pub use validator::{validate_batch, BatchContext, VoteRecord, VoteTuple};
