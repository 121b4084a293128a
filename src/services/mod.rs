//! External collaborators behind narrow trait seams.
//!
//! Each collaborator is a thin client:
//! - Social platform search (`SearchClient`)
//! - Author lookup (`UserLookup`)
//! - On-chain domain registry (`DomainRegistry`)
//! - LLM sentiment classifier (`SentimentClassifier`)
//!
//! Traits exist so the pipeline can be tested with in-memory fakes.

pub mod registry;
pub mod search;
pub mod sentiment;
pub mod users;

pub use registry::{DomainRegistry, HttpRegistry, RegisteredDomain, RegistrySnapshot};
pub use search::{HttpSearchClient, RawItem, SearchClient, SearchPage};
pub use sentiment::{HttpSentimentClassifier, OwnershipClaim, SentimentClassifier, SentimentVerdict};
pub use users::{HttpUserLookup, UserLookup, UserProfile};
