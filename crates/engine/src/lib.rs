pub mod config;
pub mod error;
pub mod jobs;
pub mod machine;
pub mod manifest;
pub mod mutation;
pub mod overlay;
pub mod store;
pub mod validation;

pub use config::{DEFAULT_STORAGE_KEY, StoreConfig};
pub use error::EngineError;
pub use jobs::HISTORY_LIMIT;
pub use manifest::{ApprovalHashes, GenerateBlocker, can_generate};
pub use mutation::{Mutation, ProjectPatch};
pub use overlay::effective_script;
pub use store::{PendingApproval, ProjectStore};
pub use validation::ValidationError;
