//! Client-side logic for the algolab platform: the run/submit job poller,
//! the auth session state machine and problem listing helpers.

pub mod api;
pub mod cache;
pub mod error;
pub mod listing;
pub mod poller;
pub mod session;


pub use api::{HttpApi, JobApi};
pub use error::ApiError;
pub use poller::{JobSnapshot, JobTracker, PollOptions};
pub use session::{AuthSession, AuthState, FileSessionStore, MemorySessionStore, SessionStore};
