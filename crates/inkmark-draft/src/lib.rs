//! Draft editing sessions on top of `inkmark-core`
//!
//! A session binds one draft id to a [`DraftRepository`], owns the working
//! annotation store, and converts screen-space input to PDF point space at
//! the moment marks are placed. It also offers an async export entry point
//! that runs the flattening on a blocking worker.

pub mod error;
pub mod repo;
pub mod session;

pub use error::{RepoError, SessionError};
pub use repo::{DraftRepository, InMemoryRepository};
pub use session::EditorSession;
