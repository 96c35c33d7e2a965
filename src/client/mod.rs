//! Client-side photo state and the commands that keep it in step with the server.

pub mod backend;
pub mod state;
pub mod store;

pub use backend::{ClientError, HttpBackend, PhotoBackend};
pub use state::{reduce, Action, Breadcrumb, PhotoState, SearchStatus};
pub use store::{PhotoStore, SyncStatus};
