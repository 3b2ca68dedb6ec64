//! # conduit-forge
//!
//! PR/code-host tooling used by the session manager's `pr_upsert`
//! operation. Only GitHub (via `gh`) is wired up today; additional
//! forges implement [`ForgeBackend`].

mod errors;
mod github;
mod traits;
mod types;

pub use errors::ForgeError;
pub use github::GitHubBackend;
pub use traits::ForgeBackend;
pub use types::{PrRecord, PrStatus};

/// Returns the first available forge backend, or `None` if no supported
/// CLI tool is installed.
pub fn detect_backend() -> Option<Box<dyn ForgeBackend>> {
    let github = GitHubBackend;
    if github.is_available() {
        return Some(Box::new(github));
    }
    None
}
