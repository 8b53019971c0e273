pub mod attendance;
pub mod stats;
pub mod user;

use std::sync::Arc;

use rollcall_common::PolicyConfig;
use rollcall_store::DocumentStore;

/// Shared handles every subcommand needs.
pub struct Ctx {
    pub store: Arc<dyn DocumentStore>,
    pub policy: PolicyConfig,
}
