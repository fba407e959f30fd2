use std::sync::LockResult;

use tracing::warn;

/// Cache state is plain maps; a panic mid-update leaves them usable, so a
/// poisoned lock is taken over rather than propagated.
pub(crate) trait Unpoison<G> {
    fn unpoison(self, module: &'static str, op: &'static str) -> G;
}

impl<G> Unpoison<G> for LockResult<G> {
    fn unpoison(self, module: &'static str, op: &'static str) -> G {
        self.unwrap_or_else(|poisoned| {
            warn!(module, op, "cache lock poisoned, continuing with inner state");
            poisoned.into_inner()
        })
    }
}
