use std::sync::atomic::{AtomicBool, Ordering};

/// "Unlocked for this run". Lives in process memory only and starts cleared.
///
/// Deliberately not `Serialize` and not `Clone`: a copy of the flag would let
/// two owners disagree about the session.
#[derive(Debug, Default)]
pub struct SessionFlag {
    unlocked: AtomicBool,
}

impl SessionFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.unlocked.load(Ordering::SeqCst)
    }

    pub(crate) fn set(&self) {
        self.unlocked.store(true, Ordering::SeqCst);
    }

    pub(crate) fn clear(&self) {
        self.unlocked.store(false, Ordering::SeqCst);
    }
}
