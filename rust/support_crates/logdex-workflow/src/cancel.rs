//! Cooperative cancellation shared between a query and the tasks it spawns.
//!
//! A [`CancellationToken`] is a cheap, clonable flag. Blocking waits that must
//! stay responsive to cancellation (slot acquisition backoff, producer loops)
//! use [`CancellationToken::sleep`], which returns early once the token fires.
//!
//! Tokens form a tree: a child created with [`CancellationToken::child_token`]
//! is cancelled whenever its parent is, while cancelling the child leaves the
//! parent untouched. Engines use this to stop their own workers (e.g. when the
//! consumer returns `false`) without cancelling the caller's token.

use std::{
    sync::{
        Arc, Condvar, Mutex, Weak,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use logdex_common::{Error, Result};

/// A clonable cancellation flag. All clones observe the same state.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<TokenNode>);

impl CancellationToken {
    pub fn new() -> CancellationToken {
        CancellationToken::default()
    }

    /// Creates a token that is cancelled together with `self`, but can also be
    /// cancelled independently.
    pub fn child_token(&self) -> CancellationToken {
        let child = CancellationToken::new();
        {
            let mut children = self.0.children.lock().unwrap();
            children.retain(|c| c.strong_count() > 0);
            children.push(Arc::downgrade(&child.0));
        }
        // The parent may have fired between construction and registration.
        if self.is_cancelled() {
            child.cancel();
        }
        child
    }

    /// Fires the token and every child token derived from it.
    pub fn cancel(&self) {
        self.0.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(Ordering::Acquire)
    }

    /// Returns `Err(Cancelled)` if the token has fired.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::cancelled())
        } else {
            Ok(())
        }
    }

    /// Blocks the current thread for up to `timeout`, waking early if the
    /// token is cancelled.
    ///
    /// Returns `true` if the token is cancelled when the call returns.
    pub fn sleep(&self, timeout: Duration) -> bool {
        let guard = self.0.lock.lock().unwrap();
        let (_guard, _) = self
            .0
            .condvar
            .wait_timeout_while(guard, timeout, |_| !self.is_cancelled())
            .unwrap();
        self.is_cancelled()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[derive(Default)]
struct TokenNode {
    cancelled: AtomicBool,
    lock: Mutex<()>,
    condvar: Condvar,
    children: Mutex<Vec<Weak<TokenNode>>>,
}

impl TokenNode {
    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        {
            // Sleepers check the flag under this lock, so taking it here
            // guarantees none of them misses the notification.
            let _guard = self.lock.lock().unwrap();
            self.condvar.notify_all();
        }
        let children = std::mem::take(&mut *self.children.lock().unwrap());
        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel();
        }
    }
}
