//! Background refresh timers, at most one armed per cache key

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

struct TimerHandle {
    id: u64,
    token: CancellationToken,
}

/// Maps cache keys to their pending refresh timer
#[derive(Default)]
pub(crate) struct RefreshTimers {
    handles: HashMap<String, TimerHandle>,
    next_id: u64,
}

impl RefreshTimers {
    /// Register a new timer for `key`, cancelling the one already pending.
    /// Returns the timer id and the token the spawned task must watch.
    pub fn arm(&mut self, key: &str, parent: &CancellationToken) -> (u64, CancellationToken) {
        self.cancel(key);
        self.next_id += 1;

        let token = parent.child_token();
        self.handles.insert(
            key.to_string(),
            TimerHandle {
                id: self.next_id,
                token: token.clone(),
            },
        );

        (self.next_id, token)
    }

    pub fn cancel(&mut self, key: &str) -> bool {
        match self.handles.remove(key) {
            Some(handle) => {
                handle.token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) -> usize {
        let count = self.handles.len();
        for (_, handle) in self.handles.drain() {
            handle.token.cancel();
        }
        count
    }

    /// Forget a timer that fired, unless it was re-armed in the meantime
    pub fn finish(&mut self, key: &str, id: u64) {
        if self.handles.get(key).is_some_and(|h| h.id == id) {
            self.handles.remove(key);
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_armed(&self, key: &str) -> bool {
        self.handles.contains_key(key)
    }
}

/// Run `on_fire` after `delay` unless `token` is cancelled first.
/// Once fired the work is not cancellable.
pub(crate) fn spawn_timer<F>(token: CancellationToken, delay: Duration, on_fire: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = tokio::time::sleep(delay) => on_fire.await,
        }
    });
}
