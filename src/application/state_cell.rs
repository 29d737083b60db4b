use tokio::sync::{broadcast, watch};

/// Capacity of the per-component transition stream. A receiver further
/// behind than this gets `RecvError::Lagged`.
pub(crate) const TRANSITION_CHANNEL_CAPACITY: usize = 64;

/// Holds the current state of a component and publishes every transition.
///
/// The `watch` side answers "what is the state now", the `broadcast` side
/// delivers each committed transition. Both are updated under the watch
/// write lock, so subscribers see transitions in commit order.
pub(crate) struct StateCell<S> {
    current: watch::Sender<S>,
    transitions: broadcast::Sender<S>,
}

impl<S: Clone + Send + Sync + 'static> StateCell<S> {
    pub(crate) fn new(initial: S) -> Self {
        let (current, _) = watch::channel(initial);
        let (transitions, _) = broadcast::channel(TRANSITION_CHANNEL_CAPACITY);
        Self {
            current,
            transitions,
        }
    }

    pub(crate) fn snapshot(&self) -> S {
        self.current.borrow().clone()
    }

    pub(crate) fn watch(&self) -> watch::Receiver<S> {
        self.current.subscribe()
    }

    /// Transitions committed from now on. A receiver that falls more than
    /// [`TRANSITION_CHANNEL_CAPACITY`] transitions behind loses the oldest
    /// ones and is told so through `Lagged`; `snapshot` stays current.
    pub(crate) fn subscribe(&self) -> broadcast::Receiver<S> {
        self.transitions.subscribe()
    }

    /// Replaces the state unconditionally.
    pub(crate) fn commit(&self, next: S) {
        self.commit_if(|_| Some(next));
    }

    /// Runs `decide` against the current state under the write lock and
    /// commits the state it returns, if any. Returns whether it committed.
    pub(crate) fn commit_if<F>(&self, decide: F) -> bool
    where
        F: FnOnce(&S) -> Option<S>,
    {
        self.current.send_if_modified(|state| match decide(&*state) {
            Some(next) => {
                // No subscribers is fine.
                let _ = self.transitions.send(next.clone());
                *state = next;
                true
            }
            None => false,
        })
    }
}
