//! Observable online/offline signal shared by every synchronizer.

use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LinkState {
    online: bool,
    /// Count of offline -> online transitions
    reconnects: u64,
}

/// Process-wide connectivity signal.
///
/// Cheap to clone; all clones observe the same state. Injected into each
/// synchronizer instead of being read from ambient global state.
#[derive(Debug, Clone)]
pub struct Connectivity {
    state: Arc<watch::Sender<LinkState>>,
}

impl Connectivity {
    /// Create a signal with the given initial state
    pub fn new(online: bool) -> Self {
        let (state, _) = watch::channel(LinkState {
            online,
            reconnects: 0,
        });
        Self {
            state: Arc::new(state),
        }
    }

    /// Current state, readable synchronously
    pub fn is_online(&self) -> bool {
        self.state.borrow().online
    }

    /// Record a connectivity change. Repeated values are ignored.
    pub fn set_online(&self, online: bool) {
        let changed = self.state.send_if_modified(|state| {
            if state.online == online {
                return false;
            }
            state.online = online;
            if online {
                state.reconnects += 1;
            }
            true
        });

        if changed {
            tracing::debug!(online, "Connectivity changed");
        }
    }

    /// Number of live transition subscribers
    pub fn subscriber_count(&self) -> usize {
        self.state.receiver_count()
    }

    /// Subscribe to offline -> online transitions
    pub fn subscribe(&self) -> OnlineTransitions {
        let mut receiver = self.state.subscribe();
        let seen = receiver.borrow_and_update().reconnects;
        OnlineTransitions { receiver, seen }
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Stream of reconnect events for one subscriber
#[derive(Debug)]
pub struct OnlineTransitions {
    receiver: watch::Receiver<LinkState>,
    seen: u64,
}

impl OnlineTransitions {
    /// Wait for the next offline -> online transition.
    ///
    /// Fires at most once per transition; transitions that happened while
    /// nobody was waiting are coalesced into one event. Returns `None` once
    /// every `Connectivity` handle is gone.
    pub async fn next_online(&mut self) -> Option<()> {
        loop {
            {
                let state = self.receiver.borrow_and_update();
                if state.reconnects > self.seen {
                    self.seen = state.reconnects;
                    return Some(());
                }
            }
            self.receiver.changed().await.ok()?;
        }
    }
}
