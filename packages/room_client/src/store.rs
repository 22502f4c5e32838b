use std::sync::Arc;

use tokio::sync::watch;

use crate::state::ConversationState;

/// Shared handle to the conversation state.
///
/// Every mutation runs under the channel's write lock and is published as a
/// whole, so observers never see a half-applied event. Cloning the handle is
/// cheap; all clones see the same state.
#[derive(Clone)]
pub struct ConversationStore {
    tx: Arc<watch::Sender<ConversationState>>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ConversationState::default());
        Self { tx: Arc::new(tx) }
    }

    /// Apply one mutation and notify subscribers.
    pub fn update(&self, mutate: impl FnOnce(&mut ConversationState)) {
        self.tx.send_modify(mutate);
    }

    pub fn read<R>(&self, f: impl FnOnce(&ConversationState) -> R) -> R {
        f(&self.tx.borrow())
    }

    pub fn snapshot(&self) -> ConversationState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConversationState> {
        self.tx.subscribe()
    }

    pub fn reset(&self) {
        self.update(ConversationState::reset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_see_updates() {
        let store = ConversationStore::new();
        let mut rx = store.subscribe();

        store.update(|s| s.set_facilitator(true));
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().facilitator_enabled());

        let clone = store.clone();
        clone.update(|s| {
            s.add_ai_participant("Sage");
        });
        assert_eq!(store.read(|s| s.ai_participants().len()), 1);
    }

    #[test]
    fn reset_clears_everything() {
        let store = ConversationStore::new();
        store.update(|s| {
            s.set_identity("t1", "Ann");
            s.set_facilitator(true);
        });
        store.reset();
        assert_eq!(store.snapshot(), ConversationState::default());
    }
}
