//! Storage seam for player-authored state.

use crate::reconcile::PersistedState;

/// Two records: the persisted player state and the tutorial flag.
///
/// Implementations swallow their own failures. A record that cannot be read
/// is reported as absent and a failed write is dropped.
pub trait PlayerStore {
    fn load(&self) -> Option<PersistedState>;
    fn save(&mut self, state: &PersistedState);
    fn tutorial_complete(&self) -> bool;
    fn set_tutorial_complete(&mut self, complete: bool);
}

/// In-process store for tests and headless runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Option<PersistedState>,
    tutorial_complete: bool,
    pub saves: usize,
}

impl PlayerStore for MemoryStore {
    fn load(&self) -> Option<PersistedState> {
        self.state.clone()
    }

    fn save(&mut self, state: &PersistedState) {
        self.state = Some(state.clone());
        self.saves += 1;
    }

    fn tutorial_complete(&self) -> bool {
        self.tutorial_complete
    }

    fn set_tutorial_complete(&mut self, complete: bool) {
        self.tutorial_complete = complete;
    }
}
