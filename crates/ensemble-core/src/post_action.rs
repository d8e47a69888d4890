//! The post-action slot: a single-slot command channel from the control
//! thread to the audio thread.
//!
//! Structural mutations of the plugin table cannot happen while the audio
//! thread is mid-block, so the control thread publishes one pending action
//! here and blocks; the audio thread executes it at the top of its next
//! block and wakes the control thread. When the engine is stopped the
//! control thread executes the action itself.
//!
//! The audio-thread side is a `try_lock` plus a bounded amount of work; it
//! never waits on the control thread. The slot holds at most one action, and
//! control-thread submissions serialize on the slot mutex.

use parking_lot::{Condvar, Mutex};

use crate::plugin::PluginInstance;
use crate::table::PluginTable;

/// A pending structural action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostAction {
    /// Nothing pending.
    #[default]
    Null,
    /// Pure block-boundary barrier.
    Idle,
    /// Remove the plugin in slot `id` and compact the table.
    RemovePlugin { id: u32 },
}

#[derive(Default)]
struct SlotState {
    action: PostAction,
    /// Plugin pulled out of the table, parked here so the control thread can
    /// destroy it. The audio thread never drops a plugin.
    parked: Option<PluginInstance>,
    done: bool,
}

pub struct PostActionQueue {
    state: Mutex<SlotState>,
    completed: Condvar,
}

impl Default for PostActionQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl PostActionQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::default()),
            completed: Condvar::new(),
        }
    }

    /// Control-thread side: publish `action` and wait for the audio thread
    /// to execute it at a block boundary. With the engine stopped the action
    /// runs synchronously instead.
    ///
    /// Returns the plugin removed by the action, if any, for destruction on
    /// this thread.
    pub fn schedule(
        &self,
        table: &PluginTable,
        engine_running: bool,
        action: PostAction,
    ) -> Option<PluginInstance> {
        debug_assert!(action != PostAction::Null);

        let mut slot = self.state.lock();
        slot.action = action;
        slot.parked = None;
        slot.done = false;

        if engine_running {
            while !slot.done {
                self.completed.wait(&mut slot);
            }
        } else {
            Self::execute(&mut slot, table);
        }

        slot.parked.take()
    }

    /// Audio-thread side, called at the top of every block. Executes at most
    /// one pending action. Never blocks: if the control thread is still
    /// filling the slot, the action is picked up one block later.
    pub fn drain(&self, table: &PluginTable) {
        let Some(mut slot) = self.state.try_lock() else {
            return;
        };

        if slot.action == PostAction::Null {
            return;
        }

        Self::execute(&mut slot, table);
        self.completed.notify_one();
    }

    fn execute(slot: &mut SlotState, table: &PluginTable) {
        match slot.action {
            PostAction::Null => {}
            PostAction::Idle => {}
            PostAction::RemovePlugin { id } => {
                // SAFETY: we hold the post-action slot.
                slot.parked = unsafe { table.remove_and_compact(id) };
            }
        }

        slot.action = PostAction::Null;
        slot.done = true;
    }
}

impl std::fmt::Debug for PostActionQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostActionQueue").finish_non_exhaustive()
    }
}
