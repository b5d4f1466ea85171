//! Function-pointer finite state machine engine for the connectivity
//! lifecycle.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  StateTable                                                   │
//! │  ┌─────────────┬───────────┬──────────┬───────────────────┐   │
//! │  │ StateId     │ on_enter  │ on_exit  │ on_update         │   │
//! │  ├─────────────┼───────────┼──────────┼───────────────────┤   │
//! │  │ Initial     │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │   │
//! │  │ TryConnect  │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │   │
//! │  │ Connecting  │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │   │
//! │  │ Connected   │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │   │
//! │  │ Reset       │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │   │
//! │  │ WaitRestart │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │   │
//! │  └─────────────┴───────────┴──────────┴───────────────────┘   │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** state.
//! If it returns `Some(next_id)`, the engine runs `on_exit` for the
//! current state, then `on_enter` for the next, and updates the
//! current pointer.  Handlers only touch the [`LifecycleContext`]; the
//! side effects they want are queued there as commands and applied by
//! the service through its ports.

pub mod context;
pub mod states;

use context::LifecycleContext;
use log::info;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Connectivity lifecycle states.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    Initial = 0,
    TryConnect = 1,
    Connecting = 2,
    Connected = 3,
    Reset = 4,
    WaitRestart = 5,
}

impl StateId {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 6;

    /// Convert an index back to `StateId`.  Asserts in debug builds;
    /// falls back to `WaitRestart` (which reboots) in release.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Initial,
            1 => Self::TryConnect,
            2 => Self::Connecting,
            3 => Self::Connected,
            4 => Self::Reset,
            5 => Self::WaitRestart,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::WaitRestart
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn = fn(&mut LifecycleContext);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut LifecycleContext) -> Option<StateId>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

pub struct Fsm {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    current: usize,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        Self {
            table,
            current: initial as usize,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut LifecycleContext) {
        info!("Lifecycle starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance the FSM by one tick.
    pub fn tick(&mut self, ctx: &mut LifecycleContext) {
        let next = (self.table[self.current].on_update)(ctx);

        if let Some(next_id) = next {
            self.transition(next_id, ctx);
        }
    }

    /// Jump to `next` from outside the table (reset and reboot requests).
    /// No-op if already there.
    pub fn force_transition(&mut self, next: StateId, ctx: &mut LifecycleContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: StateId, ctx: &mut LifecycleContext) {
        let next_idx = next_id as usize;

        info!(
            "Lifecycle transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
