//! Unidirectional data flow primitives.
//!
//! ```text
//! Action ──→ Reducer ──→ State ──→ Subscribers
//!    ↑                                  │
//!    └──────────── thunks ──────────────┘
//! ```
//!
//! - **State**: immutable snapshot of everything the application knows
//! - **Action**: description of something that happened
//! - **Reducer**: pure function computing the next state

mod action;
mod reducer;
mod state;

pub use action::Action;
pub use reducer::Reducer;
pub use state::State;
