//! Voting state store for a small internal polling app.
//!
//! Employees sign in with a four-digit id, vote on admin-created polls and
//! leave feedback. All state lives in four independently persisted slots
//! (polls, users, current session, feedback). The crate is split the same way
//! as the rest of our tools:
//!
//! - **[`core`]**: Pure, deterministic rules (vote moves, eligibility, draft
//!   validation, listing queries, invariants). No I/O.
//! - **[`io`]**: Side effects (slot storage, config, clock, scaffolding).
//!
//! [`store::VotingStore`] ties the two together and is what the CLI drives.
//! [`render`] turns store state into terminal text.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod model;
pub mod render;
pub mod seed;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
