//! Transaction orchestration.
//!
//! # State Machine
//! ```text
//! Idle → BuildingInvocation → AwaitingSignature → Submitting → Confirming → Succeeded
//!              │                     │                 │            │
//!              └─────────────────────┴─────────────────┴────────────┴──▶ Failed(kind)
//! ```
//!
//! # Design Decisions
//! - One in-flight attempt per wallet session, enforced by a session lease
//! - A failed submit is never retried with the same signed payload
//! - Terminal states invalidate campaign data instead of patching it locally

pub mod attempt;
pub mod engine;
pub mod events;

pub use attempt::{AttemptKind, AttemptState, TransactionAttempt, TransitionError};
pub use engine::{ActionRequest, Endpoints, Orchestrator};
pub use events::{AttemptOutcome, AttemptProgress, Invalidation, Receipt};
