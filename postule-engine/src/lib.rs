//! The apply engine: search navigation, answer resolution, and modal
//! traversal composed into one cancellable run loop.
//!
//! The crate is organised around three seams:
//!
//! - [`navigator::Navigator`] walks the filtered search results and hands
//!   out deduplicated [`types::Candidate`]s.
//! - [`resolve::ResolverChain`] turns a [`types::Question`] into an answer
//!   through ordered stages (policy answers, work-authorization classifier,
//!   experience table, profile, document-grounded reasoning).
//! - [`modal::ModalDriver`] drives the application modal itself and reduces
//!   each attempt to a [`modal::ApplyVerdict`].
//!
//! [`Engine`] wires the three to a live browser session and exposes the
//! run loop plus a `watch` channel of [`types::RunStatus`] snapshots.

pub mod document;
pub mod experience;
pub mod limit;
pub mod modal;
pub mod navigator;
pub mod resolve;
pub mod run;
pub mod types;

pub use modal::{ApplyVerdict, ModalDriver};
pub use navigator::Navigator;
pub use resolve::{PolicyAnswers, Resolver, ResolverChain};
pub use run::{Engine, RunReport};
pub use types::{ApplicationOutcome, Candidate, OutcomeKind, Question, RunStatus};
