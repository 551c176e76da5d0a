//! Driver layer for browser automation and session persistence.
//!
//! This crate exposes the WebDriver plumbing the apply engine drives: a
//! browser wrapper, page/element helpers with bounded waits, human-paced
//! input, and the session store that keeps one account logged in across
//! runs.
//!
//! - [`browser::driver::Browser`]: WebDriver client wrapper
//! - [`browser::page::Page`] and [`browser::page::PageElement`]: DOM helpers
//! - [`browser::behavioral::Pacer`]: randomized delays and human-like typing
//! - [`session::SessionStore`]: persisted login state with atomic snapshots
pub mod browser;
pub mod session;

pub use browser::behavioral::Pacer;
pub use browser::driver::Browser;
pub use browser::launch::LaunchOptions;
pub use browser::page::{Page, PageElement};
pub use session::{is_auth_wall, Session, SessionOptions, SessionStore};
