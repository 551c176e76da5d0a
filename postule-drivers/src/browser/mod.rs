//! Browser plumbing: driver, page/element wrappers, pacing, launch options.

pub mod behavioral;
pub mod driver;
pub mod launch;
pub mod page;
