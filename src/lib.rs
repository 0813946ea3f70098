//! Simple to use cli for logging work sessions and looking back at how focused you were.
//! Sessions are checked for overlaps before being saved, and can be analyzed per day, with a
//! comparison against the previous period, or per hour of a day.
//!

pub mod cli;
pub mod sessions;
pub mod storage;
pub mod utils;
