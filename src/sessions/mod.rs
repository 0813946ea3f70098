//! Pure computations over work sessions that were already loaded into memory.
//!  - [overlap] decides whether a new or edited session collides with existing ones.
//!  - [aggregation] groups sessions into calendar days of the owner, optionally comparing them
//!    with the previous period.
//!  - [hourly], [summary] and [grouping] build further statistics on top of that.
//!
//! Nothing here performs I/O or reads the clock. The reference instant is always passed in.

pub mod aggregation;
pub mod entities;
pub mod error;
pub mod grouping;
pub mod hourly;
pub mod overlap;
pub mod summary;
pub mod window;
