//! Calendar arithmetic: a circular value space, a calendar timestamp built
//! from chained pointers into it, and the ISO-8601 duration type used to
//! shift timestamps around.

pub mod date;
pub mod duration;
pub mod group;

pub use date::ClockworkDate;
pub use duration::RelativeDuration;
