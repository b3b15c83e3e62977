//! Shared task primitives for the calendar engine.
//!
//! Everything that leaves the caller's stack goes through [`spawn`], tagged with a
//! [`TaskClass`] for tracing. [`GenerationToken`] scopes work to one engine
//! lifetime, and [`Debouncer`] models "at most one pending timer per purpose".

mod class;
mod schedule;
mod spawn;
mod token;

pub use class::TaskClass;
pub use schedule::{Debouncer, ScheduledTask, schedule};
pub use spawn::spawn;
pub use token::{GenerationClock, GenerationToken};
