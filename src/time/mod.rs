//! The temporal algebra: durations, intervals, boolean windows and attributed spans.
pub mod duration;
pub mod interval;
pub mod spans;
pub mod windows;

pub use duration::{Duration, Timestamp};
pub use interval::{Inclusivity, Interval};
pub use spans::{Span, Spans};
pub use windows::Windows;
