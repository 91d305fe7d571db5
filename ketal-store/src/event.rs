//! Change notifications emitted by stores.

use std::fmt;

use futures_util::stream::BoxStream;

use crate::error::Result;

/// Kind of change observed on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Added,
    Modified,
    Deleted,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventType::Added => "added",
            EventType::Modified => "modified",
            EventType::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

/// A change to a single record.
///
/// Events carry only the record name. Consumers re-read the record from the
/// store instead of trusting a payload that may already be stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub event_type: EventType,
    pub name: String,
}

impl WatchEvent {
    pub fn new(event_type: EventType, name: impl Into<String>) -> Self {
        Self {
            event_type,
            name: name.into(),
        }
    }
}

/// Stream of change events for one record kind.
pub type WatchStream = BoxStream<'static, Result<WatchEvent>>;
