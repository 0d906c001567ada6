//! Actor message definitions.
//!
//! ```text
//! FsActor --Events--> BuilderActor
//! Coordinator --Shutdown--> BuilderActor
//! ```

use crate::engine::WatchEvent;

/// Messages to the builder actor.
#[derive(Debug)]
pub enum BuilderMsg {
    /// Classified changes, in processing order.
    Events(Vec<WatchEvent>),
    /// Finish the in-flight batch, release plugins and stop.
    Shutdown,
}
