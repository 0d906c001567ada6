//! Actors for watch mode.
//!
//! ```text
//! FsActor ──BuilderMsg──► BuilderActor
//! (notify, debounce)      (owns the Engine, one event at a time)
//! ```
//!
//! - `messages` - message types between actors
//! - `fs` - filesystem watcher with debouncing and classification
//! - `builder` - single writer over the engine
//! - `coordinator` - wires up and runs the actors

pub mod builder;
pub mod coordinator;
pub mod fs;
pub mod messages;

pub use coordinator::Coordinator;
