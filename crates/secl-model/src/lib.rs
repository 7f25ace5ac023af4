//! The security event model evaluated by secl rules.
//!
//! [Event] carries one kernel operation payload (open, exec, chown...) with the
//! context of the process which performed it, including its lineage. Values the
//! kernel doesn't provide directly, like user names or file paths, are computed
//! on demand through [Resolvers] and stored in [Resolved] slots on the event.
//!
//! [SecurityModel] exposes the event as dotted fields to the evaluation runtime:
//!
//! ```text
//! open.file.path              string, resolved
//! open.file.inode             int
//! process.ancestors.uid       int array, one element per ancestor
//! container.id                string, valid for every event type
//! ```

mod event;
mod file;
mod model;
mod process;
mod registry;
mod resolved;
mod resolvers;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
#[cfg(test)]
mod tests;

pub use event::*;
pub use file::{FileEvent, FileFields};
pub use model::{ANCESTORS_ITERATOR, FieldInfo, SecurityModel};
pub use process::{
    ContainerContext, Credentials, Process, ProcessAncestorsIterator, ProcessCacheEntry,
    ProcessContext,
};
pub use resolved::Resolved;
pub use resolvers::Resolvers;
