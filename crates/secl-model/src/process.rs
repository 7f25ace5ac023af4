use std::sync::Arc;

use secl_eval::{Context, FieldIterator};
use serde::{Deserialize, Serialize};

use crate::{FileEvent, Resolved, SecurityModel};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub uid: u32,
    pub gid: u32,
    pub euid: u32,
    pub egid: u32,
    pub fsuid: u32,
    pub fsgid: u32,
    pub cap_effective: u64,
    pub cap_permitted: u64,
    pub user: Resolved<String>,
    pub group: Resolved<String>,
    pub euser: Resolved<String>,
    pub egroup: Resolved<String>,
    pub fsuser: Resolved<String>,
    pub fsgroup: Resolved<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Process {
    /// The executable.
    pub file: FileEvent,
    pub comm: String,
    pub cookie: u32,
    pub ppid: Resolved<u32>,
    pub tty_name: Resolved<String>,
    pub credentials: Credentials,
}

/// The process which triggered an event, with its lineage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessContext {
    pub pid: u32,
    pub tid: u32,
    pub process: Process,
    /// Immediate parent. Each entry links to the next, older one.
    pub ancestor: Option<Arc<ProcessCacheEntry>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerContext {
    pub id: Resolved<String>,
}

/// Snapshot of an ancestor process.
///
/// Entries are shared between the events of the same lineage and never
/// modified by rule evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessCacheEntry {
    pub process_context: ProcessContext,
    pub container_context: ContainerContext,
}

impl ProcessCacheEntry {
    pub fn ancestor(&self) -> Option<&Arc<ProcessCacheEntry>> {
        self.process_context.ancestor.as_ref()
    }
}

/// Walks the lineage of the event process, from the immediate parent to the
/// oldest tracked ancestor.
#[derive(Default)]
pub struct ProcessAncestorsIterator {
    next: Option<Arc<ProcessCacheEntry>>,
}

impl FieldIterator<SecurityModel> for ProcessAncestorsIterator {
    fn front(&mut self, ctx: &Context<'_, SecurityModel>) -> Option<Arc<ProcessCacheEntry>> {
        let first = ctx.event().process_context.ancestor.clone();
        self.next = first.as_ref().and_then(|entry| entry.ancestor().cloned());
        first
    }

    fn next(&mut self) -> Option<Arc<ProcessCacheEntry>> {
        let current = self.next.take()?;
        self.next = current.ancestor().cloned();
        Some(current)
    }
}

/// Collect `extract` over every ancestor of the event in `ctx`, nearest first.
pub(crate) fn collect_ancestors<T>(
    ctx: &Context<'_, SecurityModel>,
    extract: impl Fn(&ProcessCacheEntry) -> T,
) -> Vec<T> {
    let mut iterator = ProcessAncestorsIterator::default();
    let mut values = Vec::new();

    let mut current = iterator.front(ctx);
    while let Some(entry) = current {
        values.push(extract(&entry));
        current = FieldIterator::next(&mut iterator);
    }

    values
}
