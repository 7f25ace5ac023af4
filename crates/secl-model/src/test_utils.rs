//! Deterministic resolvers and event builders for tests.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::{
    ContainerContext, Event, ExecEvent, FileEvent, OpenEvent, Payload, Process,
    ProcessCacheEntry, ProcessContext, Resolvers,
};

/// [Resolvers] returning values derived from their input, counting every call.
///
/// * users and groups: `root` for id 0, `user<uid>` and `group<gid>` otherwise
/// * files: `/tmp/file<inode>`, on `ext4`, never in an upper layer
/// * processes: ppid 1, tty `pts/0`
/// * exec arguments: the command name
#[derive(Debug, Default)]
pub struct CountingResolvers {
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl CountingResolvers {
    pub fn new() -> Self {
        Self::default()
    }

    fn count(&self, resolver: &'static str) {
        *self.calls.lock().unwrap().entry(resolver).or_default() += 1;
    }

    /// Calls of a single resolver, named after the method without the `resolve_` prefix.
    pub fn calls(&self, resolver: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(resolver)
            .copied()
            .unwrap_or_default()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

impl Resolvers for CountingResolvers {
    fn resolve_user(&self, uid: u32) -> String {
        self.count("user");
        match uid {
            0 => "root".to_string(),
            uid => format!("user{uid}"),
        }
    }

    fn resolve_group(&self, gid: u32) -> String {
        self.count("group");
        match gid {
            0 => "root".to_string(),
            gid => format!("group{gid}"),
        }
    }

    fn resolve_file_path(&self, file: &FileEvent) -> String {
        self.count("file_path");
        format!("/tmp/file{}", file.fields.inode)
    }

    fn resolve_file_basename(&self, file: &FileEvent) -> String {
        self.count("file_basename");
        format!("file{}", file.fields.inode)
    }

    fn resolve_file_container_path(&self, file: &FileEvent) -> String {
        self.count("file_container_path");
        format!("/tmp/file{}", file.fields.inode)
    }

    fn resolve_file_filesystem(&self, _file: &FileEvent) -> String {
        self.count("file_filesystem");
        "ext4".to_string()
    }

    fn resolve_file_in_upper_layer(&self, _file: &FileEvent) -> bool {
        self.count("file_in_upper_layer");
        false
    }

    fn resolve_container_id(&self, _container: &ContainerContext) -> String {
        self.count("container_id");
        String::new()
    }

    fn resolve_process_ppid(&self, _process: &Process) -> u32 {
        self.count("process_ppid");
        1
    }

    fn resolve_process_tty(&self, _process: &Process) -> String {
        self.count("process_tty");
        "pts/0".to_string()
    }

    fn resolve_exec_args(&self, exec: &ExecEvent) -> Vec<String> {
        self.count("exec_args");
        vec![exec.process.comm.clone()]
    }

    fn resolve_exec_envs(&self, _exec: &ExecEvent) -> Vec<String> {
        self.count("exec_envs");
        vec!["PATH=/usr/bin".to_string()]
    }
}

/// An open event on a file with `inode` and `mode`.
pub fn open_event(inode: u64, mode: u16) -> Event {
    Event::new(Payload::Open(OpenEvent {
        file: FileEvent::new(inode, 1).with_mode(mode),
        ..Default::default()
    }))
}

/// An exec event of the command `comm`.
pub fn exec_event(comm: &str) -> Event {
    let mut exec = ExecEvent::default();
    exec.process.comm = comm.to_string();
    Event::new(Payload::Exec(exec))
}

pub fn process_entry(pid: u32) -> ProcessCacheEntry {
    let mut process = Process {
        comm: format!("proc{pid}"),
        ..Default::default()
    };
    process.credentials.uid = pid;

    ProcessCacheEntry {
        process_context: ProcessContext {
            pid,
            tid: pid,
            process,
            ancestor: None,
        },
        ..Default::default()
    }
}

/// Chain of [process_entry], nearest ancestor first.
pub fn lineage(pids: &[u32]) -> Option<Arc<ProcessCacheEntry>> {
    pids.iter().rev().fold(None, |older, &pid| {
        let mut entry = process_entry(pid);
        entry.process_context.ancestor = older;
        Some(Arc::new(entry))
    })
}

/// Sets the event process to `pid`, with the ancestors `pids` (nearest first).
pub fn with_lineage(mut event: Event, pid: u32, pids: &[u32]) -> Event {
    event.process_context.pid = pid;
    event.process_context.tid = pid;
    event.process_context.ancestor = lineage(pids);
    event
}
