use crate::{ContainerContext, ExecEvent, FileEvent, Process};

/// Backends turning raw kernel values into human readable ones.
///
/// Resolvers never fail: when a value can't be computed they return a best-effort
/// one, usually empty. The engine decides whether a result is stored on the event,
/// implementations don't need to cache.
pub trait Resolvers: Send + Sync {
    fn resolve_user(&self, uid: u32) -> String;

    fn resolve_group(&self, gid: u32) -> String;

    /// Full path of the file.
    fn resolve_file_path(&self, file: &FileEvent) -> String;

    fn resolve_file_basename(&self, file: &FileEvent) -> String;

    /// Path of the file inside its container.
    fn resolve_file_container_path(&self, file: &FileEvent) -> String;

    /// Type of the filesystem the file lives on.
    fn resolve_file_filesystem(&self, file: &FileEvent) -> String;

    /// Whether the file lives in the upper layer of an overlay filesystem.
    fn resolve_file_in_upper_layer(&self, file: &FileEvent) -> bool;

    fn resolve_container_id(&self, container: &ContainerContext) -> String;

    fn resolve_process_ppid(&self, process: &Process) -> u32;

    fn resolve_process_tty(&self, process: &Process) -> String;

    fn resolve_exec_args(&self, exec: &ExecEvent) -> Vec<String>;

    fn resolve_exec_envs(&self, exec: &ExecEvent) -> Vec<String>;
}
