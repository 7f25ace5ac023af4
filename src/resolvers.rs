use std::path::Path;

use nix::unistd::{Gid, Group, Uid, User};
use secl_model::{ContainerContext, ExecEvent, FileEvent, Process, Resolvers};

/// [Resolvers] backed by the local host.
///
/// Users and groups come from the system databases. File names are derived from
/// the path decoded with the event, no lookup by inode is attempted. Everything
/// else resolves to an empty value.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostResolvers;

impl HostResolvers {
    fn path(file: &FileEvent) -> Option<&Path> {
        file.path.get().map(Path::new)
    }
}

impl Resolvers for HostResolvers {
    fn resolve_user(&self, uid: u32) -> String {
        match User::from_uid(Uid::from_raw(uid)) {
            Ok(Some(user)) => user.name,
            Ok(None) => String::new(),
            Err(err) => {
                log::debug!("Error resolving user {uid}: {err}");
                String::new()
            }
        }
    }

    fn resolve_group(&self, gid: u32) -> String {
        match Group::from_gid(Gid::from_raw(gid)) {
            Ok(Some(group)) => group.name,
            Ok(None) => String::new(),
            Err(err) => {
                log::debug!("Error resolving group {gid}: {err}");
                String::new()
            }
        }
    }

    fn resolve_file_path(&self, file: &FileEvent) -> String {
        log::trace!("No path for inode {}", file.fields.inode);
        String::new()
    }

    fn resolve_file_basename(&self, file: &FileEvent) -> String {
        Self::path(file)
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn resolve_file_container_path(&self, file: &FileEvent) -> String {
        file.path.get().cloned().unwrap_or_default()
    }

    fn resolve_file_filesystem(&self, _file: &FileEvent) -> String {
        String::new()
    }

    fn resolve_file_in_upper_layer(&self, _file: &FileEvent) -> bool {
        false
    }

    fn resolve_container_id(&self, _container: &ContainerContext) -> String {
        String::new()
    }

    fn resolve_process_ppid(&self, _process: &Process) -> u32 {
        0
    }

    fn resolve_process_tty(&self, _process: &Process) -> String {
        String::new()
    }

    fn resolve_exec_args(&self, _exec: &ExecEvent) -> Vec<String> {
        Vec::new()
    }

    fn resolve_exec_envs(&self, _exec: &ExecEvent) -> Vec<String> {
        Vec::new()
    }
}
