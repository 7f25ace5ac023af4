use serde::{Deserialize, Serialize};
use strum::{Display, EnumDiscriminants, EnumIter, EnumString};

use crate::{ContainerContext, FileEvent, Process, ProcessContext, Resolved};

/// A decoded kernel event: one operation payload plus the context of the process
/// which performed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub payload: Payload,
    #[serde(default)]
    pub process_context: ProcessContext,
    #[serde(default)]
    pub container_context: ContainerContext,
}

impl Event {
    pub fn new(payload: Payload) -> Self {
        Self {
            payload,
            process_context: ProcessContext::default(),
            container_context: ContainerContext::default(),
        }
    }

    pub fn event_type(&self) -> EventType {
        EventType::from(&self.payload)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyscallEvent {
    pub retval: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapsetEvent {
    pub cap_effective: u64,
    pub cap_permitted: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChmodEvent {
    pub syscall: SyscallEvent,
    pub file: FileEvent,
    pub mode: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChownEvent {
    pub syscall: SyscallEvent,
    pub file: FileEvent,
    /// -1 leaves the owner unchanged.
    pub uid: i32,
    pub gid: i32,
    pub user: Resolved<String>,
    pub group: Resolved<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecEvent {
    pub process: Process,
    pub args: Resolved<Vec<String>>,
    pub args_truncated: bool,
    pub envs: Resolved<Vec<String>>,
    pub envs_truncated: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkEvent {
    pub syscall: SyscallEvent,
    pub source: FileEvent,
    pub target: FileEvent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MkdirEvent {
    pub syscall: SyscallEvent,
    pub file: FileEvent,
    pub mode: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenEvent {
    pub syscall: SyscallEvent,
    pub file: FileEvent,
    pub flags: u32,
    pub mode: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenameEvent {
    pub syscall: SyscallEvent,
    pub old: FileEvent,
    pub new: FileEvent,
}

/// Payload of rmdir, unlink and utimes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOperationEvent {
    pub syscall: SyscallEvent,
    pub file: FileEvent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetUidEvent {
    pub uid: u32,
    pub euid: u32,
    pub fsuid: u32,
    pub user: Resolved<String>,
    pub euser: Resolved<String>,
    pub fsuser: Resolved<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetGidEvent {
    pub gid: u32,
    pub egid: u32,
    pub fsgid: u32,
    pub group: Resolved<String>,
    pub egroup: Resolved<String>,
    pub fsgroup: Resolved<String>,
}

/// Payload of setxattr and removexattr.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XAttrEvent {
    pub syscall: SyscallEvent,
    pub file: FileEvent,
    /// Attribute name as copied from userspace, NUL terminated.
    pub name_raw: Vec<u8>,
    pub name: Resolved<String>,
    pub namespace: Resolved<String>,
}

impl XAttrEvent {
    /// Attribute name, up to the first NUL byte.
    pub fn decode_name(&self) -> String {
        let end = self
            .name_raw
            .iter()
            .position(|&byte| byte == 0)
            .unwrap_or(self.name_raw.len());
        String::from_utf8_lossy(&self.name_raw[..end]).into_owned()
    }

    /// Namespace of the attribute: the name up to the first dot.
    pub fn decode_namespace(&self) -> String {
        let name = self.decode_name();
        match name.split_once('.') {
            Some((namespace, _)) => namespace.to_string(),
            None => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, EnumDiscriminants)]
#[serde(tag = "type", content = "content", rename_all = "lowercase")]
#[strum_discriminants(derive(EnumString, Display, EnumIter, Hash))]
#[strum_discriminants(name(EventType))]
#[strum_discriminants(strum(serialize_all = "lowercase"))]
pub enum Payload {
    Capset(CapsetEvent),
    Chmod(ChmodEvent),
    Chown(ChownEvent),
    Exec(ExecEvent),
    Link(LinkEvent),
    Mkdir(MkdirEvent),
    Open(OpenEvent),
    RemoveXAttr(XAttrEvent),
    Rename(RenameEvent),
    Rmdir(FileOperationEvent),
    SetGid(SetGidEvent),
    SetUid(SetUidEvent),
    SetXAttr(XAttrEvent),
    Unlink(FileOperationEvent),
    Utimes(FileOperationEvent),
}

// Borrowing accessors return `None` for other payloads; the mutable ones switch the
// event to the requested payload, starting from a zeroed one.
macro_rules! payload_accessors {
    ($($variant:ident($ty:ty) => $get:ident, $get_mut:ident;)*) => {
        impl Payload {
            $(
                pub fn $get(&self) -> Option<&$ty> {
                    match self {
                        Payload::$variant(payload) => Some(payload),
                        _ => None,
                    }
                }

                pub fn $get_mut(&mut self) -> &mut $ty {
                    if !matches!(self, Payload::$variant(_)) {
                        *self = Payload::$variant(<$ty>::default());
                    }
                    match self {
                        Payload::$variant(payload) => payload,
                        _ => unreachable!(),
                    }
                }
            )*
        }
    };
}

payload_accessors! {
    Capset(CapsetEvent) => capset, capset_mut;
    Chmod(ChmodEvent) => chmod, chmod_mut;
    Chown(ChownEvent) => chown, chown_mut;
    Exec(ExecEvent) => exec, exec_mut;
    Link(LinkEvent) => link, link_mut;
    Mkdir(MkdirEvent) => mkdir, mkdir_mut;
    Open(OpenEvent) => open, open_mut;
    RemoveXAttr(XAttrEvent) => removexattr, removexattr_mut;
    Rename(RenameEvent) => rename, rename_mut;
    Rmdir(FileOperationEvent) => rmdir, rmdir_mut;
    SetGid(SetGidEvent) => setgid, setgid_mut;
    SetUid(SetUidEvent) => setuid, setuid_mut;
    SetXAttr(XAttrEvent) => setxattr, setxattr_mut;
    Unlink(FileOperationEvent) => unlink, unlink_mut;
    Utimes(FileOperationEvent) => utimes, utimes_mut;
}
