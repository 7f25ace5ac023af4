use serde::{Deserialize, Serialize};

use crate::Resolved;

/// Raw identity of a file, as decoded from the kernel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileFields {
    pub inode: u64,
    pub mount_id: u32,
    pub mode: u16,
    pub uid: u32,
    pub gid: u32,
    pub user: Resolved<String>,
    pub group: Resolved<String>,
}

/// A file touched by an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEvent {
    pub fields: FileFields,
    pub path: Resolved<String>,
    pub basename: Resolved<String>,
    pub container_path: Resolved<String>,
    pub filesystem: Resolved<String>,
    pub in_upper_layer: Resolved<bool>,
}

impl FileEvent {
    pub fn new(inode: u64, mount_id: u32) -> Self {
        Self {
            fields: FileFields {
                inode,
                mount_id,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn with_mode(mut self, mode: u16) -> Self {
        self.fields.mode = mode;
        self
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.path = Resolved::with_value(path.to_string());
        self
    }
}
