//! Rules engine module: loads detection rules from YAML files and evaluates every
//! event against them.
//!
//! Rule files are YAML lists found anywhere under `rules_path` (`**/*.yaml`). Each
//! rule has a name, a condition tree over the fields of
//! [SecurityModel](secl_model::SecurityModel) and optional metadata:
//!
//! ```yaml
//! - name: shadow file read
//!   severity: high
//!   mitre_tactic: TA0006
//!   condition:
//!     type: Base
//!     content:
//!       field: open.file.path
//!       op: { type: Relational, content: { type: Equals } }
//!       value: !Value /etc/shadow
//! ```
//!
//! Rules referencing unknown fields, or mixing fields of different event types, are
//! rejected one by one; the others are loaded.

mod config;
mod engine;

pub use config::{Config, ConfigError, ModuleConfig};
pub use engine::{
    Metadata, RuleEngine, RuleEngineError, RuleMatch, UserRule, load_user_rules_from_dir,
};

pub const MODULE_NAME: &str = "rules-engine";

const DEFAULT_RULES_PATH: &str = "/var/lib/secl/rules";
