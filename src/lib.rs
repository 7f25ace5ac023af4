//! `secl-agent` evaluates security rules over kernel events.
//!
//! Rules are YAML files loaded by the [rules engine](rules_engine), compiled
//! against the fields of [SecurityModel](secl_model::SecurityModel) by
//! [secl_eval]. The agent feeds them with events read from JSON files:
//!
//! ```sh
//! # Fields usable in rules about exec events
//! secl-agent fields --event-type exec
//!
//! # Rules matching each event
//! secl-agent check --rules /var/lib/secl/rules events.json
//!
//! # Value of a field for each event
//! secl-agent get events.json process.ancestors.comm
//! ```
//!
//! Configuration is an `INI` file, see [config::AgentConfig]. The `rules-engine`
//! section is described by [rules_engine::Config].

pub mod agent;
pub mod cli;
pub mod config;
pub mod resolvers;

pub mod metadata {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}

/// Init logger. We log from info level and above, hide timestamp
/// and module path.
/// If RUST_LOG is set, we assume the user wants to debug something
/// and use env_logger default behaviour.
pub fn init_logger(override_log_level: Option<log::LevelFilter>) {
    if std::env::var_os("RUST_LOG").is_some() {
        env_logger::init();
    } else {
        let level_filter = override_log_level.unwrap_or(log::LevelFilter::Info);

        env_logger::builder()
            .filter_level(level_filter)
            .format_timestamp(None)
            .format_target(false)
            .init();
    }
}
