use std::{env, ffi::OsString, path::PathBuf};

use clap::{ArgAction, Parser, Subcommand};

pub const NAME: &str = "secl-agent";

#[derive(Parser, Debug, Clone)]
#[clap(name = NAME)]
#[clap(about = "Evaluate security rules over kernel events")]
#[clap(version)]
pub struct AgentOpts {
    /// Configuration file, an INI file with one section per module
    #[clap(long, global = true)]
    pub config_file: Option<String>,

    /// Pass many times for a more verbose output. Passing `-v` adds debug logs, `-vv` enables trace logging
    #[clap(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// List the fields available to rules
    Fields {
        /// Only show the fields valid for this event type
        #[clap(long)]
        event_type: Option<String>,
    },

    /// Evaluate the rules over the events of a JSON file
    Check {
        /// Rules directory, overrides `rules-engine.rules_path`
        #[clap(long)]
        rules: Option<PathBuf>,

        /// JSON file holding a list of events
        events: PathBuf,
    },

    /// Print the value of a field for every event of a JSON file
    Get {
        /// JSON file holding a list of events
        events: PathBuf,

        field: String,
    },
}

impl AgentOpts {
    pub fn override_log_level(&self) -> log::Level {
        log_level_from_verbosity_flag_count(self.verbose)
    }
}

pub fn parse_from_args() -> AgentOpts {
    parse_from(&mut std::env::args_os())
}

pub fn parse_from<I, T>(args: I) -> AgentOpts
where
    I: Iterator<Item = T>,
    T: Into<OsString> + Clone,
{
    AgentOpts::try_parse_from(args).unwrap_or_else(|e| e.exit())
}

fn log_level_from_verbosity_flag_count(num: u8) -> log::Level {
    match num {
        u8::MIN..=0 => log::Level::Info,
        1 => log::Level::Debug,
        2..=u8::MAX => log::Level::Trace,
    }
}

fn show_backtrace() -> bool {
    if log::max_level() >= log::LevelFilter::Debug {
        return true;
    }

    if let Ok(true) = env::var("RUST_BACKTRACE").map(|s| s == "1") {
        return true;
    }

    false
}

pub fn report_error(e: &anyhow::Error) {
    // One line per error chain unless debugging, where the full report with
    // causes is printed.
    if show_backtrace() {
        log::error!("{:?}", e);
    } else {
        log::error!("{:#}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_command() {
        let opts = parse_from(
            ["secl-agent", "check", "--rules", "/tmp/rules", "events.json", "-vv"].into_iter(),
        );
        assert_eq!(opts.override_log_level(), log::Level::Trace);
        assert!(matches!(
            opts.command,
            Commands::Check { rules: Some(rules), events }
                if rules == PathBuf::from("/tmp/rules") && events == PathBuf::from("events.json")
        ));
    }

    #[test]
    fn verbosity() {
        assert_eq!(log_level_from_verbosity_flag_count(0), log::Level::Info);
        assert_eq!(log_level_from_verbosity_flag_count(1), log::Level::Debug);
        assert_eq!(log_level_from_verbosity_flag_count(5), log::Level::Trace);
    }

    #[test]
    fn missing_subcommand() {
        assert!(AgentOpts::try_parse_from(["secl-agent"]).is_err());
        assert!(AgentOpts::try_parse_from(["secl-agent", "get", "events.json"]).is_err());
    }
}
