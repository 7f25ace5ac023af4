//! Implementation of the agent subcommands.

use std::{fs, path::Path, str::FromStr};

use anyhow::{Context as _, Result};
use rules_engine::{Config, RuleEngine, RuleMatch};
use secl_eval::{Context, FieldEventType, FieldValue, Model};
use secl_model::{Event, EventType, Resolvers, SecurityModel};

use crate::{
    cli::{AgentOpts, Commands},
    config::AgentConfig,
    resolvers::HostResolvers,
};

use self::term_print::TermPrintable;

mod term_print;

/// Rules matching one event of the input file.
#[derive(Debug, Clone)]
pub struct EventMatches {
    pub index: usize,
    pub event_type: EventType,
    pub matches: Vec<RuleMatch>,
}

/// Value of a field for one event of the input file.
#[derive(Debug, Clone)]
pub struct EventValue {
    pub index: usize,
    pub event_type: EventType,
    pub value: FieldValue,
}

pub fn run(options: &AgentOpts) -> Result<()> {
    log::trace!("Command received: {:?}", options.command);

    let config = match &options.config_file {
        Some(config_file) => AgentConfig::with_custom_file(config_file)?,
        None => AgentConfig::new()?,
    };

    match &options.command {
        Commands::Fields { event_type } => {
            let event_type = event_type
                .as_deref()
                .map(EventType::from_str)
                .transpose()
                .context("Unknown event type")?;

            list_fields(event_type).term_print()?;
        }
        Commands::Check { rules, events } => {
            let mut module_config = config.get_module_config(rules_engine::MODULE_NAME);
            if let Some(rules) = rules {
                module_config.insert("rules_path".to_string(), rules.display().to_string());
            }
            let engine_config = Config::try_from(&module_config)?;

            let engine = RuleEngine::new(&engine_config).with_context(|| {
                format!(
                    "Error loading rules from {}",
                    engine_config.rules_path.display()
                )
            })?;
            if !engine.rejected().is_empty() {
                engine.rejected().to_vec().term_print()?;
            }

            let events = read_events(events)?;
            check(&engine, &events, &HostResolvers).term_print()?;
        }
        Commands::Get { events, field } => {
            let events = read_events(events)?;
            get(&events, field, &HostResolvers)?.term_print()?;
        }
    }

    Ok(())
}

/// Fields usable with `event_type`, every field without filter.
pub fn list_fields(event_type: Option<EventType>) -> Vec<secl_model::FieldInfo> {
    SecurityModel
        .fields()
        .filter(|field| match (event_type, field.event_type) {
            (None, _) | (_, FieldEventType::Any) => true,
            (Some(wanted), FieldEventType::Only(event_type)) => wanted == event_type,
        })
        .collect()
}

/// Runs the engine over `events`, keeping only the events matched by some rule.
pub fn check(
    engine: &RuleEngine,
    events: &[Event],
    resolvers: &(dyn Resolvers + 'static),
) -> Vec<EventMatches> {
    events
        .iter()
        .enumerate()
        .filter_map(|(index, event)| {
            let matches = engine.process(event, resolvers);
            log::debug!("Event {index}: {} rules matched", matches.len());

            (!matches.is_empty()).then(|| EventMatches {
                index,
                event_type: event.event_type(),
                matches,
            })
        })
        .collect()
}

/// Reads `field` from every event.
pub fn get(
    events: &[Event],
    field: &str,
    resolvers: &(dyn Resolvers + 'static),
) -> Result<Vec<EventValue>> {
    let model = SecurityModel;
    model.get_field_type(field)?;

    events
        .iter()
        .enumerate()
        .map(|(index, event)| {
            let ctx: Context<'_, SecurityModel> = Context::new(event, resolvers);
            let value = model
                .get_value(&ctx, field)
                .with_context(|| format!("Error reading {field} from event {index}"))?;

            Ok(EventValue {
                index,
                event_type: event.event_type(),
                value,
            })
        })
        .collect()
}

fn read_events(path: &Path) -> Result<Vec<Event>> {
    let body = fs::read_to_string(path)
        .with_context(|| format!("Error reading events from {}", path.display()))?;
    let events: Vec<Event> = serde_json::from_str(&body)
        .with_context(|| format!("Error parsing events from {}", path.display()))?;

    log::debug!("Loaded {} events from {}", events.len(), path.display());
    Ok(events)
}
