use std::{collections::HashSet, fs, path::Path};

use glob::glob;
use secl_eval::{
    Condition, Context, FieldEventType, FieldValue, Model, RejectedRule, Rule, Ruleset,
};
use secl_model::{Event, Resolvers, SecurityModel};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;

const RULE_EXTENSION: &str = "yaml";

/// A rule as written in the rule files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRule {
    pub name: String,
    pub condition: Condition,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub mitre_tactic: Option<String>,
    #[serde(default)]
    pub mitre_technique: Option<String>,
}

impl UserRule {
    fn into_rule(self) -> (Rule, Metadata) {
        (
            Rule {
                name: self.name,
                condition: self.condition,
            },
            Metadata {
                category: self.category,
                description: self.description,
                severity: self.severity,
                mitre_tactic: self.mitre_tactic,
                mitre_technique: self.mitre_technique,
            },
        )
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Metadata {
    pub category: Option<String>,
    pub description: Option<String>,
    pub severity: Option<String>,
    pub mitre_tactic: Option<String>,
    pub mitre_technique: Option<String>,
}

/// Describes Rule Engine error.
#[allow(clippy::enum_variant_names)]
#[derive(Error, Debug)]
pub enum RuleEngineError {
    #[error("Error listing rules: {0}")]
    RuleListing(#[from] glob::PatternError),
    #[error("Error reading rule: {name}")]
    RuleLoading {
        name: String,
        #[source]
        error: std::io::Error,
    },
    #[error("Error parsing rule file: {filename}")]
    RuleParsing {
        filename: String,
        #[source]
        error: serde_yaml::Error,
    },
    #[error("Rule '{0}' defined more than once")]
    DuplicateRule(String),
}

/// A rule matching an event, with the values of the fields it references.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleMatch {
    pub rule_name: String,
    pub metadata: Metadata,
    pub values: Vec<(String, FieldValue)>,
}

/// Evaluates every event against the rules loaded from the rules directory.
pub struct RuleEngine {
    ruleset: Ruleset<SecurityModel, Metadata>,
    rejected: Vec<RejectedRule>,
    config: Config,
}

impl RuleEngine {
    pub fn new(config: &Config) -> Result<Self, RuleEngineError> {
        let user_rules = load_user_rules_from_dir(&config.rules_path)?;
        Self::from_user_rules(user_rules, config)
    }

    /// Build the engine from already parsed rules.
    ///
    /// Rules which fail compilation are rejected one by one, see [RuleEngine::rejected].
    /// Rules bound to a disabled event type are skipped.
    pub fn from_user_rules(
        user_rules: Vec<UserRule>,
        config: &Config,
    ) -> Result<Self, RuleEngineError> {
        let mut names = HashSet::new();
        for rule in &user_rules {
            if !names.insert(rule.name.as_str()) {
                return Err(RuleEngineError::DuplicateRule(rule.name.clone()));
            }
        }

        let model = SecurityModel;
        let (ruleset, rejected) = Ruleset::compile(
            &model,
            user_rules.into_iter().map(UserRule::into_rule),
        );

        let enabled = ruleset
            .into_rules()
            .into_iter()
            .filter(|(rule, _)| match rule.event_type() {
                FieldEventType::Only(event_type) if !config.is_enabled(event_type) => {
                    log::debug!("Rule '{}' skipped: {event_type} is disabled", rule.name);
                    false
                }
                _ => true,
            })
            .collect();
        let ruleset = Ruleset::from_compiled(&model, enabled);

        Ok(Self {
            ruleset,
            rejected,
            config: config.clone(),
        })
    }

    pub fn ruleset(&self) -> &Ruleset<SecurityModel, Metadata> {
        &self.ruleset
    }

    /// Rules refused at loading time.
    pub fn rejected(&self) -> &[RejectedRule] {
        &self.rejected
    }

    /// Evaluates `event` and returns the matching rules, in loading order.
    pub fn process(&self, event: &Event, resolvers: &(dyn Resolvers + 'static)) -> Vec<RuleMatch> {
        let event_type = event.event_type();
        if !self.config.is_enabled(event_type) {
            return Vec::new();
        }

        let model = SecurityModel;
        let ctx: Context<'_, SecurityModel> =
            Context::new(event, resolvers).with_scalar_cache(self.config.scalar_cache);

        self.ruleset
            .matches(event_type, &ctx)
            .map(|(rule, metadata)| {
                log::trace!("Rule '{}' matched {event_type} event", rule.name);

                let values = rule
                    .fields()
                    .iter()
                    .filter_map(|field| {
                        model
                            .get_value(&ctx, field)
                            .ok()
                            .map(|value| (field.clone(), value))
                    })
                    .collect();

                RuleMatch {
                    rule_name: rule.name.clone(),
                    metadata: metadata.clone(),
                    values,
                }
            })
            .collect()
    }
}

pub fn load_user_rules_from_dir(rules_path: &Path) -> Result<Vec<UserRule>, RuleEngineError> {
    let mut rule_files = Vec::new();

    let expr = format!("{}/**/*.{}", rules_path.display(), RULE_EXTENSION);
    let entries = glob(&expr)?;
    for path in entries.flatten() {
        let rule_file = RuleFile::from(&path)?;
        rule_files.push(rule_file);
    }

    let rules = rule_files
        .into_iter()
        .map(|rule_file| {
            serde_yaml::from_str::<Vec<UserRule>>(&rule_file.body).map_err(|error| {
                RuleEngineError::RuleParsing {
                    filename: rule_file.path,
                    error,
                }
            })
        })
        .collect::<Result<Vec<Vec<UserRule>>, RuleEngineError>>()?;

    Ok(rules.into_iter().flatten().collect())
}

#[derive(Debug, Clone)]
struct RuleFile {
    path: String,
    body: String,
}

impl RuleFile {
    pub fn from(path: &Path) -> Result<Self, RuleEngineError> {
        log::debug!("loading rule {}", path.display());
        let body = fs::read_to_string(path).map_err(|error| RuleEngineError::RuleLoading {
            name: path.display().to_string(),
            error,
        })?;
        let path = path.display().to_string();
        Ok(Self { path, body })
    }
}
