use std::collections::HashMap;

use thiserror::Error;

use crate::{CompiledRule, Context, FieldEventType, Model, Rule, SeclError};

/// A rule refused by [Ruleset::compile].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("rule '{name}' rejected: {error}")]
pub struct RejectedRule {
    pub name: String,
    #[source]
    pub error: SeclError,
}

/// Set of compiled rules of a model `M`, each one carrying a payload `D`.
///
/// Rules are indexed by the event type they apply to: evaluating an event only
/// touches the rules of its type and the ones valid for any type, in loading order.
pub struct Ruleset<M: Model, D = ()> {
    rules: Vec<(CompiledRule<M>, D)>,
    by_event_type: HashMap<M::EventType, Vec<usize>>,
    any_event_type: Vec<usize>,
}

impl<M: Model> Ruleset<M> {
    /// Compile plain rules, without payload.
    pub fn from_rules(model: &M, rules: Vec<Rule>) -> (Self, Vec<RejectedRule>) {
        Self::compile(model, rules.into_iter().map(|rule| (rule, ())))
    }
}

impl<M: Model, D> Ruleset<M, D> {
    pub fn from_compiled(model: &M, rules: Vec<(CompiledRule<M>, D)>) -> Self {
        let mut by_event_type: HashMap<M::EventType, Vec<usize>> = model
            .get_event_types()
            .into_iter()
            .map(|event_type| (event_type, Vec::new()))
            .collect();
        let mut any_event_type = Vec::new();

        for (index, (rule, _)) in rules.iter().enumerate() {
            match rule.event_type() {
                FieldEventType::Any => {
                    any_event_type.push(index);
                    by_event_type
                        .values_mut()
                        .for_each(|indexes| indexes.push(index));
                }
                FieldEventType::Only(event_type) => {
                    by_event_type.entry(event_type).or_default().push(index);
                }
            }
        }

        Self {
            rules,
            by_event_type,
            any_event_type,
        }
    }

    /// Compile the given rules.
    ///
    /// Invalid rules are logged and returned alongside the ruleset, the others are
    /// loaded anyway.
    pub fn compile(
        model: &M,
        rules: impl IntoIterator<Item = (Rule, D)>,
    ) -> (Self, Vec<RejectedRule>) {
        let mut compiled = Vec::new();
        let mut rejected = Vec::new();

        for (rule, data) in rules {
            let name = rule.name.clone();
            match rule.compile(model) {
                Ok(rule) => compiled.push((rule, data)),
                Err(error) => {
                    log::warn!("Rule '{name}' rejected: {error}");
                    rejected.push(RejectedRule { name, error });
                }
            }
        }

        log::debug!("Loaded {} rules", compiled.len());

        (Self::from_compiled(model, compiled), rejected)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// All the rules, in loading order.
    pub fn rules(&self) -> impl Iterator<Item = (&CompiledRule<M>, &D)> {
        self.rules.iter().map(|(rule, data)| (rule, data))
    }

    /// Consumes the ruleset, returning the rules in loading order.
    pub fn into_rules(self) -> Vec<(CompiledRule<M>, D)> {
        self.rules
    }

    /// Rules which could match an event of `event_type`, in loading order.
    pub fn candidates(
        &self,
        event_type: M::EventType,
    ) -> impl Iterator<Item = (&CompiledRule<M>, &D)> {
        self.by_event_type
            .get(&event_type)
            .unwrap_or(&self.any_event_type)
            .iter()
            .map(|&index| {
                let (rule, data) = &self.rules[index];
                (rule, data)
            })
    }

    /// Evaluate the candidate rules of `event_type` and return the matching ones.
    pub fn matches<'r>(
        &'r self,
        event_type: M::EventType,
        ctx: &'r Context<'_, M>,
    ) -> impl Iterator<Item = (&'r CompiledRule<M>, &'r D)> {
        self.candidates(event_type)
            .filter(move |(rule, _)| rule.is_match(ctx))
    }
}
