use std::collections::HashSet;

use regex::{Regex, RegexBuilder};
use serde::ser::{Serialize, SerializeMap, Serializer};

use super::Rule;
use crate::error::RuleSetError;

/// A rule together with its compiled, case-insensitive matcher.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    rule: Rule,
    regex: Regex,
}

impl CompiledRule {
    fn compile(rule: Rule) -> Result<Self, RuleSetError> {
        let regex = RegexBuilder::new(&rule.pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| RuleSetError::InvalidPattern {
                rule_id: rule.id.clone(),
                source,
            })?;
        Ok(Self { rule, regex })
    }

    pub fn id(&self) -> &str {
        &self.rule.id
    }

    pub fn pattern(&self) -> &str {
        &self.rule.pattern
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

/// Ordered, immutable collection of compiled rules.
///
/// Iteration order is the order rules appeared in their source; scan output
/// depends on it.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// Compile every rule, failing the whole set on the first duplicate id or
    /// invalid pattern.
    pub fn from_rules(rules: impl IntoIterator<Item = Rule>) -> Result<Self, RuleSetError> {
        let mut seen = HashSet::new();
        let mut compiled = Vec::new();
        for rule in rules {
            if !seen.insert(rule.id.clone()) {
                return Err(RuleSetError::DuplicateId { rule_id: rule.id });
            }
            compiled.push(CompiledRule::compile(rule)?);
        }
        Ok(Self { rules: compiled })
    }

    /// Convenience constructor from `(id, pattern)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, RuleSetError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::from_rules(pairs.into_iter().map(|(id, pattern)| Rule::new(id, pattern)))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompiledRule> {
        self.rules.iter()
    }

    pub fn get(&self, rule_id: &str) -> Option<&CompiledRule> {
        self.rules.iter().find(|rule| rule.id() == rule_id)
    }

    /// The id → pattern mapping in source order.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.rules
            .iter()
            .map(|rule| (rule.id().to_string(), rule.pattern().to_string()))
            .collect()
    }
}

/// Serializes as the same id → pattern mapping shape it is loaded from.
impl Serialize for RuleSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.rules.len()))?;
        for rule in &self.rules {
            map.serialize_entry(rule.id(), rule.pattern())?;
        }
        map.end()
    }
}
