use std::{fmt, fs, path::Path};

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use tracing::debug;

use super::{rule_set::RuleSet, Rule};
use crate::error::RuleSetError;

/// Serialization formats accepted for rule sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFormat {
    /// JSON object of rule id to pattern (reference format).
    Json,
    Json5,
    Yaml,
    /// One `id | pattern` per line; blank lines and `#` comments are skipped.
    Text,
}

impl RuleFormat {
    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, RuleSetError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match extension.as_str() {
            "json" => Ok(Self::Json),
            "json5" => Ok(Self::Json5),
            "yaml" | "yml" => Ok(Self::Yaml),
            "txt" => Ok(Self::Text),
            _ => Err(RuleSetError::UnsupportedFormat { extension }),
        }
    }
}

impl RuleSet {
    /// Load and compile the rule file at `path`, picking the format from its extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RuleSetError> {
        let path = path.as_ref();
        let format = RuleFormat::from_path(path)?;
        let raw = fs::read_to_string(path).map_err(|source| RuleSetError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let rules = Self::parse(&raw, format)?;
        debug!(path = %path.display(), rules = rules.len(), "loaded rule set");
        Ok(rules)
    }

    /// Parse and compile rules from an in-memory source.
    pub fn parse(source: &str, format: RuleFormat) -> Result<Self, RuleSetError> {
        let mapping = match format {
            RuleFormat::Json => serde_json::from_str::<RuleMapping>(source).map_err(parse_error)?,
            RuleFormat::Json5 => json5::from_str::<RuleMapping>(source).map_err(parse_error)?,
            RuleFormat::Yaml => serde_yaml::from_str::<RuleMapping>(source).map_err(parse_error)?,
            RuleFormat::Text => parse_text_rules(source)?,
        };
        Self::from_rules(mapping.0)
    }
}

fn parse_error(err: impl fmt::Display) -> RuleSetError {
    RuleSetError::Parse {
        message: err.to_string(),
    }
}

fn parse_text_rules(source: &str) -> Result<RuleMapping, RuleSetError> {
    let mut rules = Vec::new();
    for (idx, line) in source.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some((id, pattern)) = trimmed.split_once('|') else {
            return Err(RuleSetError::InvalidLine { line: idx + 1 });
        };
        let id = id.trim();
        if id.is_empty() {
            return Err(RuleSetError::InvalidLine { line: idx + 1 });
        }
        rules.push(Rule::new(id, pattern.trim()));
    }
    Ok(RuleMapping(rules))
}

/// Source-ordered mapping that keeps duplicate keys so they can be reported
/// instead of silently overwritten.
struct RuleMapping(Vec<Rule>);

impl<'de> Deserialize<'de> for RuleMapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RuleMappingVisitor)
    }
}

struct RuleMappingVisitor;

impl<'de> Visitor<'de> for RuleMappingVisitor {
    type Value = RuleMapping;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a mapping of rule id strings to pattern strings")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut rules = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((id, pattern)) = map.next_entry::<String, String>()? {
            rules.push(Rule::new(id, pattern));
        }
        Ok(RuleMapping(rules))
    }
}
