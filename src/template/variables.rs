//! Variable schemas, presets and resolution.
//!
//! Resolution only ever yields values for variables in the schema, and every declared variable
//! gets a value: a valid candidate, else the first option (choices) or an empty default.

use std::collections::BTreeMap;

use crate::foundation::error::{LookupKind, TopotrackError, TopotrackResult};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum VarValue {
    Toggle(bool),
    Number(f64),
    Text(String),
}

impl VarValue {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }
}

impl std::fmt::Display for VarValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Toggle(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Candidate values keyed by variable name.
pub type VariableValues = BTreeMap<String, VarValue>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VariableKind {
    Text,
    Number,
    Toggle,
    Choice { options: Vec<String> },
}

impl VariableKind {
    pub fn choice<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Choice {
            options: options.into_iter().map(Into::into).collect(),
        }
    }

    fn default_value(&self) -> VarValue {
        match self {
            Self::Text => VarValue::Text(String::new()),
            Self::Number => VarValue::Number(0.0),
            Self::Toggle => VarValue::Toggle(false),
            Self::Choice { options } => {
                VarValue::Text(options.first().cloned().unwrap_or_default())
            }
        }
    }

    /// Normalized value if `v` is acceptable for this kind. Text is coerced for numbers and
    /// toggles so string-only callers (CLI, query strings) work.
    fn accept(&self, v: &VarValue) -> Option<VarValue> {
        match (self, v) {
            (Self::Text, VarValue::Text(s)) => Some(VarValue::Text(s.clone())),
            (Self::Number, VarValue::Number(n)) if n.is_finite() => Some(VarValue::Number(*n)),
            (Self::Number, VarValue::Text(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(VarValue::Number),
            (Self::Toggle, VarValue::Toggle(b)) => Some(VarValue::Toggle(*b)),
            (Self::Toggle, VarValue::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Some(VarValue::Toggle(true)),
                "false" | "no" | "off" | "0" => Some(VarValue::Toggle(false)),
                _ => None,
            },
            (Self::Choice { options }, VarValue::Text(s)) if options.contains(s) => {
                Some(VarValue::Text(s.clone()))
            }
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariableSpec {
    pub name: String,
    pub label: String,
    pub kind: VariableKind,
}

impl VariableSpec {
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: VariableKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
        }
    }
}

/// A named bundle of variable values.
#[derive(Clone, Debug, PartialEq)]
pub struct Preset {
    pub name: String,
    pub values: VariableValues,
}

impl Preset {
    pub fn new<I, K>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = (K, VarValue)>,
        K: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Fully resolved values, one per declared variable.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolvedVariables {
    values: VariableValues,
}

impl ResolvedVariables {
    pub fn get(&self, name: &str) -> TopotrackResult<&VarValue> {
        self.values
            .get(name)
            .ok_or_else(|| TopotrackError::not_found(LookupKind::Variable, name))
    }

    pub fn text(&self, name: &str) -> TopotrackResult<&str> {
        match self.get(name)? {
            VarValue::Text(s) => Ok(s),
            other => Err(TopotrackError::validation(format!(
                "variable '{name}' is not text ({other})"
            ))),
        }
    }

    pub fn number(&self, name: &str) -> TopotrackResult<f64> {
        match self.get(name)? {
            VarValue::Number(n) => Ok(*n),
            other => Err(TopotrackError::validation(format!(
                "variable '{name}' is not a number ({other})"
            ))),
        }
    }

    pub fn toggle(&self, name: &str) -> TopotrackResult<bool> {
        match self.get(name)? {
            VarValue::Toggle(b) => Ok(*b),
            other => Err(TopotrackError::validation(format!(
                "variable '{name}' is not a toggle ({other})"
            ))),
        }
    }

    pub fn values(&self) -> &VariableValues {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

pub fn resolve(specs: &[VariableSpec], candidates: &VariableValues) -> ResolvedVariables {
    let values = specs
        .iter()
        .map(|spec| {
            let value = match candidates.get(&spec.name) {
                Some(v) => spec.kind.accept(v).unwrap_or_else(|| {
                    tracing::debug!(variable = %spec.name, value = %v, "rejected variable value");
                    spec.kind.default_value()
                }),
                None => spec.kind.default_value(),
            };
            (spec.name.clone(), value)
        })
        .collect();
    ResolvedVariables { values }
}

/// Resolve a preset's values; missing or invalid entries fall back like any other candidate.
pub fn apply_preset(
    specs: &[VariableSpec],
    presets: &[Preset],
    preset_name: &str,
) -> TopotrackResult<ResolvedVariables> {
    let preset = presets
        .iter()
        .find(|p| p.name == preset_name)
        .ok_or_else(|| TopotrackError::not_found(LookupKind::Preset, preset_name))?;
    Ok(resolve(specs, &preset.values))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Vec<VariableSpec> {
        vec![
            VariableSpec::new("theme", "Theme", VariableKind::choice(["Dark", "Light"])),
            VariableSpec::new("title", "Title", VariableKind::Text),
            VariableSpec::new("line_width", "Line width", VariableKind::Number),
            VariableSpec::new("show_stats", "Show stats", VariableKind::Toggle),
        ]
    }

    fn values(pairs: &[(&str, VarValue)]) -> VariableValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn empty_candidates_resolve_to_defaults() {
        let r = resolve(&schema(), &VariableValues::new());
        assert_eq!(r.len(), 4);
        assert_eq!(r.text("theme").unwrap(), "Dark");
        assert_eq!(r.text("title").unwrap(), "");
        assert_eq!(r.number("line_width").unwrap(), 0.0);
        assert!(!r.toggle("show_stats").unwrap());
    }

    #[test]
    fn valid_values_are_kept_and_invalid_replaced() {
        let r = resolve(
            &schema(),
            &values(&[
                ("theme", VarValue::text("Neon")),
                ("title", VarValue::text("Sunday loop")),
                ("line_width", VarValue::text("6.5")),
                ("show_stats", VarValue::text("yes")),
            ]),
        );
        assert_eq!(r.text("theme").unwrap(), "Dark");
        assert_eq!(r.text("title").unwrap(), "Sunday loop");
        assert_eq!(r.number("line_width").unwrap(), 6.5);
        assert!(r.toggle("show_stats").unwrap());
    }

    #[test]
    fn stale_values_are_dropped() {
        let r = resolve(&schema(), &values(&[("accent", VarValue::text("Orange"))]));
        assert!(r.get("accent").unwrap_err().is_not_found());
        assert!(!r.values().contains_key("accent"));
    }

    #[test]
    fn preset_missing_a_variable_falls_back() {
        let presets = vec![Preset::new("Paper", [("theme", VarValue::text("Light"))])];
        let r = apply_preset(&schema(), &presets, "Paper").unwrap();
        assert_eq!(r.text("theme").unwrap(), "Light");
        assert_eq!(r.text("title").unwrap(), "");
        assert_eq!(r.len(), 4);
    }

    #[test]
    fn presets_cannot_bypass_options() {
        let presets = vec![Preset::new("Bad", [("theme", VarValue::text("Sepia"))])];
        let r = apply_preset(&schema(), &presets, "Bad").unwrap();
        assert_eq!(r.text("theme").unwrap(), "Dark");
        assert!(apply_preset(&schema(), &presets, "Nope").unwrap_err().is_not_found());
    }

    #[test]
    fn untagged_json_values() {
        let v: VariableValues =
            serde_json::from_str(r#"{ "a": true, "b": 2.5, "c": "Dark" }"#).unwrap();
        assert_eq!(v["a"], VarValue::Toggle(true));
        assert_eq!(v["b"], VarValue::Number(2.5));
        assert_eq!(v["c"], VarValue::text("Dark"));
    }
}
