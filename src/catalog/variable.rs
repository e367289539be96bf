//! Variable definitions from data dictionaries and variable reports.

use serde::{Deserialize, Serialize};

use crate::study::RecordType;

/// Declared type of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableType {
    Categorical,
    String,
    Integer,
    Decimal,
    Unknown,
}

impl VariableType {
    /// Map one of dbGaP's type spellings (`encoded value`, `enum_integer`,
    /// `integer`, `decimal, encoded value`, ...) onto a variable type.
    pub fn from_declared(declared: &str) -> VariableType {
        let t = declared.trim().to_ascii_lowercase();
        if t.contains("encoded") || t.starts_with("enum") {
            VariableType::Categorical
        } else if t.starts_with("int") {
            VariableType::Integer
        } else if t.starts_with("decimal") || t.starts_with("float") || t.starts_with("num") {
            VariableType::Decimal
        } else if t == "string" {
            VariableType::String
        } else {
            VariableType::Unknown
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VariableType::Categorical => "categorical",
            VariableType::String => "string",
            VariableType::Integer => "integer",
            VariableType::Decimal => "decimal",
            VariableType::Unknown => "unknown",
        }
    }

    /// First spelling that maps to a known type, in priority order.
    pub fn first_known<'a>(declared: impl IntoIterator<Item = Option<&'a str>>) -> VariableType {
        declared
            .into_iter()
            .flatten()
            .map(VariableType::from_declared)
            .find(|t| *t != VariableType::Unknown)
            .unwrap_or(VariableType::Unknown)
    }
}

/// One entry of a coded-value table, or one enumerated/example value of a
/// variable report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodedValue {
    pub code: Option<String>,
    pub label: String,
    pub count: Option<u64>,
}

/// Summary statistics block of a variable report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub n: Option<u64>,
    pub nulls: Option<u64>,
    pub mean: Option<String>,
    pub median: Option<String>,
    pub min: Option<String>,
    pub max: Option<String>,
    pub sd: Option<String>,
    /// Enumerated value+count pairs.
    pub values: Vec<CodedValue>,
    pub examples: Vec<CodedValue>,
}

/// One column/trait of a data dictionary. Immutable once in a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableDefinition {
    /// Globally unique schema id, e.g. `phv00169061.v7` or
    /// `phv00169061.v7.p2.c1`.
    pub id: String,
    /// Display name without any consent suffix.
    pub name: String,
    /// `""` for the pooled definition, `.c<N>` for a consent group.
    pub consent_suffix: String,
    pub record_type: RecordType,
    pub description: Option<String>,
    pub var_type: VariableType,
    pub unit: Option<String>,
    pub comment: Option<String>,
    /// Code → label table for categorical variables.
    pub coded_values: Vec<CodedValue>,
    pub stats: Option<SummaryStats>,
    /// Other names this variable is indexed under.
    pub aliases: Vec<String>,
}

impl VariableDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>, record_type: RecordType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            consent_suffix: String::new(),
            record_type,
            description: None,
            var_type: VariableType::Unknown,
            unit: None,
            comment: None,
            coded_values: Vec::new(),
            stats: None,
            aliases: Vec::new(),
        }
    }

    pub fn with_type(mut self, var_type: VariableType) -> Self {
        self.var_type = var_type;
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn is_pooled(&self) -> bool {
        self.consent_suffix.is_empty()
    }

    /// Label for a coded value, if the code is in the table.
    pub fn label_for(&self, code: &str) -> Option<&str> {
        self.coded_values
            .iter()
            .find(|cv| cv.code.as_deref() == Some(code))
            .map(|cv| cv.label.as_str())
    }
}

/// Split a trailing `.c<digits>` off `s`: `("SEX", ".c1")` for `SEX.c1`,
/// `(s, "")` otherwise.
pub fn split_consent_suffix(s: &str) -> (&str, &str) {
    if let Some(pos) = s.rfind(".c") {
        let digits = &s[pos + 2..];
        if pos > 0 && !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            return (&s[..pos], &s[pos..]);
        }
    }
    (s, "")
}

/// Accept `c1`, `.c1` or `""`; return `.c1` or `""`.
pub fn normalize_consent(consent: &str) -> String {
    let c = consent.trim().trim_start_matches('.');
    if c.is_empty() { String::new() } else { format!(".{c}") }
}

/// `phv00169061.v7.p2.c1` → `phv00169061.v7`.
pub fn base_variable_id(id: &str) -> &str {
    let mut parts = id.splitn(3, '.');
    match (parts.next(), parts.next()) {
        (Some(phv), Some(version)) if version.starts_with('v') => &id[..phv.len() + 1 + version.len()],
        _ => id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_consent_suffix() {
        assert_eq!(split_consent_suffix("SEX.c1"), ("SEX", ".c1"));
        assert_eq!(split_consent_suffix("phv00169061.v7.p2.c12"), ("phv00169061.v7.p2", ".c12"));
        assert_eq!(split_consent_suffix("SEX"), ("SEX", ""));
        assert_eq!(split_consent_suffix("SEX.cx"), ("SEX.cx", ""));
        assert_eq!(split_consent_suffix(".c1"), (".c1", ""));
    }

    #[test]
    fn test_normalize_consent() {
        assert_eq!(normalize_consent("c1"), ".c1");
        assert_eq!(normalize_consent(".c2"), ".c2");
        assert_eq!(normalize_consent(""), "");
    }

    #[test]
    fn test_base_variable_id() {
        assert_eq!(base_variable_id("phv00169061.v7.p2.c1"), "phv00169061.v7");
        assert_eq!(base_variable_id("phv00169061.v7"), "phv00169061.v7");
        assert_eq!(base_variable_id("phv10"), "phv10");
    }

    #[test]
    fn test_type_spellings() {
        assert_eq!(VariableType::from_declared("encoded value"), VariableType::Categorical);
        assert_eq!(VariableType::from_declared("enum_integer"), VariableType::Categorical);
        assert_eq!(VariableType::from_declared("integer, encoded value"), VariableType::Categorical);
        assert_eq!(VariableType::from_declared("integer"), VariableType::Integer);
        assert_eq!(VariableType::from_declared("decimal"), VariableType::Decimal);
        assert_eq!(VariableType::from_declared("string"), VariableType::String);
        assert_eq!(VariableType::from_declared("blob"), VariableType::Unknown);
        assert_eq!(
            VariableType::first_known([None, Some("blob"), Some("integer")]),
            VariableType::Integer
        );
    }

    #[test]
    fn test_label_for() {
        let mut def = VariableDefinition::new("phv1", "SEX", RecordType::Subject);
        def.coded_values.push(CodedValue { code: Some("1".into()), label: "Male".into(), count: None });
        assert_eq!(def.label_for("1"), Some("Male"));
        assert_eq!(def.label_for("2"), None);
    }
}
