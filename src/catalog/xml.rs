//! dbGaP `data_dict.xml` / `var_report.xml` reader.
//!
//! Both file kinds share one shape:
//!
//! ```text
//! <data_table id="pht002742.v7" study_id="phs000424.v7" date_created="...">
//!   <description>...</description>
//!   <variable id="phv00169061.v7" var_name="SEX" reported_type="encoded value">
//!     <name>SEX</name> <description>...</description> <type>encoded value</type>
//!     <value code="1">Male</value>
//!     <total>
//!       <subject_profile>...</subject_profile>
//!       <stats>
//!         <stat n="80" nulls="0"/>
//!         <enum code="1" count="23">Male</enum>
//!       </stats>
//!     </total>
//!   </variable>
//! </data_table>
//! ```
//!
//! quick-xml does the lexing; this module checks the document against the
//! expected shape and fails on anything it does not recognise.

use std::path::Path;

use chrono::NaiveDateTime;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::variable::{CodedValue, SummaryStats};
use crate::{Error, Result};

/// Attributes allowed on `<stat>`.
const STAT_ATTRIBS: [&str; 11] = [
    "n", "nulls", "mean_count", "median_count", "min_count", "max_count",
    "mean", "median", "min", "max", "sd",
];

/// Attributes allowed on `<data_table>`.
const TABLE_ATTRIBS: [&str; 4] = ["id", "study_id", "participant_set", "date_created"];

/// Attributes allowed on `<variable>`.
const VARIABLE_ATTRIBS: [&str; 4] = ["id", "var_name", "calculated_type", "reported_type"];

/// dbGaP's `date_created` format, e.g. `Mon Jan 30 11:02:13 2017`.
const DATE_CREATED_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// A parsed `<data_table>` document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTable {
    pub table_id: Option<String>,
    pub study_id: String,
    pub participant_set: Option<String>,
    /// `date_created` exactly as written.
    pub date_created: Option<String>,
    /// `date_created` when it parses.
    pub created: Option<NaiveDateTime>,
    pub description: Option<String>,
    pub has_coll: Option<String>,
    pub variables: Vec<RawVariable>,
}

/// A `<variable>` element before it is turned into a definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawVariable {
    pub id: String,
    pub var_name: Option<String>,
    pub calculated_type: Option<String>,
    pub reported_type: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub declared_type: Option<String>,
    pub comment: Option<String>,
    pub coll_interval: Option<String>,
    pub unit: Option<String>,
    pub logical_min: Option<String>,
    pub logical_max: Option<String>,
    pub values: Vec<CodedValue>,
    pub stats: Option<SummaryStats>,
}

impl RawVariable {
    /// `var_name` from a report, else `<name>` from a dictionary.
    pub fn display_name(&self) -> Option<&str> {
        self.var_name.as_deref().or(self.name.as_deref())
    }
}

// ============================================================================
// Element tree
// ============================================================================

#[derive(Debug, Default)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn open(e: &BytesStart<'_>, path: &Path) -> Result<Element> {
        let mut el = Element {
            name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
            ..Element::default()
        };
        for attr in e.attributes() {
            let attr = attr.map_err(|err| xml_error(path, err))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(|err| xml_error(path, err))?.into_owned();
            el.attrs.push((key, value));
        }
        Ok(el)
    }

    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    fn required_attr(&self, key: &str, path: &Path) -> Result<&str> {
        self.attr(key).ok_or_else(|| {
            structural(path, format!("<{}> is missing required attribute '{key}'", self.name))
        })
    }

    /// Namespace declarations and `xsi:` hints are always accepted.
    fn check_attrs(&self, allowed: &[&str], path: &Path) -> Result<()> {
        let unexpected = self.attrs.iter().map(|(k, _)| k.as_str()).find(|k| {
            !allowed.contains(k) && *k != "xmlns" && !k.starts_with("xmlns:") && !k.starts_with("xsi:")
        });
        match unexpected {
            Some(key) => Err(structural(path, format!("unexpected attribute in <{}> element: {key}", self.name))),
            None => Ok(()),
        }
    }

    fn text(&self) -> Option<String> {
        let t = self.text.trim();
        (!t.is_empty()).then(|| t.to_string())
    }
}

fn xml_error(path: &Path, err: impl std::fmt::Display) -> Error {
    Error::Xml { path: path.to_path_buf(), message: err.to_string() }
}

fn structural(path: &Path, message: impl Into<String>) -> Error {
    Error::StructuralParse { path: path.to_path_buf(), message: message.into() }
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, el: Element, path: &Path) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(el),
        None if root.is_none() => *root = Some(el),
        None => return Err(structural(path, format!("second root element <{}>", el.name))),
    }
    Ok(())
}

fn read_tree(content: &str, path: &Path) -> Result<Element> {
    let mut reader = Reader::from_str(content);
    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => stack.push(Element::open(e, path)?),
            Ok(Event::Empty(ref e)) => {
                let el = Element::open(e, path)?;
                attach(&mut stack, &mut root, el, path)?;
            }
            Ok(Event::Text(ref e)) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&e.unescape().map_err(|err| xml_error(path, err))?);
                }
            }
            Ok(Event::CData(ref e)) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(e));
                }
            }
            Ok(Event::End(_)) => {
                let el = stack.pop().ok_or_else(|| structural(path, "unbalanced end tag"))?;
                attach(&mut stack, &mut root, el, path)?;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(xml_error(path, err)),
        }
    }

    if !stack.is_empty() {
        return Err(structural(path, "document ended inside an element"));
    }
    root.ok_or_else(|| structural(path, "empty document"))
}

// ============================================================================
// Shape checks
// ============================================================================

fn parse_count(value: &str, what: &str, path: &Path) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| structural(path, format!("{what} '{value}' is not a count")))
}

fn parse_stats(el: &Element, path: &Path) -> Result<SummaryStats> {
    let mut stats = SummaryStats::default();
    for child in &el.children {
        match child.name.as_str() {
            "stat" => {
                child.check_attrs(&STAT_ATTRIBS, path)?;
                for (key, value) in &child.attrs {
                    match key.as_str() {
                        "n" => stats.n = Some(parse_count(value, "n", path)?),
                        "nulls" => stats.nulls = Some(parse_count(value, "nulls", path)?),
                        "mean" => stats.mean = Some(value.clone()),
                        "median" => stats.median = Some(value.clone()),
                        "min" => stats.min = Some(value.clone()),
                        "max" => stats.max = Some(value.clone()),
                        "sd" => stats.sd = Some(value.clone()),
                        // per-statistic counts are validated but not kept
                        _ => {}
                    }
                }
            }
            "enum" => stats.values.push(CodedValue {
                code: child.attr("code").map(str::to_string),
                label: child.text().unwrap_or_default(),
                count: Some(parse_count(child.required_attr("count", path)?, "count", path)?),
            }),
            "example" => stats.examples.push(CodedValue {
                code: None,
                label: child.text().unwrap_or_default(),
                count: Some(parse_count(child.required_attr("count", path)?, "count", path)?),
            }),
            other => return Err(structural(path, format!("unexpected <{other}> under <stats>"))),
        }
    }
    Ok(stats)
}

fn parse_total(el: &Element, path: &Path) -> Result<Option<SummaryStats>> {
    let mut stats = None;
    for child in &el.children {
        match child.name.as_str() {
            "subject_profile" => {}
            "stats" => stats = Some(parse_stats(child, path)?),
            other => return Err(structural(path, format!("unexpected <{other}> under <total>"))),
        }
    }
    Ok(stats)
}

fn parse_variable(el: &Element, path: &Path) -> Result<RawVariable> {
    el.check_attrs(&VARIABLE_ATTRIBS, path)?;
    let mut var = RawVariable {
        id: el.required_attr("id", path)?.to_string(),
        var_name: el.attr("var_name").map(str::to_string),
        calculated_type: el.attr("calculated_type").map(str::to_string),
        reported_type: el.attr("reported_type").map(str::to_string),
        ..RawVariable::default()
    };

    for child in &el.children {
        let text = child.text();
        match child.name.as_str() {
            "name" => var.name = text,
            "description" => var.description = text,
            "type" => var.declared_type = text,
            "comment" => var.comment = text,
            "coll_interval" => var.coll_interval = text,
            "unit" => var.unit = text,
            "logical_min" => var.logical_min = text,
            "logical_max" => var.logical_max = text,
            "value" => var.values.push(CodedValue {
                code: Some(child.required_attr("code", path)?.to_string()),
                label: text.unwrap_or_default(),
                count: None,
            }),
            "total" => var.stats = parse_total(child, path)?,
            other => {
                return Err(structural(path, format!("unexpected <{other}> in variable {}", var.id)));
            }
        }
    }
    if var.display_name().is_none() {
        return Err(structural(path, format!("variable {} has no name", var.id)));
    }
    Ok(var)
}

/// Parse a data dictionary or variable report from a string.
/// `path` is used for error messages only.
pub fn parse_data_table_str(content: &str, path: &Path) -> Result<DataTable> {
    let root = read_tree(content, path)?;
    if root.name != "data_table" {
        return Err(structural(path, format!("unexpected root element <{}>", root.name)));
    }
    root.check_attrs(&TABLE_ATTRIBS, path)?;

    let date_created = root.attr("date_created").map(str::to_string);
    let created = date_created.as_deref().and_then(|raw| {
        let parsed = NaiveDateTime::parse_from_str(raw.trim(), DATE_CREATED_FORMAT).ok();
        if parsed.is_none() {
            tracing::warn!(path = %path.display(), date_created = raw, "unparseable date_created; keeping raw value");
        }
        parsed
    });

    let mut table = DataTable {
        table_id: root.attr("id").map(str::to_string),
        study_id: root.required_attr("study_id", path)?.to_string(),
        participant_set: root.attr("participant_set").map(str::to_string),
        date_created,
        created,
        ..DataTable::default()
    };

    for child in &root.children {
        match child.name.as_str() {
            "description" => table.description = child.text(),
            "has_coll" => table.has_coll = child.text(),
            "variable" => table.variables.push(parse_variable(child, path)?),
            other => return Err(structural(path, format!("unexpected <{other}> under <data_table>"))),
        }
    }
    Ok(table)
}

/// Read and parse a data dictionary or variable report file.
pub fn read_data_table(path: &Path) -> Result<DataTable> {
    tracing::info!(path = %path.display(), "reading");
    let content = std::fs::read_to_string(path)?;
    parse_data_table_str(&content, path)
}
