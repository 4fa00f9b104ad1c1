//! Line-oriented parser for `.mtd` attribute templates.
//!
//! A template file looks like this:
//!
//! ```text
//! # comments start with '#' or ';'
//! [group Node Attributes]
//!
//! [attr frames]
//! default     INT     24
//! label       STRING  "Frames"
//! hidden      BOOL    false
//!
//! [input input]
//! max_connections  INT    1
//! data_type        INPUT  FILE
//! ```
//!
//! Parsing never fails on malformed content. Lines that cannot be used are
//! skipped and reported as [`ParseWarning`]s alongside the template.

use crate::literal::parse_literal;
use crate::template::{
    AttributeRecord, ConnectionType, Property, Template, TYPE_BOOL, TYPE_INPUT, TYPE_OUTPUT,
};
use log::{debug, warn};
use regex::Regex;
use scenegraph_core::{Error, Result, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static SECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[[^\]\r\n]+\]").expect("Invalid section regex"));

#[allow(clippy::expect_used)]
static SECTION_VALUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(?P<kind>\w+)\s+(?P<name>[\w\s]+?)\s*\]$")
        .expect("Invalid section value regex")
});

#[allow(clippy::expect_used)]
static PROPERTY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>[.\w]+)\s+(?P<type>\w+)(?:\s+(?P<value>.*))?$")
        .expect("Invalid property regex")
});

// ============================================================================
// Options and results
// ============================================================================

/// What to do with a property whose value is not a valid literal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnparsedValuePolicy {
    /// Leave the property out of the record.
    #[default]
    Drop,
    /// Keep the raw text as a string value.
    KeepRaw,
}

/// A recoverable problem found while parsing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseWarning {
    /// 1-based line number.
    pub line: usize,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// Output of a parse: the template plus any warnings.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParseReport {
    /// Parsed template.
    pub template: Template,
    /// Skipped lines and unparsable values.
    pub warnings: Vec<ParseWarning>,
}

impl ParseReport {
    /// Returns true when the parse produced no warnings.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

// ============================================================================
// TemplateParser
// ============================================================================

/// Stateful single-document template parser.
///
/// Each call to [`parse_str`](Self::parse_str) or
/// [`parse_file`](Self::parse_file) starts from a clean state, so one parser
/// can be reused for many files.
#[derive(Debug, Default)]
pub struct TemplateParser {
    policy: UnparsedValuePolicy,
    source: Option<PathBuf>,
    group: Option<String>,
    record: Option<String>,
    template: Template,
    warnings: Vec<ParseWarning>,
}

impl TemplateParser {
    /// Creates a parser with the default policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how unparsable property values are handled.
    pub fn with_policy(mut self, policy: UnparsedValuePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the active policy.
    pub fn policy(&self) -> UnparsedValuePolicy {
        self.policy
    }

    /// Parses a template file.
    ///
    /// A missing file yields an empty template. Other I/O failures are
    /// returned as errors.
    pub fn parse_file(&mut self, path: impl AsRef<Path>) -> Result<ParseReport> {
        let path = path.as_ref();
        debug!("Reading template file: {}", path.display());
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Template file not found, using empty template: {}", path.display());
                self.reset(Some(path.to_path_buf()));
                return Ok(self.finish());
            }
            Err(e) => return Err(Error::io_with_path(e, path)),
        };
        self.reset(Some(path.to_path_buf()));
        self.parse_lines(&text);
        Ok(self.finish())
    }

    /// Parses template text.
    pub fn parse_str(&mut self, text: &str) -> ParseReport {
        self.reset(None);
        self.parse_lines(text);
        self.finish()
    }

    fn reset(&mut self, source: Option<PathBuf>) {
        self.source = source;
        self.group = None;
        self.record = None;
        self.template = Template::new();
        self.warnings.clear();
    }

    fn finish(&mut self) -> ParseReport {
        self.group = None;
        self.record = None;
        ParseReport {
            template: std::mem::take(&mut self.template),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    fn parse_lines(&mut self, text: &str) {
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            let lineno = idx + 1;
            if line.is_empty() {
                continue;
            }
            if line.starts_with('#') || line.starts_with(';') {
                debug!("Skipping: {line:?}");
                continue;
            }
            if SECTION_RE.is_match(line) {
                self.parse_header(lineno, line);
            } else {
                self.parse_property(lineno, line);
            }
        }
    }

    fn parse_header(&mut self, lineno: usize, line: &str) {
        let Some(caps) = SECTION_VALUE_RE.captures(line) else {
            self.warn(lineno, format!("malformed section header {line:?}"));
            return;
        };
        let kind = &caps["kind"];
        let name = caps["name"].to_string();

        match kind {
            "group" => {
                self.template.section_mut(Some(name.as_str()));
                self.group = Some(name);
                self.record = None;
            }
            "attr" => self.open_record(name, AttributeRecord::attribute()),
            "input" => self.open_record(name, AttributeRecord::connection(ConnectionType::Input)),
            "output" => self.open_record(name, AttributeRecord::connection(ConnectionType::Output)),
            other => {
                self.warn(lineno, format!("unknown section kind {other:?}"));
                self.record = None;
            }
        }
    }

    fn open_record(&mut self, name: String, record: AttributeRecord) {
        self.template.insert(self.group.as_deref(), name.clone(), record);
        self.record = Some(name);
    }

    fn parse_property(&mut self, lineno: usize, line: &str) {
        let Some(caps) = PROPERTY_RE.captures(line) else {
            self.warn(lineno, format!("malformed property line {line:?}"));
            return;
        };
        let Some(attr) = self.record.clone() else {
            self.warn(
                lineno,
                format!("property {:?} outside of any attribute", &caps["name"]),
            );
            return;
        };
        let name = &caps["name"];
        let type_tag = &caps["type"];
        let raw = caps.name("value").map(|m| m.as_str().trim()).unwrap_or("");

        let value = match type_tag {
            TYPE_BOOL => Value::Bool(raw == "true"),
            TYPE_INPUT | TYPE_OUTPUT => Value::String(raw.to_lowercase()),
            _ => match parse_literal(raw) {
                Ok(value) => value,
                Err(e) => {
                    self.warn(
                        lineno,
                        format!("cannot parse value of \"{attr}.{name}\": {raw:?} ({e})"),
                    );
                    match self.policy {
                        UnparsedValuePolicy::Drop => return,
                        UnparsedValuePolicy::KeepRaw => Value::String(raw.to_string()),
                    }
                }
            },
        };

        if let Some(record) = self.template.section_mut(self.group.as_deref()).get_mut(&attr) {
            record
                .properties
                .insert(name.to_string(), Property::new(type_tag, value));
        }
    }

    fn warn(&mut self, line: usize, message: String) {
        match &self.source {
            Some(path) => warn!("{}:{line}: {message}", path.display()),
            None => warn!("line {line}: {message}"),
        }
        self.warnings.push(ParseWarning { line, message });
    }
}

/// Parses template text with the default policy.
pub fn parse_str(text: &str) -> ParseReport {
    TemplateParser::new().parse_str(text)
}

/// Parses a template file with the default policy.
pub fn parse_file(path: impl AsRef<Path>) -> Result<ParseReport> {
    TemplateParser::new().parse_file(path)
}
