//! Declarative request schemas.
//!
//! A [`Schema`] checks a JSON payload and collects every failing field before
//! returning, so one response lists all problems.

use crate::case::to_camel_case;
use crate::config::{ColumnKind, EntityTable};
use crate::error::{AppError, ValidationIssue};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

#[derive(Clone, Debug)]
pub enum FieldType {
    String,
    Integer,
    Object(Schema),
    Array {
        item: Box<FieldType>,
        min_items: usize,
        min_message: String,
    },
}

#[derive(Clone, Debug)]
pub enum Format {
    Email,
    Uuid,
    DateTime,
}

#[derive(Clone, Debug)]
pub struct FieldRule {
    pub name: String,
    pub ty: FieldType,
    /// Message reported when absent; `None` makes the field optional.
    pub required: Option<String>,
    pub format: Option<Format>,
    pub pattern: Option<(Regex, String)>,
    pub min_length: Option<usize>,
}

impl FieldRule {
    pub fn required(name: &str, ty: FieldType, message: &str) -> Self {
        FieldRule {
            name: name.to_string(),
            ty,
            required: Some(message.to_string()),
            format: None,
            pattern: None,
            min_length: None,
        }
    }

    pub fn optional(name: &str, ty: FieldType) -> Self {
        FieldRule {
            name: name.to_string(),
            ty,
            required: None,
            format: None,
            pattern: None,
            min_length: None,
        }
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_pattern(mut self, re: Regex, message: &str) -> Self {
        self.pattern = Some((re, message.to_string()));
        self
    }

    pub fn with_min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct Schema {
    pub fields: Vec<FieldRule>,
    /// Reject keys not declared in `fields`.
    pub strict: bool,
}

impl Schema {
    pub fn new(fields: Vec<FieldRule>) -> Self {
        Schema { fields, strict: false }
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn validate(&self, value: &Value) -> Result<(), AppError> {
        let mut issues = Vec::new();
        match value {
            Value::Object(map) => self.check_object("", map, &mut issues),
            _ => issues.push(ValidationIssue::new("body", "Expected an object")),
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(AppError::SchemaValidation(issues))
        }
    }

    fn check_object(&self, prefix: &str, map: &Map<String, Value>, issues: &mut Vec<ValidationIssue>) {
        for rule in &self.fields {
            let path = join_path(prefix, &rule.name);
            match map.get(&rule.name) {
                None | Some(Value::Null) => {
                    if let Some(message) = &rule.required {
                        issues.push(ValidationIssue::new(path, message.clone()));
                    }
                }
                Some(v) => check_field(&path, v, rule, issues),
            }
        }
        if self.strict {
            for key in map.keys() {
                if !self.fields.iter().any(|f| &f.name == key) {
                    issues.push(ValidationIssue::new(
                        join_path(prefix, key),
                        format!("Unrecognized key '{}'", key),
                    ));
                }
            }
        }
    }
}

fn join_path(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", prefix, segment)
    }
}

fn check_field(path: &str, v: &Value, rule: &FieldRule, issues: &mut Vec<ValidationIssue>) {
    if !check_type(path, v, &rule.ty, issues) {
        return;
    }
    if let Some(s) = v.as_str() {
        if let Some(min) = rule.min_length {
            if s.chars().count() < min {
                issues.push(ValidationIssue::new(
                    path,
                    format!("Must be at least {} characters", min),
                ));
            }
        }
        if let Some(format) = &rule.format {
            if let Some(message) = check_format(s, format) {
                issues.push(ValidationIssue::new(path, message));
            }
        }
        if let Some((re, message)) = &rule.pattern {
            if !re.is_match(s) {
                issues.push(ValidationIssue::new(path, message.clone()));
            }
        }
    }
}

/// Returns false when the value has the wrong shape (further checks are skipped).
fn check_type(path: &str, v: &Value, ty: &FieldType, issues: &mut Vec<ValidationIssue>) -> bool {
    match (ty, v) {
        (FieldType::String, Value::String(_)) => true,
        (FieldType::Integer, Value::Number(n)) if n.is_i64() => true,
        (FieldType::Object(schema), Value::Object(map)) => {
            schema.check_object(path, map, issues);
            true
        }
        (
            FieldType::Array {
                item,
                min_items,
                min_message,
            },
            Value::Array(items),
        ) => {
            if items.len() < *min_items {
                issues.push(ValidationIssue::new(path, min_message.clone()));
            }
            for (i, element) in items.iter().enumerate() {
                check_type(&join_path(path, &i.to_string()), element, item, issues);
            }
            true
        }
        _ => {
            issues.push(ValidationIssue::new(
                path,
                format!("Expected {}, received {}", type_name(ty), value_type(v)),
            ));
            false
        }
    }
}

fn type_name(ty: &FieldType) -> &'static str {
    match ty {
        FieldType::String => "string",
        FieldType::Integer => "integer",
        FieldType::Object(_) => "object",
        FieldType::Array { .. } => "array",
    }
}

fn value_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn check_format(s: &str, format: &Format) -> Option<String> {
    match format {
        Format::Email => (!email_regex().is_match(s)).then(|| "Invalid email".to_string()),
        Format::Uuid => uuid::Uuid::parse_str(s)
            .is_err()
            .then(|| "Invalid uuid".to_string()),
        Format::DateTime => chrono::DateTime::parse_from_rfc3339(s)
            .is_err()
            .then(|| "Invalid datetime".to_string()),
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles"))
}

fn contact_number_regex() -> Regex {
    Regex::new(r"^\+?[0-9][0-9\- ]{5,19}$").expect("contact number pattern compiles")
}

/// PATCH schema for a profile table: every updatable column, optional, camelCase keys.
pub fn update_schema(entity: &EntityTable) -> Schema {
    let fields = entity
        .updatable_columns()
        .map(|c| {
            let ty = match c.kind {
                ColumnKind::Integer => FieldType::Integer,
                _ => FieldType::String,
            };
            let rule = FieldRule::optional(&to_camel_case(c.name), ty);
            match c.name {
                "name" => rule.with_min_length(1),
                "contact_number" => rule.with_pattern(contact_number_regex(), "Invalid contact number"),
                _ => rule,
            }
        })
        .collect();
    Schema::new(fields).strict()
}

/// Body of `POST /prescription`.
pub fn prescription_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        let medication = Schema::new(vec![
            FieldRule::required("name", FieldType::String, "Medication name is required"),
            FieldRule::required("dosage", FieldType::String, "Dosage is required"),
            FieldRule::required("frequency", FieldType::String, "Frequency is required"),
            FieldRule::required("duration", FieldType::String, "Duration is required"),
            FieldRule::optional("instructions", FieldType::String),
        ]);
        Schema::new(vec![
            FieldRule::required("appointmentId", FieldType::String, "Appointment ID is required"),
            FieldRule::optional("issuedAt", FieldType::String).with_format(Format::DateTime),
            FieldRule::required(
                "medications",
                FieldType::Array {
                    item: Box::new(FieldType::Object(medication)),
                    min_items: 1,
                    min_message: "At least one medication is required".into(),
                },
                "Medications are required",
            ),
            FieldRule::optional("notes", FieldType::String),
        ])
    })
}
