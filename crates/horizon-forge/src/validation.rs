//! Declarative validation of built objects.
//!
//! Rules come from the `validate` node of a document, one property per
//! target:
//!
//! ```text
//! validate:
//!   txtUser.text:  { label: label.user, mandatory: true, minLength: 5 }
//!   txtMail.text:  [mandatory, emailAddress]
//! ```
//!
//! Within a rule `mandatory` runs first; when it fails nothing else is
//! checked for that field. Every other constraint is evaluated on its own,
//! so one value can produce several messages. Custom [`ValueValidator`]s run
//! after the built-in constraints of their field.

use std::fmt;
use std::sync::{Arc, OnceLock};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

use horizon_forge_core::ObjectRef;
use horizon_forge_core::logging::targets;

use crate::error::BuildError;
use crate::node::Value;
use crate::registry::TypeRegistry;
use crate::resource::{ResourceScope, format_message};

/// Resource key of the mandatory message.
pub const MANDATORY_KEY: &str = "validation.mandatory";
/// Resource key used when a numeric constraint meets a non-number.
pub const NUMERIC_KEY: &str = "validation.numeric";

/// A check that does not fit the built-in constraints.
pub trait ValueValidator: Send + Sync {
    /// Check `value`; return the failure message, if any.
    fn validate(&self, value: &Value) -> Option<String>;

    /// The kind reported in [`ValidationMessage::kind`].
    fn kind(&self) -> &str {
        "custom"
    }
}

impl<F> ValueValidator for F
where
    F: Fn(&Value) -> Option<String> + Send + Sync,
{
    fn validate(&self, value: &Value) -> Option<String> {
        self(value)
    }
}

/// One failed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationMessage {
    /// Build name of the validated object.
    pub object_name: String,
    /// The validated property.
    pub property_name: String,
    /// The resolved field label.
    pub label: String,
    /// The constraint kind, e.g. `minLength`.
    pub kind: String,
    /// The formatted message.
    pub message: String,
}

impl fmt::Display for ValidationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Which chrono type a date pattern parses into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateKind {
    /// Date and time fields.
    DateTime,
    /// Date fields only.
    Date,
    /// Time fields only.
    Time,
}

/// A built-in constraint.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// The trimmed value must not be empty.
    Mandatory,
    /// At least this many characters.
    MinLength(usize),
    /// At most this many characters.
    MaxLength(usize),
    /// The whole value must match.
    Regex {
        /// The pattern as declared.
        pattern: String,
        /// Message or message key replacing the default one.
        message: Option<String>,
        /// The anchored, compiled pattern.
        compiled: Regex,
    },
    /// Numeric lower bound.
    MinValue(f64),
    /// Numeric upper bound.
    MaxValue(f64),
    /// A date and/or time in the given `SimpleDateFormat`-style pattern.
    DateFormat {
        /// The pattern as declared, e.g. `dd.MM.yyyy`.
        pattern: String,
        /// The equivalent chrono format string.
        strftime: String,
        /// What the pattern parses into.
        kind: DateKind,
    },
    /// A plausible e-mail address.
    EmailAddress,
}

impl Constraint {
    /// Create a regex constraint; the pattern must match the whole value.
    pub fn regex(pattern: &str, message: Option<String>) -> Result<Self, String> {
        let compiled = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| e.to_string())?;
        Ok(Self::Regex {
            pattern: pattern.to_string(),
            message,
            compiled,
        })
    }

    /// Create a date format constraint.
    pub fn date_format(pattern: &str) -> Result<Self, String> {
        let (strftime, kind) = translate_date_pattern(pattern)?;
        Ok(Self::DateFormat {
            pattern: pattern.to_string(),
            strftime,
            kind,
        })
    }

    /// The kind name as written in documents.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Mandatory => "mandatory",
            Self::MinLength(_) => "minLength",
            Self::MaxLength(_) => "maxLength",
            Self::Regex { .. } => "regex",
            Self::MinValue(_) => "minValue",
            Self::MaxValue(_) => "maxValue",
            Self::DateFormat { .. } => "dateFormat",
            Self::EmailAddress => "emailAddress",
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(self, Self::MinValue(_) | Self::MaxValue(_))
    }

    /// Parse `kind: arg` from a rule map. `Ok(None)` means the constraint is switched off.
    fn from_entry(kind: &str, arg: &Value, regex_message: Option<&str>) -> Result<Option<Self>, String> {
        let flag = || {
            arg.as_bool()
                .ok_or_else(|| format!("'{kind}' expects true or false, got {arg}"))
        };
        let length = || match arg {
            Value::Int(n) if *n >= 0 => Ok(*n as usize),
            other => Err(format!("'{kind}' expects a non-negative integer, got {other}")),
        };
        let number = || {
            arg.as_float()
                .filter(|v| v.is_finite())
                .ok_or_else(|| format!("'{kind}' expects a finite number, got {arg}"))
        };
        let text = || {
            arg.as_str()
                .ok_or_else(|| format!("'{kind}' expects a string, got {arg}"))
        };

        match kind {
            "mandatory" => Ok(flag()?.then_some(Self::Mandatory)),
            "emailAddress" => Ok(flag()?.then_some(Self::EmailAddress)),
            "minLength" => Ok(Some(Self::MinLength(length()?))),
            "maxLength" => Ok(Some(Self::MaxLength(length()?))),
            "minValue" => Ok(Some(Self::MinValue(number()?))),
            "maxValue" => Ok(Some(Self::MaxValue(number()?))),
            "regex" => Self::regex(text()?, regex_message.map(str::to_string)).map(Some),
            "dateFormat" => Self::date_format(text()?).map(Some),
            other => Err(format!("unknown constraint '{other}'")),
        }
    }

    /// Check `text`; on failure return the argument the message is formatted with.
    fn check(&self, text: &str) -> Option<String> {
        let length = text.chars().count();
        let failed = match self {
            Self::Mandatory => text.trim().is_empty(),
            Self::MinLength(min) => length < *min,
            Self::MaxLength(max) => length > *max,
            Self::Regex { compiled, .. } => !compiled.is_match(text),
            Self::MinValue(min) => parse_number(text).is_some_and(|v| v < *min),
            Self::MaxValue(max) => parse_number(text).is_some_and(|v| v > *max),
            Self::DateFormat { strftime, kind, .. } => !matches_date(text.trim(), strftime, *kind),
            Self::EmailAddress => !is_email(text.trim()),
        };
        failed.then(|| self.argument())
    }

    fn argument(&self) -> String {
        match self {
            Self::Mandatory | Self::EmailAddress => String::new(),
            Self::MinLength(n) | Self::MaxLength(n) => n.to_string(),
            Self::MinValue(v) | Self::MaxValue(v) => format_number(*v),
            Self::Regex { pattern, .. } => pattern.clone(),
            Self::DateFormat { pattern, .. } => pattern.clone(),
        }
    }

    fn message_key(&self) -> String {
        format!("validation.{}", self.kind())
    }
}

impl PartialEq for Constraint {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.argument() == other.argument()
    }
}

/// Finite numbers only; `NaN` and infinities count as not a number.
fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

fn is_email(text: &str) -> bool {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$").ok())
        .as_ref()
        .is_some_and(|email| email.is_match(text))
}

fn matches_date(text: &str, strftime: &str, kind: DateKind) -> bool {
    match kind {
        DateKind::DateTime => NaiveDateTime::parse_from_str(text, strftime).is_ok(),
        DateKind::Date => NaiveDate::parse_from_str(text, strftime).is_ok(),
        DateKind::Time => NaiveTime::parse_from_str(text, strftime).is_ok(),
    }
}

/// Translate a `SimpleDateFormat`-style pattern (`dd.MM.yyyy HH:mm`) into a
/// chrono format string.
fn translate_date_pattern(pattern: &str) -> Result<(String, DateKind), String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::new();
    let (mut has_date, mut has_time) = (false, false);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '\'' {
            let end = chars[i + 1..]
                .iter()
                .position(|&q| q == '\'')
                .ok_or_else(|| format!("unterminated quote in date pattern '{pattern}'"))?;
            let literal: String = chars[i + 1..i + 1 + end].iter().collect();
            out.push_str(&literal.replace('%', "%%"));
            i += end + 2;
            continue;
        }

        let run = chars[i..].iter().take_while(|&&n| n == c).count();
        let token = match (c, run) {
            ('y', 2) => "%y",
            ('y', _) => "%Y",
            ('M', 1 | 2) => "%m",
            ('M', 3) => "%b",
            ('M', _) => "%B",
            ('d', _) => "%d",
            ('H', _) => "%H",
            ('m', _) => "%M",
            ('s', _) => "%S",
            (c, _) if c.is_ascii_alphabetic() => {
                return Err(format!("unsupported letter '{c}' in date pattern '{pattern}'"));
            }
            ('%', _) => {
                out.push_str(&"%%".repeat(run));
                i += run;
                continue;
            }
            _ => {
                out.extend(std::iter::repeat_n(c, run));
                i += run;
                continue;
            }
        };
        match c {
            'y' | 'M' | 'd' => has_date = true,
            _ => has_time = true,
        }
        out.push_str(token);
        i += run;
    }

    let kind = match (has_date, has_time) {
        (true, true) => DateKind::DateTime,
        (true, false) => DateKind::Date,
        (false, true) => DateKind::Time,
        (false, false) => return Err(format!("date pattern '{pattern}' has no date or time fields")),
    };
    Ok((out, kind))
}

/// The constraints registered for one `object.property` target.
#[derive(Clone)]
pub struct ValidationRule {
    object_name: String,
    property_name: String,
    label: Option<String>,
    constraints: Vec<Constraint>,
    custom: Vec<Arc<dyn ValueValidator>>,
}

impl ValidationRule {
    /// A rule for `object_name.property_name` without constraints.
    pub fn new(object_name: impl Into<String>, property_name: impl Into<String>) -> Self {
        Self {
            object_name: object_name.into(),
            property_name: property_name.into(),
            label: None,
            constraints: Vec::new(),
            custom: Vec::new(),
        }
    }

    /// Parse one entry of a `validate` node.
    ///
    /// `value` is either a map of constraint kinds to arguments (plus an
    /// optional `label` and `regexMessage`) or a list of argument-less kinds.
    pub fn parse(target: &str, value: &Value) -> Result<Self, BuildError> {
        let invalid = |message: String| BuildError::invalid_rule(target, message);
        let (object, property) = split_target(target).ok_or_else(|| invalid("expected 'object.property'".into()))?;
        let mut rule = Self::new(object, property);

        match value {
            Value::Map(entries) => {
                let regex_message = entries.get("regexMessage").and_then(Value::as_str);
                for (kind, arg) in entries {
                    match kind.as_str() {
                        "label" => {
                            let label = arg
                                .as_str()
                                .ok_or_else(|| invalid(format!("'label' expects a string, got {arg}")))?;
                            rule.label = Some(label.to_string());
                        }
                        "regexMessage" => {}
                        kind => {
                            if let Some(constraint) = Constraint::from_entry(kind, arg, regex_message).map_err(invalid)? {
                                rule.constraints.push(constraint);
                            }
                        }
                    }
                }
            }
            Value::List(kinds) => {
                for kind in kinds {
                    let kind = kind
                        .as_str()
                        .ok_or_else(|| invalid(format!("expected a constraint name, got {kind}")))?;
                    match kind {
                        "mandatory" => rule.constraints.push(Constraint::Mandatory),
                        "emailAddress" => rule.constraints.push(Constraint::EmailAddress),
                        "minLength" | "maxLength" | "minValue" | "maxValue" | "regex" | "dateFormat" => {
                            return Err(invalid(format!("'{kind}' needs an argument; use the map form")));
                        }
                        other => return Err(invalid(format!("unknown constraint '{other}'"))),
                    }
                }
            }
            Value::Str(kind) | Value::Reference(kind) => {
                return Self::parse(target, &Value::List(vec![Value::Str(kind.clone())]));
            }
            other => return Err(invalid(format!("expected a map or list, got {}", other.kind_name()))),
        }

        Ok(rule)
    }

    /// Set the label, a resource key or literal text.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Append a built-in constraint.
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Append a custom validator.
    pub fn with_validator(mut self, validator: impl ValueValidator + 'static) -> Self {
        self.custom.push(Arc::new(validator));
        self
    }

    pub(crate) fn push_validator(&mut self, validator: Arc<dyn ValueValidator>) {
        self.custom.push(validator);
    }

    /// `object.property`.
    pub fn target(&self) -> String {
        format!("{}.{}", self.object_name, self.property_name)
    }

    /// Build name of the validated object.
    pub fn object_name(&self) -> &str {
        &self.object_name
    }

    /// The validated property.
    pub fn property_name(&self) -> &str {
        &self.property_name
    }

    /// The declared label, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// The built-in constraints in declaration order.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Number of custom validators.
    pub fn custom_count(&self) -> usize {
        self.custom.len()
    }

    /// Evaluate the rule against `value`.
    ///
    /// An empty value only fails `mandatory`; the other built-in constraints
    /// apply to values that were entered.
    pub fn evaluate(&self, value: &Value, scope: &ResourceScope) -> Vec<ValidationMessage> {
        let label = scope.resolve_or_literal(self.label.as_deref().unwrap_or(&self.property_name));
        let text = value.to_text();
        let message = |kind: &str, message: String| ValidationMessage {
            object_name: self.object_name.clone(),
            property_name: self.property_name.clone(),
            label: label.clone(),
            kind: kind.to_string(),
            message,
        };

        let mut messages = Vec::new();
        let mandatory = self.constraints.iter().any(|c| matches!(c, Constraint::Mandatory));
        if mandatory && Constraint::Mandatory.check(&text).is_some() {
            messages.push(message("mandatory", scope.format(MANDATORY_KEY, &[&label])));
            return messages;
        }

        if !text.trim().is_empty() {
            let mut numeric_reported = false;
            for constraint in self.constraints.iter().filter(|c| !matches!(c, Constraint::Mandatory)) {
                if constraint.is_numeric() && parse_number(&text).is_none() {
                    if !numeric_reported {
                        numeric_reported = true;
                        messages.push(message(constraint.kind(), scope.format(NUMERIC_KEY, &[&label])));
                    }
                    continue;
                }
                let Some(argument) = constraint.check(&text) else {
                    continue;
                };
                let formatted = match constraint {
                    Constraint::Regex {
                        message: Some(custom), ..
                    } => format_message(&scope.resolve_or_literal(custom), &[&label, &argument]),
                    _ => scope.format(&constraint.message_key(), &[&label, &argument]),
                };
                messages.push(message(constraint.kind(), formatted));
            }
        }

        for validator in &self.custom {
            if let Some(text) = validator.validate(value) {
                messages.push(message(validator.kind(), scope.resolve_or_literal(&text)));
            }
        }

        messages
    }
}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRule")
            .field("target", &self.target())
            .field("label", &self.label)
            .field("constraints", &self.constraints)
            .field("custom", &self.custom.len())
            .finish()
    }
}

/// Split `object.property` at the last dot.
pub(crate) fn split_target(target: &str) -> Option<(&str, &str)> {
    let (object, property) = target.rsplit_once('.')?;
    (!object.is_empty() && !property.is_empty()).then_some((object, property))
}

/// Evaluate `rules` in order against the objects `lookup` returns.
pub(crate) fn validate_all<F>(
    rules: &[ValidationRule],
    lookup: F,
    registry: &TypeRegistry,
    scope: &ResourceScope,
) -> Vec<ValidationMessage>
where
    F: Fn(&str) -> Option<ObjectRef>,
{
    let _span = tracing::debug_span!(target: targets::VALIDATION, "horizon_forge::validation", rules = rules.len()).entered();

    let mut messages = Vec::new();
    for rule in rules {
        let value = lookup(rule.object_name()).and_then(|object| {
            registry
                .descriptor_for(&object)
                .and_then(|descriptor| descriptor.read(&object, rule.property_name()))
        });
        match value {
            Some(value) => messages.extend(rule.evaluate(&value, scope)),
            None => tracing::warn!(
                target: targets::VALIDATION,
                target_path = %rule.target(),
                "validation target is no longer readable, rule skipped"
            ),
        }
    }

    tracing::debug!(target: targets::VALIDATION, failures = messages.len(), "validation finished");
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ResourceBundle, ResourceResolver};

    fn scope() -> ResourceScope {
        ResourceScope::new(Arc::new(ResourceResolver::new()), Vec::new(), Vec::new())
    }

    fn rule(value: Value) -> ValidationRule {
        ValidationRule::parse("txtUser.text", &value).unwrap()
    }

    #[test]
    fn test_mandatory_with_min_length() {
        let rule = rule(Value::map([
            ("label", Value::from("User")),
            ("mandatory", Value::Bool(true)),
            ("minLength", Value::Int(5)),
        ]));

        let empty = rule.evaluate(&Value::from(""), &scope());
        assert_eq!(empty.len(), 1);
        assert_eq!(empty[0].kind, "mandatory");
        assert_eq!(empty[0].message, "User is required");

        let short = rule.evaluate(&Value::from("abc"), &scope());
        assert_eq!(short.len(), 1);
        assert_eq!(short[0].kind, "minLength");
        assert_eq!(short[0].message, "User must be at least 5 characters long");

        assert!(rule.evaluate(&Value::from("abcdefghij"), &scope()).is_empty());
    }

    #[test]
    fn test_whitespace_fails_mandatory() {
        let rule = rule(Value::List(vec![Value::from("mandatory")]));
        assert_eq!(rule.evaluate(&Value::from("   "), &scope()).len(), 1);
    }

    #[test]
    fn test_remaining_constraints_are_independent() {
        let rule = rule(Value::map([
            ("minLength", Value::Int(8)),
            ("regex", Value::from("[0-9]+")),
        ]));

        let messages = rule.evaluate(&Value::from("abc"), &scope());
        let kinds: Vec<_> = messages.iter().map(|m| m.kind.as_str()).collect();
        assert_eq!(kinds, ["minLength", "regex"]);
    }

    #[test]
    fn test_empty_optional_value_skips_constraints() {
        let rule = rule(Value::map([("minLength", Value::Int(3)), ("emailAddress", Value::Bool(true))]));
        assert!(rule.evaluate(&Value::from(""), &scope()).is_empty());
    }

    #[test]
    fn test_regex_matches_whole_value_and_custom_message() {
        let rule = rule(Value::map([
            ("label", Value::from("Zip")),
            ("regex", Value::from("[0-9]{4}")),
            ("regexMessage", Value::from("msg.zip")),
        ]));
        let bundle = ResourceBundle::from_pairs("app", [("msg.zip", "{0} needs four digits")]);
        let resolver = Arc::new(ResourceResolver::new());
        resolver.add_global_bundle(bundle);
        let scope = ResourceScope::new(resolver, Vec::new(), Vec::new());

        assert!(rule.evaluate(&Value::from("1234"), &scope).is_empty());
        let messages = rule.evaluate(&Value::from("12345"), &scope);
        assert_eq!(messages[0].message, "Zip needs four digits");
    }

    #[test]
    fn test_numeric_bounds() {
        let rule = rule(Value::map([
            ("label", Value::from("Age")),
            ("minValue", Value::Int(18)),
            ("maxValue", Value::Int(99)),
        ]));

        assert!(rule.evaluate(&Value::Int(30), &scope()).is_empty());
        assert_eq!(rule.evaluate(&Value::Int(12), &scope())[0].message, "Age must be at least 18");
        assert_eq!(rule.evaluate(&Value::from("120"), &scope())[0].kind, "maxValue");

        let not_a_number = rule.evaluate(&Value::from("old"), &scope());
        assert_eq!(not_a_number.len(), 1);
        assert_eq!(not_a_number[0].message, "Age must be a number");

        for value in [Value::from("NaN"), Value::from("inf"), Value::from("-infinity"), Value::Float(f64::INFINITY)] {
            let messages = rule.evaluate(&value, &scope());
            assert_eq!(messages.len(), 1, "{value}");
            assert_eq!(messages[0].message, "Age must be a number");
        }
    }

    #[test]
    fn test_date_format() {
        let rule = rule(Value::map([("dateFormat", Value::from("dd.MM.yyyy"))]));
        assert!(rule.evaluate(&Value::from("24.12.2025"), &scope()).is_empty());
        assert_eq!(rule.evaluate(&Value::from("2025-12-24"), &scope()).len(), 1);

        let time = rule_with("HH:mm");
        assert!(time.evaluate(&Value::from("09:30"), &scope()).is_empty());
        assert_eq!(time.evaluate(&Value::from("9h30"), &scope()).len(), 1);
    }

    fn rule_with(date_pattern: &str) -> ValidationRule {
        rule(Value::map([("dateFormat", Value::from(date_pattern))]))
    }

    #[test]
    fn test_date_pattern_translation() {
        assert_eq!(
            translate_date_pattern("yyyy-MM-dd'T'HH:mm:ss").unwrap(),
            ("%Y-%m-%dT%H:%M:%S".to_string(), DateKind::DateTime)
        );
        assert!(translate_date_pattern("dd.MM.QQ").is_err());
        assert!(translate_date_pattern("--").is_err());
    }

    #[test]
    fn test_email_address() {
        let rule = rule(Value::List(vec![Value::from("emailAddress")]));
        assert!(rule.evaluate(&Value::from("jane.doe@example.org"), &scope()).is_empty());
        assert_eq!(rule.evaluate(&Value::from("jane.doe@"), &scope()).len(), 1);
    }

    #[test]
    fn test_custom_validators_run_after_builtins() {
        let rule = rule(Value::map([("maxLength", Value::Int(3))]))
            .with_validator(|value: &Value| (value.to_text() != "ok").then(|| "not ok".to_string()));

        let messages = rule.evaluate(&Value::from("nope"), &scope());
        let kinds: Vec<_> = messages.iter().map(|m| m.kind.as_str()).collect();
        assert_eq!(kinds, ["maxLength", "custom"]);
    }

    #[test]
    fn test_mandatory_failure_skips_custom_validators() {
        let rule = rule(Value::List(vec![Value::from("mandatory")]))
            .with_validator(|_: &Value| Some("never reported".to_string()));
        let messages = rule.evaluate(&Value::from(""), &scope());
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind, "mandatory");
    }

    #[test]
    fn test_invalid_rules() {
        let parse = |value| ValidationRule::parse("txtUser.text", &value);

        assert!(matches!(
            parse(Value::map([("colour", Value::from("red"))])),
            Err(BuildError::InvalidValidationRule { .. })
        ));
        assert!(parse(Value::map([("regex", Value::from("(unclosed"))])).is_err());
        assert!(parse(Value::List(vec![Value::from("minLength")])).is_err());
        assert!(ValidationRule::parse("noproperty", &Value::List(Vec::new())).is_err());
    }

    #[test]
    fn test_label_resolves_through_resources() {
        let resolver = Arc::new(ResourceResolver::new());
        resolver.add_global_bundle(ResourceBundle::from_pairs("app", [("label.user", "User name")]));
        let scope = ResourceScope::new(resolver, Vec::new(), Vec::new());

        let rule = rule(Value::map([("label", Value::from("label.user")), ("mandatory", Value::Bool(true))]));
        let messages = rule.evaluate(&Value::from(""), &scope);
        assert_eq!(messages[0].label, "User name");
        assert_eq!(messages[0].message, "User name is required");
    }
}
