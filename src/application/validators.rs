//! Declarative form validation.
//!
//! Every form has one [`FormSchema`], looked up by [`FormKind`]. A schema lists fields
//! in source order; each field carries an ordered list of rules and the first failing
//! rule decides that field's message. Validation is synchronous and runs before any
//! call to the identity provider or the profile store.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use strum::IntoStaticStr;
use validator::ValidateEmail;

/// Field name → message for every field that failed validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `message` for `field` unless the field already failed.
    pub fn insert(&mut self, field: &str, message: &str) {
        self.0
            .entry(field.to_string())
            .or_insert_with(|| message.to_string());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    fn into_result(self) -> ValidationResult {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

pub type ValidationResult = Result<(), FieldErrors>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
pub enum FormKind {
    SignUp,
    SignIn,
    EmailChange,
    ProfileEdit,
}

#[derive(Debug, Clone)]
pub enum Rule {
    Required,
    Email,
    MinLength(usize),
    MaxLength(usize),
    Pattern(Regex),
    /// Value must equal another field of the same input.
    Equals(&'static str),
    /// Value must differ from another field of the same input.
    NotEquals(&'static str),
}

impl Rule {
    fn holds(&self, value: &str, input: &FormInput<'_>) -> bool {
        match self {
            Rule::Required => !value.trim().is_empty(),
            Rule::Email => is_valid_email(value),
            Rule::MinLength(min) => value.chars().count() >= *min,
            Rule::MaxLength(max) => value.chars().count() <= *max,
            Rule::Pattern(re) => re.is_match(value),
            Rule::Equals(other) => value == input.get(other),
            Rule::NotEquals(other) => value != input.get(other),
        }
    }
}

#[derive(Debug, Clone)]
struct Constraint {
    rule: Rule,
    message: &'static str,
}

#[derive(Debug, Clone)]
pub struct Field {
    name: &'static str,
    constraints: Vec<Constraint>,
}

impl Field {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            constraints: Vec::new(),
        }
    }

    pub fn rule(mut self, rule: Rule, message: &'static str) -> Self {
        self.constraints.push(Constraint { rule, message });
        self
    }

    pub fn required(self, message: &'static str) -> Self {
        self.rule(Rule::Required, message)
    }

    pub fn email(self, message: &'static str) -> Self {
        self.rule(Rule::Email, message)
    }

    pub fn min_length(self, min: usize, message: &'static str) -> Self {
        self.rule(Rule::MinLength(min), message)
    }

    pub fn max_length(self, max: usize, message: &'static str) -> Self {
        self.rule(Rule::MaxLength(max), message)
    }

    pub fn pattern(self, re: Regex, message: &'static str) -> Self {
        self.rule(Rule::Pattern(re), message)
    }

    pub fn equals(self, other: &'static str, message: &'static str) -> Self {
        self.rule(Rule::Equals(other), message)
    }

    pub fn not_equals(self, other: &'static str, message: &'static str) -> Self {
        self.rule(Rule::NotEquals(other), message)
    }

    fn first_violation(&self, input: &FormInput<'_>) -> Option<&'static str> {
        let value = input.get(self.name);
        self.constraints
            .iter()
            .find(|c| !c.rule.holds(value, input))
            .map(|c| c.message)
    }
}

#[derive(Debug, Clone)]
pub struct FormSchema {
    kind: FormKind,
    fields: Vec<Field>,
}

impl FormSchema {
    pub fn new(kind: FormKind) -> Self {
        Self {
            kind,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }
}

/// Submitted values by field name. Absent fields read as the empty string.
#[derive(Debug, Clone, Default)]
pub struct FormInput<'a>(BTreeMap<&'a str, &'a str>);

impl<'a> FormInput<'a> {
    pub fn get(&self, field: &str) -> &'a str {
        self.0.get(field).copied().unwrap_or("")
    }

    pub fn with(mut self, field: &'a str, value: &'a str) -> Self {
        self.0.insert(field, value);
        self
    }
}

impl<'a, const N: usize> From<[(&'a str, &'a str); N]> for FormInput<'a> {
    fn from(pairs: [(&'a str, &'a str); N]) -> Self {
        Self(pairs.into_iter().collect())
    }
}

pub fn validate(schema: &FormSchema, input: &FormInput<'_>) -> ValidationResult {
    let mut errors = FieldErrors::new();
    for field in &schema.fields {
        if let Some(message) = field.first_violation(input) {
            errors.insert(field.name, message);
        }
    }
    if !errors.is_empty() {
        tracing::debug!(form = <&'static str>::from(schema.kind), %errors, "Form rejected");
    }
    errors.into_result()
}

pub fn schema_for(kind: FormKind) -> &'static FormSchema {
    match kind {
        FormKind::SignUp => &SIGN_UP,
        FormKind::SignIn => &SIGN_IN,
        FormKind::EmailChange => &EMAIL_CHANGE,
        FormKind::ProfileEdit => &PROFILE_EDIT,
    }
}

pub const NAME_MAX_LEN: usize = 50;
pub const INTRODUCE_MAX_LEN: usize = 500;
pub const PASSWORD_MIN_LEN: usize = 6;

const INVALID_EMAIL: &str = "Not a valid email address.";

fn no_control_chars() -> Regex {
    Regex::new(r"^\P{Cc}*$").expect("static pattern compiles")
}

static SIGN_UP: Lazy<FormSchema> = Lazy::new(|| {
    FormSchema::new(FormKind::SignUp)
        .field(
            Field::new("email")
                .required("Enter your email address.")
                .email(INVALID_EMAIL),
        )
        .field(
            Field::new("password")
                .required("Enter a password.")
                .min_length(PASSWORD_MIN_LEN, "Password must be at least 6 characters."),
        )
        .field(
            Field::new("name")
                .max_length(NAME_MAX_LEN, "Name must be at most 50 characters.")
                .pattern(no_control_chars(), "Name contains invalid characters."),
        )
});

static SIGN_IN: Lazy<FormSchema> = Lazy::new(|| {
    FormSchema::new(FormKind::SignIn)
        .field(
            Field::new("email")
                .required("Enter your email address.")
                .email(INVALID_EMAIL),
        )
        .field(Field::new("password").required("Enter your password."))
});

static EMAIL_CHANGE: Lazy<FormSchema> = Lazy::new(|| {
    FormSchema::new(FormKind::EmailChange)
        .field(
            Field::new("new_email")
                .required("Enter the new email address.")
                .email(INVALID_EMAIL)
                .not_equals(
                    "current_email",
                    "The new email address is the same as the current one.",
                ),
        )
        .field(
            Field::new("new_email_confirm")
                .required("Confirm the new email address.")
                .email(INVALID_EMAIL)
                .equals("new_email", "The confirmation does not match the new email address."),
        )
});

static PROFILE_EDIT: Lazy<FormSchema> = Lazy::new(|| {
    FormSchema::new(FormKind::ProfileEdit)
        .field(
            Field::new("name")
                .required("Enter your name.")
                .min_length(2, "Name must be at least 2 characters.")
                .max_length(NAME_MAX_LEN, "Name must be at most 50 characters.")
                .pattern(no_control_chars(), "Name contains invalid characters."),
        )
        .field(Field::new("introduce").max_length(
            INTRODUCE_MAX_LEN,
            "Introduction must be at most 500 characters.",
        ))
});

/// Avatar uploads: present, at most `max_bytes`, JPEG or PNG.
pub fn validate_avatar(content_type: Option<&str>, size: usize, max_bytes: usize) -> ValidationResult {
    let mut errors = FieldErrors::new();
    if size == 0 {
        errors.insert("avatar", "Choose an image to upload.");
    } else if size > max_bytes {
        errors.insert("avatar", "Images must be 2MB or smaller.");
    } else if !matches!(content_type, Some("image/jpeg") | Some("image/png")) {
        errors.insert("avatar", "Images must be JPG or PNG.");
    }
    errors.into_result()
}

/// Validates that the input looks like a valid email address
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty() && email.validate_email()
}
