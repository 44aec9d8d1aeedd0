use std::collections::BTreeMap;

use infokeeper_contracts::{FieldViolation, parse_date};

mod rules;

/// Closed vocabulary of field constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Required,
    Uuid,
    Email,
    Date,
    CardNumber,
    Cvv,
    Pin,
    OwnerName,
}

impl Rule {
    pub fn message(self) -> &'static str {
        match self {
            Rule::Required => "must be not empty",
            Rule::Uuid => "must be valid uuid",
            Rule::Email => "must be valid email",
            Rule::Date => "must be valid date in format YYYY-MM-DD",
            Rule::CardNumber => "must be valid credit card number",
            Rule::Cvv => "must be valid cvv",
            Rule::Pin => "must be valid pin",
            Rule::OwnerName => "must be valid owner name",
        }
    }

    pub fn accepts(self, value: &str) -> bool {
        match self {
            Rule::Required => !value.trim().is_empty(),
            Rule::Uuid => is_uuid(value),
            Rule::Email => is_email(value),
            // Date bounds on filters are optional; presence is Required's job.
            Rule::Date => value.trim().is_empty() || parse_date(value).is_some(),
            Rule::CardNumber => is_card_number(value),
            Rule::Cvv => is_code(value, 3),
            Rule::Pin => is_code(value, 4),
            Rule::OwnerName => is_owner_name(value),
        }
    }
}

/// One row of a rule table: a field and the rules applied to it, in order.
#[derive(Debug, Clone, Copy)]
pub struct FieldRules {
    pub field: &'static str,
    pub rules: &'static [Rule],
}

/// Implemented by every inbound record that carries validation rules.
///
/// `RULES` is data. Adding a constrained field means adding a row and a
/// `field` arm, never new control flow.
pub trait Validate {
    /// Resource noun used in the `invalid <resource> request` message.
    const RESOURCE: &'static str;
    const RULES: &'static [FieldRules];

    fn field(&self, name: &str) -> Option<&str>;
}

/// Field name to the ordered messages of every rule that field failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViolationReport {
    fields: BTreeMap<String, Vec<String>>,
}

impl ViolationReport {
    pub fn is_valid(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn add(&mut self, field: &str, message: &str) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    pub fn messages(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// One entry per violated field, messages joined with `; `.
    pub fn into_field_violations(self) -> Vec<FieldViolation> {
        self.fields
            .into_iter()
            .map(|(field, messages)| FieldViolation {
                field,
                description: messages.join("; "),
            })
            .collect()
    }
}

/// Evaluates every field of `input` against its rule table.
///
/// A failed `Required` suppresses the remaining rules of that field only.
pub fn validate<T: Validate>(input: &T) -> ViolationReport {
    let mut report = ViolationReport::default();

    for row in T::RULES {
        let value = input.field(row.field).unwrap_or_default();
        for rule in row.rules {
            if rule.accepts(value) {
                continue;
            }
            report.add(row.field, rule.message());
            if *rule == Rule::Required {
                break;
            }
        }
    }

    report
}

pub fn check<T: Validate>(input: &T) -> Result<(), ViolationReport> {
    let report = validate(input);
    if report.is_valid() {
        Ok(())
    } else {
        Err(report)
    }
}

/// Canonical hyphenated form only.
fn is_uuid(value: &str) -> bool {
    value.len() == 36 && uuid::Uuid::try_parse(value).is_ok()
}

fn is_email(value: &str) -> bool {
    if value.len() > 254 || value.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.contains('@') {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}

fn is_code_char(c: char) -> bool {
    !c.is_alphabetic() && !c.is_whitespace()
}

fn is_code(value: &str, len: usize) -> bool {
    value.chars().count() == len && value.chars().all(is_code_char)
}

fn is_card_number(value: &str) -> bool {
    let groups: Vec<&str> = value.split(' ').collect();
    groups.len() == 4 && groups.iter().all(|group| is_code(group, 4))
}

fn is_owner_name(value: &str) -> bool {
    let tokens: Vec<&str> = value.split(' ').collect();
    tokens.len() == 2 && tokens.iter().all(|token| !token.is_empty())
}
