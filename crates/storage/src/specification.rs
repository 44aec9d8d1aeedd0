//! Ownership-scoped filter predicates.
//!
//! A [`Specification`] turns an owner id plus a sparse filter into one
//! parameterized `WHERE` clause. Clause order comes from the filter's
//! descriptor table, so placeholder `$i` always binds argument `i`.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use infokeeper_contracts::parse_date;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clause {
    /// Case-insensitive substring match.
    Contains,
    OnOrAfter,
    OnOrBefore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Date,
    Timestamp,
}

/// One row of a filter descriptor table.
#[derive(Debug, Clone, Copy)]
pub struct FilterField {
    /// Name of the filter field on the wire.
    pub param: &'static str,
    pub column: &'static str,
    pub clause: Clause,
    pub column_type: ColumnType,
}

impl FilterField {
    pub const fn contains(param: &'static str, column: &'static str) -> Self {
        Self {
            param,
            column,
            clause: Clause::Contains,
            column_type: ColumnType::Text,
        }
    }

    pub const fn after(param: &'static str, column: &'static str, column_type: ColumnType) -> Self {
        Self {
            param,
            column,
            clause: Clause::OnOrAfter,
            column_type,
        }
    }

    pub const fn before(
        param: &'static str,
        column: &'static str,
        column_type: ColumnType,
    ) -> Self {
        Self {
            param,
            column,
            clause: Clause::OnOrBefore,
            column_type,
        }
    }
}

/// A sparse filter over one resource kind.
pub trait Filter {
    /// Declared clause order.
    const FIELDS: &'static [FilterField];

    /// Raw value of a filter field. Blank means absent.
    fn value(&self, param: &str) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryArg {
    Text(String),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub column: &'static str,
    pub clause: Clause,
    /// Unwrapped comparison value; `Contains` holds the plain needle.
    pub value: QueryArg,
}

impl Condition {
    /// Evaluates the condition against a column value read from a record.
    pub fn matches(&self, actual: &QueryArg) -> bool {
        match (self.clause, &self.value, actual) {
            (Clause::Contains, QueryArg::Text(needle), QueryArg::Text(haystack)) => haystack
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            (Clause::OnOrAfter, QueryArg::Date(bound), QueryArg::Date(v)) => v >= bound,
            (Clause::OnOrBefore, QueryArg::Date(bound), QueryArg::Date(v)) => v <= bound,
            (Clause::OnOrAfter, QueryArg::Timestamp(bound), QueryArg::Timestamp(v)) => v >= bound,
            (Clause::OnOrBefore, QueryArg::Timestamp(bound), QueryArg::Timestamp(v)) => v <= bound,
            _ => false,
        }
    }

    fn arg(&self) -> QueryArg {
        match (&self.clause, &self.value) {
            (Clause::Contains, QueryArg::Text(needle)) => {
                QueryArg::Text(format!("%{}%", escape_like(needle)))
            }
            (_, value) => value.clone(),
        }
    }

    fn operator(&self) -> &'static str {
        match self.clause {
            Clause::Contains => "ILIKE",
            Clause::OnOrAfter => ">=",
            Clause::OnOrBefore => "<=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecificationError {
    MissingOwner,
    InvalidDate { field: &'static str },
}

impl std::fmt::Display for SpecificationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpecificationError::MissingOwner => write!(f, "owner id must be non-empty"),
            SpecificationError::InvalidDate { field } => {
                write!(f, "{} must be a date in format YYYY-MM-DD", field)
            }
        }
    }
}

impl std::error::Error for SpecificationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specification {
    owner_id: String,
    conditions: Vec<Condition>,
}

impl Specification {
    pub fn new<F: Filter>(owner_id: &str, filter: &F) -> Result<Self, SpecificationError> {
        if owner_id.trim().is_empty() {
            return Err(SpecificationError::MissingOwner);
        }

        let mut conditions = Vec::new();
        for field in F::FIELDS {
            let raw = filter.value(field.param);
            if raw.trim().is_empty() {
                continue;
            }

            let value = match field.column_type {
                ColumnType::Text => QueryArg::Text(raw.to_string()),
                ColumnType::Date => QueryArg::Date(
                    parse_date(raw).ok_or(SpecificationError::InvalidDate { field: field.param })?,
                ),
                ColumnType::Timestamp => {
                    let date = parse_date(raw)
                        .ok_or(SpecificationError::InvalidDate { field: field.param })?;
                    QueryArg::Timestamp(day_bound(date, field.clause))
                }
            };

            conditions.push(Condition {
                column: field.column,
                clause: field.clause,
                value,
            });
        }

        Ok(Self {
            owner_id: owner_id.to_string(),
            conditions,
        })
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// `owner_id = $1` followed by one clause per present field.
    pub fn predicate(&self) -> (String, Vec<QueryArg>) {
        let mut clauses = Vec::with_capacity(self.conditions.len() + 1);
        let mut args = Vec::with_capacity(self.conditions.len() + 1);

        clauses.push("owner_id = $1".to_string());
        args.push(QueryArg::Text(self.owner_id.clone()));

        for condition in &self.conditions {
            args.push(condition.arg());
            clauses.push(format!(
                "{} {} ${}",
                condition.column,
                condition.operator(),
                args.len()
            ));
        }

        (clauses.join(" AND "), args)
    }

    pub fn query(&self, base: &str) -> (String, Vec<QueryArg>) {
        let (predicate, args) = self.predicate();
        (format!("{} WHERE {}", base, predicate), args)
    }
}

/// A calendar-day bound over a timestamp column covers the whole day (UTC).
fn day_bound(date: NaiveDate, clause: Clause) -> DateTime<Utc> {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    match clause {
        Clause::OnOrBefore => date
            .checked_add_days(Days::new(1))
            .map(|next| next.and_time(NaiveTime::MIN).and_utc() - chrono::Duration::microseconds(1))
            .unwrap_or(start),
        _ => start,
    }
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
