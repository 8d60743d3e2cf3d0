//! Query filter builder
//!
//! Translates structured quals into a single OData `$filter` expression.
//! Pure and deterministic: the same qual set always renders the same string,
//! with clauses in a fixed field order rather than input order.
//!
//! The Graph filter DSL only supports inclusive comparisons (`ge`/`le`) on
//! timestamp properties, so strict `>` and `<` are simulated by shifting the
//! boundary one second.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use convert_case::{Case, Casing};
use std::str::FromStr;

// ============================================================================
// Qual Types
// ============================================================================

/// Comparison operator on a query qual
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOperator {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
}

impl FromStr for QueryOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" => Ok(Self::Eq),
            ">" => Ok(Self::Gt),
            ">=" => Ok(Self::Ge),
            "<" => Ok(Self::Lt),
            "<=" => Ok(Self::Le),
            other => Err(format!("unsupported operator: {other}")),
        }
    }
}

impl QueryOperator {
    /// Tie-break rank for clause ordering within one field
    fn rank(self) -> u8 {
        match self {
            Self::Eq => 0,
            Self::Gt => 1,
            Self::Ge => 2,
            Self::Lt => 3,
            Self::Le => 4,
        }
    }
}

/// Value side of a qual
#[derive(Debug, Clone, PartialEq)]
pub enum QualValue {
    /// String value; supports equality only
    Str(String),
    /// Timestamp value; supports the full range operator set
    Timestamp(DateTime<Utc>),
}

/// One (field, operator, value) triple from the caller's query
#[derive(Debug, Clone, PartialEq)]
pub struct Qual {
    pub field: String,
    pub operator: QueryOperator,
    pub value: QualValue,
}

impl Qual {
    /// Equality qual on a string field
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator: QueryOperator::Eq,
            value: QualValue::Str(value.into()),
        }
    }

    /// Range qual on a timestamp field
    pub fn timestamp(
        field: impl Into<String>,
        operator: QueryOperator,
        value: DateTime<Utc>,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value: QualValue::Timestamp(value),
        }
    }
}

// ============================================================================
// Filter Builder
// ============================================================================

/// Build an OData `$filter` expression from a qual set
///
/// An explicit raw filter always overrides the synthesized expression
/// entirely. Returns `None` when nothing renders a clause.
pub fn build_filter(quals: &[Qual], raw: Option<&str>) -> Option<String> {
    if let Some(raw) = raw {
        if !raw.is_empty() {
            return Some(raw.to_string());
        }
    }

    let mut clauses: Vec<(String, u8, String)> = Vec::new();

    for qual in quals {
        let field = qual.field.to_case(Case::Camel);
        match &qual.value {
            QualValue::Str(value) => {
                // String fields only support equality; anything else is
                // dropped rather than rendered as an invalid clause.
                if qual.operator == QueryOperator::Eq {
                    // Embedded quotes are doubled per the OData literal rules
                    let clause = format!("{field} eq '{}'", value.replace('\'', "''"));
                    clauses.push((field, qual.operator.rank(), clause));
                }
            }
            QualValue::Timestamp(value) => {
                let clause = render_timestamp_clause(&field, qual.operator, *value);
                clauses.push((field, qual.operator.rank(), clause));
            }
        }
    }

    if clauses.is_empty() {
        return None;
    }

    clauses.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

    Some(
        clauses
            .into_iter()
            .map(|(_, _, clause)| clause)
            .collect::<Vec<_>>()
            .join(" and "),
    )
}

fn render_timestamp_clause(field: &str, operator: QueryOperator, value: DateTime<Utc>) -> String {
    let (op, shifted) = match operator {
        QueryOperator::Eq => ("eq", value),
        QueryOperator::Ge => ("ge", value),
        QueryOperator::Le => ("le", value),
        QueryOperator::Gt => ("ge", value + Duration::seconds(1)),
        QueryOperator::Lt => ("le", value - Duration::seconds(1)),
    };
    format!(
        "{field} {op} {}",
        shifted.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}
