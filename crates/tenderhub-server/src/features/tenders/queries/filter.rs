//! Dynamic filter and sort composition for tender listings
//!
//! Listing parameters arrive as a set of optional criteria. Each present
//! criterion becomes one typed [`Criterion`] and the whole set is AND-folded
//! into a [`QueryBuilder`] WHERE clause; the sort key is an explicit
//! enum-to-column mapping. Cursor tokens are parsed and re-serialized
//! according to the active sort field's type.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};

use crate::features::tenders::read_model::TenderRow;

/// Sort key for tender listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    Id,
    Date,
    AwardedValueInEuro,
}

impl SortField {
    /// Column backing this sort key
    pub fn column(self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Date => "date",
            SortField::AwardedValueInEuro => "awarded_value_in_euro",
        }
    }

    /// Turn a cursor token into the strict lower-bound criterion for this
    /// sort field.
    ///
    /// The token must parse as the field's type; a token that does not is
    /// mapped to [`Criterion::Unsatisfiable`], so the caller gets an empty
    /// page rather than a parse error. Callers that round-trip tokens from
    /// [`SortField::cursor_token`] always parse.
    pub fn cursor_criterion(self, token: &str) -> Criterion {
        let value = match self {
            SortField::Id => Some(FieldValue::Text(token.to_string())),
            SortField::Date => parse_cursor_timestamp(token).map(FieldValue::Timestamp),
            SortField::AwardedValueInEuro => {
                BigDecimal::from_str(token).ok().map(FieldValue::Decimal)
            },
        };

        match value {
            Some(value) => Criterion::Compare {
                column: self.column(),
                op: ComparisonOp::Gt,
                value,
            },
            None => Criterion::Unsatisfiable,
        }
    }

    /// Serialize the sort-key value of a returned row into the cursor token
    /// for the next page.
    pub(crate) fn cursor_token(self, row: &TenderRow) -> String {
        match self {
            SortField::Id => row.id.clone(),
            SortField::Date => row.date.to_rfc3339(),
            SortField::AwardedValueInEuro => row.awarded_value_in_euro.to_string(),
        }
    }
}

fn parse_cursor_timestamp(token: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(token) {
        return Some(parsed.with_timezone(&Utc));
    }
    // Plain dates are accepted as midnight UTC
    NaiveDate::parse_from_str(token, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}

/// Comparison operator of a [`Criterion::Compare`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    /// Inclusive lower bound
    Ge,
    /// Inclusive upper bound
    Le,
    /// Strict lower bound (cursor paging)
    Gt,
}

impl ComparisonOp {
    fn sql(self) -> &'static str {
        match self {
            ComparisonOp::Ge => " >= ",
            ComparisonOp::Le => " <= ",
            ComparisonOp::Gt => " > ",
        }
    }
}

/// A bindable filter value, typed per column
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Timestamp(DateTime<Utc>),
    Decimal(BigDecimal),
}

/// One filter criterion of a tender listing
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    /// `t.<column> <op> <value>`
    Compare {
        column: &'static str,
        op: ComparisonOp,
        value: FieldValue,
    },
    /// Tender was awarded to the given supplier
    SupplierMembership(i32),
    /// Never matches. The degenerate form of an unparsable cursor token.
    Unsatisfiable,
}

/// AND-fold a criteria list into the builder's WHERE clause.
///
/// An empty list appends nothing; the base SELECT stays unfiltered.
pub fn apply_criteria(builder: &mut QueryBuilder<'_, Postgres>, criteria: &[Criterion]) {
    for (index, criterion) in criteria.iter().enumerate() {
        builder.push(if index == 0 { " WHERE " } else { " AND " });
        match criterion {
            Criterion::Compare { column, op, value } => {
                builder.push("t.").push(column).push(op.sql());
                match value {
                    FieldValue::Text(text) => builder.push_bind(text.clone()),
                    FieldValue::Timestamp(ts) => builder.push_bind(*ts),
                    FieldValue::Decimal(dec) => builder.push_bind(dec.clone()),
                };
            },
            Criterion::SupplierMembership(supplier_id) => {
                builder.push(
                    "EXISTS (SELECT 1 FROM supplier_tenders st \
                     WHERE st.tender_id = t.id AND st.supplier_id = ",
                );
                builder.push_bind(*supplier_id);
                builder.push(")");
            },
            Criterion::Unsatisfiable => {
                builder.push("FALSE");
            },
        }
    }
}

/// Append the ORDER BY clause for the chosen sort key and direction.
pub fn apply_order(builder: &mut QueryBuilder<'_, Postgres>, sort: SortField, descending: bool) {
    builder
        .push(" ORDER BY t.")
        .push(sort.column())
        .push(if descending { " DESC" } else { " ASC" });
}
