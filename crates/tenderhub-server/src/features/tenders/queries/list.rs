//! Tender listing query
//!
//! Translates the optional filter/sort/paging parameters into two storage
//! round-trips: a COUNT over the filtered set, then the page query. Two
//! paging strategies are supported as deliberate alternatives: offset
//! paging via `page`, and cursor paging via `page_after` (which wins when
//! both are present). The total is always counted over the filtered set
//! without the cursor criterion, so it is stable across pages in both
//! modes.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, QueryBuilder};

use super::filter::{apply_criteria, apply_order, ComparisonOp, Criterion, FieldValue, SortField};
use crate::features::shared::pagination::{PageMeta, PageParams};
use crate::features::tenders::read_model::{load_suppliers, TenderReadModel, TenderRow};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ListTendersQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub awarded_value_in_euro_from: Option<BigDecimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub awarded_value_in_euro_to: Option<BigDecimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_field: Option<SortField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_descending: Option<bool>,
    /// Cursor: sort-key value of the last record of the previous page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_after: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListTendersResponse {
    pub items: Vec<TenderReadModel>,
    pub pagination: PageMeta,
}

#[derive(Debug, thiserror::Error)]
pub enum ListTendersError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ListTendersQuery {
    /// The filter criteria present in this query, cursor excluded.
    fn criteria(&self) -> Vec<Criterion> {
        let mut criteria = Vec::new();

        if let Some(supplier_id) = self.supplier_id {
            criteria.push(Criterion::SupplierMembership(supplier_id));
        }
        if let Some(date_from) = self.date_from {
            criteria.push(Criterion::Compare {
                column: "date",
                op: ComparisonOp::Ge,
                value: FieldValue::Timestamp(date_from),
            });
        }
        if let Some(date_to) = self.date_to {
            criteria.push(Criterion::Compare {
                column: "date",
                op: ComparisonOp::Le,
                value: FieldValue::Timestamp(date_to),
            });
        }
        if let Some(ref value_from) = self.awarded_value_in_euro_from {
            criteria.push(Criterion::Compare {
                column: "awarded_value_in_euro",
                op: ComparisonOp::Ge,
                value: FieldValue::Decimal(value_from.clone()),
            });
        }
        if let Some(ref value_to) = self.awarded_value_in_euro_to {
            criteria.push(Criterion::Compare {
                column: "awarded_value_in_euro",
                op: ComparisonOp::Le,
                value: FieldValue::Decimal(value_to.clone()),
            });
        }

        criteria
    }
}

#[tracing::instrument(
    skip(pool, query),
    fields(
        sort = ?query.sort_field,
        supplier_id = ?query.supplier_id,
        page_after = ?query.page_after
    )
)]
pub async fn handle(
    pool: PgPool,
    query: ListTendersQuery,
) -> Result<ListTendersResponse, ListTendersError> {
    let paging = PageParams::new(query.page, query.page_size);
    let sort = query.sort_field.unwrap_or_default();
    let descending = query.sort_descending.unwrap_or(false);
    let criteria = query.criteria();

    // Total over the filtered set; a second round-trip, never derived from
    // the returned page.
    let mut count_builder = QueryBuilder::new("SELECT COUNT(*) FROM tenders t");
    apply_criteria(&mut count_builder, &criteria);
    let total: i64 = count_builder.build_query_scalar().fetch_one(&pool).await?;

    let mut page_builder = QueryBuilder::new(
        "SELECT t.id, t.date, t.title, t.description, t.awarded_value_in_euro FROM tenders t",
    );
    let mut page_criteria = criteria;
    if let Some(ref token) = query.page_after {
        page_criteria.push(sort.cursor_criterion(token));
    }
    apply_criteria(&mut page_builder, &page_criteria);
    apply_order(&mut page_builder, sort, descending);
    page_builder.push(" LIMIT ").push_bind(paging.page_size());
    if query.page_after.is_none() {
        page_builder.push(" OFFSET ").push_bind(paging.offset());
    }

    let rows: Vec<TenderRow> = page_builder.build_query_as().fetch_all(&pool).await?;

    let tender_ids: Vec<String> = rows.iter().map(|row| row.id.clone()).collect();
    let associations = load_suppliers(&pool, &tender_ids).await?;

    // Cursor for the following page; absent when this page came back empty
    let next_page_after = rows.last().map(|row| sort.cursor_token(row));
    let items = TenderReadModel::assemble(rows, associations);

    tracing::debug!(count = items.len(), total, "tenders listed");

    Ok(ListTendersResponse {
        items,
        pagination: PageMeta {
            page: paging.page(),
            page_size: paging.page_size(),
            total,
            next_page_after,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn empty_query_builds_no_criteria() {
        assert!(ListTendersQuery::default().criteria().is_empty());
    }

    #[test]
    fn present_parameters_each_become_one_criterion() {
        let query = ListTendersQuery {
            supplier_id: Some(7),
            date_from: Some(Utc::now()),
            awarded_value_in_euro_from: Some(BigDecimal::from_str("50.00").unwrap()),
            ..Default::default()
        };

        let criteria = query.criteria();
        assert_eq!(criteria.len(), 3);
        assert!(matches!(criteria[0], Criterion::SupplierMembership(7)));
        assert!(matches!(
            criteria[1],
            Criterion::Compare { column: "date", op: ComparisonOp::Ge, .. }
        ));
        assert!(matches!(
            criteria[2],
            Criterion::Compare { column: "awarded_value_in_euro", op: ComparisonOp::Ge, .. }
        ));
    }

    #[test]
    fn bounds_are_inclusive_pairs() {
        let query = ListTendersQuery {
            date_from: Some(Utc::now()),
            date_to: Some(Utc::now()),
            ..Default::default()
        };

        let criteria = query.criteria();
        assert!(matches!(
            criteria[0],
            Criterion::Compare { op: ComparisonOp::Ge, .. }
        ));
        assert!(matches!(
            criteria[1],
            Criterion::Compare { op: ComparisonOp::Le, .. }
        ));
    }

    #[test]
    fn query_deserializes_from_url_parameters() {
        let query: ListTendersQuery = serde_urlencoded_like(
            "page_size=10&sort_field=date&sort_descending=true&supplier_id=3",
        );
        assert_eq!(query.page_size, Some(10));
        assert_eq!(query.sort_field, Some(SortField::Date));
        assert_eq!(query.sort_descending, Some(true));
        assert_eq!(query.supplier_id, Some(3));
        assert!(query.page_after.is_none());
    }

    fn serde_urlencoded_like(input: &str) -> ListTendersQuery {
        // Checks the field names and enum spellings the Query extractor
        // will see, without pulling in a urlencoded parser
        serde_json::from_value(
            input
                .split('&')
                .map(|pair| {
                    let (key, value) = pair.split_once('=').unwrap();
                    let value = match key {
                        "page" | "page_size" | "supplier_id" => {
                            serde_json::Value::from(value.parse::<i64>().unwrap())
                        },
                        "sort_descending" => serde_json::Value::from(value == "true"),
                        _ => serde_json::Value::from(value),
                    };
                    (key.to_string(), value)
                })
                .collect::<serde_json::Map<String, serde_json::Value>>()
                .into(),
        )
        .unwrap()
    }
}
