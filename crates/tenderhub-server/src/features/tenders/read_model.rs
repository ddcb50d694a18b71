//! Query-only projections of stored tenders
//!
//! Read models are assembled per request from the `tenders` page rows plus
//! one supplier lookup for the returned ids; they are never persisted.

use std::collections::HashMap;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Flattened tender projection returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenderReadModel {
    pub id: String,
    pub date: DateTime<Utc>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub awarded_value_in_euro: BigDecimal,
    pub suppliers: Vec<SupplierReadModel>,
}

/// Supplier as embedded in a tender read model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierReadModel {
    pub id: i32,
    pub name: String,
}

/// One row of the `tenders` table, as selected by the queries
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct TenderRow {
    pub id: String,
    pub date: DateTime<Utc>,
    pub title: String,
    pub description: Option<String>,
    pub awarded_value_in_euro: BigDecimal,
}

/// One supplier association row for a page of tenders
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct SupplierAssocRow {
    pub tender_id: String,
    pub supplier_id: i32,
    pub name: String,
}

impl TenderReadModel {
    pub(crate) fn from_row(row: TenderRow, suppliers: Vec<SupplierReadModel>) -> Self {
        Self {
            id: row.id,
            date: row.date,
            title: row.title,
            description: row.description,
            awarded_value_in_euro: row.awarded_value_in_euro,
            suppliers,
        }
    }

    /// Attach supplier associations to their tenders, preserving row order.
    pub(crate) fn assemble(
        rows: Vec<TenderRow>,
        associations: Vec<SupplierAssocRow>,
    ) -> Vec<Self> {
        let mut by_tender: HashMap<String, Vec<SupplierReadModel>> = HashMap::new();
        for assoc in associations {
            by_tender.entry(assoc.tender_id).or_default().push(SupplierReadModel {
                id: assoc.supplier_id,
                name: assoc.name,
            });
        }

        rows.into_iter()
            .map(|row| {
                let suppliers = by_tender.remove(&row.id).unwrap_or_default();
                Self::from_row(row, suppliers)
            })
            .collect()
    }
}

/// Fetch the supplier associations for a set of tender ids, ordered by
/// supplier id for a stable projection.
pub(crate) async fn load_suppliers(
    pool: &PgPool,
    tender_ids: &[String],
) -> Result<Vec<SupplierAssocRow>, sqlx::Error> {
    if tender_ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, SupplierAssocRow>(
        r#"
        SELECT st.tender_id, s.id AS supplier_id, s.name
        FROM supplier_tenders st
        JOIN suppliers s ON s.id = st.supplier_id
        WHERE st.tender_id = ANY($1)
        ORDER BY s.id
        "#,
    )
    .bind(tender_ids)
    .fetch_all(pool)
    .await
}
