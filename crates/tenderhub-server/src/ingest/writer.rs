//! Merge writer
//!
//! The only code path that writes tender and supplier rows. A batch is
//! merged in two phases: a pure planning pass that decides exactly which
//! rows will be inserted, then a single transaction that commits them.
//!
//! Supplier references are deduplicated both within the batch and against
//! the store, so one external supplier id maps to exactly one row, ever.
//! Tenders whose id is already persisted are skipped (re-fetching an
//! overlapping page is a no-op, not an error); a residual uniqueness
//! violation still aborts the batch and surfaces to the downloader's
//! fail-stop path.

use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, QueryBuilder};
use thiserror::Error;

use super::source::RawTender;

#[derive(Debug, Error)]
pub enum SaveBatchError {
    #[error("unparsable monetary value '{value}' in tender {tender_id}")]
    MalformedValue { tender_id: String, value: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A supplier row staged for insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSupplier {
    pub id: i32,
    pub name: String,
}

/// A tender row staged for insert, with its resolved supplier ids
#[derive(Debug, Clone)]
pub struct NewTender {
    pub id: String,
    pub date: DateTime<Utc>,
    pub title: String,
    pub description: Option<String>,
    pub awarded_value_in_euro: BigDecimal,
    pub supplier_ids: Vec<i32>,
}

/// What a batch commit will insert, decided before any write
#[derive(Debug, Default)]
pub struct BatchPlan {
    pub suppliers: Vec<NewSupplier>,
    pub tenders: Vec<NewTender>,
    /// Tenders dropped because their id is already persisted (or repeated
    /// within the batch)
    pub skipped_tenders: usize,
}

impl BatchPlan {
    pub fn is_empty(&self) -> bool {
        self.suppliers.is_empty() && self.tenders.is_empty()
    }
}

/// Decide the insert set for a raw batch.
///
/// `existing_supplier_ids` / `existing_tender_ids` are the ids from the
/// batch that the store already holds. Fails without planning anything if
/// any monetary value does not parse.
pub fn plan_batch(
    batch: &[RawTender],
    existing_supplier_ids: &HashSet<i32>,
    existing_tender_ids: &HashSet<String>,
) -> Result<BatchPlan, SaveBatchError> {
    // Suppliers: dedupe within the batch (first name wins), skip ids the
    // store already has. BTreeMap keeps the insert order deterministic.
    let mut staged_suppliers: BTreeMap<i32, NewSupplier> = BTreeMap::new();
    for raw in batch {
        for supplier in raw.awarded.iter().flat_map(|award| &award.suppliers) {
            if existing_supplier_ids.contains(&supplier.id) {
                continue;
            }
            staged_suppliers.entry(supplier.id).or_insert_with(|| NewSupplier {
                id: supplier.id,
                name: supplier.name.clone(),
            });
        }
    }

    let mut tenders = Vec::new();
    let mut skipped_tenders = 0;
    let mut seen_ids: HashSet<&str> = HashSet::new();

    for raw in batch {
        if existing_tender_ids.contains(&raw.id) || !seen_ids.insert(raw.id.as_str()) {
            skipped_tenders += 1;
            continue;
        }

        let value = raw.awarded_value_eur.trim();
        let awarded_value_in_euro =
            BigDecimal::from_str(value).map_err(|_| SaveBatchError::MalformedValue {
                tender_id: raw.id.clone(),
                value: value.to_string(),
            })?;

        // Resolve supplier references, deduped per tender
        let mut supplier_ids = Vec::new();
        let mut seen_suppliers = HashSet::new();
        for supplier in raw.awarded.iter().flat_map(|award| &award.suppliers) {
            if seen_suppliers.insert(supplier.id) {
                supplier_ids.push(supplier.id);
            }
        }

        tenders.push(NewTender {
            id: raw.id.clone(),
            date: raw.date,
            title: raw.title.clone(),
            description: raw.description.clone(),
            awarded_value_in_euro,
            supplier_ids,
        });
    }

    Ok(BatchPlan {
        suppliers: staged_suppliers.into_values().collect(),
        tenders,
        skipped_tenders,
    })
}

/// Merge a raw batch into the store.
///
/// Returns the executed plan. The batch commits atomically: supplier
/// inserts precede the tender and association inserts within one
/// transaction, so a tender is never visible without its suppliers.
#[tracing::instrument(skip(pool, batch), fields(batch_size = batch.len()))]
pub async fn save_batch(pool: &PgPool, batch: &[RawTender]) -> Result<BatchPlan, SaveBatchError> {
    let supplier_ids: Vec<i32> = {
        let unique: HashSet<i32> = batch
            .iter()
            .flat_map(|raw| &raw.awarded)
            .flat_map(|award| &award.suppliers)
            .map(|supplier| supplier.id)
            .collect();
        unique.into_iter().collect()
    };
    let tender_ids: Vec<String> = batch.iter().map(|raw| raw.id.clone()).collect();

    let existing_supplier_ids: HashSet<i32> = if supplier_ids.is_empty() {
        HashSet::new()
    } else {
        sqlx::query_scalar::<_, i32>("SELECT id FROM suppliers WHERE id = ANY($1)")
            .bind(&supplier_ids)
            .fetch_all(pool)
            .await?
            .into_iter()
            .collect()
    };

    let existing_tender_ids: HashSet<String> = if tender_ids.is_empty() {
        HashSet::new()
    } else {
        sqlx::query_scalar::<_, String>("SELECT id FROM tenders WHERE id = ANY($1)")
            .bind(&tender_ids)
            .fetch_all(pool)
            .await?
            .into_iter()
            .collect()
    };

    let plan = plan_batch(batch, &existing_supplier_ids, &existing_tender_ids)?;
    if plan.is_empty() {
        tracing::debug!(skipped = plan.skipped_tenders, "nothing new in batch");
        return Ok(plan);
    }

    let mut tx = pool.begin().await?;

    if !plan.suppliers.is_empty() {
        let mut builder = QueryBuilder::new("INSERT INTO suppliers (id, name) ");
        builder.push_values(&plan.suppliers, |mut b, supplier| {
            b.push_bind(supplier.id).push_bind(&supplier.name);
        });
        builder.build().execute(&mut *tx).await?;
    }

    if !plan.tenders.is_empty() {
        let mut builder = QueryBuilder::new(
            "INSERT INTO tenders (id, date, title, description, awarded_value_in_euro) ",
        );
        builder.push_values(&plan.tenders, |mut b, tender| {
            b.push_bind(&tender.id)
                .push_bind(tender.date)
                .push_bind(&tender.title)
                .push_bind(&tender.description)
                .push_bind(&tender.awarded_value_in_euro);
        });
        builder.build().execute(&mut *tx).await?;

        let associations: Vec<(i32, &str)> = plan
            .tenders
            .iter()
            .flat_map(|tender| {
                tender
                    .supplier_ids
                    .iter()
                    .map(|supplier_id| (*supplier_id, tender.id.as_str()))
            })
            .collect();

        if !associations.is_empty() {
            let mut builder = QueryBuilder::new(
                "INSERT INTO supplier_tenders (supplier_id, tender_id) ",
            );
            builder.push_values(&associations, |mut b, (supplier_id, tender_id)| {
                b.push_bind(*supplier_id).push_bind(*tender_id);
            });
            builder.build().execute(&mut *tx).await?;
        }
    }

    tx.commit().await?;

    tracing::debug!(
        suppliers = plan.suppliers.len(),
        tenders = plan.tenders.len(),
        skipped = plan.skipped_tenders,
        "batch committed"
    );

    Ok(plan)
}
