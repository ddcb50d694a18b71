//! Single tender lookup by primary id

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::features::tenders::read_model::{
    load_suppliers, SupplierReadModel, TenderReadModel, TenderRow,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTenderQuery {
    pub id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GetTenderError {
    #[error("Tender '{0}' not found")]
    NotFound(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[tracing::instrument(skip(pool), fields(id = %query.id))]
pub async fn handle(
    pool: PgPool,
    query: GetTenderQuery,
) -> Result<TenderReadModel, GetTenderError> {
    let row = sqlx::query_as::<_, TenderRow>(
        r#"
        SELECT id, date, title, description, awarded_value_in_euro
        FROM tenders
        WHERE id = $1
        "#,
    )
    .bind(&query.id)
    .fetch_optional(&pool)
    .await?
    .ok_or(GetTenderError::NotFound(query.id.clone()))?;

    let suppliers = load_suppliers(&pool, std::slice::from_ref(&query.id))
        .await?
        .into_iter()
        .map(|assoc| SupplierReadModel {
            id: assoc.supplier_id,
            name: assoc.name,
        })
        .collect();

    Ok(TenderReadModel::from_row(row, suppliers))
}
