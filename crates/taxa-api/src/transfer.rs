//! Bulk export/import and schema display.

use std::sync::Arc;

use axum::extract::State;
use serde_json::{Value, json};
use taxa_core::{
  dump::{Dump, ImportSummary},
  store::TaxonomyStore,
};

use crate::{error::ApiError, extract::Json};

/// `GET /export`
pub async fn export<S>(State(store): State<Arc<S>>) -> Result<Json<Dump>, ApiError>
where
  S: TaxonomyStore,
{
  let dump = store.export_all().await.map_err(ApiError::from_store)?;
  Ok(Json(dump))
}

/// `POST /import`: replace the whole store with the posted document.
pub async fn import<S>(
  State(store): State<Arc<S>>,
  Json(dump): Json<Dump>,
) -> Result<Json<ImportSummary>, ApiError>
where
  S: TaxonomyStore,
{
  let summary = store.import_all(dump).await.map_err(ApiError::from_store)?;
  Ok(Json(summary))
}

/// `GET /schema`
pub async fn schema<S>(State(store): State<Arc<S>>) -> Json<Value>
where
  S: TaxonomyStore,
{
  Json(json!({ "schema": store.schema() }))
}
