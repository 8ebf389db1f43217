//! Handlers for `/tags` endpoints.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use taxa_core::{store::TaxonomyStore, tag::Tag};
use uuid::Uuid;

use crate::{
  error::ApiError,
  extract::{Json, Path},
};

/// `GET /tags`
pub async fn list<S>(State(store): State<Arc<S>>) -> Result<Json<Vec<Tag>>, ApiError>
where
  S: TaxonomyStore,
{
  let tags = store.list_tags().await.map_err(ApiError::from_store)?;
  Ok(Json(tags))
}

/// `DELETE /tags/{id}`
pub async fn delete_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: TaxonomyStore,
{
  if store.delete_tag(id).await.map_err(ApiError::from_store)? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("tag {id} not found")))
  }
}

#[derive(Debug, Deserialize)]
pub struct MergeBody {
  pub target_id: Uuid,
}

/// `POST /tags/{id}/merge` with body `{"target_id":"<uuid>"}`
///
/// Moves every association of `{id}` onto the target and deletes `{id}`.
pub async fn merge<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<MergeBody>,
) -> Result<Json<Tag>, ApiError>
where
  S: TaxonomyStore,
{
  let merged = store
    .merge_tags(id, body.target_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(merged))
}
