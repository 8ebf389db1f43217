//! Handlers for `/ranks` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/ranks/{rank}` | Optional `?parent_id=<uuid>` |
//! | `GET`    | `/ranks/{rank}/{id}` | 404 if not found |
//! | `PATCH`  | `/ranks/{rank}/{id}` | Body: `{"name":..,"description":..}` |
//! | `DELETE` | `/ranks/{rank}/{id}` | Cascades to everything beneath |
//! | `GET`    | `/ranks/{rank}/{id}/species` | Species under the row |

use std::sync::Arc;

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use taxa_core::{
  Rank,
  species::SpeciesListing,
  store::TaxonomyStore,
  taxon::{Taxon, TaxonPatch},
};
use uuid::Uuid;

use crate::{
  error::ApiError,
  extract::{Json, Path, Query},
};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub parent_id: Option<Uuid>,
}

/// `GET /ranks/{rank}[?parent_id=<uuid>]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Path(rank): Path<Rank>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Taxon>>, ApiError>
where
  S: TaxonomyStore,
{
  let taxa = store
    .list_rank(rank, params.parent_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(taxa))
}

/// `GET /ranks/{rank}/{id}`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path((rank, id)): Path<(Rank, Uuid)>,
) -> Result<Json<Taxon>, ApiError>
where
  S: TaxonomyStore,
{
  let taxon = store
    .get_taxon(rank, id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("{rank} {id} not found")))?;
  Ok(Json(taxon))
}

/// `PATCH /ranks/{rank}/{id}`
pub async fn update<S>(
  State(store): State<Arc<S>>,
  Path((rank, id)): Path<(Rank, Uuid)>,
  Json(patch): Json<TaxonPatch>,
) -> Result<Json<Taxon>, ApiError>
where
  S: TaxonomyStore,
{
  if patch.is_empty() {
    return Err(ApiError::BadRequest("nothing to update".into()));
  }
  let taxon = store
    .update_taxon(rank, id, patch)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("{rank} {id} not found")))?;
  Ok(Json(taxon))
}

/// `DELETE /ranks/{rank}/{id}`
pub async fn delete_one<S>(
  State(store): State<Arc<S>>,
  Path((rank, id)): Path<(Rank, Uuid)>,
) -> Result<StatusCode, ApiError>
where
  S: TaxonomyStore,
{
  if store.delete_taxon(rank, id).await.map_err(ApiError::from_store)? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("{rank} {id} not found")))
  }
}

/// `GET /ranks/{rank}/{id}/species`
pub async fn species<S>(
  State(store): State<Arc<S>>,
  Path((rank, id)): Path<(Rank, Uuid)>,
) -> Result<Json<Vec<SpeciesListing>>, ApiError>
where
  S: TaxonomyStore,
{
  let listings = store
    .species_by_rank(rank, id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(listings))
}
