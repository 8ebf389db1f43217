//! Handlers for `/species` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/species` | Optional `?search=<text>&tag=<a,b>` |
//! | `POST`   | `/species` | Classification, optional species and tags |
//! | `GET`    | `/species/{id}` | Full taxonomy; 404 if not found |
//! | `PATCH`  | `/species/{id}` | Partial edit |
//! | `DELETE` | `/species/{id}` | |
//! | `GET`    | `/species/{id}/tags` | |
//! | `POST`   | `/species/{id}/tags` | Body: `{"tags":[..]}`; adds |
//! | `PUT`    | `/species/{id}/tags` | Body: `{"tags":[..]}`; replaces |
//! | `DELETE` | `/species/{id}/tags/{tag_id}` | |

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use taxa_core::{
  species::{FullTaxonomy, NewSpecies, Species, SpeciesListing, SpeciesPatch, SpeciesQuery},
  store::TaxonomyStore,
  tag::{Tag, split_tag_list},
  taxon::Classification,
};
use uuid::Uuid;

use crate::{
  error::ApiError,
  extract::{Json, Path, Query},
};

fn species_not_found(id: Uuid) -> ApiError {
  ApiError::NotFound(format!("species {id} not found"))
}

// ─── List / search ───────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub search: Option<String>,
  /// Comma-separated tag names; a species matches if it has any of them.
  pub tag:    Option<String>,
}

/// `GET /species[?search=<text>][&tag=<a,b>]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<SpeciesListing>>, ApiError>
where
  S: TaxonomyStore,
{
  let listings = if params.search.is_none() && params.tag.is_none() {
    store.list_species().await
  } else {
    let query = SpeciesQuery {
      text: params.search,
      tags: params.tag.as_deref().map(split_tag_list).unwrap_or_default(),
    };
    store.search_species(&query).await
  }
  .map_err(ApiError::from_store)?;
  Ok(Json(listings))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// Body of `POST /species`: the seven rank names (and optional descriptions)
/// at the top level, plus an optional species and its tags.
#[derive(Debug, Deserialize)]
pub struct CreateBody {
  #[serde(flatten)]
  pub classification: Classification,
  pub species:        Option<NewSpecies>,
  #[serde(default)]
  pub tags:           Vec<String>,
}

/// `POST /species`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: TaxonomyStore,
{
  let added = store
    .add_full_taxonomy(body.classification, body.species, body.tags)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(added)))
}

// ─── Single species ──────────────────────────────────────────────────────────

/// `GET /species/{id}`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<FullTaxonomy>, ApiError>
where
  S: TaxonomyStore,
{
  let full = store
    .get_full_taxonomy(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| species_not_found(id))?;
  Ok(Json(full))
}

/// `PATCH /species/{id}`
pub async fn update<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(patch): Json<SpeciesPatch>,
) -> Result<Json<Species>, ApiError>
where
  S: TaxonomyStore,
{
  if patch.is_empty() {
    return Err(ApiError::BadRequest("nothing to update".into()));
  }
  let species = store
    .update_species(id, patch)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| species_not_found(id))?;
  Ok(Json(species))
}

/// `DELETE /species/{id}`
pub async fn delete_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: TaxonomyStore,
{
  if store.delete_species(id).await.map_err(ApiError::from_store)? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(species_not_found(id))
  }
}

// ─── Species tags ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TagsBody {
  pub tags: Vec<String>,
}

/// `GET /species/{id}/tags`
pub async fn list_tags<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Tag>>, ApiError>
where
  S: TaxonomyStore,
{
  store
    .get_species(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| species_not_found(id))?;
  let tags = store
    .tags_for_species(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(tags))
}

/// `POST /species/{id}/tags`
pub async fn add_tags<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<TagsBody>,
) -> Result<Json<Vec<Tag>>, ApiError>
where
  S: TaxonomyStore,
{
  let tags = store
    .add_tags_to_species(id, body.tags)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(tags))
}

/// `PUT /species/{id}/tags`
pub async fn set_tags<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<TagsBody>,
) -> Result<Json<Vec<Tag>>, ApiError>
where
  S: TaxonomyStore,
{
  let tags = store
    .set_species_tags(id, body.tags)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(tags))
}

/// `DELETE /species/{id}/tags/{tag_id}`
pub async fn remove_tag<S>(
  State(store): State<Arc<S>>,
  Path((id, tag_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError>
where
  S: TaxonomyStore,
{
  let removed = store
    .remove_tag_from_species(id, tag_id)
    .await
    .map_err(ApiError::from_store)?;
  if removed {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!(
      "tag {tag_id} is not attached to species {id}"
    )))
  }
}
