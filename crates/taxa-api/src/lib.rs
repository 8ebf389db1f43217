//! JSON REST API for Taxa.
//!
//! Exposes an axum [`Router`] backed by any [`taxa_core::store::TaxonomyStore`].
//! Store errors are mapped onto HTTP statuses by their
//! [`taxa_core::ErrorKind`].
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", taxa_api::api_router(store.clone()))
//! ```

pub mod error;
pub mod extract;
pub mod ranks;
pub mod species;
pub mod tags;
pub mod transfer;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post},
};
use taxa_core::store::TaxonomyStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: TaxonomyStore + Send + Sync + 'static,
{
  Router::new()
    // Ranks
    .route("/ranks/{rank}", get(ranks::list::<S>))
    .route(
      "/ranks/{rank}/{id}",
      get(ranks::get_one::<S>)
        .patch(ranks::update::<S>)
        .delete(ranks::delete_one::<S>),
    )
    .route("/ranks/{rank}/{id}/species", get(ranks::species::<S>))
    // Species
    .route("/species", get(species::list::<S>).post(species::create::<S>))
    .route(
      "/species/{id}",
      get(species::get_one::<S>)
        .patch(species::update::<S>)
        .delete(species::delete_one::<S>),
    )
    .route(
      "/species/{id}/tags",
      get(species::list_tags::<S>)
        .post(species::add_tags::<S>)
        .put(species::set_tags::<S>),
    )
    .route("/species/{id}/tags/{tag_id}", delete(species::remove_tag::<S>))
    // Tags
    .route("/tags", get(tags::list::<S>))
    .route("/tags/{id}", delete(tags::delete_one::<S>))
    .route("/tags/{id}/merge", post(tags::merge::<S>))
    // Bulk transfer
    .route("/export", get(transfer::export::<S>))
    .route("/import", post(transfer::import::<S>))
    .route("/schema", get(transfer::schema::<S>))
    .with_state(store)
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use serde_json::{Value, json};
  use taxa_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  async fn router() -> Router {
    let store = SqliteStore::open_in_memory().await.expect("in-memory store");
    api_router(Arc::new(store))
  }

  async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
      Some(body) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  fn coli_body() -> Value {
    json!({
      "domain": "Bacteria",
      "kingdom": "Eubacteria",
      "phylum": "Proteobacteria",
      "class": "Gammaproteobacteria",
      "order": "Enterobacterales",
      "family": "Enterobacteriaceae",
      "genus": "Escherichia",
      "species": { "name": "coli", "common_name": "E. coli" },
      "tags": ["gram-negative", "rod-shaped"]
    })
  }

  #[tokio::test]
  async fn create_then_read_full_taxonomy() {
    let app = router().await;
    let (status, created) = send(&app, "POST", "/species", Some(coli_body())).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["species_id"].as_str().unwrap().to_owned();
    assert!(created["genus_id"].is_string());

    let (status, full) = send(&app, "GET", &format!("/species/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(full["domain_name"], "Bacteria");
    assert_eq!(full["genus_name"], "Escherichia");
    assert_eq!(full["tags"], json!(["gram-negative", "rod-shaped"]));
  }

  #[tokio::test]
  async fn duplicate_species_is_409() {
    let app = router().await;
    send(&app, "POST", "/species", Some(coli_body())).await;
    let (status, body) = send(&app, "POST", "/species", Some(coli_body())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("coli"));
  }

  #[tokio::test]
  async fn missing_rank_name_is_400() {
    let app = router().await;
    let mut body = coli_body();
    body.as_object_mut().unwrap().remove("phylum");
    let (status, body) = send(&app, "POST", "/species", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("phylum"));
  }

  #[tokio::test]
  async fn unknown_species_is_404() {
    let app = router().await;
    let uri = format!("/species/{}", uuid::Uuid::new_v4());
    let (status, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
  }

  #[tokio::test]
  async fn ranks_list_and_scope() {
    let app = router().await;
    let (_, created) = send(&app, "POST", "/species", Some(coli_body())).await;
    let domain_id = created["domain_id"].as_str().unwrap().to_owned();

    let (status, domains) = send(&app, "GET", "/ranks/domain", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(domains[0]["name"], "Bacteria");

    let uri = format!("/ranks/kingdom?parent_id={domain_id}");
    let (_, kingdoms) = send(&app, "GET", &uri, None).await;
    assert_eq!(kingdoms.as_array().unwrap().len(), 1);

    let uri = format!("/ranks/domain/{domain_id}/species");
    let (_, species) = send(&app, "GET", &uri, None).await;
    assert_eq!(species[0]["name"], "coli");

    let (status, _) = send(&app, "GET", "/ranks/tribe", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn malformed_requests_get_json_errors() {
    let app = router().await;

    let (status, body) = send(&app, "GET", "/ranks/tribe", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("tribe"));

    let (status, body) = send(&app, "GET", "/species/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(&app, "GET", "/ranks/kingdom?parent_id=nope", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let req = Request::builder()
      .method("POST")
      .uri("/species")
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from("{bad json"))
      .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].is_string());
  }

  #[tokio::test]
  async fn patch_and_delete_rank() {
    let app = router().await;
    let (_, created) = send(&app, "POST", "/species", Some(coli_body())).await;
    let domain_id = created["domain_id"].as_str().unwrap().to_owned();
    let uri = format!("/ranks/domain/{domain_id}");

    let (status, patched) = send(
      &app,
      "PATCH",
      &uri,
      Some(json!({ "description": "prokaryotes" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["description"], "prokaryotes");

    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, all) = send(&app, "GET", "/species", None).await;
    assert!(all.as_array().unwrap().is_empty());
  }

  #[tokio::test]
  async fn search_and_tag_filters() {
    let app = router().await;
    send(&app, "POST", "/species", Some(coli_body())).await;

    let (_, hits) = send(&app, "GET", "/species?search=escher", None).await;
    assert_eq!(hits.as_array().unwrap().len(), 1);

    let (_, hits) = send(&app, "GET", "/species?tag=rod-shaped,other", None).await;
    assert_eq!(hits.as_array().unwrap().len(), 1);

    let (_, misses) = send(&app, "GET", "/species?tag=other", None).await;
    assert!(misses.as_array().unwrap().is_empty());
  }

  #[tokio::test]
  async fn species_tag_endpoints() {
    let app = router().await;
    let (_, created) = send(&app, "POST", "/species", Some(coli_body())).await;
    let id = created["species_id"].as_str().unwrap().to_owned();
    let uri = format!("/species/{id}/tags");

    let (_, tags) = send(&app, "POST", &uri, Some(json!({ "tags": ["motile"] }))).await;
    assert_eq!(tags.as_array().unwrap().len(), 3);

    let (_, tags) = send(&app, "PUT", &uri, Some(json!({ "tags": ["motile"] }))).await;
    let tag_id = tags[0]["id"].as_str().unwrap().to_owned();
    assert_eq!(tags.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "DELETE", &format!("{uri}/{tag_id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, tags) = send(&app, "GET", &uri, None).await;
    assert!(tags.as_array().unwrap().is_empty());
  }

  #[tokio::test]
  async fn merge_tags_endpoint() {
    let app = router().await;
    send(&app, "POST", "/species", Some(coli_body())).await;
    let (_, tags) = send(&app, "GET", "/tags", None).await;
    let source = tags[0]["id"].as_str().unwrap().to_owned();
    let target = tags[1]["id"].as_str().unwrap().to_owned();

    let uri = format!("/tags/{source}/merge");
    let (status, merged) =
      send(&app, "POST", &uri, Some(json!({ "target_id": target }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(merged["id"], target.as_str());

    let (_, tags) = send(&app, "GET", "/tags", None).await;
    assert_eq!(tags.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "POST", &uri, Some(json!({ "target_id": target }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn export_import_and_schema() {
    let app = router().await;
    send(&app, "POST", "/species", Some(coli_body())).await;
    let (status, dump) = send(&app, "GET", "/export", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dump["genera"].as_array().unwrap().len(), 1);

    let other = router().await;
    let (status, summary) = send(&other, "POST", "/import", Some(dump.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["tables"]["species"], 1);
    let (_, again) = send(&other, "GET", "/export", None).await;
    assert_eq!(again, dump);

    let (status, bad) = send(
      &other,
      "POST",
      "/import",
      Some(json!({ "domains": [{ "id": "x", "colour": "red" }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(bad["error"].as_str().unwrap().contains("colour"));

    let (_, schema) = send(&app, "GET", "/schema", None).await;
    assert!(schema["schema"].as_str().unwrap().contains("CREATE TABLE"));
  }
}
