//! The SQLite implementation of [`TaxonomyStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{Connection, TransactionBehavior, params};
use uuid::Uuid;

use taxa_core::{
  Error as CoreError, Rank, Table,
  dump::{Dump, ImportSummary},
  species::{FullTaxonomy, NewSpecies, Species, SpeciesListing, SpeciesPatch, SpeciesQuery},
  store::TaxonomyStore,
  tag::Tag,
  taxon::{AddedTaxonomy, Classification, HierarchyIds, Taxon, TaxonPatch},
};

use crate::{
  Error, Result,
  encode::{encode_dt, encode_uuid},
  hierarchy::{self, ensure_exists, non_blank},
  reader,
  schema::SCHEMA,
  transfer,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A taxonomy store backed by a single SQLite file.
///
/// Cloning shares the inner connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// Carry one of our errors through the connection thread.
fn boxed(e: Error) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(e))
}

fn in_transaction<T>(
  conn: &mut Connection,
  f: impl FnOnce(&Connection) -> Result<T>,
) -> Result<T> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let out = f(&tx)?;
  tx.commit()?;
  Ok(out)
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    tracing::info!(path = %path.display(), "opened taxonomy store");
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` on the connection thread outside any explicit transaction.
  async fn with_conn<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
  {
    self
      .conn
      .call(move |conn| f(conn).map_err(boxed))
      .await
      .map_err(Error::from)
  }

  /// Run `f` inside one `IMMEDIATE` transaction, committed only if `f`
  /// succeeds.
  async fn with_tx<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
  {
    self
      .conn
      .call(move |conn| in_transaction(conn, f).map_err(boxed))
      .await
      .map_err(Error::from)
  }

  /// Delete the row with `id` from `table`, reporting whether it existed.
  async fn delete_row(&self, table: Table, id: Uuid) -> Result<bool> {
    self
      .with_conn(move |conn| {
        let sql = format!("DELETE FROM {} WHERE id = ?1", table.name());
        Ok(conn.execute(&sql, params![encode_uuid(id)])? > 0)
      })
      .await
  }
}

// ─── TaxonomyStore impl ──────────────────────────────────────────────────────

impl TaxonomyStore for SqliteStore {
  type Error = Error;

  fn schema(&self) -> &'static str { SCHEMA }

  // ── Hierarchy ─────────────────────────────────────────────────────────────

  async fn resolve_rank(
    &self,
    rank: Rank,
    name: String,
    parent_id: Option<Uuid>,
    description: Option<String>,
  ) -> Result<Uuid> {
    self
      .with_tx(move |conn| {
        hierarchy::resolve_rank(conn, rank, &name, parent_id, description.as_deref())
      })
      .await
  }

  async fn build_hierarchy(
    &self,
    classification: Classification,
  ) -> Result<HierarchyIds> {
    self
      .with_tx(move |conn| hierarchy::build_hierarchy(conn, &classification))
      .await
  }

  async fn add_species(
    &self,
    genus_id: Uuid,
    species: NewSpecies,
    tags: Vec<String>,
  ) -> Result<Species> {
    self
      .with_tx(move |conn| {
        let species = hierarchy::insert_species(conn, genus_id, &species)?;
        hierarchy::attach_tags(conn, species.id, &tags)?;
        Ok(species)
      })
      .await
  }

  async fn add_full_taxonomy(
    &self,
    classification: Classification,
    species: Option<NewSpecies>,
    tags: Vec<String>,
  ) -> Result<AddedTaxonomy> {
    self
      .with_tx(move |conn| {
        let ids = hierarchy::build_hierarchy(conn, &classification)?;
        let species_id = match species {
          Some(input) => {
            let species = hierarchy::insert_species(conn, ids.genus_id, &input)?;
            hierarchy::attach_tags(conn, species.id, &tags)?;
            Some(species.id)
          }
          None => None,
        };
        Ok(AddedTaxonomy { ids, species_id })
      })
      .await
  }

  // ── Ranks ─────────────────────────────────────────────────────────────────

  async fn list_rank(
    &self,
    rank: Rank,
    parent_id: Option<Uuid>,
  ) -> Result<Vec<Taxon>> {
    self
      .with_conn(move |conn| reader::list_rank(conn, rank, parent_id))
      .await
  }

  async fn get_taxon(&self, rank: Rank, id: Uuid) -> Result<Option<Taxon>> {
    self
      .with_conn(move |conn| reader::get_taxon(conn, rank, id))
      .await
  }

  async fn update_taxon(
    &self,
    rank: Rank,
    id: Uuid,
    patch: TaxonPatch,
  ) -> Result<Option<Taxon>> {
    self
      .with_tx(move |conn| {
        let Some(current) = reader::get_taxon(conn, rank, id)? else {
          return Ok(None);
        };
        let name = match patch.name.as_deref().map(str::trim) {
          Some("") => return Err(CoreError::MissingName(rank).into()),
          Some(name) => name.to_owned(),
          None => current.name,
        };
        let description = match patch.description {
          Some(d) => non_blank(Some(d.as_str())),
          None => current.description,
        };
        conn.execute(
          &format!(
            "UPDATE {} SET name = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
            rank.table().name()
          ),
          params![name, description, encode_dt(Utc::now()), encode_uuid(id)],
        )?;
        reader::get_taxon(conn, rank, id)
      })
      .await
  }

  async fn delete_taxon(&self, rank: Rank, id: Uuid) -> Result<bool> {
    let deleted = self.delete_row(rank.table(), id).await?;
    if deleted {
      tracing::info!(%rank, %id, "deleted rank and descendants");
    }
    Ok(deleted)
  }

  // ── Species ───────────────────────────────────────────────────────────────

  async fn get_species(&self, id: Uuid) -> Result<Option<Species>> {
    self.with_conn(move |conn| reader::get_species(conn, id)).await
  }

  async fn list_species(&self) -> Result<Vec<SpeciesListing>> {
    self.with_conn(reader::list_species).await
  }

  async fn search_species<'a>(
    &'a self,
    query: &'a SpeciesQuery,
  ) -> Result<Vec<SpeciesListing>> {
    let query = query.clone();
    self
      .with_conn(move |conn| reader::search_species(conn, &query))
      .await
  }

  async fn species_by_rank(
    &self,
    rank: Rank,
    id: Uuid,
  ) -> Result<Vec<SpeciesListing>> {
    if !rank.is_grouping() {
      return Err(CoreError::NotAGroupingRank(rank).into());
    }
    self
      .with_conn(move |conn| reader::species_by_rank(conn, rank, id))
      .await
  }

  async fn get_full_taxonomy(
    &self,
    species_id: Uuid,
  ) -> Result<Option<FullTaxonomy>> {
    self
      .with_conn(move |conn| reader::get_full_taxonomy(conn, species_id))
      .await
  }

  async fn list_full_taxonomies(&self) -> Result<Vec<FullTaxonomy>> {
    self.with_conn(reader::list_full_taxonomies).await
  }

  async fn update_species(
    &self,
    id: Uuid,
    patch: SpeciesPatch,
  ) -> Result<Option<Species>> {
    self
      .with_tx(move |conn| {
        let Some(current) = reader::get_species(conn, id)? else {
          return Ok(None);
        };
        let name = match patch.name.as_deref().map(str::trim) {
          Some("") => return Err(CoreError::MissingName(Rank::Species).into()),
          Some(name) => name.to_owned(),
          None => current.name,
        };
        let text = |new: Option<String>, old: Option<String>| match new {
          Some(v) => non_blank(Some(v.as_str())),
          None => old,
        };
        conn.execute(
          "UPDATE species SET
             name = ?1, common_name = ?2, description = ?3, image_url = ?4,
             distribution_map_url = ?5, discovery_year = ?6,
             conservation_status = ?7, habitat = ?8,
             geographic_distribution = ?9, updated_at = ?10
           WHERE id = ?11",
          params![
            name,
            text(patch.common_name, current.common_name),
            text(patch.description, current.description),
            text(patch.image_url, current.image_url),
            text(patch.distribution_map_url, current.distribution_map_url),
            patch.discovery_year.unwrap_or(current.discovery_year),
            text(patch.conservation_status, current.conservation_status),
            text(patch.habitat, current.habitat),
            text(patch.geographic_distribution, current.geographic_distribution),
            encode_dt(Utc::now()),
            encode_uuid(id),
          ],
        )?;
        reader::get_species(conn, id)
      })
      .await
  }

  async fn delete_species(&self, id: Uuid) -> Result<bool> {
    self.delete_row(Table::Species, id).await
  }

  // ── Tags ──────────────────────────────────────────────────────────────────

  async fn list_tags(&self) -> Result<Vec<Tag>> {
    self.with_conn(reader::list_tags).await
  }

  async fn get_or_create_tag(
    &self,
    name: String,
    description: Option<String>,
  ) -> Result<Tag> {
    self
      .with_tx(move |conn| {
        hierarchy::get_or_create_tag(conn, &name, description.as_deref())
      })
      .await
  }

  async fn tags_for_species(&self, species_id: Uuid) -> Result<Vec<Tag>> {
    self
      .with_conn(move |conn| reader::tags_for_species(conn, species_id))
      .await
  }

  async fn species_by_tag(&self, tag_name: String) -> Result<Vec<SpeciesListing>> {
    self
      .with_conn(move |conn| reader::species_by_tag(conn, &tag_name))
      .await
  }

  /// Returns the species' full tag set after the addition.
  async fn add_tags_to_species(
    &self,
    species_id: Uuid,
    tags: Vec<String>,
  ) -> Result<Vec<Tag>> {
    self
      .with_tx(move |conn| {
        ensure_exists(conn, Table::Species, species_id)?;
        hierarchy::attach_tags(conn, species_id, &tags)?;
        reader::tags_for_species(conn, species_id)
      })
      .await
  }

  async fn set_species_tags(
    &self,
    species_id: Uuid,
    tags: Vec<String>,
  ) -> Result<Vec<Tag>> {
    self
      .with_tx(move |conn| {
        ensure_exists(conn, Table::Species, species_id)?;
        conn.execute(
          "DELETE FROM species_tags WHERE species_id = ?1",
          params![encode_uuid(species_id)],
        )?;
        hierarchy::attach_tags(conn, species_id, &tags)?;
        reader::tags_for_species(conn, species_id)
      })
      .await
  }

  async fn remove_tag_from_species(
    &self,
    species_id: Uuid,
    tag_id: Uuid,
  ) -> Result<bool> {
    self
      .with_conn(move |conn| {
        let removed = conn.execute(
          "DELETE FROM species_tags WHERE species_id = ?1 AND tag_id = ?2",
          params![encode_uuid(species_id), encode_uuid(tag_id)],
        )?;
        Ok(removed > 0)
      })
      .await
  }

  async fn delete_tag(&self, tag_id: Uuid) -> Result<bool> {
    self.delete_row(Table::Tags, tag_id).await
  }

  async fn merge_tags(&self, source: Uuid, target: Uuid) -> Result<Tag> {
    if source == target {
      return Err(CoreError::SelfMerge.into());
    }
    let merged = self
      .with_tx(move |conn| {
        ensure_exists(conn, Table::Tags, source)?;
        let target_tag = reader::get_tag(conn, target)?
          .ok_or_else(|| Error::NotFound(format!("tag {target}")))?;

        let (source_str, target_str) = (encode_uuid(source), encode_uuid(target));
        conn.execute(
          "INSERT OR IGNORE INTO species_tags (species_id, tag_id)
           SELECT species_id, ?1 FROM species_tags WHERE tag_id = ?2",
          params![target_str, source_str],
        )?;
        conn.execute("DELETE FROM tags WHERE id = ?1", params![source_str])?;
        Ok(target_tag)
      })
      .await?;
    tracing::info!(%source, target = %merged.name, "merged tags");
    Ok(merged)
  }

  // ── Bulk transfer ─────────────────────────────────────────────────────────

  async fn export_all(&self) -> Result<Dump> {
    self.with_tx(transfer::export_all).await
  }

  async fn import_all(&self, dump: Dump) -> Result<ImportSummary> {
    self
      .with_tx(move |conn| transfer::import_all(conn, &dump))
      .await
  }
}
