//! The `TaxonomyStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `taxa-store-sqlite`).
//! Higher layers (`taxa-api`, `taxa-cli`) depend on this abstraction, not on
//! any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  Classify,
  dump::{Dump, ImportSummary},
  rank::Rank,
  species::{FullTaxonomy, NewSpecies, Species, SpeciesListing, SpeciesPatch, SpeciesQuery},
  tag::Tag,
  taxon::{AddedTaxonomy, Classification, HierarchyIds, Taxon, TaxonPatch},
};

/// Abstraction over a taxonomy store backend.
///
/// Rank rows are created with get-or-create semantics within their parent's
/// scope; species are insert-only. Every method that writes more than one row
/// is atomic.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait TaxonomyStore: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  /// The DDL this backend runs at startup, for display.
  fn schema(&self) -> &'static str;

  // ── Hierarchy ─────────────────────────────────────────────────────────

  /// Return the id of the `rank` row named `name` under `parent_id`, creating
  /// it (with `description`) if absent. An existing row's description is
  /// never changed.
  ///
  /// `parent_id` must be `None` for domains and `Some` for every other
  /// grouping rank; species cannot be resolved.
  fn resolve_rank(
    &self,
    rank: Rank,
    name: String,
    parent_id: Option<Uuid>,
    description: Option<String>,
  ) -> impl Future<Output = Result<Uuid, Self::Error>> + Send + '_;

  /// Resolve all seven levels of `classification`, root first, each scoped by
  /// the previous one. Either every missing level is created or none is.
  fn build_hierarchy(
    &self,
    classification: Classification,
  ) -> impl Future<Output = Result<HierarchyIds, Self::Error>> + Send + '_;

  /// Insert a species under `genus_id` and attach `tags`, creating tags on
  /// demand. A species with the same name under the same genus is a conflict.
  fn add_species(
    &self,
    genus_id: Uuid,
    species: NewSpecies,
    tags: Vec<String>,
  ) -> impl Future<Output = Result<Species, Self::Error>> + Send + '_;

  /// Build the hierarchy and, if given, attach a species with its tags, all in
  /// one transaction.
  fn add_full_taxonomy(
    &self,
    classification: Classification,
    species: Option<NewSpecies>,
    tags: Vec<String>,
  ) -> impl Future<Output = Result<AddedTaxonomy, Self::Error>> + Send + '_;

  // ── Ranks ─────────────────────────────────────────────────────────────

  /// List rows of `rank`, optionally restricted to one parent.
  fn list_rank(
    &self,
    rank: Rank,
    parent_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<Taxon>, Self::Error>> + Send + '_;

  /// Retrieve a rank row by id. Returns `None` if not found.
  fn get_taxon(
    &self,
    rank: Rank,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Taxon>, Self::Error>> + Send + '_;

  /// Edit a rank row in place. Returns `None` if not found.
  fn update_taxon(
    &self,
    rank: Rank,
    id: Uuid,
    patch: TaxonPatch,
  ) -> impl Future<Output = Result<Option<Taxon>, Self::Error>> + Send + '_;

  /// Delete a rank row and everything beneath it. Returns `false` if not
  /// found.
  fn delete_taxon(
    &self,
    rank: Rank,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Species ───────────────────────────────────────────────────────────

  fn get_species(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Species>, Self::Error>> + Send + '_;

  fn list_species(
    &self,
  ) -> impl Future<Output = Result<Vec<SpeciesListing>, Self::Error>> + Send + '_;

  fn search_species<'a>(
    &'a self,
    query: &'a SpeciesQuery,
  ) -> impl Future<Output = Result<Vec<SpeciesListing>, Self::Error>> + Send + 'a;

  /// All species beneath the given grouping-rank row.
  fn species_by_rank(
    &self,
    rank: Rank,
    id: Uuid,
  ) -> impl Future<Output = Result<Vec<SpeciesListing>, Self::Error>> + Send + '_;

  /// The species with its full ancestry and tags. Returns `None` if not found.
  fn get_full_taxonomy(
    &self,
    species_id: Uuid,
  ) -> impl Future<Output = Result<Option<FullTaxonomy>, Self::Error>> + Send + '_;

  /// [`TaxonomyStore::get_full_taxonomy`] for every species.
  fn list_full_taxonomies(
    &self,
  ) -> impl Future<Output = Result<Vec<FullTaxonomy>, Self::Error>> + Send + '_;

  fn update_species(
    &self,
    id: Uuid,
    patch: SpeciesPatch,
  ) -> impl Future<Output = Result<Option<Species>, Self::Error>> + Send + '_;

  fn delete_species(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Tags ──────────────────────────────────────────────────────────────

  /// All tags, sorted by name.
  fn list_tags(
    &self,
  ) -> impl Future<Output = Result<Vec<Tag>, Self::Error>> + Send + '_;

  fn get_or_create_tag(
    &self,
    name: String,
    description: Option<String>,
  ) -> impl Future<Output = Result<Tag, Self::Error>> + Send + '_;

  fn tags_for_species(
    &self,
    species_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Tag>, Self::Error>> + Send + '_;

  fn species_by_tag(
    &self,
    tag_name: String,
  ) -> impl Future<Output = Result<Vec<SpeciesListing>, Self::Error>> + Send + '_;

  /// Attach tags to an existing species; existing associations are kept.
  fn add_tags_to_species(
    &self,
    species_id: Uuid,
    tags: Vec<String>,
  ) -> impl Future<Output = Result<Vec<Tag>, Self::Error>> + Send + '_;

  /// Replace a species' tag set.
  fn set_species_tags(
    &self,
    species_id: Uuid,
    tags: Vec<String>,
  ) -> impl Future<Output = Result<Vec<Tag>, Self::Error>> + Send + '_;

  fn remove_tag_from_species(
    &self,
    species_id: Uuid,
    tag_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn delete_tag(
    &self,
    tag_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Move every association of `source` onto `target`, then delete `source`.
  fn merge_tags(
    &self,
    source: Uuid,
    target: Uuid,
  ) -> impl Future<Output = Result<Tag, Self::Error>> + Send + '_;

  // ── Bulk transfer ─────────────────────────────────────────────────────

  /// Read every table in full.
  fn export_all(
    &self,
  ) -> impl Future<Output = Result<Dump, Self::Error>> + Send + '_;

  /// Replace the contents of every table with `dump`. On any failure nothing
  /// is changed.
  fn import_all(
    &self,
    dump: Dump,
  ) -> impl Future<Output = Result<ImportSummary, Self::Error>> + Send + '_;
}
