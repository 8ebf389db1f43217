//! Species rows, their inputs, and the read models assembled from joins.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::rank::Rank;

// ─── Species ─────────────────────────────────────────────────────────────────

/// A stored species row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Species {
  pub id:                      Uuid,
  pub genus_id:                Uuid,
  /// The specific epithet, e.g. `coli` in *Escherichia coli*.
  pub name:                    String,
  pub common_name:             Option<String>,
  pub description:             Option<String>,
  pub image_url:               Option<String>,
  pub distribution_map_url:    Option<String>,
  pub discovery_year:          Option<i32>,
  pub conservation_status:     Option<String>,
  pub habitat:                 Option<String>,
  pub geographic_distribution: Option<String>,
  pub created_at:              DateTime<Utc>,
  pub updated_at:              DateTime<Utc>,
}

/// Input to [`crate::store::TaxonomyStore::add_species`]. Ids and timestamps
/// are always set by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSpecies {
  pub name:                    String,
  pub common_name:             Option<String>,
  pub description:             Option<String>,
  pub image_url:               Option<String>,
  pub distribution_map_url:    Option<String>,
  pub discovery_year:          Option<i32>,
  pub conservation_status:     Option<String>,
  pub habitat:                 Option<String>,
  pub geographic_distribution: Option<String>,
}

impl NewSpecies {
  /// Convenience constructor with every optional field unset.
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into(), ..Self::default() }
  }
}

/// Explicit edit of a species row. Absent fields are left untouched; an
/// empty string clears a text field and `null` clears `discovery_year`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpeciesPatch {
  pub name:                    Option<String>,
  pub common_name:             Option<String>,
  pub description:             Option<String>,
  pub image_url:               Option<String>,
  pub distribution_map_url:    Option<String>,
  #[serde(default, deserialize_with = "present")]
  pub discovery_year:          Option<Option<i32>>,
  pub conservation_status:     Option<String>,
  pub habitat:                 Option<String>,
  pub geographic_distribution: Option<String>,
}

/// Keep an explicit `null` distinct from an absent field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de>,
{
  Option::<T>::deserialize(deserializer).map(Some)
}

impl SpeciesPatch {
  pub fn is_empty(&self) -> bool {
    self.name.is_none()
      && self.common_name.is_none()
      && self.description.is_none()
      && self.image_url.is_none()
      && self.distribution_map_url.is_none()
      && self.discovery_year.is_none()
      && self.conservation_status.is_none()
      && self.habitat.is_none()
      && self.geographic_distribution.is_none()
  }
}

// ─── Read models ─────────────────────────────────────────────────────────────

/// A species as returned by list and search operations: the row, its genus
/// name, and its tag names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesListing {
  #[serde(flatten)]
  pub species:    Species,
  pub genus_name: String,
  pub tags:       Vec<String>,
}

impl SpeciesListing {
  /// Binomial name, e.g. "Escherichia coli".
  pub fn scientific_name(&self) -> String {
    format!("{} {}", self.genus_name, self.species.name)
  }
}

/// A species flattened together with every ancestor and its tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullTaxonomy {
  pub species_id:              Uuid,
  pub species_name:            String,
  pub common_name:             Option<String>,
  pub description:             Option<String>,
  pub image_url:               Option<String>,
  pub distribution_map_url:    Option<String>,
  pub discovery_year:          Option<i32>,
  pub conservation_status:     Option<String>,
  pub habitat:                 Option<String>,
  pub geographic_distribution: Option<String>,
  pub genus_id:                Uuid,
  pub genus_name:              String,
  pub family_id:               Uuid,
  pub family_name:             String,
  pub order_id:                Uuid,
  pub order_name:              String,
  pub class_id:                Uuid,
  pub class_name:              String,
  pub phylum_id:               Uuid,
  pub phylum_name:             String,
  pub kingdom_id:              Uuid,
  pub kingdom_name:            String,
  pub domain_id:               Uuid,
  pub domain_name:             String,
  pub tags:                    BTreeSet<String>,
}

impl FullTaxonomy {
  /// `(id, name)` at `rank`.
  pub fn at(&self, rank: Rank) -> (Uuid, &str) {
    match rank {
      Rank::Domain => (self.domain_id, &self.domain_name),
      Rank::Kingdom => (self.kingdom_id, &self.kingdom_name),
      Rank::Phylum => (self.phylum_id, &self.phylum_name),
      Rank::Class => (self.class_id, &self.class_name),
      Rank::Order => (self.order_id, &self.order_name),
      Rank::Family => (self.family_id, &self.family_name),
      Rank::Genus => (self.genus_id, &self.genus_name),
      Rank::Species => (self.species_id, &self.species_name),
    }
  }

  pub fn scientific_name(&self) -> String {
    format!("{} {}", self.genus_name, self.species_name)
  }
}

// ─── Query ───────────────────────────────────────────────────────────────────

/// Parameters for [`crate::store::TaxonomyStore::search_species`].
#[derive(Debug, Clone, Default)]
pub struct SpeciesQuery {
  /// Case-insensitive substring matched against species name, common name,
  /// description and genus name.
  pub text: Option<String>,
  /// Species must carry at least one of these tags.
  pub tags: Vec<String>,
}
