//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings and UUIDs as hyphenated
//! lowercase strings. Rows are first read into `Raw*` structs of column
//! values, then decoded outside the connection thread.

use chrono::{DateTime, Utc};
use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::Value;
use taxa_core::{
  Rank,
  species::{FullTaxonomy, Species, SpeciesListing},
  tag::Tag,
  taxon::Taxon,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Tag name aggregates ─────────────────────────────────────────────────────

/// Decode the output of `json_group_array(DISTINCT t.name)`. A species with no
/// tags aggregates to `[null]`.
pub fn decode_tag_names(s: &str) -> Result<Vec<String>> {
  let raw: Vec<Option<String>> = serde_json::from_str(s)?;
  let mut names: Vec<String> = raw.into_iter().flatten().collect();
  names.sort();
  names.dedup();
  Ok(names)
}

// ─── JSON <-> SQL values ─────────────────────────────────────────────────────

/// Map a bulk-document value onto an SQLite value.
pub fn json_to_sql(value: &Value) -> SqlValue {
  match value {
    Value::Null => SqlValue::Null,
    Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
    Value::Number(n) => match n.as_i64() {
      Some(i) => SqlValue::Integer(i),
      None => n.as_f64().map_or(SqlValue::Null, SqlValue::Real),
    },
    Value::String(s) => SqlValue::Text(s.clone()),
    Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
  }
}

pub fn sql_to_json(value: ValueRef<'_>) -> Value {
  match value {
    ValueRef::Null => Value::Null,
    ValueRef::Integer(i) => Value::from(i),
    ValueRef::Real(f) => {
      serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number)
    }
    ValueRef::Text(t) | ValueRef::Blob(t) => {
      Value::String(String::from_utf8_lossy(t).into_owned())
    }
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Columns shared by every rank table, in select order.
pub fn taxon_columns(rank: Rank) -> String {
  format!(
    "id, {}, name, description, created_at, updated_at",
    rank.parent_column().unwrap_or("NULL")
  )
}

/// Raw strings read from any rank table through [`taxon_columns`].
pub struct RawTaxon {
  pub id:          String,
  pub parent_id:   Option<String>,
  pub name:        String,
  pub description: Option<String>,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawTaxon {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      parent_id:   row.get(1)?,
      name:        row.get(2)?,
      description: row.get(3)?,
      created_at:  row.get(4)?,
      updated_at:  row.get(5)?,
    })
  }

  pub fn into_taxon(self, rank: Rank) -> Result<Taxon> {
    Ok(Taxon {
      id: decode_uuid(&self.id)?,
      rank,
      parent_id: self.parent_id.as_deref().map(decode_uuid).transpose()?,
      name: self.name,
      description: self.description,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Every `species` column, qualified with the `s` alias, in DDL order.
pub const SPECIES_COLUMNS: &str = "s.id, s.genus_id, s.name, s.common_name, \
   s.description, s.image_url, s.distribution_map_url, s.discovery_year, \
   s.conservation_status, s.habitat, s.geographic_distribution, \
   s.created_at, s.updated_at";

/// Number of columns in [`SPECIES_COLUMNS`].
pub const SPECIES_COLUMN_COUNT: usize = 13;

pub struct RawSpecies {
  pub id:                      String,
  pub genus_id:                String,
  pub name:                    String,
  pub common_name:             Option<String>,
  pub description:             Option<String>,
  pub image_url:               Option<String>,
  pub distribution_map_url:    Option<String>,
  pub discovery_year:          Option<i32>,
  pub conservation_status:     Option<String>,
  pub habitat:                 Option<String>,
  pub geographic_distribution: Option<String>,
  pub created_at:              String,
  pub updated_at:              String,
}

impl RawSpecies {
  /// Read [`SPECIES_COLUMNS`] starting at column 0.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                      row.get(0)?,
      genus_id:                row.get(1)?,
      name:                    row.get(2)?,
      common_name:             row.get(3)?,
      description:             row.get(4)?,
      image_url:               row.get(5)?,
      distribution_map_url:    row.get(6)?,
      discovery_year:          row.get(7)?,
      conservation_status:     row.get(8)?,
      habitat:                 row.get(9)?,
      geographic_distribution: row.get(10)?,
      created_at:              row.get(11)?,
      updated_at:              row.get(12)?,
    })
  }

  pub fn into_species(self) -> Result<Species> {
    Ok(Species {
      id:                      decode_uuid(&self.id)?,
      genus_id:                decode_uuid(&self.genus_id)?,
      name:                    self.name,
      common_name:             self.common_name,
      description:             self.description,
      image_url:               self.image_url,
      distribution_map_url:    self.distribution_map_url,
      discovery_year:          self.discovery_year,
      conservation_status:     self.conservation_status,
      habitat:                 self.habitat,
      geographic_distribution: self.geographic_distribution,
      created_at:              decode_dt(&self.created_at)?,
      updated_at:              decode_dt(&self.updated_at)?,
    })
  }
}

/// A species row followed by its genus name and aggregated tag names.
pub struct RawListing {
  pub species:    RawSpecies,
  pub genus_name: String,
  pub tags:       String,
}

impl RawListing {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      species:    RawSpecies::from_row(row)?,
      genus_name: row.get(SPECIES_COLUMN_COUNT)?,
      tags:       row.get(SPECIES_COLUMN_COUNT + 1)?,
    })
  }

  pub fn into_listing(self) -> Result<SpeciesListing> {
    Ok(SpeciesListing {
      species:    self.species.into_species()?,
      genus_name: self.genus_name,
      tags:       decode_tag_names(&self.tags)?,
    })
  }
}

pub struct RawTag {
  pub id:          String,
  pub name:        String,
  pub description: Option<String>,
  pub created_at:  String,
}

impl RawTag {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      name:        row.get(1)?,
      description: row.get(2)?,
      created_at:  row.get(3)?,
    })
  }

  pub fn into_tag(self) -> Result<Tag> {
    Ok(Tag {
      id:          decode_uuid(&self.id)?,
      name:        self.name,
      description: self.description,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Raw columns of the full-hierarchy join, leaf first.
pub struct RawFullTaxonomy {
  pub species_id:              String,
  pub species_name:            String,
  pub common_name:             Option<String>,
  pub description:             Option<String>,
  pub image_url:               Option<String>,
  pub distribution_map_url:    Option<String>,
  pub discovery_year:          Option<i32>,
  pub conservation_status:     Option<String>,
  pub habitat:                 Option<String>,
  pub geographic_distribution: Option<String>,
  /// `(id, name)` for genus, family, order, class, phylum, kingdom, domain.
  pub ancestors:               [(String, String); 7],
  pub tags:                    String,
}

impl RawFullTaxonomy {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    let ancestor = |i: usize| -> rusqlite::Result<(String, String)> {
      Ok((row.get(10 + 2 * i)?, row.get(11 + 2 * i)?))
    };
    Ok(Self {
      species_id:              row.get(0)?,
      species_name:            row.get(1)?,
      common_name:             row.get(2)?,
      description:             row.get(3)?,
      image_url:               row.get(4)?,
      distribution_map_url:    row.get(5)?,
      discovery_year:          row.get(6)?,
      conservation_status:     row.get(7)?,
      habitat:                 row.get(8)?,
      geographic_distribution: row.get(9)?,
      ancestors:               [
        ancestor(0)?,
        ancestor(1)?,
        ancestor(2)?,
        ancestor(3)?,
        ancestor(4)?,
        ancestor(5)?,
        ancestor(6)?,
      ],
      tags:                    row.get(24)?,
    })
  }

  pub fn into_full_taxonomy(self) -> Result<FullTaxonomy> {
    let [genus, family, order, class, phylum, kingdom, domain] = self.ancestors;
    Ok(FullTaxonomy {
      species_id:              decode_uuid(&self.species_id)?,
      species_name:            self.species_name,
      common_name:             self.common_name,
      description:             self.description,
      image_url:               self.image_url,
      distribution_map_url:    self.distribution_map_url,
      discovery_year:          self.discovery_year,
      conservation_status:     self.conservation_status,
      habitat:                 self.habitat,
      geographic_distribution: self.geographic_distribution,
      genus_id:                decode_uuid(&genus.0)?,
      genus_name:              genus.1,
      family_id:               decode_uuid(&family.0)?,
      family_name:             family.1,
      order_id:                decode_uuid(&order.0)?,
      order_name:              order.1,
      class_id:                decode_uuid(&class.0)?,
      class_name:              class.1,
      phylum_id:               decode_uuid(&phylum.0)?,
      phylum_name:             phylum.1,
      kingdom_id:              decode_uuid(&kingdom.0)?,
      kingdom_name:            kingdom.1,
      domain_id:               decode_uuid(&domain.0)?,
      domain_name:             domain.1,
      tags:                    decode_tag_names(&self.tags)?.into_iter().collect(),
    })
  }
}
