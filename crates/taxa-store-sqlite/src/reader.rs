//! Read path: rank listings, species listings and the full-hierarchy join.
//!
//! Join depth is chosen per rank from the closed [`Rank`] enumeration, so
//! query text never contains caller input.

use rusqlite::{Connection, OptionalExtension as _, params, params_from_iter};
use taxa_core::{
  Rank,
  species::{FullTaxonomy, Species, SpeciesListing, SpeciesQuery},
  tag::Tag,
  taxon::Taxon,
};
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    RawFullTaxonomy, RawListing, RawSpecies, RawTag, RawTaxon, SPECIES_COLUMNS,
    encode_uuid, taxon_columns,
  },
};

// ─── SQL builders ────────────────────────────────────────────────────────────

/// `JOIN` clauses from `species s` up to and including `top`.
pub fn ancestor_joins(top: Rank) -> String {
  let mut sql = String::new();
  let mut child = Rank::Species;
  while let Some(parent) = child.parent() {
    if parent < top {
      break;
    }
    let alias = parent.alias();
    sql.push_str(&format!(
      "\n JOIN {} {alias} ON {alias}.id = {}.{}",
      parent.table().name(),
      child.alias(),
      parent.id_column(),
    ));
    child = parent;
  }
  sql
}

const TAG_JOINS: &str = "
 LEFT JOIN species_tags st ON st.species_id = s.id
 LEFT JOIN tags t ON t.id = st.tag_id";

/// Species listing query joined up to `top` (at least the genus), filtered by
/// `filter` (an SQL condition or empty).
pub fn listing_sql(top: Rank, filter: &str) -> String {
  let top = top.min(Rank::Genus);
  let where_clause = if filter.is_empty() {
    String::new()
  } else {
    format!("\n WHERE {filter}")
  };
  format!(
    "SELECT {SPECIES_COLUMNS}, g.name, json_group_array(DISTINCT t.name)
     FROM species s{}{TAG_JOINS}{where_clause}
     GROUP BY s.id
     ORDER BY g.name, s.name",
    ancestor_joins(top),
  )
}

pub fn full_taxonomy_sql(filter: &str) -> String {
  let where_clause = if filter.is_empty() {
    String::new()
  } else {
    format!("\n WHERE {filter}")
  };
  format!(
    "SELECT s.id, s.name, s.common_name, s.description, s.image_url,
            s.distribution_map_url, s.discovery_year, s.conservation_status,
            s.habitat, s.geographic_distribution,
            g.id, g.name, f.id, f.name, o.id, o.name, c.id, c.name,
            p.id, p.name, k.id, k.name, d.id, d.name,
            json_group_array(DISTINCT t.name)
     FROM species s{}{TAG_JOINS}{where_clause}
     GROUP BY s.id
     ORDER BY d.name, k.name, p.name, c.name, o.name, f.name, g.name, s.name",
    ancestor_joins(Rank::Domain),
  )
}

/// Escape `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
pub fn escape_like(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for ch in text.chars() {
    if matches!(ch, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(ch);
  }
  out
}

// ─── Ranks ───────────────────────────────────────────────────────────────────

pub fn list_rank(
  conn: &Connection,
  rank: Rank,
  parent_id: Option<Uuid>,
) -> Result<Vec<Taxon>> {
  let base = format!(
    "SELECT {} FROM {}",
    taxon_columns(rank),
    rank.table().name()
  );
  let raws = match (rank.parent_column(), parent_id) {
    (Some(col), Some(pid)) => {
      let mut stmt =
        conn.prepare(&format!("{base} WHERE {col} = ?1 ORDER BY name"))?;
      stmt
        .query_map(params![encode_uuid(pid)], RawTaxon::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?
    }
    (None, Some(_)) => Vec::new(),
    (_, None) => {
      let mut stmt = conn.prepare(&format!("{base} ORDER BY name"))?;
      stmt
        .query_map([], RawTaxon::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?
    }
  };
  raws.into_iter().map(|r| r.into_taxon(rank)).collect()
}

pub fn get_taxon(conn: &Connection, rank: Rank, id: Uuid) -> Result<Option<Taxon>> {
  let sql = format!(
    "SELECT {} FROM {} WHERE id = ?1",
    taxon_columns(rank),
    rank.table().name()
  );
  conn
    .query_row(&sql, params![encode_uuid(id)], RawTaxon::from_row)
    .optional()?
    .map(|r| r.into_taxon(rank))
    .transpose()
}

// ─── Species ─────────────────────────────────────────────────────────────────

pub fn get_species(conn: &Connection, id: Uuid) -> Result<Option<Species>> {
  conn
    .query_row(
      &format!("SELECT {SPECIES_COLUMNS} FROM species s WHERE s.id = ?1"),
      params![encode_uuid(id)],
      RawSpecies::from_row,
    )
    .optional()?
    .map(RawSpecies::into_species)
    .transpose()
}

fn listings<P: rusqlite::Params>(
  conn: &Connection,
  sql: &str,
  params: P,
) -> Result<Vec<SpeciesListing>> {
  let mut stmt = conn.prepare(sql)?;
  let raws = stmt
    .query_map(params, RawListing::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawListing::into_listing).collect()
}

pub fn list_species(conn: &Connection) -> Result<Vec<SpeciesListing>> {
  listings(conn, &listing_sql(Rank::Genus, ""), [])
}

/// Substring search over names and descriptions, optionally restricted to
/// species carrying any of `query.tags`.
pub fn search_species(
  conn: &Connection,
  query: &SpeciesQuery,
) -> Result<Vec<SpeciesListing>> {
  let mut conditions = Vec::new();
  let mut values: Vec<String> = Vec::new();

  if let Some(text) = query.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
  {
    values.push(format!("%{}%", escape_like(text)));
    let n = values.len();
    conditions.push(format!(
      "(s.name LIKE ?{n} ESCAPE '\\' OR s.common_name LIKE ?{n} ESCAPE '\\' \
       OR s.description LIKE ?{n} ESCAPE '\\' OR g.name LIKE ?{n} ESCAPE '\\')"
    ));
  }

  let tags = taxa_core::tag::normalize_tag_names(&query.tags);
  if !tags.is_empty() {
    let placeholders: Vec<String> = tags
      .into_iter()
      .map(|tag| {
        values.push(tag);
        format!("?{}", values.len())
      })
      .collect();
    conditions.push(format!(
      "EXISTS (SELECT 1 FROM species_tags st2 JOIN tags t2 ON t2.id = st2.tag_id
               WHERE st2.species_id = s.id AND t2.name IN ({}))",
      placeholders.join(", ")
    ));
  }

  let sql = listing_sql(Rank::Genus, &conditions.join(" AND "));
  listings(conn, &sql, params_from_iter(values.iter()))
}

/// Every species beneath the `rank` row `id`.
pub fn species_by_rank(
  conn: &Connection,
  rank: Rank,
  id: Uuid,
) -> Result<Vec<SpeciesListing>> {
  let sql = listing_sql(rank, &format!("{}.id = ?1", rank.alias()));
  listings(conn, &sql, params![encode_uuid(id)])
}

pub fn species_by_tag(conn: &Connection, tag_name: &str) -> Result<Vec<SpeciesListing>> {
  let sql = listing_sql(
    Rank::Genus,
    "EXISTS (SELECT 1 FROM species_tags st2 JOIN tags t2 ON t2.id = st2.tag_id
             WHERE st2.species_id = s.id AND t2.name = ?1)",
  );
  listings(conn, &sql, params![tag_name.trim()])
}

// ─── Full taxonomy ───────────────────────────────────────────────────────────

pub fn get_full_taxonomy(conn: &Connection, id: Uuid) -> Result<Option<FullTaxonomy>> {
  conn
    .query_row(
      &full_taxonomy_sql("s.id = ?1"),
      params![encode_uuid(id)],
      RawFullTaxonomy::from_row,
    )
    .optional()?
    .map(RawFullTaxonomy::into_full_taxonomy)
    .transpose()
}

pub fn list_full_taxonomies(conn: &Connection) -> Result<Vec<FullTaxonomy>> {
  let mut stmt = conn.prepare(&full_taxonomy_sql(""))?;
  let raws = stmt
    .query_map([], RawFullTaxonomy::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws
    .into_iter()
    .map(RawFullTaxonomy::into_full_taxonomy)
    .collect()
}

// ─── Tags ────────────────────────────────────────────────────────────────────

pub fn list_tags(conn: &Connection) -> Result<Vec<Tag>> {
  let mut stmt =
    conn.prepare("SELECT id, name, description, created_at FROM tags ORDER BY name")?;
  let raws = stmt
    .query_map([], RawTag::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawTag::into_tag).collect()
}

pub fn get_tag(conn: &Connection, id: Uuid) -> Result<Option<Tag>> {
  conn
    .query_row(
      "SELECT id, name, description, created_at FROM tags WHERE id = ?1",
      params![encode_uuid(id)],
      RawTag::from_row,
    )
    .optional()?
    .map(RawTag::into_tag)
    .transpose()
}

pub fn tags_for_species(conn: &Connection, species_id: Uuid) -> Result<Vec<Tag>> {
  let mut stmt = conn.prepare(
    "SELECT t.id, t.name, t.description, t.created_at
     FROM tags t JOIN species_tags st ON st.tag_id = t.id
     WHERE st.species_id = ?1
     ORDER BY t.name",
  )?;
  let raws = stmt
    .query_map(params![encode_uuid(species_id)], RawTag::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawTag::into_tag).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn join_depth_follows_requested_rank() {
    let genus = ancestor_joins(Rank::Genus);
    assert!(genus.contains("JOIN genera g ON g.id = s.genus_id"));
    assert!(!genus.contains("families"));

    let phylum = ancestor_joins(Rank::Phylum);
    assert!(phylum.contains("JOIN phyla p ON p.id = c.phylum_id"));
    assert!(!phylum.contains("kingdoms"));

    let domain = ancestor_joins(Rank::Domain);
    assert_eq!(domain.matches(" JOIN ").count(), 7);
    assert!(domain.contains("JOIN domains d ON d.id = k.domain_id"));
  }

  #[test]
  fn listing_always_reaches_the_genus() {
    assert!(listing_sql(Rank::Species, "").contains("JOIN genera g"));
  }

  #[test]
  fn like_wildcards_are_escaped() {
    assert_eq!(escape_like("50%_a\\b"), "50\\%\\_a\\\\b");
    assert_eq!(escape_like("coli"), "coli");
  }
}
