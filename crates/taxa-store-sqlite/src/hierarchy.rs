//! Write path for ranks, species and tags.
//!
//! These functions take a plain `&Connection` so the store can run several of
//! them inside one transaction (a `Transaction` derefs to `Connection`).

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _, params};
use taxa_core::{
  Error as CoreError, Rank, Table,
  species::{NewSpecies, Species},
  tag::{Tag, normalize_tag_names},
  taxon::{Classification, HierarchyIds},
};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{RawTag, decode_uuid, encode_dt, encode_uuid},
};

/// Treat a blank optional text field as absent.
pub fn non_blank(value: Option<&str>) -> Option<String> {
  value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_owned)
}

/// Fail with `NotFound` unless `table` has a row with `id`.
pub fn ensure_exists(conn: &Connection, table: Table, id: Uuid) -> Result<()> {
  let sql = format!("SELECT 1 FROM {} WHERE id = ?1", table.name());
  let found = conn
    .query_row(&sql, params![encode_uuid(id)], |_| Ok(()))
    .optional()?
    .is_some();
  if found {
    Ok(())
  } else {
    let what = table.rank().map_or("tag", Rank::as_str);
    Err(Error::NotFound(format!("{what} {id}")))
  }
}

// ─── Rank resolver ───────────────────────────────────────────────────────────

/// Get-or-create the `rank` row named `name` within `parent_id`'s scope.
pub fn resolve_rank(
  conn: &Connection,
  rank: Rank,
  name: &str,
  parent_id: Option<Uuid>,
  description: Option<&str>,
) -> Result<Uuid> {
  if !rank.is_grouping() {
    return Err(CoreError::NotAGroupingRank(rank).into());
  }
  let name = name.trim();
  if name.is_empty() {
    return Err(CoreError::MissingName(rank).into());
  }
  let table = rank.table().name();

  let existing: Option<String> = match (rank.parent(), parent_id) {
    (None, None) => conn
      .query_row(
        &format!("SELECT id FROM {table} WHERE name = ?1"),
        params![name],
        |r| r.get(0),
      )
      .optional()?,
    (Some(parent), Some(pid)) => {
      ensure_exists(conn, parent.table(), pid)?;
      conn
        .query_row(
          &format!(
            "SELECT id FROM {table} WHERE {} = ?1 AND name = ?2",
            parent.id_column()
          ),
          params![encode_uuid(pid), name],
          |r| r.get(0),
        )
        .optional()?
    }
    (Some(parent), None) => {
      return Err(CoreError::MissingParent { rank, parent }.into());
    }
    (None, Some(_)) => return Err(CoreError::UnexpectedParent.into()),
  };

  if let Some(id) = existing {
    return decode_uuid(&id);
  }

  let id = Uuid::new_v4();
  let now = encode_dt(Utc::now());
  let description = non_blank(description);
  match (rank.parent_column(), parent_id) {
    (Some(col), Some(pid)) => conn.execute(
      &format!(
        "INSERT INTO {table} (id, {col}, name, description, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)"
      ),
      params![encode_uuid(id), encode_uuid(pid), name, description, now],
    )?,
    _ => conn.execute(
      &format!(
        "INSERT INTO {table} (id, name, description, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)"
      ),
      params![encode_uuid(id), name, description, now],
    )?,
  };

  tracing::debug!(%rank, name, %id, "created rank");
  Ok(id)
}

// ─── Hierarchy builder ───────────────────────────────────────────────────────

/// Resolve the seven levels root first, each scoped by the previous id.
pub fn build_hierarchy(
  conn: &Connection,
  classification: &Classification,
) -> Result<HierarchyIds> {
  classification.validate()?;

  let mut ids = [Uuid::nil(); 7];
  let mut parent = None;
  for (slot, level) in ids.iter_mut().zip(classification.levels()) {
    let id =
      resolve_rank(conn, level.rank, level.name, parent, level.description)?;
    *slot = id;
    parent = Some(id);
  }
  Ok(HierarchyIds::from_chain(ids))
}

// ─── Species ─────────────────────────────────────────────────────────────────

/// Insert a species under `genus_id`. Duplicate names within the genus are a
/// conflict.
pub fn insert_species(
  conn: &Connection,
  genus_id: Uuid,
  input: &NewSpecies,
) -> Result<Species> {
  let name = input.name.trim();
  if name.is_empty() {
    return Err(CoreError::MissingName(Rank::Species).into());
  }
  ensure_exists(conn, Table::Genera, genus_id)?;

  let genus_str = encode_uuid(genus_id);
  let duplicate = conn
    .query_row(
      "SELECT 1 FROM species WHERE genus_id = ?1 AND name = ?2",
      params![genus_str, name],
      |_| Ok(()),
    )
    .optional()?
    .is_some();
  if duplicate {
    return Err(Error::Conflict(format!(
      "species {name:?} already exists in genus {genus_id}"
    )));
  }

  let now = Utc::now();
  let species = Species {
    id:                      Uuid::new_v4(),
    genus_id,
    name:                    name.to_owned(),
    common_name:             non_blank(input.common_name.as_deref()),
    description:             non_blank(input.description.as_deref()),
    image_url:               non_blank(input.image_url.as_deref()),
    distribution_map_url:    non_blank(input.distribution_map_url.as_deref()),
    discovery_year:          input.discovery_year,
    conservation_status:     non_blank(input.conservation_status.as_deref()),
    habitat:                 non_blank(input.habitat.as_deref()),
    geographic_distribution: non_blank(
      input.geographic_distribution.as_deref(),
    ),
    created_at:              now,
    updated_at:              now,
  };

  let now_str = encode_dt(now);
  conn.execute(
    "INSERT INTO species (
       id, genus_id, name, common_name, description, image_url,
       distribution_map_url, discovery_year, conservation_status, habitat,
       geographic_distribution, created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
    params![
      encode_uuid(species.id),
      genus_str,
      species.name,
      species.common_name,
      species.description,
      species.image_url,
      species.distribution_map_url,
      species.discovery_year,
      species.conservation_status,
      species.habitat,
      species.geographic_distribution,
      now_str,
    ],
  )?;

  tracing::debug!(id = %species.id, name = %species.name, "created species");
  Ok(species)
}

// ─── Tags ────────────────────────────────────────────────────────────────────

pub fn find_tag(conn: &Connection, name: &str) -> Result<Option<Tag>> {
  conn
    .query_row(
      "SELECT id, name, description, created_at FROM tags WHERE name = ?1",
      params![name],
      RawTag::from_row,
    )
    .optional()?
    .map(RawTag::into_tag)
    .transpose()
}

pub fn get_or_create_tag(
  conn: &Connection,
  name: &str,
  description: Option<&str>,
) -> Result<Tag> {
  let name = name.trim();
  if name.is_empty() {
    return Err(CoreError::BlankTagName.into());
  }
  if let Some(tag) = find_tag(conn, name)? {
    return Ok(tag);
  }

  let tag = Tag {
    id:          Uuid::new_v4(),
    name:        name.to_owned(),
    description: non_blank(description),
    created_at:  Utc::now(),
  };
  conn.execute(
    "INSERT INTO tags (id, name, description, created_at) VALUES (?1, ?2, ?3, ?4)",
    params![
      encode_uuid(tag.id),
      tag.name,
      tag.description,
      encode_dt(tag.created_at)
    ],
  )?;
  tracing::debug!(id = %tag.id, name = %tag.name, "created tag");
  Ok(tag)
}

/// Get-or-create each named tag and associate it with the species. Existing
/// associations are left alone. Returns the tags in input order.
pub fn attach_tags(
  conn: &Connection,
  species_id: Uuid,
  names: &[String],
) -> Result<Vec<Tag>> {
  let species_str = encode_uuid(species_id);
  let mut tags = Vec::new();
  for name in normalize_tag_names(names) {
    let tag = get_or_create_tag(conn, &name, None)?;
    conn.execute(
      "INSERT OR IGNORE INTO species_tags (species_id, tag_id) VALUES (?1, ?2)",
      params![species_str, encode_uuid(tag.id)],
    )?;
    tags.push(tag);
  }
  Ok(tags)
}
