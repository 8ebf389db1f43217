//! The closed set of taxonomic ranks and the tables that store them.
//!
//! Every table, alias and foreign-key column name used in SQL comes from the
//! `&'static str` values returned here, so no caller-supplied string is ever
//! interpolated into query text.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

// ─── Rank ────────────────────────────────────────────────────────────────────

/// One of the eight fixed taxonomy levels, ordered root first.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Rank {
  Domain,
  Kingdom,
  Phylum,
  Class,
  Order,
  Family,
  Genus,
  Species,
}

impl Rank {
  /// The seven ranks above species, root first. These are the levels the
  /// hierarchy builder resolves.
  pub const GROUPING: [Rank; 7] = [
    Rank::Domain,
    Rank::Kingdom,
    Rank::Phylum,
    Rank::Class,
    Rank::Order,
    Rank::Family,
    Rank::Genus,
  ];

  pub fn table(self) -> Table {
    match self {
      Self::Domain => Table::Domains,
      Self::Kingdom => Table::Kingdoms,
      Self::Phylum => Table::Phyla,
      Self::Class => Table::Classes,
      Self::Order => Table::Orders,
      Self::Family => Table::Families,
      Self::Genus => Table::Genera,
      Self::Species => Table::Species,
    }
  }

  /// Short alias used for this rank's table in join queries.
  pub fn alias(self) -> &'static str {
    match self {
      Self::Domain => "d",
      Self::Kingdom => "k",
      Self::Phylum => "p",
      Self::Class => "c",
      Self::Order => "o",
      Self::Family => "f",
      Self::Genus => "g",
      Self::Species => "s",
    }
  }

  /// The column a child table uses to reference this rank.
  pub fn id_column(self) -> &'static str {
    match self {
      Self::Domain => "domain_id",
      Self::Kingdom => "kingdom_id",
      Self::Phylum => "phylum_id",
      Self::Class => "class_id",
      Self::Order => "order_id",
      Self::Family => "family_id",
      Self::Genus => "genus_id",
      Self::Species => "species_id",
    }
  }

  pub fn parent(self) -> Option<Rank> {
    match self {
      Self::Domain => None,
      Self::Kingdom => Some(Self::Domain),
      Self::Phylum => Some(Self::Kingdom),
      Self::Class => Some(Self::Phylum),
      Self::Order => Some(Self::Class),
      Self::Family => Some(Self::Order),
      Self::Genus => Some(Self::Family),
      Self::Species => Some(Self::Genus),
    }
  }

  pub fn child(self) -> Option<Rank> {
    match self {
      Self::Domain => Some(Self::Kingdom),
      Self::Kingdom => Some(Self::Phylum),
      Self::Phylum => Some(Self::Class),
      Self::Class => Some(Self::Order),
      Self::Order => Some(Self::Family),
      Self::Family => Some(Self::Genus),
      Self::Genus => Some(Self::Species),
      Self::Species => None,
    }
  }

  /// The foreign-key column on this rank's own table, if it has a parent.
  pub fn parent_column(self) -> Option<&'static str> {
    self.parent().map(Rank::id_column)
  }

  pub fn is_grouping(self) -> bool { self != Self::Species }

  pub fn as_str(self) -> &'static str { self.into() }
}

// ─── Table ───────────────────────────────────────────────────────────────────

/// Every table in the store, in foreign-key dependency order.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Table {
  Domains,
  Kingdoms,
  Phyla,
  Classes,
  Orders,
  Families,
  Genera,
  Species,
  Tags,
  SpeciesTags,
}

impl Table {
  pub fn name(self) -> &'static str { self.into() }

  pub fn rank(self) -> Option<Rank> {
    match self {
      Self::Domains => Some(Rank::Domain),
      Self::Kingdoms => Some(Rank::Kingdom),
      Self::Phyla => Some(Rank::Phylum),
      Self::Classes => Some(Rank::Class),
      Self::Orders => Some(Rank::Order),
      Self::Families => Some(Rank::Family),
      Self::Genera => Some(Rank::Genus),
      Self::Species => Some(Rank::Species),
      Self::Tags | Self::SpeciesTags => None,
    }
  }

  /// Column names, in DDL order.
  pub fn columns(self) -> &'static [&'static str] {
    match self {
      Self::Domains => &["id", "name", "description", "created_at", "updated_at"],
      Self::Kingdoms => &[
        "id", "domain_id", "name", "description", "created_at", "updated_at",
      ],
      Self::Phyla => &[
        "id", "kingdom_id", "name", "description", "created_at", "updated_at",
      ],
      Self::Classes => &[
        "id", "phylum_id", "name", "description", "created_at", "updated_at",
      ],
      Self::Orders => &[
        "id", "class_id", "name", "description", "created_at", "updated_at",
      ],
      Self::Families => &[
        "id", "order_id", "name", "description", "created_at", "updated_at",
      ],
      Self::Genera => &[
        "id", "family_id", "name", "description", "created_at", "updated_at",
      ],
      Self::Species => &[
        "id",
        "genus_id",
        "name",
        "common_name",
        "description",
        "image_url",
        "distribution_map_url",
        "discovery_year",
        "conservation_status",
        "habitat",
        "geographic_distribution",
        "created_at",
        "updated_at",
      ],
      Self::Tags => &["id", "name", "description", "created_at"],
      Self::SpeciesTags => &["species_id", "tag_id"],
    }
  }

  pub fn has_column(self, column: &str) -> bool {
    self.columns().contains(&column)
  }
}
