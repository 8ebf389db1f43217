//! Rank rows and the classification input used to build a hierarchy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, rank::Rank};

// ─── Taxon ───────────────────────────────────────────────────────────────────

/// A row of any rank table, viewed through the columns every rank shares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxon {
  pub id:          Uuid,
  pub rank:        Rank,
  /// `None` only for domains.
  pub parent_id:   Option<Uuid>,
  pub name:        String,
  pub description: Option<String>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// Explicit edit of a rank row. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaxonPatch {
  pub name:        Option<String>,
  pub description: Option<String>,
}

impl TaxonPatch {
  pub fn is_empty(&self) -> bool {
    self.name.is_none() && self.description.is_none()
  }
}

// ─── Classification ──────────────────────────────────────────────────────────

/// One level of a [`Classification`], borrowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Level<'a> {
  pub rank:        Rank,
  pub name:        &'a str,
  pub description: Option<&'a str>,
}

/// The seven ancestor names of a species, with optional descriptions that are
/// only used when a level is created.
///
/// Every name is required; [`Classification::validate`] rejects blanks rather
/// than substituting a placeholder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
  #[serde(default)]
  pub domain:              String,
  #[serde(default)]
  pub kingdom:             String,
  #[serde(default)]
  pub phylum:              String,
  #[serde(default)]
  pub class:               String,
  #[serde(default)]
  pub order:               String,
  #[serde(default)]
  pub family:              String,
  #[serde(default)]
  pub genus:               String,
  pub domain_description:  Option<String>,
  pub kingdom_description: Option<String>,
  pub phylum_description:  Option<String>,
  pub class_description:   Option<String>,
  pub order_description:   Option<String>,
  pub family_description:  Option<String>,
  pub genus_description:   Option<String>,
}

impl Classification {
  /// Build from the seven names, root first, with no descriptions.
  pub fn new(names: [&str; 7]) -> Self {
    let [domain, kingdom, phylum, class, order, family, genus] =
      names.map(str::to_owned);
    Self {
      domain,
      kingdom,
      phylum,
      class,
      order,
      family,
      genus,
      ..Self::default()
    }
  }

  /// The seven levels, root first, names trimmed.
  pub fn levels(&self) -> [Level<'_>; 7] {
    fn level<'a>(
      rank: Rank,
      name: &'a str,
      description: Option<&'a str>,
    ) -> Level<'a> {
      Level { rank, name: name.trim(), description }
    }
    [
      level(Rank::Domain, &self.domain, self.domain_description.as_deref()),
      level(Rank::Kingdom, &self.kingdom, self.kingdom_description.as_deref()),
      level(Rank::Phylum, &self.phylum, self.phylum_description.as_deref()),
      level(Rank::Class, &self.class, self.class_description.as_deref()),
      level(Rank::Order, &self.order, self.order_description.as_deref()),
      level(Rank::Family, &self.family, self.family_description.as_deref()),
      level(Rank::Genus, &self.genus, self.genus_description.as_deref()),
    ]
  }

  /// Reject the classification if any level's name is blank.
  pub fn validate(&self) -> Result<()> {
    match self.levels().iter().find(|l| l.name.is_empty()) {
      Some(level) => Err(Error::MissingName(level.rank)),
      None => Ok(()),
    }
  }
}

// ─── Resolved ids ────────────────────────────────────────────────────────────

/// The ids of the seven levels of a built hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyIds {
  pub domain_id:  Uuid,
  pub kingdom_id: Uuid,
  pub phylum_id:  Uuid,
  pub class_id:   Uuid,
  pub order_id:   Uuid,
  pub family_id:  Uuid,
  pub genus_id:   Uuid,
}

impl HierarchyIds {
  /// Assemble from the resolved ids, root first.
  pub fn from_chain(ids: [Uuid; 7]) -> Self {
    let [domain_id, kingdom_id, phylum_id, class_id, order_id, family_id, genus_id] =
      ids;
    Self {
      domain_id,
      kingdom_id,
      phylum_id,
      class_id,
      order_id,
      family_id,
      genus_id,
    }
  }

  pub fn id(&self, rank: Rank) -> Option<Uuid> {
    match rank {
      Rank::Domain => Some(self.domain_id),
      Rank::Kingdom => Some(self.kingdom_id),
      Rank::Phylum => Some(self.phylum_id),
      Rank::Class => Some(self.class_id),
      Rank::Order => Some(self.order_id),
      Rank::Family => Some(self.family_id),
      Rank::Genus => Some(self.genus_id),
      Rank::Species => None,
    }
  }
}

/// Result of adding a classification with an optional species attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddedTaxonomy {
  #[serde(flatten)]
  pub ids:        HierarchyIds,
  pub species_id: Option<Uuid>,
}
