//! The whole-store JSON document used by bulk export and import.
//!
//! Rows are kept as flat JSON objects keyed by column name rather than typed
//! structs, so a document always mirrors the tables exactly, including ids
//! and timestamps.

use std::collections::BTreeMap;

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{Error, Result, rank::Table};

/// One table row, keyed by column name.
pub type Row = serde_json::Map<String, Value>;

/// Every table of the store, one field per table in dependency order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dump {
  #[serde(default)]
  pub domains:      Vec<Row>,
  #[serde(default)]
  pub kingdoms:     Vec<Row>,
  #[serde(default)]
  pub phyla:        Vec<Row>,
  #[serde(default)]
  pub classes:      Vec<Row>,
  #[serde(default)]
  pub orders:       Vec<Row>,
  #[serde(default)]
  pub families:     Vec<Row>,
  #[serde(default)]
  pub genera:       Vec<Row>,
  #[serde(default)]
  pub species:      Vec<Row>,
  #[serde(default)]
  pub tags:         Vec<Row>,
  #[serde(default)]
  pub species_tags: Vec<Row>,
}

impl Dump {
  pub fn rows(&self, table: Table) -> &[Row] {
    match table {
      Table::Domains => &self.domains,
      Table::Kingdoms => &self.kingdoms,
      Table::Phyla => &self.phyla,
      Table::Classes => &self.classes,
      Table::Orders => &self.orders,
      Table::Families => &self.families,
      Table::Genera => &self.genera,
      Table::Species => &self.species,
      Table::Tags => &self.tags,
      Table::SpeciesTags => &self.species_tags,
    }
  }

  pub fn rows_mut(&mut self, table: Table) -> &mut Vec<Row> {
    match table {
      Table::Domains => &mut self.domains,
      Table::Kingdoms => &mut self.kingdoms,
      Table::Phyla => &mut self.phyla,
      Table::Classes => &mut self.classes,
      Table::Orders => &mut self.orders,
      Table::Families => &mut self.families,
      Table::Genera => &mut self.genera,
      Table::Species => &mut self.species,
      Table::Tags => &mut self.tags,
      Table::SpeciesTags => &mut self.species_tags,
    }
  }

  /// Check every row before it is written: only known columns, UUID ids and
  /// references, RFC 3339 timestamps and an integer `discovery_year`.
  /// Values the store could not read back are rejected here.
  pub fn validate(&self) -> Result<()> {
    use strum::IntoEnumIterator as _;

    for table in Table::iter() {
      for row in self.rows(table) {
        if let Some(column) = row.keys().find(|k| !table.has_column(k.as_str())) {
          return Err(Error::UnknownColumn {
            table:  table.name().to_owned(),
            column: column.clone(),
          });
        }
        for &column in table.columns() {
          check_value(column, row.get(column)).map_err(|reason| {
            Error::InvalidValue {
              table: table.name().to_owned(),
              column: column.to_owned(),
              reason,
            }
          })?;
        }
      }
    }
    Ok(())
  }

  pub fn to_json_pretty(&self) -> Result<String> {
    Ok(serde_json::to_string_pretty(self)?)
  }

  pub fn from_json(s: &str) -> Result<Self> { Ok(serde_json::from_str(s)?) }
}

/// Check one column value against what the store decodes for it. Absent
/// and null values pass unless the column is an identifier; the schema's
/// NOT NULL constraints cover the rest.
fn check_value(column: &str, value: Option<&Value>) -> Result<(), String> {
  let value = value.unwrap_or(&Value::Null);
  if column == "id" || column.ends_with("_id") {
    return match value.as_str().map(Uuid::parse_str) {
      Some(Ok(_)) => Ok(()),
      Some(Err(e)) => Err(e.to_string()),
      None => Err(format!("expected a UUID string, got {value}")),
    };
  }
  if value.is_null() {
    return Ok(());
  }
  if column.ends_with("_at") {
    return match value.as_str().map(DateTime::parse_from_rfc3339) {
      Some(Ok(_)) => Ok(()),
      Some(Err(e)) => Err(e.to_string()),
      None => Err(format!("expected an RFC 3339 string, got {value}")),
    };
  }
  if column == "discovery_year"
    && value.as_i64().and_then(|y| i32::try_from(y).ok()).is_none()
  {
    return Err(format!("expected a year, got {value}"));
  }
  Ok(())
}

/// Row counts written by an import, per table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
  pub tables: BTreeMap<Table, usize>,
}

impl ImportSummary {
  pub fn total(&self) -> usize { self.tables.values().sum() }
}
