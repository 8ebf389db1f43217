//! Whole-store export and import.

use rusqlite::{Connection, params_from_iter};
use strum::IntoEnumIterator as _;
use taxa_core::{
  Table,
  dump::{Dump, ImportSummary, Row},
};

use crate::{
  Result,
  encode::{json_to_sql, sql_to_json},
};

fn export_table(conn: &Connection, table: Table) -> Result<Vec<Row>> {
  let columns = table.columns();
  let sql = format!(
    "SELECT {} FROM {} ORDER BY rowid",
    columns.join(", "),
    table.name()
  );
  let mut stmt = conn.prepare(&sql)?;
  let rows = stmt
    .query_map([], |row| {
      let mut out = Row::new();
      for (i, column) in columns.iter().enumerate() {
        out.insert((*column).to_owned(), sql_to_json(row.get_ref(i)?));
      }
      Ok(out)
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

pub fn export_all(conn: &Connection) -> Result<Dump> {
  let mut dump = Dump::default();
  for table in Table::iter() {
    *dump.rows_mut(table) = export_table(conn, table)?;
  }
  tracing::info!(
    species = dump.species.len(),
    tags = dump.tags.len(),
    "exported store"
  );
  Ok(dump)
}

fn insert_row(conn: &Connection, table: Table, row: &Row) -> Result<()> {
  if row.is_empty() {
    conn.execute(&format!("INSERT INTO {} DEFAULT VALUES", table.name()), [])?;
    return Ok(());
  }
  let columns: Vec<&str> = row.keys().map(String::as_str).collect();
  let placeholders: Vec<String> =
    (1..=columns.len()).map(|i| format!("?{i}")).collect();
  let sql = format!(
    "INSERT INTO {} ({}) VALUES ({})",
    table.name(),
    columns.join(", "),
    placeholders.join(", ")
  );
  conn.execute(&sql, params_from_iter(row.values().map(json_to_sql)))?;
  Ok(())
}

/// Replace every table with the contents of `dump`. The caller supplies the
/// transaction; any error here leaves it to roll back.
pub fn import_all(conn: &Connection, dump: &Dump) -> Result<ImportSummary> {
  dump.validate()?;

  // Children first so no cascade runs during the wipe.
  let tables: Vec<Table> = Table::iter().collect();
  for table in tables.iter().rev() {
    conn.execute(&format!("DELETE FROM {}", table.name()), [])?;
  }

  let mut summary = ImportSummary::default();
  for table in tables {
    let rows = dump.rows(table);
    for row in rows {
      insert_row(conn, table, row)?;
    }
    summary.tables.insert(table, rows.len());
  }

  tracing::info!(rows = summary.total(), "imported store");
  Ok(summary)
}
