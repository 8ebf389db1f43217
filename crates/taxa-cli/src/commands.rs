//! Subcommand definitions and their implementations.
//!
//! Every command runs against a [`TaxonomyStore`] and writes its report to
//! the given output, so the binary prints to stdout while tests capture it.

use std::{
  io::{BufRead, Write},
  path::{Path, PathBuf},
};

use anyhow::{Context as _, Result, bail};
use chrono::{DateTime, Local};
use clap::Subcommand;
use taxa_core::{
  Rank,
  dump::Dump,
  species::{NewSpecies, SpeciesListing, SpeciesQuery},
  store::TaxonomyStore,
  tag::split_tag_list,
  taxon::Classification,
};
use uuid::Uuid;

use crate::{
  csv_io::{export_csv, import_csv},
  sources::{Source, SourceClient, SourceUrls, import_batch, import_taxon},
};

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
  /// Create the database and its schema
  Init,

  /// Add the sample Escherichia coli classification
  Sample,

  /// Import species from a CSV file, one species per row
  ImportCsv {
    file: PathBuf,

    /// Field delimiter (a single ASCII character)
    #[arg(long, default_value_t = ',')]
    delimiter: char,
  },

  /// Export every species with its full hierarchy to a CSV file
  ExportCsv { file: PathBuf },

  /// Replace the database contents with a JSON export
  ImportJson { file: PathBuf },

  /// Export every table to a JSON file
  ExportJson { file: PathBuf },

  /// Fetch one taxon from an external service and add it
  ImportSource {
    #[arg(value_enum)]
    source: Source,
    /// Taxon key (GBIF), TSN (ITIS) or page id (EOL)
    id:     String,
  },

  /// Import every `source,taxon_id` row of a CSV file from its service
  ImportBatch {
    file: PathBuf,

    /// Field delimiter (a single ASCII character)
    #[arg(long, default_value_t = ',')]
    delimiter: char,
  },

  /// Add a single species with its classification
  AddSpecies {
    #[arg(long)]
    domain:      String,
    #[arg(long)]
    kingdom:     String,
    #[arg(long)]
    phylum:      String,
    #[arg(long)]
    class:       String,
    #[arg(long)]
    order:       String,
    #[arg(long)]
    family:      String,
    #[arg(long)]
    genus:       String,
    #[arg(long)]
    species:     String,
    #[arg(long)]
    common_name: Option<String>,
    #[arg(long)]
    description: Option<String>,
    /// Comma-separated tag names
    #[arg(long)]
    tags:        Option<String>,
  },

  /// Search species by text or tag; lists everything without filters
  Search {
    #[arg(long)]
    term: Option<String>,
    #[arg(long)]
    tag:  Option<String>,
  },

  /// Show one species with its full classification
  Show { id: Uuid },

  /// Print the SQL schema, or write it to a file
  Schema {
    #[arg(long)]
    file: Option<PathBuf>,
  },

  /// Write a JSON backup of the whole database
  Backup {
    /// Defaults to `taxonomy_backup_<timestamp>.json`
    #[arg(long)]
    file: Option<PathBuf>,
  },

  /// Restore the database from a JSON backup, replacing all data
  Restore {
    file: PathBuf,

    /// Skip the confirmation prompt
    #[arg(long)]
    force: bool,
  },
}

// ─── Dispatch ─────────────────────────────────────────────────────────────────

pub async fn run<S, I, W>(
  store: &S,
  sources: &SourceUrls,
  command: Command,
  input: &mut I,
  out: &mut W,
) -> Result<()>
where
  S: TaxonomyStore,
  I: BufRead,
  W: Write,
{
  match command {
    Command::Init => writeln!(out, "Database schema initialized.")?,
    Command::Sample => {
      let (classification, species, tags) = sample_taxonomy();
      let added = store
        .add_full_taxonomy(classification, Some(species), tags)
        .await?;
      if let Some(id) = added.species_id {
        writeln!(out, "Sample data added with species id {id}")?;
      }
    }
    Command::ImportCsv { file, delimiter } => {
      let outcome = import_csv(store, &file, ascii_delimiter(delimiter)?).await?;
      writeln!(
        out,
        "Import completed. {} species imported, {} errors.",
        outcome.imported, outcome.failed
      )?;
    }
    Command::ImportSource { source, id } => {
      let client = SourceClient::new(sources.clone())?;
      let added = import_taxon(store, &client, source, &id).await?;
      if let Some(species_id) = added.species_id {
        writeln!(out, "Imported {source} taxon {id} as species {species_id}")?;
      }
    }
    Command::ImportBatch { file, delimiter } => {
      let client = SourceClient::new(sources.clone())?;
      let outcome =
        import_batch(store, &client, &file, ascii_delimiter(delimiter)?).await?;
      writeln!(
        out,
        "Batch import completed. {} successful, {} errors.",
        outcome.imported, outcome.failed
      )?;
    }
    Command::ExportCsv { file } => {
      let count = export_csv(store, &file).await?;
      writeln!(out, "Exported {count} species to {}", file.display())?;
    }
    Command::ImportJson { file } => {
      let total = import_json(store, &file).await?;
      writeln!(out, "Imported {total} rows from {}", file.display())?;
    }
    Command::ExportJson { file } => {
      export_json(store, &file).await?;
      writeln!(out, "Database exported to {}", file.display())?;
    }
    Command::AddSpecies {
      domain,
      kingdom,
      phylum,
      class,
      order,
      family,
      genus,
      species,
      common_name,
      description,
      tags,
    } => {
      let classification = Classification::new(
        [&domain, &kingdom, &phylum, &class, &order, &family, &genus].map(String::as_str),
      );
      let species = NewSpecies {
        common_name,
        description,
        ..NewSpecies::new(species)
      };
      let tags = tags.as_deref().map(split_tag_list).unwrap_or_default();
      let added = store
        .add_full_taxonomy(classification, Some(species), tags)
        .await?;
      if let Some(id) = added.species_id {
        writeln!(out, "Species added with id {id}")?;
      }
    }
    Command::Search { term, tag } => search(store, term, tag, out).await?,
    Command::Show { id } => show(store, id, out).await?,
    Command::Schema { file } => match file {
      Some(file) => {
        std::fs::write(&file, store.schema())
          .with_context(|| format!("writing {}", file.display()))?;
        writeln!(out, "Schema written to {}", file.display())?;
      }
      None => writeln!(out, "{}", store.schema())?,
    },
    Command::Backup { file } => {
      let file = file.unwrap_or_else(|| default_backup_path(Local::now()));
      export_json(store, &file).await?;
      writeln!(out, "Database backup created: {}", file.display())?;
    }
    Command::Restore { file, force } => {
      if !file.exists() {
        bail!("backup file {} not found", file.display());
      }
      if !force && !confirm(input, out, "This will overwrite existing data. Continue? (y/n): ")? {
        writeln!(out, "Operation cancelled.")?;
        return Ok(());
      }
      let total = import_json(store, &file).await?;
      writeln!(out, "Database restored from {} ({total} rows)", file.display())?;
    }
  }
  Ok(())
}

fn ascii_delimiter(delimiter: char) -> Result<u8> {
  u8::try_from(delimiter)
    .ok()
    .filter(u8::is_ascii)
    .with_context(|| format!("delimiter {delimiter:?} is not ASCII"))
}

/// The E. coli classification with a description at every level and four
/// tags.
pub fn sample_taxonomy() -> (Classification, NewSpecies, Vec<String>) {
  let classification = Classification {
    domain_description: Some("Single-celled prokaryotic microorganisms".into()),
    kingdom_description: Some("True bacteria".into()),
    phylum_description: Some("Gram-negative bacteria".into()),
    class_description: Some("Class of proteobacteria".into()),
    order_description: Some("Order of gram-negative bacteria".into()),
    family_description: Some("Family of gram-negative bacteria".into()),
    genus_description: Some("Genus of gram-negative bacteria".into()),
    ..Classification::new([
      "Bacteria",
      "Eubacteria",
      "Proteobacteria",
      "Gammaproteobacteria",
      "Enterobacterales",
      "Enterobacteriaceae",
      "Escherichia",
    ])
  };
  let species = NewSpecies {
    common_name: Some("E. coli".into()),
    description: Some("Common gut bacteria, some strains can cause illness".into()),
    discovery_year: Some(1885),
    conservation_status: Some("Not Applicable".into()),
    habitat: Some("Intestinal tract of warm-blooded organisms".into()),
    geographic_distribution: Some("Worldwide".into()),
    ..NewSpecies::new("coli")
  };
  let tags = ["gram-negative", "facultative anaerobe", "pathogenic", "rod-shaped"]
    .map(str::to_owned)
    .to_vec();
  (classification, species, tags)
}

// ─── JSON ─────────────────────────────────────────────────────────────────────

async fn export_json<S: TaxonomyStore>(store: &S, file: &Path) -> Result<()> {
  let dump = store.export_all().await?;
  std::fs::write(file, dump.to_json_pretty()?)
    .with_context(|| format!("writing {}", file.display()))?;
  Ok(())
}

async fn import_json<S: TaxonomyStore>(store: &S, file: &Path) -> Result<usize> {
  let text = std::fs::read_to_string(file)
    .with_context(|| format!("reading {}", file.display()))?;
  let dump = Dump::from_json(&text).context("parsing JSON export")?;
  let summary = store.import_all(dump).await?;
  Ok(summary.total())
}

pub fn default_backup_path(now: DateTime<Local>) -> PathBuf {
  PathBuf::from(format!("taxonomy_backup_{}.json", now.format("%Y%m%d_%H%M%S")))
}

/// Ask a yes/no question; only `y` or `yes` (any case) confirms.
fn confirm<I: BufRead, W: Write>(input: &mut I, out: &mut W, prompt: &str) -> Result<bool> {
  write!(out, "{prompt}")?;
  out.flush()?;
  let mut line = String::new();
  input.read_line(&mut line)?;
  Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}

// ─── Reports ──────────────────────────────────────────────────────────────────

async fn search<S: TaxonomyStore, W: Write>(
  store: &S,
  term: Option<String>,
  tag: Option<String>,
  out: &mut W,
) -> Result<()> {
  let results: Vec<SpeciesListing> = match (term, tag) {
    (None, None) => {
      writeln!(out, "All species:")?;
      store.list_species().await?
    }
    (term, tag) => {
      let query = SpeciesQuery {
        text: term,
        tags: tag.as_deref().map(split_tag_list).unwrap_or_default(),
      };
      writeln!(out, "Matching species:")?;
      store.search_species(&query).await?
    }
  };

  for listing in &results {
    match &listing.species.common_name {
      Some(common) => writeln!(out, "- {} ({common})", listing.scientific_name())?,
      None => writeln!(out, "- {}", listing.scientific_name())?,
    }
  }
  writeln!(out, "Total: {} species", results.len())?;
  Ok(())
}

async fn show<S: TaxonomyStore, W: Write>(store: &S, id: Uuid, out: &mut W) -> Result<()> {
  let Some(full) = store.get_full_taxonomy(id).await? else {
    bail!("species {id} not found");
  };

  writeln!(out, "{}", full.scientific_name())?;
  for rank in Rank::GROUPING {
    writeln!(out, "  {:<8} {}", rank.as_str(), full.at(rank).1)?;
  }
  let optional = [
    ("common name", &full.common_name),
    ("description", &full.description),
    ("habitat", &full.habitat),
    ("status", &full.conservation_status),
    ("range", &full.geographic_distribution),
  ];
  for (label, value) in optional {
    if let Some(value) = value {
      writeln!(out, "  {label}: {value}")?;
    }
  }
  if let Some(year) = full.discovery_year {
    writeln!(out, "  discovered: {year}")?;
  }
  if !full.tags.is_empty() {
    let tags: Vec<&str> = full.tags.iter().map(String::as_str).collect();
    writeln!(out, "  tags: {}", tags.join(", "))?;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use std::io::Cursor;

  use chrono::TimeZone as _;
  use taxa_store_sqlite::SqliteStore;

  use super::*;

  async fn run_capture(store: &SqliteStore, command: Command, input: &str) -> String {
    let mut input = Cursor::new(input.as_bytes().to_vec());
    let mut out = Vec::new();
    run(store, &SourceUrls::default(), command, &mut input, &mut out)
      .await
      .unwrap();
    String::from_utf8(out).unwrap()
  }

  fn add_lion() -> Command {
    Command::AddSpecies {
      domain:      "Eukarya".into(),
      kingdom:     "Animalia".into(),
      phylum:      "Chordata".into(),
      class:       "Mammalia".into(),
      order:       "Carnivora".into(),
      family:      "Felidae".into(),
      genus:       "Panthera".into(),
      species:     "leo".into(),
      common_name: Some("Lion".into()),
      description: None,
      tags:        Some("big-cat, savanna".into()),
    }
  }

  #[tokio::test]
  async fn add_search_and_show() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let added = run_capture(&store, add_lion(), "").await;
    let id: Uuid = added.trim().rsplit(' ').next().unwrap().parse().unwrap();

    let all = run_capture(&store, Command::Search { term: None, tag: None }, "").await;
    assert!(all.contains("- Panthera leo (Lion)"));
    assert!(all.contains("Total: 1 species"));

    let none = run_capture(
      &store,
      Command::Search { term: None, tag: Some("aquatic".into()) },
      "",
    )
    .await;
    assert!(none.contains("Total: 0 species"));

    let shown = run_capture(&store, Command::Show { id }, "").await;
    assert!(shown.starts_with("Panthera leo\n"));
    assert!(shown.contains("family   Felidae"));
    assert!(shown.contains("tags: big-cat, savanna"));
  }

  #[tokio::test]
  async fn backup_and_forced_restore() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    run_capture(&store, add_lion(), "").await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("backup.json");
    run_capture(&store, Command::Backup { file: Some(file.clone()) }, "").await;

    let other = SqliteStore::open_in_memory().await.unwrap();
    let report =
      run_capture(&other, Command::Restore { file: file.clone(), force: true }, "").await;
    assert!(report.contains("restored"));
    assert_eq!(other.export_all().await.unwrap(), store.export_all().await.unwrap());
  }

  #[tokio::test]
  async fn restore_declined_changes_nothing() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("empty.json");
    std::fs::write(&file, "{}").unwrap();
    run_capture(&store, add_lion(), "").await;

    let report = run_capture(&store, Command::Restore { file, force: false }, "n\n").await;
    assert!(report.contains("Operation cancelled."));
    assert_eq!(store.list_species().await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn restore_of_missing_file_fails() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let mut input = Cursor::new(Vec::new());
    let mut out = Vec::new();
    let command = Command::Restore { file: "/nonexistent/backup.json".into(), force: true };
    assert!(
      run(&store, &SourceUrls::default(), command, &mut input, &mut out)
        .await
        .is_err()
    );
  }

  #[tokio::test]
  async fn sample_adds_described_coli() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let report = run_capture(&store, Command::Sample, "").await;
    let id: Uuid = report.trim().rsplit(' ').next().unwrap().parse().unwrap();

    let full = store.get_full_taxonomy(id).await.unwrap().unwrap();
    assert_eq!(full.scientific_name(), "Escherichia coli");
    assert_eq!(full.discovery_year, Some(1885));
    assert_eq!(full.tags.len(), 4);
    assert!(full.tags.contains("facultative anaerobe"));

    let domain = store
      .get_taxon(Rank::Domain, full.domain_id)
      .await
      .unwrap()
      .unwrap();
    assert_eq!(
      domain.description.as_deref(),
      Some("Single-celled prokaryotic microorganisms")
    );
    let genus = store
      .get_taxon(Rank::Genus, full.genus_id)
      .await
      .unwrap()
      .unwrap();
    assert_eq!(genus.description.as_deref(), Some("Genus of gram-negative bacteria"));
  }

  #[test]
  fn backup_name_is_timestamped() {
    let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
    assert_eq!(
      default_backup_path(now),
      PathBuf::from("taxonomy_backup_20240309_140507.json")
    );
  }
}
