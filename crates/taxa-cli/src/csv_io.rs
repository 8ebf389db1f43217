//! Flat CSV import and export, one species per row.

use std::path::Path;

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use taxa_core::{
  species::{FullTaxonomy, NewSpecies},
  store::TaxonomyStore,
  tag::split_tag_list,
  taxon::Classification,
};

/// One CSV row. Field order is the column order on export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvRecord {
  pub domain:                  String,
  pub kingdom:                 String,
  pub phylum:                  String,
  pub class:                   String,
  pub order:                   String,
  pub family:                  String,
  pub genus:                   String,
  pub species:                 String,
  pub common_name:             Option<String>,
  pub description:             Option<String>,
  pub image_url:               Option<String>,
  pub distribution_map_url:    Option<String>,
  pub discovery_year:          Option<i32>,
  pub conservation_status:     Option<String>,
  pub habitat:                 Option<String>,
  pub geographic_distribution: Option<String>,
  /// Comma-separated tag names.
  pub tags:                    Option<String>,
}

impl CsvRecord {
  pub fn classification(&self) -> Classification {
    Classification::new([
      self.domain.as_str(),
      self.kingdom.as_str(),
      self.phylum.as_str(),
      self.class.as_str(),
      self.order.as_str(),
      self.family.as_str(),
      self.genus.as_str(),
    ])
  }

  pub fn new_species(&self) -> NewSpecies {
    NewSpecies {
      name:                    self.species.trim().to_owned(),
      common_name:             self.common_name.clone(),
      description:             self.description.clone(),
      image_url:               self.image_url.clone(),
      distribution_map_url:    self.distribution_map_url.clone(),
      discovery_year:          self.discovery_year,
      conservation_status:     self.conservation_status.clone(),
      habitat:                 self.habitat.clone(),
      geographic_distribution: self.geographic_distribution.clone(),
    }
  }

  pub fn tag_names(&self) -> Vec<String> {
    self.tags.as_deref().map(split_tag_list).unwrap_or_default()
  }
}

impl From<&FullTaxonomy> for CsvRecord {
  fn from(full: &FullTaxonomy) -> Self {
    let tags = full.tags.iter().map(String::as_str).collect::<Vec<_>>();
    Self {
      domain:                  full.domain_name.clone(),
      kingdom:                 full.kingdom_name.clone(),
      phylum:                  full.phylum_name.clone(),
      class:                   full.class_name.clone(),
      order:                   full.order_name.clone(),
      family:                  full.family_name.clone(),
      genus:                   full.genus_name.clone(),
      species:                 full.species_name.clone(),
      common_name:             full.common_name.clone(),
      description:             full.description.clone(),
      image_url:               full.image_url.clone(),
      distribution_map_url:    full.distribution_map_url.clone(),
      discovery_year:          full.discovery_year,
      conservation_status:     full.conservation_status.clone(),
      habitat:                 full.habitat.clone(),
      geographic_distribution: full.geographic_distribution.clone(),
      tags:                    (!tags.is_empty()).then(|| tags.join(",")),
    }
  }
}

/// Outcome of a CSV import.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CsvImport {
  pub imported: usize,
  pub failed:   usize,
}

/// Add every row of `path` through the full-taxonomy path. A failing row is
/// logged and counted; the rest still import.
pub async fn import_csv<S>(store: &S, path: &Path, delimiter: u8) -> Result<CsvImport>
where
  S: TaxonomyStore,
{
  let mut reader = csv::ReaderBuilder::new()
    .delimiter(delimiter)
    .trim(csv::Trim::All)
    .from_path(path)
    .with_context(|| format!("opening {}", path.display()))?;

  let mut outcome = CsvImport::default();
  for (index, record) in reader.deserialize::<CsvRecord>().enumerate() {
    // Header is line 1.
    let line = index + 2;
    let record = match record {
      Ok(record) => record,
      Err(e) => {
        tracing::warn!(line, error = %e, "skipping unreadable row");
        outcome.failed += 1;
        continue;
      }
    };

    match store
      .add_full_taxonomy(
        record.classification(),
        Some(record.new_species()),
        record.tag_names(),
      )
      .await
    {
      Ok(_) => {
        tracing::info!(line, "imported {} {}", record.genus, record.species);
        outcome.imported += 1;
      }
      Err(e) => {
        tracing::warn!(line, error = %e, "skipping row");
        outcome.failed += 1;
      }
    }
  }
  Ok(outcome)
}

/// Write every species with its full hierarchy to `path`. Returns the row
/// count.
pub async fn export_csv<S>(store: &S, path: &Path) -> Result<usize>
where
  S: TaxonomyStore,
{
  let all = store.list_full_taxonomies().await?;
  let mut writer = csv::Writer::from_path(path)
    .with_context(|| format!("creating {}", path.display()))?;
  for full in &all {
    writer.serialize(CsvRecord::from(full))?;
  }
  writer.flush()?;
  Ok(all.len())
}

#[cfg(test)]
mod tests {
  use std::io::Write as _;

  use taxa_store_sqlite::SqliteStore;

  use super::*;

  const HEADER: &str = "domain,kingdom,phylum,class,order,family,genus,species,\
                        common_name,discovery_year,tags";

  fn write_csv(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
  }

  #[tokio::test]
  async fn import_counts_failures_and_continues() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let file = write_csv(&format!(
      "{HEADER}\n\
       Bacteria,Eubacteria,Proteobacteria,Gammaproteobacteria,Enterobacterales,Enterobacteriaceae,Escherichia,coli,E. coli,1885,\"gram-negative, rod-shaped\"\n\
       Bacteria,Eubacteria,Proteobacteria,Gammaproteobacteria,Enterobacterales,Enterobacteriaceae,Escherichia,coli,,,\n\
       Eukarya,Animalia,,Mammalia,Carnivora,Felidae,Panthera,leo,Lion,,\n\
       Eukarya,Animalia,Chordata,Mammalia,Carnivora,Felidae,Panthera,leo,Lion,not-a-year,\n\
       Eukarya,Animalia,Chordata,Mammalia,Carnivora,Felidae,Panthera,tigris,Tiger,1758,big-cat\n"
    ));

    let outcome = import_csv(&store, file.path(), b',').await.unwrap();
    assert_eq!(outcome, CsvImport { imported: 2, failed: 3 });

    let listings = store.list_species().await.unwrap();
    let names: Vec<String> = listings.iter().map(|l| l.scientific_name()).collect();
    assert_eq!(names, ["Escherichia coli", "Panthera tigris"]);
    assert_eq!(listings[0].tags, ["gram-negative", "rod-shaped"]);
    assert_eq!(listings[0].species.discovery_year, Some(1885));
  }

  #[tokio::test]
  async fn export_then_import_reproduces_species() {
    let source = SqliteStore::open_in_memory().await.unwrap();
    let file = write_csv(
      "domain;kingdom;phylum;class;order;family;genus;species;common_name;discovery_year;tags\n\
       Eukarya;Animalia;Chordata;Mammalia;Carnivora;Felidae;Panthera;leo;Lion;1758;big-cat,savanna\n",
    );
    let outcome = import_csv(&source, file.path(), b';').await.unwrap();
    assert_eq!(outcome.imported, 1);

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("species.csv");
    assert_eq!(export_csv(&source, &out).await.unwrap(), 1);

    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("domain,kingdom,phylum,class,order,family,genus,species,"));
    assert!(text.contains("\"big-cat,savanna\""));

    let target = SqliteStore::open_in_memory().await.unwrap();
    let outcome = import_csv(&target, &out, b',').await.unwrap();
    assert_eq!(outcome, CsvImport { imported: 1, failed: 0 });

    let a = source.list_full_taxonomies().await.unwrap();
    let b = target.list_full_taxonomies().await.unwrap();
    assert_eq!(CsvRecord::from(&a[0]), CsvRecord::from(&b[0]));
  }

  #[test]
  fn record_splits_tags_and_builds_classification() {
    let record = CsvRecord {
      domain: "Bacteria".into(),
      genus: " Escherichia ".into(),
      species: " coli ".into(),
      tags: Some("a, ,b".into()),
      ..CsvRecord::default()
    };
    assert_eq!(record.tag_names(), ["a", "b"]);
    assert_eq!(record.new_species().name, "coli");
    assert_eq!(record.classification().levels()[6].name, "Escherichia");
  }
}
