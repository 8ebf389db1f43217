//! Species import from external taxonomy services: GBIF, ITIS and the
//! Encyclopedia of Life.
//!
//! Each service response is mapped onto a [`Fetched`] record and added
//! through `add_full_taxonomy`, the same path CSV rows take.

use std::{path::Path, time::Duration};

use anyhow::{Context as _, Result, anyhow, bail};
use clap::ValueEnum;
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use taxa_core::{
  Rank,
  species::NewSpecies,
  store::TaxonomyStore,
  taxon::{AddedTaxonomy, Classification},
};

use crate::csv_io::CsvImport;

// ─── Sources ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Source {
  /// Global Biodiversity Information Facility (taxon key)
  Gbif,
  /// Integrated Taxonomic Information System (TSN)
  Itis,
  /// Encyclopedia of Life (page id)
  Eol,
}

impl Source {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Gbif => "gbif",
      Self::Itis => "itis",
      Self::Eol => "eol",
    }
  }
}

impl std::fmt::Display for Source {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Base URLs of the services, settable under `[sources]` in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SourceUrls {
  pub gbif: String,
  pub itis: String,
  pub eol:  String,
}

impl Default for SourceUrls {
  fn default() -> Self {
    Self {
      gbif: "https://api.gbif.org/v1".to_owned(),
      itis: "https://services.itis.gov".to_owned(),
      eol:  "https://eol.org/api".to_owned(),
    }
  }
}

/// A species and its classification as read from a service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fetched {
  /// Domain through genus, root first. Empty where the service had nothing.
  pub ranks:   [String; 7],
  pub species: NewSpecies,
}

impl Fetched {
  pub fn classification(&self) -> Classification {
    Classification::new(self.ranks.each_ref().map(String::as_str))
  }
}

fn non_empty(value: Option<String>) -> Option<String> {
  value.filter(|v| !v.trim().is_empty())
}

/// Services other than EOL report no domain; infer it from the kingdom.
fn domain_for_kingdom(kingdom: &str) -> &'static str {
  match kingdom {
    "" => "",
    "Bacteria" => "Bacteria",
    "Archaea" => "Archaea",
    _ => "Eukarya",
  }
}

/// Position of a rank name (any case) among domain..genus.
fn grouping_index(rank: &str) -> Option<usize> {
  let rank: Rank = rank.to_lowercase().parse().ok()?;
  Rank::GROUPING.iter().position(|r| *r == rank)
}

/// The specific epithet of a binomial, e.g. `coli` in `Escherichia coli`.
fn epithet(scientific_name: &str) -> String {
  scientific_name
    .split_whitespace()
    .nth(1)
    .unwrap_or_default()
    .to_owned()
}

// ─── GBIF ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct GbifSpecies {
  kingdom:          Option<String>,
  phylum:           Option<String>,
  class:            Option<String>,
  order:            Option<String>,
  family:           Option<String>,
  genus:            Option<String>,
  specific_epithet: Option<String>,
  vernacular_name:  Option<String>,
  descriptions:     Vec<GbifDescription>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GbifDescription {
  description: Option<String>,
}

fn from_gbif(taxon: GbifSpecies) -> Fetched {
  let kingdom = taxon.kingdom.unwrap_or_default();
  let description = taxon
    .descriptions
    .into_iter()
    .find_map(|d| non_empty(d.description));
  Fetched {
    ranks:   [
      domain_for_kingdom(&kingdom).to_owned(),
      kingdom,
      taxon.phylum.unwrap_or_default(),
      taxon.class.unwrap_or_default(),
      taxon.order.unwrap_or_default(),
      taxon.family.unwrap_or_default(),
      taxon.genus.unwrap_or_default(),
    ],
    species: NewSpecies {
      common_name: non_empty(taxon.vernacular_name),
      description,
      ..NewSpecies::new(taxon.specific_epithet.unwrap_or_default())
    },
  }
}

// ─── ITIS ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ItisRecord {
  scientific_name:  Option<String>,
  common_name_list: ItisCommonNames,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ItisCommonNames {
  common_names: Vec<ItisCommonName>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ItisCommonName {
  common_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ItisHierarchy {
  hierarchy_list: Vec<ItisRank>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ItisRank {
  rank:       Option<String>,
  taxon_name: Option<String>,
}

fn from_itis(record: ItisRecord, hierarchy: ItisHierarchy) -> Result<Fetched> {
  let Some(scientific_name) = non_empty(record.scientific_name) else {
    bail!("ITIS record has no scientificName");
  };

  let mut ranks: [String; 7] = Default::default();
  for entry in hierarchy.hierarchy_list {
    if let (Some(rank), Some(name)) = (entry.rank, entry.taxon_name)
      && let Some(index) = grouping_index(&rank)
      && index > 0
    {
      ranks[index] = name;
    }
  }
  ranks[0] = domain_for_kingdom(&ranks[1]).to_owned();

  let common_name = record
    .common_name_list
    .common_names
    .into_iter()
    .find_map(|c| non_empty(c.common_name));
  Ok(Fetched {
    ranks,
    species: NewSpecies {
      common_name,
      ..NewSpecies::new(epithet(&scientific_name))
    },
  })
}

// ─── EOL ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EolPage {
  scientific_name:  Option<String>,
  taxon_concepts:   Vec<EolConcept>,
  classification:   Vec<EolClassification>,
  vernacular_names: Vec<EolVernacular>,
  data_objects:     Vec<EolDataObject>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EolConcept {
  taxonomic_ranks: Vec<EolRank>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EolRank {
  name:  Option<String>,
  value: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EolClassification {
  rank: Option<String>,
  name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EolVernacular {
  vernacular_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EolDataObject {
  #[serde(rename = "type")]
  kind:          Option<String>,
  description:   Option<String>,
  #[serde(rename = "eolMediaURL")]
  eol_media_url: Option<String>,
}

const EOL_PAGE_QUERY: [(&str, &str); 6] = [
  ("images", "1"),
  ("videos", "0"),
  ("sounds", "0"),
  ("maps", "0"),
  ("text", "1"),
  ("details", "1"),
];

fn from_eol(page: EolPage) -> Fetched {
  let mut ranks: [String; 7] = Default::default();
  for concept in page.taxon_concepts {
    for entry in concept.taxonomic_ranks {
      if let (Some(rank), Some(name)) = (entry.name, entry.value)
        && let Some(index) = grouping_index(&rank)
      {
        ranks[index] = name;
      }
    }
  }
  if ranks[1].is_empty() {
    for entry in page.classification {
      if let (Some(rank), Some(name)) = (entry.rank, entry.name)
        && let Some(index) = grouping_index(&rank)
      {
        ranks[index] = name;
      }
    }
  }
  if ranks[0].is_empty() {
    ranks[0] = domain_for_kingdom(&ranks[1]).to_owned();
  }

  let description = page
    .data_objects
    .iter()
    .filter(|o| matches!(o.kind.as_deref(), Some("text/plain" | "text/html")))
    .find_map(|o| non_empty(o.description.clone()));
  let image_url = page
    .data_objects
    .iter()
    .filter(|o| o.kind.as_deref() == Some("image"))
    .find_map(|o| non_empty(o.eol_media_url.clone()));
  let common_name = page
    .vernacular_names
    .into_iter()
    .find_map(|v| non_empty(v.vernacular_name));

  Fetched {
    ranks,
    species: NewSpecies {
      common_name,
      description,
      image_url,
      ..NewSpecies::new(epithet(page.scientific_name.as_deref().unwrap_or_default()))
    },
  }
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// HTTP client for the external services.
#[derive(Clone)]
pub struct SourceClient {
  client: Client,
  urls:   SourceUrls,
}

impl SourceClient {
  pub fn new(urls: SourceUrls) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, urls })
  }

  async fn get_json<T: DeserializeOwned>(
    &self,
    url: &str,
    query: &[(&str, &str)],
  ) -> Result<T> {
    let resp = self
      .client
      .get(url)
      .query(query)
      .send()
      .await
      .with_context(|| format!("GET {url} failed"))?;

    if !resp.status().is_success() {
      return Err(anyhow!("GET {url} → {}", resp.status()));
    }
    resp
      .json()
      .await
      .with_context(|| format!("deserialising {url}"))
  }

  /// Fetch one taxon from `source` and map it onto a [`Fetched`] record.
  pub async fn fetch(&self, source: Source, id: &str) -> Result<Fetched> {
    let id = id.trim();
    if id.is_empty() {
      bail!("missing {source} taxon id");
    }

    match source {
      Source::Gbif => {
        let url = format!("{}/species/{id}", self.urls.gbif.trim_end_matches('/'));
        Ok(from_gbif(self.get_json(&url, &[]).await?))
      }
      Source::Itis => {
        let url = format!("{}/", self.urls.itis.trim_end_matches('/'));
        let tsn = format!("tsn:{id}");
        let record = self
          .get_json(&url, &[("q", tsn.as_str()), ("format", "json")])
          .await?;
        let hierarchy = format!("hierarchy:{id}");
        let hierarchy = self
          .get_json(&url, &[("q", hierarchy.as_str()), ("format", "json")])
          .await?;
        from_itis(record, hierarchy)
      }
      Source::Eol => {
        let url = format!("{}/pages/1.0/{id}.json", self.urls.eol.trim_end_matches('/'));
        Ok(from_eol(self.get_json(&url, &EOL_PAGE_QUERY).await?))
      }
    }
  }
}

// ─── Import ──────────────────────────────────────────────────────────────────

/// Fetch one taxon and add it with its full classification.
pub async fn import_taxon<S>(
  store: &S,
  client: &SourceClient,
  source: Source,
  id: &str,
) -> Result<AddedTaxonomy>
where
  S: TaxonomyStore,
{
  let fetched = client.fetch(source, id).await?;
  let added = store
    .add_full_taxonomy(fetched.classification(), Some(fetched.species.clone()), Vec::new())
    .await?;
  tracing::info!(
    %source,
    id,
    "imported {} {}",
    fetched.ranks[6],
    fetched.species.name
  );
  Ok(added)
}

/// One row of a batch file: which service and which of its ids.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BatchRow {
  source:   String,
  taxon_id: String,
}

/// Import every `source,taxon_id` row of `path`. A failing row is logged and
/// counted; the rest still import.
pub async fn import_batch<S>(
  store: &S,
  client: &SourceClient,
  path: &Path,
  delimiter: u8,
) -> Result<CsvImport>
where
  S: TaxonomyStore,
{
  let mut reader = csv::ReaderBuilder::new()
    .delimiter(delimiter)
    .trim(csv::Trim::All)
    .from_path(path)
    .with_context(|| format!("opening {}", path.display()))?;

  let mut outcome = CsvImport::default();
  for (index, row) in reader.deserialize::<BatchRow>().enumerate() {
    let line = index + 2;
    let imported = match row {
      Ok(row) => match <Source as ValueEnum>::from_str(&row.source, true) {
        Ok(source) => import_taxon(store, client, source, &row.taxon_id).await,
        Err(_) => Err(anyhow!("unknown source {:?}", row.source)),
      },
      Err(e) => Err(e.into()),
    };
    match imported {
      Ok(_) => outcome.imported += 1,
      Err(e) => {
        tracing::warn!(line, error = %e, "skipping row");
        outcome.failed += 1;
      }
    }
  }
  Ok(outcome)
}
