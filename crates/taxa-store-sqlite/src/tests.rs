//! Integration tests for `SqliteStore` against an in-memory database.

use taxa_core::{
  Classify as _, ErrorKind, Rank,
  species::{NewSpecies, SpeciesPatch, SpeciesQuery},
  store::TaxonomyStore,
  taxon::{Classification, TaxonPatch},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

const ECOLI: [&str; 7] = [
  "Bacteria",
  "Eubacteria",
  "Proteobacteria",
  "Gammaproteobacteria",
  "Enterobacterales",
  "Enterobacteriaceae",
  "Escherichia",
];

const LION: [&str; 7] = [
  "Eukarya",
  "Animalia",
  "Chordata",
  "Mammalia",
  "Carnivora",
  "Felidae",
  "Panthera",
];

fn tags(names: &[&str]) -> Vec<String> {
  names.iter().map(|s| (*s).to_owned()).collect()
}

async fn add_coli(s: &SqliteStore) -> Uuid {
  s.add_full_taxonomy(
    Classification::new(ECOLI),
    Some(NewSpecies {
      common_name: Some("E. coli".into()),
      ..NewSpecies::new("coli")
    }),
    tags(&["gram-negative", "rod-shaped"]),
  )
  .await
  .unwrap()
  .species_id
  .expect("species attached")
}

// ─── Rank resolver & hierarchy builder ───────────────────────────────────────

#[tokio::test]
async fn build_hierarchy_is_idempotent() {
  let s = store().await;
  let first = s.build_hierarchy(Classification::new(ECOLI)).await.unwrap();
  let second = s.build_hierarchy(Classification::new(ECOLI)).await.unwrap();
  assert_eq!(first, second);

  for rank in Rank::GROUPING {
    assert_eq!(s.list_rank(rank, None).await.unwrap().len(), 1, "{rank}");
  }
}

#[tokio::test]
async fn resolve_rank_keeps_first_description() {
  let s = store().await;
  let a = s
    .resolve_rank(Rank::Domain, "Bacteria".into(), None, Some("first".into()))
    .await
    .unwrap();
  let b = s
    .resolve_rank(Rank::Domain, "Bacteria".into(), None, Some("second".into()))
    .await
    .unwrap();
  assert_eq!(a, b);

  let domain = s.get_taxon(Rank::Domain, a).await.unwrap().unwrap();
  assert_eq!(domain.description.as_deref(), Some("first"));
}

#[tokio::test]
async fn same_name_under_different_parents_stays_distinct() {
  let s = store().await;
  let bacteria = s
    .resolve_rank(Rank::Domain, "Bacteria".into(), None, None)
    .await
    .unwrap();
  let archaea = s
    .resolve_rank(Rank::Domain, "Archaea".into(), None, None)
    .await
    .unwrap();
  assert_ne!(bacteria, archaea);

  let k1 = s
    .resolve_rank(Rank::Kingdom, "Shared".into(), Some(bacteria), None)
    .await
    .unwrap();
  let k2 = s
    .resolve_rank(Rank::Kingdom, "Shared".into(), Some(archaea), None)
    .await
    .unwrap();
  assert_ne!(k1, k2);

  let under_bacteria = s.list_rank(Rank::Kingdom, Some(bacteria)).await.unwrap();
  assert_eq!(under_bacteria.len(), 1);
  assert_eq!(under_bacteria[0].parent_id, Some(bacteria));
}

#[tokio::test]
async fn resolve_rank_checks_parent_scope() {
  let s = store().await;

  let err = s
    .resolve_rank(Rank::Kingdom, "Animalia".into(), None, None)
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);

  let err = s
    .resolve_rank(Rank::Kingdom, "Animalia".into(), Some(Uuid::new_v4()), None)
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);

  let err = s
    .resolve_rank(Rank::Species, "coli".into(), Some(Uuid::new_v4()), None)
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn missing_name_writes_nothing() {
  let s = store().await;
  let mut c = Classification::new(ECOLI);
  c.family = " ".into();

  let err = s.build_hierarchy(c).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
  assert!(s.list_rank(Rank::Domain, None).await.unwrap().is_empty());
}

// ─── Species ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn full_taxonomy_of_e_coli() {
  let s = store().await;
  let id = add_coli(&s).await;

  let full = s.get_full_taxonomy(id).await.unwrap().unwrap();
  let names: Vec<&str> = Rank::GROUPING.iter().map(|r| full.at(*r).1).collect();
  assert_eq!(names, ECOLI);
  assert_eq!(full.species_name, "coli");
  assert_eq!(full.scientific_name(), "Escherichia coli");
  assert_eq!(full.common_name.as_deref(), Some("E. coli"));
  assert_eq!(
    full.tags.iter().map(String::as_str).collect::<Vec<_>>(),
    ["gram-negative", "rod-shaped"]
  );
}

#[tokio::test]
async fn full_taxonomy_of_unknown_species_is_none() {
  let s = store().await;
  assert!(s.get_full_taxonomy(Uuid::new_v4()).await.unwrap().is_none());
  assert!(s.get_species(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_species_conflicts() {
  let s = store().await;
  add_coli(&s).await;

  let err = s
    .add_full_taxonomy(
      Classification::new(ECOLI),
      Some(NewSpecies::new("coli")),
      tags(&["new-tag"]),
    )
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Conflict);

  // The failed call rolled back its tag as well.
  let all = s.list_tags().await.unwrap();
  assert!(all.iter().all(|t| t.name != "new-tag"));
  assert_eq!(s.list_species().await.unwrap().len(), 1);
}

#[tokio::test]
async fn add_species_to_unknown_genus_is_not_found() {
  let s = store().await;
  let err = s
    .add_species(Uuid::new_v4(), NewSpecies::new("coli"), Vec::new())
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn hierarchy_without_species() {
  let s = store().await;
  let added = s
    .add_full_taxonomy(Classification::new(LION), None, Vec::new())
    .await
    .unwrap();
  assert!(added.species_id.is_none());
  assert!(s.get_taxon(Rank::Genus, added.ids.genus_id).await.unwrap().is_some());
}

#[tokio::test]
async fn update_species_changes_only_given_fields() {
  let s = store().await;
  let id = add_coli(&s).await;

  let updated = s
    .update_species(id, SpeciesPatch {
      habitat: Some("intestine".into()),
      discovery_year: Some(Some(1885)),
      ..SpeciesPatch::default()
    })
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.habitat.as_deref(), Some("intestine"));
  assert_eq!(updated.discovery_year, Some(1885));
  assert_eq!(updated.common_name.as_deref(), Some("E. coli"));
  assert!(updated.updated_at >= updated.created_at);

  let cleared = s
    .update_species(id, SpeciesPatch {
      discovery_year: Some(None),
      common_name: Some(String::new()),
      ..SpeciesPatch::default()
    })
    .await
    .unwrap()
    .unwrap();
  assert_eq!(cleared.discovery_year, None);
  assert_eq!(cleared.common_name, None);
  assert_eq!(cleared.habitat.as_deref(), Some("intestine"));

  assert!(
    s.update_species(Uuid::new_v4(), SpeciesPatch::default())
      .await
      .unwrap()
      .is_none()
  );
}

#[tokio::test]
async fn renaming_into_an_existing_name_conflicts() {
  let s = store().await;
  let bacteria = s
    .resolve_rank(Rank::Domain, "Bacteria".into(), None, None)
    .await
    .unwrap();
  s.resolve_rank(Rank::Domain, "Archaea".into(), None, None)
    .await
    .unwrap();

  let err = s
    .update_taxon(Rank::Domain, bacteria, TaxonPatch {
      name: Some("Archaea".into()),
      ..TaxonPatch::default()
    })
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Conflict);

  let renamed = s
    .update_taxon(Rank::Domain, bacteria, TaxonPatch {
      description: Some("prokaryotes".into()),
      ..TaxonPatch::default()
    })
    .await
    .unwrap()
    .unwrap();
  assert_eq!(renamed.name, "Bacteria");
  assert_eq!(renamed.description.as_deref(), Some("prokaryotes"));
}

// ─── Reader ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn species_by_rank_at_every_depth() {
  let s = store().await;
  let coli = add_coli(&s).await;
  s.add_full_taxonomy(Classification::new(LION), Some(NewSpecies::new("leo")), Vec::new())
    .await
    .unwrap();

  let full = s.get_full_taxonomy(coli).await.unwrap().unwrap();
  for rank in Rank::GROUPING {
    let (id, _) = full.at(rank);
    let found = s.species_by_rank(rank, id).await.unwrap();
    assert_eq!(found.len(), 1, "{rank}");
    assert_eq!(found[0].species.id, coli);
    assert_eq!(found[0].genus_name, "Escherichia");
  }

  assert!(s.species_by_rank(Rank::Family, Uuid::new_v4()).await.unwrap().is_empty());
  let err = s.species_by_rank(Rank::Species, coli).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn search_matches_text_and_tags() {
  let s = store().await;
  add_coli(&s).await;
  s.add_full_taxonomy(
    Classification::new(LION),
    Some(NewSpecies {
      common_name: Some("Lion".into()),
      ..NewSpecies::new("leo")
    }),
    tags(&["big-cat"]),
  )
  .await
  .unwrap();

  let by_text = s
    .search_species(&SpeciesQuery { text: Some("LION".into()), tags: Vec::new() })
    .await
    .unwrap();
  assert_eq!(by_text.len(), 1);
  assert_eq!(by_text[0].scientific_name(), "Panthera leo");

  let by_genus = s
    .search_species(&SpeciesQuery { text: Some("escher".into()), tags: Vec::new() })
    .await
    .unwrap();
  assert_eq!(by_genus.len(), 1);

  let by_tag = s
    .search_species(&SpeciesQuery { text: None, tags: tags(&["rod-shaped"]) })
    .await
    .unwrap();
  assert_eq!(by_tag.len(), 1);
  assert_eq!(by_tag[0].tags, ["gram-negative", "rod-shaped"]);

  let wildcard = s
    .search_species(&SpeciesQuery { text: Some("%".into()), tags: Vec::new() })
    .await
    .unwrap();
  assert!(wildcard.is_empty());

  let everything = s.search_species(&SpeciesQuery::default()).await.unwrap();
  assert_eq!(everything.len(), 2);
}

// ─── Cascades ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn deleting_a_domain_removes_everything_beneath_it() {
  let s = store().await;
  let coli = add_coli(&s).await;
  let full = s.get_full_taxonomy(coli).await.unwrap().unwrap();

  assert!(s.delete_taxon(Rank::Domain, full.domain_id).await.unwrap());
  assert!(!s.delete_taxon(Rank::Domain, full.domain_id).await.unwrap());

  for rank in Rank::GROUPING {
    assert!(s.list_rank(rank, None).await.unwrap().is_empty(), "{rank}");
  }
  assert!(s.get_species(coli).await.unwrap().is_none());
  assert!(s.export_all().await.unwrap().species_tags.is_empty());
  // Tags themselves are not owned by the hierarchy.
  assert_eq!(s.list_tags().await.unwrap().len(), 2);
}

// ─── Tags ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn tag_attachment_is_idempotent() {
  let s = store().await;
  let coli = add_coli(&s).await;

  let after = s
    .add_tags_to_species(coli, tags(&["rod-shaped", " motile ", ""]))
    .await
    .unwrap();
  let names: Vec<&str> = after.iter().map(|t| t.name.as_str()).collect();
  assert_eq!(names, ["gram-negative", "motile", "rod-shaped"]);
  assert_eq!(s.list_tags().await.unwrap().len(), 3);

  let replaced = s.set_species_tags(coli, tags(&["motile"])).await.unwrap();
  assert_eq!(replaced.len(), 1);
  assert_eq!(s.species_by_tag("gram-negative".into()).await.unwrap().len(), 0);
  assert_eq!(s.species_by_tag("motile".into()).await.unwrap().len(), 1);

  assert!(s.remove_tag_from_species(coli, replaced[0].id).await.unwrap());
  assert!(s.tags_for_species(coli).await.unwrap().is_empty());

  let err = s
    .add_tags_to_species(Uuid::new_v4(), tags(&["x"]))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn merge_moves_associations_and_removes_source() {
  let s = store().await;
  let coli = add_coli(&s).await;
  let target = s.get_or_create_tag("bacillus".into(), None).await.unwrap();
  let source = s
    .list_tags()
    .await
    .unwrap()
    .into_iter()
    .find(|t| t.name == "rod-shaped")
    .unwrap();

  let merged = s.merge_tags(source.id, target.id).await.unwrap();
  assert_eq!(merged.id, target.id);

  let names: Vec<String> = s
    .tags_for_species(coli)
    .await
    .unwrap()
    .into_iter()
    .map(|t| t.name)
    .collect();
  assert_eq!(names, ["bacillus", "gram-negative"]);
  assert!(!s.delete_tag(source.id).await.unwrap());

  let err = s.merge_tags(target.id, target.id).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn blank_tag_name_is_rejected() {
  let s = store().await;
  let err = s.get_or_create_tag("  ".into(), None).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
}

// ─── Bulk transfer ───────────────────────────────────────────────────────────

#[tokio::test]
async fn export_import_round_trip() {
  let source = store().await;
  add_coli(&source).await;
  source
    .add_full_taxonomy(Classification::new(LION), Some(NewSpecies::new("leo")), Vec::new())
    .await
    .unwrap();
  let exported = source.export_all().await.unwrap();
  assert_eq!(exported.domains.len(), 2);
  assert_eq!(exported.species_tags.len(), 2);

  let target = store().await;
  let summary = target.import_all(exported.clone()).await.unwrap();
  assert_eq!(summary.total(), 2 * 7 + 2 + 2 + 2);

  assert_eq!(target.export_all().await.unwrap(), exported);
}

#[tokio::test]
async fn failed_import_leaves_store_unchanged() {
  let s = store().await;
  add_coli(&s).await;
  let before = s.export_all().await.unwrap();

  let mut bad = before.clone();
  bad.species_tags[0].insert("tag_id".into(), Uuid::new_v4().to_string().into());
  let err = s.import_all(bad).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Conflict);
  assert_eq!(s.export_all().await.unwrap(), before);

  let mut unknown = before.clone();
  unknown.domains[0].insert("colour".into(), "red".into());
  let err = s.import_all(unknown).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
  assert_eq!(s.export_all().await.unwrap(), before);
}

#[tokio::test]
async fn import_with_unreadable_values_is_rejected() {
  let s = store().await;
  add_coli(&s).await;
  let before = s.export_all().await.unwrap();

  let mut bad_id = before.clone();
  bad_id.domains[0].insert("id".into(), "x".into());
  let mut bad_time = before.clone();
  bad_time.genera[0].insert("updated_at".into(), "last tuesday".into());
  let mut bad_year = before.clone();
  bad_year.species[0].insert("discovery_year".into(), "1885".into());

  for dump in [bad_id, bad_time, bad_year] {
    let err = s.import_all(dump).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(s.export_all().await.unwrap(), before);
  }
  assert_eq!(s.list_rank(Rank::Domain, None).await.unwrap().len(), 1);
  assert_eq!(s.list_species().await.unwrap().len(), 1);
}

#[tokio::test]
async fn importing_an_empty_document_clears_the_store() {
  let s = store().await;
  add_coli(&s).await;
  let summary = s.import_all(Default::default()).await.unwrap();
  assert_eq!(summary.total(), 0);
  assert!(s.list_species().await.unwrap().is_empty());
  assert!(s.list_tags().await.unwrap().is_empty());
}
