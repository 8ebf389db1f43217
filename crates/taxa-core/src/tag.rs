//! Free-form labels attached to species.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
  pub id:          Uuid,
  /// Globally unique, matched exactly.
  pub name:        String,
  pub description: Option<String>,
  pub created_at:  DateTime<Utc>,
}

/// Trim tag names and drop blanks and repeats, keeping first-seen order.
pub fn normalize_tag_names<I, S>(names: I) -> Vec<String>
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  let mut out: Vec<String> = Vec::new();
  for name in names {
    let name = name.as_ref().trim();
    if !name.is_empty() && !out.iter().any(|n| n == name) {
      out.push(name.to_owned());
    }
  }
  out
}

/// Split a comma-separated tag list, as accepted by the CLI and query strings.
pub fn split_tag_list(list: &str) -> Vec<String> {
  normalize_tag_names(list.split(','))
}
