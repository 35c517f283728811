//! Relation tuples and subjects — the facts the watcher streams.
//!
//! A relation tuple is the fact "subject has relation on object within
//! namespace". Its canonical text form is
//! `namespace:object#relation@subject`, where the subject is either an
//! opaque id or a subject-set reference `namespace:object#relation`.
//! Parsing and rendering are exact inverses of each other.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Subject ─────────────────────────────────────────────────────────────────

/// An indirect subject reference: whoever holds `relation` on `object` in
/// `namespace`. Renders as `namespace:object#relation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectSet {
  pub namespace: String,
  pub object:    String,
  pub relation:  String,
}

impl FromStr for SubjectSet {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let (head, relation) = s.split_once('#').ok_or(Error::InvalidSubjectSet)?;
    let (namespace, object) =
      head.split_once(':').ok_or(Error::InvalidSubjectSet)?;
    Ok(Self {
      namespace: namespace.to_owned(),
      object:    object.to_owned(),
      relation:  relation.to_owned(),
    })
  }
}

impl fmt::Display for SubjectSet {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}#{}", self.namespace, self.object, self.relation)
  }
}

/// The holder of a relation.
///
/// Exactly two variants exist and they are distinguished syntactically: a
/// subject-set string always contains `#`, a subject id never does in the
/// position it is parsed. Equality is variant-typed — an `Id` never equals
/// a `Set`, whatever the field values.
///
/// On the wire this is a tagged union with one field populated:
/// `{"id": "alice"}` or `{"set": {"namespace": .., ..}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
  /// An opaque direct identity.
  Id(String),
  /// An indirect subject-set reference.
  Set(SubjectSet),
}

impl FromStr for Subject {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    if s.contains('#') {
      Ok(Self::Set(s.parse()?))
    } else {
      Ok(Self::Id(s.to_owned()))
    }
  }
}

impl fmt::Display for Subject {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Id(id) => f.write_str(id),
      Self::Set(set) => set.fmt(f),
    }
  }
}

// ─── RelationTuple ───────────────────────────────────────────────────────────

/// The fact that `subject` has `relation` on `object` within `namespace`.
/// Immutable once constructed; carries no external resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationTuple {
  pub namespace: String,
  pub object:    String,
  pub relation:  String,
  pub subject:   Subject,
}

impl FromStr for RelationTuple {
  type Err = Error;

  /// Parse the canonical text form.
  ///
  /// Splits on the *first* `#` into `head#rest`, `head` on the *first* `:`
  /// into `namespace:object`, and `rest` on the *first* `@` into
  /// `relation@subject`. Any missing separator is
  /// [`Error::InvalidRelationTuple`]; the subject part is handed to the
  /// subject grammar, whose errors propagate as-is.
  fn from_str(s: &str) -> Result<Self> {
    let (head, rest) = s.split_once('#').ok_or(Error::InvalidRelationTuple)?;
    let (namespace, object) =
      head.split_once(':').ok_or(Error::InvalidRelationTuple)?;
    let (relation, subject) =
      rest.split_once('@').ok_or(Error::InvalidRelationTuple)?;

    Ok(Self {
      namespace: namespace.to_owned(),
      object:    object.to_owned(),
      relation:  relation.to_owned(),
      subject:   subject.parse()?,
    })
  }
}

impl fmt::Display for RelationTuple {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{}:{}#{}@{}",
      self.namespace, self.object, self.relation, self.subject
    )
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
