//! Static model and cascade-relation declarations.
//!
//! # Responsibility
//! - Hold the set of soft-delete model labels known to the process.
//! - Hold per-model relation declarations and expose the cascade edges.
//!
//! # Invariants
//! - Declarations are validated once, in `ModelRegistryBuilder::build`.
//! - Cascade edges are returned in declaration order.
//! - Both endpoints of every relation are registered models.

use crate::model::record::is_valid_label;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Behavior declared for dependents when their owner is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnDelete {
    /// Dependents receive the same delete/undelete operation.
    #[default]
    Cascade,
    Protect,
    SetNull,
    DoNothing,
}

/// One dependent relationship: records of `related_label` whose
/// `foreign_key` link points at the owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CascadeEdge {
    pub related_label: String,
    pub foreign_key: String,
}

/// Declared relation from an owner model to a dependent model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub edge: CascadeEdge,
    pub on_delete: OnDelete,
}

/// Registry declaration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    InvalidLabel(String),
    InvalidForeignKey { owner: String, foreign_key: String },
    DuplicateModel(String),
    UnknownModel(String),
    DuplicateRelation {
        owner: String,
        related: String,
        foreign_key: String,
    },
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLabel(label) => {
                write!(f, "invalid model label `{label}`; expected `app.Model`")
            }
            Self::InvalidForeignKey { owner, foreign_key } => write!(
                f,
                "invalid foreign key `{foreign_key}` declared on `{owner}`"
            ),
            Self::DuplicateModel(label) => write!(f, "model already registered: {label}"),
            Self::UnknownModel(label) => write!(f, "model not registered: {label}"),
            Self::DuplicateRelation {
                owner,
                related,
                foreign_key,
            } => write!(
                f,
                "relation `{related}.{foreign_key}` already declared on `{owner}`"
            ),
        }
    }
}

impl Error for RegistryError {}

#[derive(Debug, Clone, Default)]
struct ModelEntry {
    relations: Vec<Relation>,
}

/// Validated, immutable model registry.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: BTreeMap<String, ModelEntry>,
}

impl ModelRegistry {
    pub fn builder() -> ModelRegistryBuilder {
        ModelRegistryBuilder::default()
    }

    pub fn is_registered(&self, label: &str) -> bool {
        self.models.contains_key(label)
    }

    /// All relations declared on `label`, cascade or not.
    pub fn relations(&self, label: &str) -> &[Relation] {
        self.models
            .get(label)
            .map(|entry| entry.relations.as_slice())
            .unwrap_or(&[])
    }

    /// Relation declared on `owner` for `related` records linked by
    /// `foreign_key`, if any.
    pub fn find_relation(
        &self,
        owner: &str,
        related: &str,
        foreign_key: &str,
    ) -> Option<&Relation> {
        self.relations(owner).iter().find(|relation| {
            relation.edge.related_label == related && relation.edge.foreign_key == foreign_key
        })
    }

    /// Edges tagged `OnDelete::Cascade` on `label`, in declaration order.
    pub fn cascade_edges(&self, label: &str) -> Vec<&CascadeEdge> {
        self.relations(label)
            .iter()
            .filter(|relation| relation.on_delete == OnDelete::Cascade)
            .map(|relation| &relation.edge)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Collects declarations; `build` validates them all at once.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistryBuilder {
    models: Vec<String>,
    relations: Vec<(String, Relation)>,
}

impl ModelRegistryBuilder {
    /// Declares one soft-delete model.
    pub fn model(mut self, label: impl Into<String>) -> Self {
        self.models.push(label.into());
        self
    }

    /// Declares a relation from `owner` to dependents of `related`.
    pub fn relation(
        mut self,
        owner: impl Into<String>,
        related: impl Into<String>,
        foreign_key: impl Into<String>,
        on_delete: OnDelete,
    ) -> Self {
        self.relations.push((
            owner.into(),
            Relation {
                edge: CascadeEdge {
                    related_label: related.into(),
                    foreign_key: foreign_key.into(),
                },
                on_delete,
            },
        ));
        self
    }

    /// Shorthand for `relation(.., OnDelete::Cascade)`.
    pub fn cascade(
        self,
        owner: impl Into<String>,
        related: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        self.relation(owner, related, foreign_key, OnDelete::Cascade)
    }

    pub fn build(self) -> Result<ModelRegistry, RegistryError> {
        let mut models: BTreeMap<String, ModelEntry> = BTreeMap::new();
        for label in self.models {
            if !is_valid_label(&label) {
                return Err(RegistryError::InvalidLabel(label));
            }
            if models.contains_key(&label) {
                return Err(RegistryError::DuplicateModel(label));
            }
            models.insert(label, ModelEntry::default());
        }

        for (owner, relation) in self.relations {
            if !models.contains_key(&relation.edge.related_label) {
                return Err(RegistryError::UnknownModel(relation.edge.related_label));
            }
            if !is_valid_foreign_key(&relation.edge.foreign_key) {
                return Err(RegistryError::InvalidForeignKey {
                    owner,
                    foreign_key: relation.edge.foreign_key,
                });
            }
            let Some(entry) = models.get_mut(&owner) else {
                return Err(RegistryError::UnknownModel(owner));
            };
            if entry.relations.iter().any(|known| known.edge == relation.edge) {
                return Err(RegistryError::DuplicateRelation {
                    owner,
                    related: relation.edge.related_label,
                    foreign_key: relation.edge.foreign_key,
                });
            }
            entry.relations.push(relation);
        }

        Ok(ModelRegistry { models })
    }
}

fn is_valid_foreign_key(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

#[cfg(test)]
mod tests {
    use super::{ModelRegistry, OnDelete, RegistryError};

    fn blog_registry() -> ModelRegistry {
        ModelRegistry::builder()
            .model("blog.Post")
            .model("blog.Comment")
            .model("blog.Tag")
            .cascade("blog.Post", "blog.Comment", "post")
            .relation("blog.Post", "blog.Tag", "post", OnDelete::SetNull)
            .build()
            .expect("blog registry should build")
    }

    #[test]
    fn cascade_edges_skip_non_cascade_relations() {
        let registry = blog_registry();
        let edges = registry.cascade_edges("blog.Post");
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].related_label, "blog.Comment");
        assert_eq!(edges[0].foreign_key, "post");
        assert_eq!(registry.relations("blog.Post").len(), 2);
        assert!(registry.cascade_edges("blog.Comment").is_empty());
    }

    #[test]
    fn find_relation_matches_owner_related_and_foreign_key() {
        let registry = blog_registry();
        let relation = registry
            .find_relation("blog.Post", "blog.Tag", "post")
            .expect("tag relation is declared");
        assert_eq!(relation.on_delete, OnDelete::SetNull);

        assert!(registry.find_relation("blog.Post", "blog.Comment", "pots").is_none());
        assert!(registry.find_relation("blog.Comment", "blog.Post", "post").is_none());
        assert!(registry.find_relation("shop.Order", "blog.Comment", "post").is_none());
    }

    #[test]
    fn rejects_relation_to_unregistered_model() {
        let err = ModelRegistry::builder()
            .model("blog.Post")
            .cascade("blog.Post", "blog.Comment", "post")
            .build()
            .expect_err("unknown related model must fail");
        assert_eq!(err, RegistryError::UnknownModel("blog.Comment".to_string()));
    }

    #[test]
    fn rejects_duplicate_model_and_relation() {
        let err = ModelRegistry::builder()
            .model("blog.Post")
            .model("blog.Post")
            .build()
            .expect_err("duplicate model must fail");
        assert!(matches!(err, RegistryError::DuplicateModel(_)));

        let err = ModelRegistry::builder()
            .model("blog.Post")
            .model("blog.Comment")
            .cascade("blog.Post", "blog.Comment", "post")
            .relation("blog.Post", "blog.Comment", "post", OnDelete::Protect)
            .build()
            .expect_err("duplicate relation must fail");
        assert!(matches!(err, RegistryError::DuplicateRelation { .. }));
    }

    #[test]
    fn rejects_malformed_declarations() {
        let err = ModelRegistry::builder()
            .model("Post")
            .build()
            .expect_err("label without app must fail");
        assert!(matches!(err, RegistryError::InvalidLabel(_)));

        let err = ModelRegistry::builder()
            .model("blog.Post")
            .cascade("blog.Post", "blog.Post", "parent id")
            .build()
            .expect_err("foreign key with space must fail");
        assert!(matches!(err, RegistryError::InvalidForeignKey { .. }));
    }
}
