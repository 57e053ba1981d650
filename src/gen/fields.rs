//! Field Construction and Merging
//!
//! Tag handling for individual fields, and the table that folds the fields of
//! every config load in a service into one set of top-level fields.
//!
//! Merging is how several `config.Load` calls converge on one document: a
//! label seen again keeps its first position, unions its comment lines, and
//! conjoins its value with the new one unless the two are already equal.

use indexmap::IndexMap;
use tracing::debug;

use crate::config::GeneratorConfig;
use crate::cue::{parse_expr, CommentGroup, Expr, Field as CueField, Label};
use crate::error::{CuegenError, Result};
use crate::schema::Field;

// =============================================================================
// Tag Handling
// =============================================================================

/// What a field's struct tags ask for
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldTags {
    /// Label override from the json tag
    pub label: Option<String>,
    pub optional: bool,
    /// Parsed refinement from the annotation tag
    pub refinement: Option<Expr>,
}

impl FieldTags {
    /// Read the json and annotation tags of a field.
    ///
    /// A refinement that does not parse fails the whole generation.
    pub fn parse(field: &Field, config: &GeneratorConfig) -> Result<Self> {
        let mut tags = FieldTags::default();

        for tag in &field.tags {
            if tag.key == config.json_key {
                if !tag.name.is_empty() {
                    tags.label = Some(tag.name.clone());
                }
                if tag.has_option("omitempty") {
                    tags.optional = true;
                }
            }

            if tag.key == config.annotation_key {
                if !tag.name.is_empty() {
                    let expr = parse_expr(&tag.name).map_err(|source| CuegenError::MalformedAnnotation {
                        field: field.name.clone(),
                        fragment: tag.name.clone(),
                        source,
                    })?;
                    tags.refinement = Some(match tags.refinement.take() {
                        Some(existing) => Expr::and(existing, expr),
                        None => expr,
                    });
                }
                if tag.has_option("opt") {
                    tags.optional = true;
                }
            }
        }

        Ok(tags)
    }
}

/// Assemble the document field for a schema field whose type has already
/// been translated to `value`
pub fn build_field(field: &Field, value: Expr, config: &GeneratorConfig) -> Result<CueField> {
    let tags = FieldTags::parse(field, config)?;

    let label = tags.label.unwrap_or_else(|| field.name.clone());
    let value = match tags.refinement {
        Some(refinement) => Expr::and(value, refinement),
        None => value,
    };

    let mut out = CueField::new(Label::Name(label), value);
    out.optional = tags.optional;
    if let Some(comments) = CommentGroup::from_doc(&field.doc) {
        out.new_section = comments.is_multiline();
        out.comments = Some(comments);
    }
    Ok(out)
}

// =============================================================================
// Field Table
// =============================================================================

/// Top-level fields of a service document, keyed by label in first-seen order
#[derive(Debug, Clone, Default)]
pub struct FieldTable {
    fields: IndexMap<String, CueField>,
}

impl FieldTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, merging it into an existing field with the same label
    pub fn insert(&mut self, field: CueField) -> Result<()> {
        let name = field
            .label
            .as_name()
            .ok_or_else(|| CuegenError::Internal("pattern label at the top level".to_string()))?
            .to_string();

        match self.fields.get_mut(&name) {
            Some(existing) => {
                debug!(label = %name, "merging field declarations");
                merge_field(existing, field);
            }
            None => {
                self.fields.insert(name, field);
            }
        }
        Ok(())
    }

    pub fn extend(&mut self, fields: impl IntoIterator<Item = CueField>) -> Result<()> {
        for field in fields {
            self.insert(field)?;
        }
        Ok(())
    }

    pub fn get(&self, label: &str) -> Option<&CueField> {
        self.fields.get(label)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_fields(self) -> Vec<CueField> {
        self.fields.into_values().collect()
    }
}

fn merge_field(existing: &mut CueField, incoming: CueField) {
    if let Some(incoming_comments) = incoming.comments {
        match &mut existing.comments {
            None => {
                existing.new_section = incoming_comments.is_multiline();
                existing.comments = Some(incoming_comments);
            }
            Some(group) => {
                for line in incoming_comments.lines {
                    if !group.contains(&line) {
                        group.lines.push(line);
                    }
                }
                // A block that grew to several lines gets its own section
                if group.is_multiline() {
                    existing.new_section = true;
                }
            }
        }
    }

    if existing.value != incoming.value {
        let current = std::mem::replace(&mut existing.value, Expr::Ident(String::new()));
        existing.value = Expr::and(current, incoming.value);
    }

    existing.optional |= incoming.optional;
}
