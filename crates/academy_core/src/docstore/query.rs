//! Filters, projections and aggregation stages.

use super::document::{Document, ID_FIELD};
use rand::seq::index;
use rand::Rng;
use serde_json::Value;

/// Comparison applied to one field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    Eq(Value),
    In(Vec<Value>),
    /// Also matches documents that lack the field.
    NotIn(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldCondition {
    pub field: String,
    pub op: FieldOp,
}

impl FieldCondition {
    pub fn matches(&self, document: &Document) -> bool {
        match (&self.op, document.get(&self.field)) {
            (FieldOp::Eq(expected), Some(actual)) => actual == expected,
            (FieldOp::In(values), Some(actual)) => values.contains(actual),
            (FieldOp::NotIn(values), Some(actual)) => !values.contains(actual),
            (FieldOp::NotIn(_), None) => true,
            (_, None) => false,
        }
    }
}

/// AND-conjunction of field conditions. Empty matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<FieldCondition>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(FieldCondition {
            field: field.into(),
            op: FieldOp::Eq(value.into()),
        });
        self
    }

    pub fn is_in(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.conditions.push(FieldCondition {
            field: field.into(),
            op: FieldOp::In(values),
        });
        self
    }

    pub fn not_in(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.conditions.push(FieldCondition {
            field: field.into(),
            op: FieldOp::NotIn(values),
        });
        self
    }

    pub fn conditions(&self) -> &[FieldCondition] {
        &self.conditions
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.conditions
            .iter()
            .all(|condition| condition.matches(document))
    }

    /// The `_id` value when this filter is exactly one `_id` equality.
    pub fn id_equality(&self) -> Option<&Value> {
        match self.conditions.as_slice() {
            [FieldCondition {
                field,
                op: FieldOp::Eq(value),
            }] if field == ID_FIELD => Some(value),
            _ => None,
        }
    }
}

/// Inclusion projection. `_id` is always kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    fields: Vec<String>,
}

impl Projection {
    pub fn fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn id_only() -> Self {
        Self::default()
    }

    pub fn apply(&self, mut document: Document) -> Document {
        document.retain(|key, _| key == ID_FIELD || self.fields.iter().any(|field| field == key));
        document
    }
}

/// One aggregation pipeline stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Filter),
    /// Uniform random selection without replacement, at most `n` documents.
    Sample(usize),
    Project(Projection),
}

/// Evaluates `pipeline` over `documents` in stage order.
pub fn run_pipeline<R: Rng + ?Sized>(
    mut documents: Vec<Document>,
    pipeline: &[Stage],
    rng: &mut R,
) -> Vec<Document> {
    for stage in pipeline {
        documents = match stage {
            Stage::Match(filter) => documents
                .into_iter()
                .filter(|document| filter.matches(document))
                .collect(),
            Stage::Sample(size) => {
                let amount = (*size).min(documents.len());
                let mut slots = documents.into_iter().map(Some).collect::<Vec<_>>();
                index::sample(rng, slots.len(), amount)
                    .into_iter()
                    .filter_map(|position| slots[position].take())
                    .collect()
            }
            Stage::Project(projection) => documents
                .into_iter()
                .map(|document| projection.apply(document))
                .collect(),
        };
    }
    documents
}
