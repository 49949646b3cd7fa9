//! Immutable external → internal field name tables.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use serde_json::{Map, Value};

use super::keys::{AssessmentAnswerKey, SessionMetricKey};

/// Record kinds that carry their own naming table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    AssessmentAnswer,
    SessionActivityMetric,
}

impl RecordKind {
    /// URL path segment naming this kind.
    pub fn slug(self) -> &'static str {
        match self {
            RecordKind::AssessmentAnswer => "assessment-answer",
            RecordKind::SessionActivityMetric => "session-metric",
        }
    }

    /// Table for this kind.
    pub fn mapping(self) -> &'static FieldMapping {
        match self {
            RecordKind::AssessmentAnswer => &*ASSESSMENT_ANSWER,
            RecordKind::SessionActivityMetric => all_session_metric_mappings(),
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assessment-answer" => Ok(RecordKind::AssessmentAnswer),
            "session-metric" => Ok(RecordKind::SessionActivityMetric),
            other => Err(other.to_string()),
        }
    }
}

/// Exact-match, case-sensitive lookup from external key to internal key.
///
/// Several external keys may share one internal key (fan-in). Built once and
/// never mutated, so concurrent readers need no synchronization.
#[derive(Debug)]
pub struct FieldMapping {
    kind: RecordKind,
    entries: HashMap<&'static str, &'static str>,
    fan_in: HashSet<&'static str>,
}

impl FieldMapping {
    fn from_pairs(kind: RecordKind, pairs: impl IntoIterator<Item = (&'static str, &'static str)>) -> Self {
        let entries: HashMap<_, _> = pairs.into_iter().collect();

        let mut seen = HashSet::new();
        let mut fan_in = HashSet::new();
        for internal in entries.values() {
            if !seen.insert(*internal) {
                fan_in.insert(*internal);
            }
        }

        Self { kind, entries, fan_in }
    }

    /// Record kind this table belongs to.
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Internal name for `external`, or `None` when the key is not part of
    /// this record kind.
    pub fn get(&self, external: &str) -> Option<&'static str> {
        self.entries.get(external).copied()
    }

    /// Number of external keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All `(external, internal)` pairs, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, *v))
    }

    /// Copy of the table keyed by external name, suitable for a response body.
    pub fn to_json(&self) -> Map<String, Value> {
        self.iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect()
    }

    /// Rename the known keys of `row` and drop the rest.
    ///
    /// Values landing on a fan-in key are gathered into an array; array values
    /// contribute their elements.
    pub fn translate_row(&self, row: &Map<String, Value>) -> Map<String, Value> {
        let mut out = Map::new();

        for (external, value) in row {
            let Some(internal) = self.get(external) else {
                continue;
            };

            if !self.fan_in.contains(internal) {
                out.insert(internal.to_string(), value.clone());
                continue;
            }

            let slot = out
                .entry(internal.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(items) = slot {
                match value {
                    Value::Array(values) => items.extend(values.iter().cloned()),
                    other => items.push(other.clone()),
                }
            }
        }

        out
    }
}

static ASSESSMENT_ANSWER: LazyLock<FieldMapping> = LazyLock::new(|| {
    FieldMapping::from_pairs(
        RecordKind::AssessmentAnswer,
        AssessmentAnswerKey::ALL.iter().map(|k| (k.external(), k.internal())),
    )
});

static SESSION_METRIC: LazyLock<FieldMapping> = LazyLock::new(|| {
    FieldMapping::from_pairs(
        RecordKind::SessionActivityMetric,
        SessionMetricKey::ALL.iter().map(|k| (k.external(), k.internal())),
    )
});

/// Internal attribute name for an assessment answer column.
pub fn translate_assessment_answer_key(external: &str) -> Option<&'static str> {
    ASSESSMENT_ANSWER.get(external)
}

/// Internal attribute name for a session activity metric column.
pub fn translate_session_metric_key(external: &str) -> Option<&'static str> {
    SESSION_METRIC.get(external)
}

/// The whole session activity metric table, read-only.
pub fn all_session_metric_mappings() -> &'static FieldMapping {
    &*SESSION_METRIC
}
