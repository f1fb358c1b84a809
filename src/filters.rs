//! Per-line decisions for archive filtering: community gate, kind-specific validity,
//! and projection onto the declared field set.

use crate::config::{RecordKind, COMMUNITY_FIELD};
use crate::util::normalize_community;
use serde_json::{Map, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Case-insensitive community allow-list (sorted for binary_search).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Allowlist {
    names: Vec<String>,
}

impl Allowlist {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names: Vec<String> = names
            .into_iter()
            .map(|s| normalize_community(s.as_ref()))
            .filter(|s| !s.is_empty())
            .collect();
        names.sort();
        names.dedup();
        Self { names }
    }

    pub fn contains(&self, community: &str) -> bool {
        self.names.binary_search(&community.to_lowercase()).is_ok()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Why a line was counted as skipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    Malformed,
    MissingCommunity,
    Invalid,
}

/// Outcome of one archive line.
#[derive(Clone, Debug, PartialEq)]
pub enum LineOutcome {
    Keep(Vec<String>),
    /// Parsed fine but belongs to a community outside the allow-list; not counted as skipped.
    OutOfScope,
    Skip(SkipReason),
}

/// Loose truthiness: null, false, 0, "" and empty containers are falsy.
fn truthy(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

/// A comment needs a body; a post needs a title or a body.
pub fn is_valid_record(kind: RecordKind, obj: &Map<String, Value>) -> bool {
    match kind {
        RecordKind::Comment => truthy(obj.get("body")),
        RecordKind::Post => truthy(obj.get("title")) || truthy(obj.get("selftext")),
    }
}

/// Community name as text, `None` when absent or falsy.
pub fn community_of(obj: &Map<String, Value>) -> Option<String> {
    let v = obj.get(COMMUNITY_FIELD);
    if !truthy(v) {
        return None;
    }
    match v? {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// CSV rendering of one JSON value; missing/null become the empty field.
pub fn field_text(v: Option<&Value>) -> String {
    match v {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn human_timestamp(v: Option<&Value>) -> Option<String> {
    let ts = match v? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    OffsetDateTime::from_unix_timestamp(ts).ok()?.format(&Rfc3339).ok()
}

/// Project `obj` onto `fields` in order.
pub fn project(obj: &Map<String, Value>, fields: &[String], human_timestamps: bool) -> Vec<String> {
    fields
        .iter()
        .map(|k| {
            let v = obj.get(k);
            if human_timestamps && k == "created_utc" {
                if let Some(s) = human_timestamp(v) {
                    return s;
                }
            }
            field_text(v)
        })
        .collect()
}

/// Decide what to do with one raw archive line.
pub fn classify_line(
    line: &[u8],
    kind: RecordKind,
    allow: &Allowlist,
    fields: &[String],
    human_timestamps: bool,
) -> LineOutcome {
    let obj: Map<String, Value> = match serde_json::from_slice(line) {
        Ok(o) => o,
        Err(_) => return LineOutcome::Skip(SkipReason::Malformed),
    };
    let community = match community_of(&obj) {
        Some(c) => c,
        None => return LineOutcome::Skip(SkipReason::MissingCommunity),
    };
    if !allow.contains(&community) {
        return LineOutcome::OutOfScope;
    }
    if !is_valid_record(kind, &obj) {
        return LineOutcome::Skip(SkipReason::Invalid);
    }
    LineOutcome::Keep(project(&obj, fields, human_timestamps))
}
