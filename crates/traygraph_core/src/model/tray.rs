//! Tray domain model.
//!
//! # Responsibility
//! - Define the canonical outline node record persisted per document.
//! - Normalize stored/clipboard JSON into the canonical schema.
//! - Validate graph-local invariants before persistence.
//!
//! # Invariants
//! - `id` is stable for the tray lifetime and never reused.
//! - A tray id never appears in its own `children` or `parents`.
//! - `children` and `parents` hold no duplicates; `children` order is display order.
//! - `watched` is derived from watch tags and is never treated as explicit edges.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Opaque tray identity.
///
/// Fresh ids are UUID v4 strings, but stored ids are not required to be
/// UUIDs (the session root uses a fixed well-known id).
pub type TrayId = String;

/// Latest on-disk schema version understood by this crate.
pub const TRAY_SCHEMA_VERSION: u32 = 1;

/// Rendering hint for child layout. Persisted, never interpreted by core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutAxis {
    Row,
    #[default]
    Column,
}

impl LayoutAxis {
    /// Returns the other axis.
    pub fn toggled(self) -> Self {
        match self {
            Self::Row => Self::Column,
            Self::Column => Self::Row,
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "row" => Some(Self::Row),
            "column" => Some(Self::Column),
            _ => None,
        }
    }
}

/// Canonical outline node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tray {
    /// Stable identity; serialized as `uuid` to match stored documents.
    #[serde(rename = "uuid")]
    pub id: TrayId,
    /// Display text.
    pub name: String,
    /// Explicit children in display order.
    pub children: Vec<TrayId>,
    /// Trays listing this tray among their explicit children.
    #[serde(rename = "parentUuid")]
    pub parents: Vec<TrayId>,
    /// Whether children are hidden.
    #[serde(rename = "isFolded")]
    pub folded: bool,
    /// Free-form labels, lowercased and de-duplicated.
    pub tags: Vec<String>,
    /// Labels whose carriers become implicit children.
    #[serde(rename = "watchTags")]
    pub watch_tags: Vec<String>,
    /// Implicit children derived from `watch_tags`; kept apart from `children`.
    #[serde(rename = "watchedChildren")]
    pub watched: Vec<TrayId>,
    /// Open-ended host data, opaque to core.
    #[serde(rename = "metaData")]
    pub metadata: Map<String, Value>,
    /// Unix epoch milliseconds of the last mutation.
    #[serde(rename = "lastModified")]
    pub last_modified: i64,
    #[serde(rename = "flexDirection")]
    pub layout_axis: LayoutAxis,
    /// Transient "open in edit mode" flag set on freshly added children.
    #[serde(rename = "editingStart")]
    pub editing_start: bool,
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,
}

/// Graph-local invariant violations detected before persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrayValidationError {
    EmptyId,
    SelfChild(TrayId),
    SelfParent(TrayId),
    DuplicateChild { tray: TrayId, child: TrayId },
    DuplicateParent { tray: TrayId, parent: TrayId },
}

impl Display for TrayValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "tray id must not be empty"),
            Self::SelfChild(id) => write!(f, "tray {id} lists itself as a child"),
            Self::SelfParent(id) => write!(f, "tray {id} lists itself as a parent"),
            Self::DuplicateChild { tray, child } => {
                write!(f, "tray {tray} lists child {child} more than once")
            }
            Self::DuplicateParent { tray, parent } => {
                write!(f, "tray {tray} lists parent {parent} more than once")
            }
        }
    }
}

impl Error for TrayValidationError {}

/// Reasons a JSON document cannot be normalized into a tray.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrayDocumentError {
    NotAnObject,
    MissingId,
    UnsupportedSchemaVersion { found: u64, supported: u32 },
}

impl Display for TrayDocumentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "tray document must be a JSON object"),
            Self::MissingId => write!(f, "tray document has no usable `uuid`"),
            Self::UnsupportedSchemaVersion { found, supported } => write!(
                f,
                "tray schema version {found} is newer than supported {supported}"
            ),
        }
    }
}

impl Error for TrayDocumentError {}

impl Tray {
    /// Creates a tray with a freshly generated id.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(fresh_tray_id(), name)
    }

    /// Creates a tray with a caller-provided id.
    ///
    /// Used for the well-known session root and for import paths where the
    /// identity already exists.
    pub fn with_id(id: impl Into<TrayId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            children: Vec::new(),
            parents: Vec::new(),
            folded: false,
            tags: Vec::new(),
            watch_tags: Vec::new(),
            watched: Vec::new(),
            metadata: Map::new(),
            last_modified: now_epoch_ms(),
            layout_axis: LayoutAxis::default(),
            editing_start: false,
            schema_version: TRAY_SCHEMA_VERSION,
        }
    }

    /// Normalizes an untrusted JSON document into a canonical tray.
    ///
    /// Missing or mistyped fields fall back to defaults, non-string list
    /// entries are dropped and duplicate/self references are removed. Only
    /// a missing id or a newer schema version are rejected.
    pub fn from_document(document: &Value) -> Result<Self, TrayDocumentError> {
        let object = document.as_object().ok_or(TrayDocumentError::NotAnObject)?;

        let id = object
            .get("uuid")
            .and_then(Value::as_str)
            .filter(|value| !value.trim().is_empty())
            .ok_or(TrayDocumentError::MissingId)?
            .to_string();

        let schema_version = match object.get("schemaVersion").and_then(Value::as_u64) {
            Some(found) if found > u64::from(TRAY_SCHEMA_VERSION) => {
                return Err(TrayDocumentError::UnsupportedSchemaVersion {
                    found,
                    supported: TRAY_SCHEMA_VERSION,
                });
            }
            _ => TRAY_SCHEMA_VERSION,
        };

        let last_modified = match object.get("lastModified") {
            Some(Value::Number(number)) => number
                .as_i64()
                .or_else(|| number.as_f64().map(|value| value as i64))
                .unwrap_or_else(now_epoch_ms),
            _ => now_epoch_ms(),
        };

        let mut tray = Self {
            name: object
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            children: id_list(object.get("children")),
            parents: id_list(object.get("parentUuid")),
            folded: object
                .get("isFolded")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            tags: normalize_tags(string_list(object.get("tags"))),
            watch_tags: normalize_tags(string_list(object.get("watchTags"))),
            watched: id_list(object.get("watchedChildren")),
            metadata: object
                .get("metaData")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
            last_modified,
            layout_axis: object
                .get("flexDirection")
                .and_then(Value::as_str)
                .and_then(LayoutAxis::parse)
                .unwrap_or_default(),
            editing_start: object
                .get("editingStart")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            schema_version,
            id,
        };
        tray.strip_self_references();
        Ok(tray)
    }

    /// Serializes to the canonical JSON document shape.
    pub fn to_document(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Checks graph-local invariants; called by stores before every write.
    pub fn validate(&self) -> Result<(), TrayValidationError> {
        if self.id.trim().is_empty() {
            return Err(TrayValidationError::EmptyId);
        }
        if self.children.contains(&self.id) {
            return Err(TrayValidationError::SelfChild(self.id.clone()));
        }
        if self.parents.contains(&self.id) {
            return Err(TrayValidationError::SelfParent(self.id.clone()));
        }
        if let Some(child) = first_duplicate(&self.children) {
            return Err(TrayValidationError::DuplicateChild {
                tray: self.id.clone(),
                child,
            });
        }
        if let Some(parent) = first_duplicate(&self.parents) {
            return Err(TrayValidationError::DuplicateParent {
                tray: self.id.clone(),
                parent,
            });
        }
        Ok(())
    }

    /// Marks the tray as mutated now.
    pub fn touch(&mut self) {
        self.last_modified = now_epoch_ms();
    }

    pub fn has_child(&self, id: &str) -> bool {
        self.children.iter().any(|child| child == id)
    }

    pub fn has_parent(&self, id: &str) -> bool {
        self.parents.iter().any(|parent| parent == id)
    }

    /// Appends a parent reference. Returns `false` when nothing changed.
    pub fn add_parent(&mut self, id: &str) -> bool {
        if id == self.id || self.has_parent(id) {
            return false;
        }
        self.parents.push(id.to_string());
        true
    }

    /// Appends an explicit child. Returns `false` when nothing changed.
    pub fn push_child(&mut self, id: &str) -> bool {
        if id == self.id || self.has_child(id) {
            return false;
        }
        self.children.push(id.to_string());
        true
    }

    /// Inserts an explicit child ahead of existing ones.
    pub fn prepend_child(&mut self, id: &str) -> bool {
        if id == self.id || self.has_child(id) {
            return false;
        }
        self.children.insert(0, id.to_string());
        true
    }

    pub fn remove_child(&mut self, id: &str) -> bool {
        let before = self.children.len();
        self.children.retain(|child| child != id);
        before != self.children.len()
    }

    pub fn remove_parent(&mut self, id: &str) -> bool {
        let before = self.parents.len();
        self.parents.retain(|parent| parent != id);
        before != self.parents.len()
    }

    /// Explicit children followed by implicit (watched) ones not already present.
    pub fn effective_children(&self) -> Vec<TrayId> {
        let mut merged = self.children.clone();
        for id in &self.watched {
            if *id != self.id && !merged.contains(id) {
                merged.push(id.clone());
            }
        }
        merged
    }

    /// Whether `id` is a child only through watch aggregation.
    pub fn is_implicit_child(&self, id: &str) -> bool {
        !self.has_child(id) && self.watched.iter().any(|watched| watched == id)
    }

    fn strip_self_references(&mut self) {
        let own = self.id.clone();
        self.children.retain(|id| *id != own);
        self.parents.retain(|id| *id != own);
        self.watched.retain(|id| *id != own);
    }
}

/// Generates a fresh, globally unique tray id.
pub fn fresh_tray_id() -> TrayId {
    Uuid::new_v4().to_string()
}

/// Current time as Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}

/// Normalizes one tag value: trimmed, lowercased, `None` when blank.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Normalizes and de-duplicates tags, keeping first-seen order.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut normalized = Vec::new();
    for tag in tags {
        if let Some(value) = normalize_tag(tag.as_ref()) {
            if seen.insert(value.clone()) {
                normalized.push(value);
            }
        }
    }
    normalized
}

/// Splits comma separated tag input (`"work, Home"`) into normalized tags.
pub fn parse_tag_input(input: &str) -> Vec<String> {
    normalize_tags(input.split(','))
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn id_list(value: Option<&Value>) -> Vec<TrayId> {
    let mut seen = HashSet::new();
    string_list(value)
        .into_iter()
        .filter(|id| !id.trim().is_empty())
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

fn first_duplicate(ids: &[TrayId]) -> Option<TrayId> {
    let mut seen = HashSet::new();
    ids.iter().find(|id| !seen.insert(id.as_str())).cloned()
}
