//! Subtree transplant (paste).
//!
//! # Responsibility
//! - Parse serialized subtrees produced by traversal export.
//! - Copy mode: clone with fresh ids and attach under a destination.
//! - Reference mode: link one existing tray under a destination as-is.
//!
//! # Invariants
//! - Copy mode never reuses an input id; internal references are remapped
//!   and external references pass through unchanged.
//! - The source subtree is never mutated.
//! - All saves are attempted in order; a failure stops the batch and leaves
//!   earlier saves in place for a later repair pass.

use crate::model::tray::{fresh_tray_id, Tray, TrayId};
use crate::repo::tray_store::{StoreError, TrayStore};
use log::{info, warn};
use serde_json::Value;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from transplant operations.
#[derive(Debug)]
pub enum TransplantError {
    /// Payload is not JSON, not a non-empty array, or holds non-tray records.
    MalformedPayload(String),
    /// Reference paste would make a tray its own child.
    SelfReference(TrayId),
    /// A save failed; earlier saves in the batch were kept.
    Store(StoreError),
}

impl Display for TransplantError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedPayload(reason) => write!(f, "malformed subtree payload: {reason}"),
            Self::SelfReference(id) => write!(f, "tray {id} cannot be pasted into itself"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TransplantError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for TransplantError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Result of a successful transplant.
#[derive(Debug, Clone, PartialEq)]
pub struct TransplantOutcome {
    /// Root of the attached subtree.
    pub root: Tray,
    /// Destination after attaching the root.
    pub destination: Tray,
    /// Every tray written for the subtree, root first.
    pub written: Vec<Tray>,
}

/// Parses a clipboard payload into tray records.
///
/// Accepts a JSON array of tray objects. A bare object is accepted as a
/// one-element array so shallow single-tray copies can be pasted.
pub fn parse_subtree_payload(payload: &str) -> Result<Vec<Tray>, TransplantError> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|err| TransplantError::MalformedPayload(err.to_string()))?;
    let records = match value {
        Value::Array(items) => items,
        object @ Value::Object(_) => vec![object],
        _ => {
            return Err(TransplantError::MalformedPayload(
                "expected an array of trays".to_string(),
            ))
        }
    };
    if records.is_empty() {
        return Err(TransplantError::MalformedPayload(
            "subtree payload is empty".to_string(),
        ));
    }

    records
        .iter()
        .enumerate()
        .map(|(position, record)| {
            Tray::from_document(record).map_err(|err| {
                TransplantError::MalformedPayload(format!("record {position}: {err}"))
            })
        })
        .collect()
}

/// Clones `trays` with fresh ids, remapping internal references.
///
/// The first record is the subtree root. Its external parent references are
/// dropped because the copy is attached only where it is pasted.
pub fn reassign_ids(trays: &[Tray]) -> Vec<Tray> {
    let mut mapping: HashMap<&str, TrayId> = HashMap::new();
    for tray in trays {
        mapping
            .entry(tray.id.as_str())
            .or_insert_with(fresh_tray_id);
    }
    let remap = |id: &TrayId| mapping.get(id.as_str()).cloned().unwrap_or_else(|| id.clone());

    let mut seen = HashMap::new();
    let mut clones = Vec::with_capacity(mapping.len());
    for (position, tray) in trays.iter().enumerate() {
        if seen.insert(tray.id.as_str(), position).is_some() {
            continue;
        }
        let mut clone = tray.clone();
        clone.id = remap(&tray.id);
        clone.children = Vec::new();
        for child in tray.children.iter().map(remap) {
            clone.push_child(&child);
        }
        clone.parents = Vec::new();
        for parent in &tray.parents {
            let internal = mapping.contains_key(parent.as_str());
            if position == 0 && !internal {
                continue;
            }
            clone.add_parent(&remap(parent));
        }
        clone.watched = Vec::new();
        clone.editing_start = false;
        clone.touch();
        clones.push(clone);
    }
    clones
}

/// Copy-mode paste: attaches a fresh-id copy of `payload` under `destination`.
///
/// Subtree trays are saved first, then the destination.
pub async fn transplant_copy<S: TrayStore + ?Sized>(
    store: &S,
    payload: &str,
    destination: &Tray,
) -> Result<TransplantOutcome, TransplantError> {
    let trays = parse_subtree_payload(payload)?;
    let mut written = reassign_ids(&trays);

    let root = &mut written[0];
    root.add_parent(&destination.id);
    let root_id = root.id.clone();

    let mut destination = destination.clone();
    destination.prepend_child(&root_id);
    destination.folded = false;
    destination.touch();

    save_batch(store, &written, &destination).await?;
    info!(
        "event=subtree_paste module=transplant status=ok mode=copy count={}",
        written.len()
    );
    Ok(TransplantOutcome {
        root: written[0].clone(),
        destination,
        written,
    })
}

/// Reference-mode paste: links the single tray in `payload` under `destination`.
///
/// The stored version of the referenced tray is preferred over the payload
/// copy; the payload record is persisted only when the id is unknown.
pub async fn transplant_reference<S: TrayStore + ?Sized>(
    store: &S,
    payload: &str,
    destination: &Tray,
) -> Result<TransplantOutcome, TransplantError> {
    let mut trays = parse_subtree_payload(payload)?;
    if trays.len() != 1 {
        return Err(TransplantError::MalformedPayload(format!(
            "reference paste expects exactly one tray, got {}",
            trays.len()
        )));
    }
    let record = trays.remove(0);
    if record.id == destination.id {
        return Err(TransplantError::SelfReference(record.id));
    }

    let mut referenced = match store.load_tray(&record.id).await {
        Ok(Some(stored)) => stored,
        Ok(None) => record,
        Err(err) => {
            warn!("event=subtree_paste module=transplant status=skip mode=reference error={err}");
            record
        }
    };
    referenced.add_parent(&destination.id);
    referenced.editing_start = false;
    referenced.touch();

    let mut destination = destination.clone();
    destination.prepend_child(&referenced.id);
    destination.folded = false;
    destination.touch();

    let written = vec![referenced];
    save_batch(store, &written, &destination).await?;
    info!("event=subtree_paste module=transplant status=ok mode=reference count=1");
    Ok(TransplantOutcome {
        root: written[0].clone(),
        destination,
        written,
    })
}

async fn save_batch<S: TrayStore + ?Sized>(
    store: &S,
    trays: &[Tray],
    destination: &Tray,
) -> Result<(), TransplantError> {
    for (saved, tray) in trays.iter().chain(std::iter::once(destination)).enumerate() {
        if let Err(err) = store.save_tray(tray).await {
            warn!(
                "event=subtree_paste module=transplant status=error saved_before_failure={} error={}",
                saved, err
            );
            return Err(err.into());
        }
    }
    Ok(())
}
