//! Tray graph algorithms.
//!
//! # Responsibility
//! - Traverse, transplant, repair and aggregate over the multi-parent tray graph.
//! - Compute focus movement over focus paths.
//!
//! # Invariants
//! - Referenced trays that fail to load are skipped, never fatal.
//! - Saves are independent; a failed save leaves earlier saves in place.

pub mod generation;
pub mod navigator;
pub mod repair;
pub mod tag_index;
pub mod transplant;
pub mod traversal;
pub mod watch;

use crate::model::tray::{Tray, TrayId};
use crate::repo::tray_store::TrayStore;
use futures::future::join_all;
use log::warn;

/// Loads `ids` concurrently, pairing each id with its tray.
///
/// Missing ids and load failures yield `None`; failures are logged with the
/// calling module name.
pub(crate) async fn load_many<S: TrayStore + ?Sized>(
    store: &S,
    ids: &[TrayId],
    module: &'static str,
) -> Vec<(TrayId, Option<Tray>)> {
    let loads = ids.iter().map(|id| store.load_tray(id));
    let results = join_all(loads).await;
    ids.iter()
        .cloned()
        .zip(results)
        .map(|(id, result)| match result {
            Ok(tray) => (id, tray),
            Err(err) => {
                warn!("event=tray_load module={module} status=skip error={err}");
                (id, None)
            }
        })
        .collect()
}
