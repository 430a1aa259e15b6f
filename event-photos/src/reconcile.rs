//! Duplicate prevention: set difference between scanned candidates and the
//! ids already present in the remote event gallery.

use crate::models::PhotoCandidate;
use std::collections::HashSet;

/// Returns the candidates whose id is not in `uploaded`, in input order.
pub fn reconcile(candidates: &[PhotoCandidate], uploaded: &HashSet<String>) -> Vec<PhotoCandidate> {
    if uploaded.is_empty() {
        return candidates.to_vec();
    }

    candidates
        .iter()
        .filter(|photo| !uploaded.contains(&photo.id))
        .cloned()
        .collect()
}

/// Splits candidates into (new, already uploaded), both in input order.
pub fn partition(
    candidates: &[PhotoCandidate],
    uploaded: &HashSet<String>,
) -> (Vec<PhotoCandidate>, Vec<PhotoCandidate>) {
    candidates
        .iter()
        .cloned()
        .partition(|photo| !uploaded.contains(&photo.id))
}
