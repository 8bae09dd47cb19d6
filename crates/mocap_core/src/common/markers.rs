use mocap_utils::vector::{is_missing_v3f, Vector3f};
use std::collections::{HashMap, HashSet};

/// Marker identifier to position for a single frame
pub type MarkerMap = HashMap<String, Vector3f>;
/// A set of marker identifiers
pub type MarkerSet = HashSet<String>;

/// Markers of `universe` that are present in `frame` with a finite position
pub fn available_markers(frame: &MarkerMap, universe: &[String]) -> MarkerMap {
    universe
        .iter()
        .filter_map(|id| {
            frame
                .get(id)
                .filter(|p| !is_missing_v3f(p))
                .map(|p| (id.clone(), *p))
        })
        .collect()
}

/// Identifiers of `universe` missing from `available`
pub fn occluded_markers(available: &MarkerMap, universe: &[String]) -> MarkerSet {
    universe.iter().filter(|id| !available.contains_key(*id)).cloned().collect()
}

pub fn key_set(markers: &MarkerMap) -> MarkerSet {
    markers.keys().cloned().collect()
}
