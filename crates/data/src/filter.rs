use std::fmt;
use std::str::FromStr;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Filterable dimension of a data point.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Locations,
    Labels,
    Groups,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Locations, Dimension::Labels, Dimension::Groups];

    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Locations => "locations",
            Dimension::Labels => "labels",
            Dimension::Groups => "groups",
        }
    }

    /// Name of the event published after this dimension's filters change.
    pub fn did_change_event(self) -> String {
        format!("{}-filter-did-change", self.as_str())
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown filter dimension `{0}`")]
pub struct UnknownDimension(pub String);

impl FromStr for Dimension {
    type Err = UnknownDimension;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "locations" => Ok(Dimension::Locations),
            "labels" => Ok(Dimension::Labels),
            "groups" => Ok(Dimension::Groups),
            other => Err(UnknownDimension(other.to_string())),
        }
    }
}

/// Selected keys for one dimension.
///
/// Ordering contract:
/// - Iteration yields keys in insertion order; removing a key keeps the
///   relative order of the others.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySet {
    keys: IndexSet<String>,
}

impl KeySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Adds `key` if absent, removes it if present.
    ///
    /// Returns `true` if the key is selected afterwards.
    pub fn toggle(&mut self, key: &str) -> bool {
        if self.keys.shift_remove(key) {
            false
        } else {
            self.keys.insert(key.to_string());
            true
        }
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.keys.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.keys.iter().cloned().collect()
    }
}

/// Selected keys for every dimension. Dimensions are independent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    locations: KeySet,
    labels: KeySet,
    groups: KeySet,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, dimension: Dimension) -> &KeySet {
        match dimension {
            Dimension::Locations => &self.locations,
            Dimension::Labels => &self.labels,
            Dimension::Groups => &self.groups,
        }
    }

    pub fn get_mut(&mut self, dimension: Dimension) -> &mut KeySet {
        match dimension {
            Dimension::Locations => &mut self.locations,
            Dimension::Labels => &mut self.labels,
            Dimension::Groups => &mut self.groups,
        }
    }

    pub fn is_empty(&self) -> bool {
        Dimension::ALL.iter().all(|d| self.get(*d).is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::{Dimension, FilterState, KeySet};
    use pretty_assertions::assert_eq;

    #[test]
    fn toggle_adds_then_removes() {
        let mut s = KeySet::new();
        assert!(s.is_empty());
        assert!(s.toggle("A"));
        assert!(s.contains("A"));
        assert_eq!(s.len(), 1);
        assert!(!s.toggle("A"));
        assert!(!s.contains("A"));
        assert!(s.is_empty());
    }

    #[test]
    fn removal_keeps_insertion_order() {
        let mut s = KeySet::new();
        s.toggle("C");
        s.toggle("A");
        s.toggle("B");
        s.toggle("A");
        assert_eq!(s.to_vec(), vec!["C", "B"]);
    }

    #[test]
    fn dimensions_are_independent() {
        let mut f = FilterState::new();
        f.get_mut(Dimension::Locations).toggle("A");
        assert!(f.get(Dimension::Locations).contains("A"));
        assert!(!f.get(Dimension::Labels).contains("A"));
        assert!(!f.is_empty());
        f.get_mut(Dimension::Locations).clear();
        assert!(f.is_empty());
    }

    #[test]
    fn dimension_names_round_trip() {
        for d in Dimension::ALL {
            assert_eq!(d.as_str().parse::<Dimension>().unwrap(), d);
        }
        assert!("regions".parse::<Dimension>().is_err());
        assert_eq!(
            Dimension::Locations.did_change_event(),
            "locations-filter-did-change"
        );
    }
}
