//! Species collections
//!
//! Read-only views over per-species data returned by the solver. A
//! [`SpeciesScalars`] pairs every species in a phase with one scalar value
//! (mole fractions, production rates, and so on) without copying the species
//! metadata per entry.

use serde::{Deserialize, Serialize};
use std::ops::Index;
use std::sync::Arc;

/// A chemical species as reported by the native library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Species {
    /// Species name (e.g. "CH4", "OH")
    pub name: String,
    /// Molecular weight in kg/kmol
    pub molecular_weight: f64,
}

impl Species {
    /// Create a new species
    pub fn new(name: impl Into<String>, molecular_weight: f64) -> Self {
        Self {
            name: name.into(),
            molecular_weight,
        }
    }
}

/// The ordered set of species in a phase.
///
/// Cheap to clone; shared by every [`SpeciesScalars`] view over the phase.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesCollection {
    species: Arc<Vec<Species>>,
}

impl SpeciesCollection {
    /// Create a collection from an ordered list of species
    pub fn new(species: Vec<Species>) -> Self {
        Self {
            species: Arc::new(species),
        }
    }

    /// Number of species in the phase
    pub fn len(&self) -> usize {
        self.species.len()
    }

    /// True if the phase has no species
    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    /// Look up a species by name
    pub fn by_name(&self, name: &str) -> Option<&Species> {
        self.species.iter().find(|s| s.name == name)
    }

    /// Iterate over the species in phase order
    pub fn iter(&self) -> std::slice::Iter<'_, Species> {
        self.species.iter()
    }
}

impl Index<usize> for SpeciesCollection {
    type Output = Species;

    fn index(&self, index: usize) -> &Species {
        &self.species[index]
    }
}

/// One scalar value per species, in phase order.
///
/// A fixed-size read-only view: `scalars[i]` yields the species at position
/// `i` together with its value. The species list and the value array must
/// have the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesScalars {
    species: SpeciesCollection,
    values: Vec<f64>,
}

impl SpeciesScalars {
    /// Pair a species collection with a same-length array of values
    pub fn new(species: SpeciesCollection, values: Vec<f64>) -> Self {
        debug_assert_eq!(species.len(), values.len());
        Self { species, values }
    }

    /// Number of (species, value) pairs
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if the view is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The (species, value) pair at `index`, or `None` past the end
    pub fn get(&self, index: usize) -> Option<(&Species, f64)> {
        Some((self.species.species.get(index)?, *self.values.get(index)?))
    }

    /// The raw value array, in phase order
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// The species this view is defined over
    pub fn species(&self) -> &SpeciesCollection {
        &self.species
    }

    /// Iterate over (species, value) pairs in phase order
    pub fn iter(&self) -> impl Iterator<Item = (&Species, f64)> {
        self.species.iter().zip(self.values.iter().copied())
    }

    /// The value for a species looked up by name
    pub fn value_of(&self, name: &str) -> Option<f64> {
        self.species
            .iter()
            .position(|s| s.name == name)
            .map(|i| self.values[i])
    }
}
