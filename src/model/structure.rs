// src/model/structure.rs

use crate::model::elements;
use crate::utils::linalg;
use std::sync::OnceLock;

#[derive(Clone, Debug, PartialEq)]
pub struct AtomSite {
    pub element: String,
    // Fractional coordinates; not wrapped, periodic images may lie outside [0, 1)
    pub frac_coords: [f64; 3],
    // Position within the parent structure. Stable for the whole analysis.
    pub index: usize,
}

impl AtomSite {
    pub fn new(element: impl Into<String>, frac_coords: [f64; 3], index: usize) -> Self {
        Self {
            element: element.into(),
            frac_coords,
            index,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Structure {
    pub name: String,
    // Lattice vectors: [a_vec, b_vec, c_vec]
    pub lattice: [[f64; 3]; 3],
    pub atoms: Vec<AtomSite>,
    distances: OnceLock<Vec<Vec<f64>>>,
}

impl Structure {
    /// Builds a structure and re-numbers the atoms so that `index` matches
    /// the position in `atoms`.
    pub fn new(name: impl Into<String>, lattice: [[f64; 3]; 3], atoms: Vec<AtomSite>) -> Self {
        let atoms = atoms
            .into_iter()
            .enumerate()
            .map(|(i, mut atom)| {
                atom.index = i;
                atom
            })
            .collect();

        Self {
            name: name.into(),
            lattice,
            atoms,
            distances: OnceLock::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn volume(&self) -> f64 {
        linalg::cell_volume(self.lattice)
    }

    /// Periodic (minimum image) distance matrix, computed on first use.
    pub fn distance_matrix(&self) -> &[Vec<f64>] {
        self.distances.get_or_init(|| {
            let frac: Vec<[f64; 3]> = self.atoms.iter().map(|a| a.frac_coords).collect();
            linalg::periodic_distance_matrix(&frac, self.lattice)
        })
    }

    /// Indices of the metal atoms, in structure order.
    pub fn metal_indices(&self) -> Vec<usize> {
        self.atoms
            .iter()
            .filter(|a| elements::is_metal(&a.element))
            .map(|a| a.index)
            .collect()
    }

    /// Splits into a metal-only and a non-metal-only structure on the same lattice.
    pub fn split_metal_organic(&self) -> (Structure, Structure) {
        let (metal, organic): (Vec<AtomSite>, Vec<AtomSite>) = self
            .atoms
            .iter()
            .cloned()
            .partition(|a| elements::is_metal(&a.element));

        (
            Structure::new(format!("{}_metal", self.name), self.lattice, metal),
            Structure::new(format!("{}_organic", self.name), self.lattice, organic),
        )
    }

    /// Chemical formula in alphabetical order, e.g. "C8 Cu2 O4".
    pub fn formula(&self) -> String {
        let mut counts: std::collections::BTreeMap<&str, usize> = Default::default();
        for atom in &self.atoms {
            *counts.entry(atom.element.as_str()).or_insert(0) += 1;
        }
        counts
            .into_iter()
            .map(|(el, count)| format!("{}{}", el, count))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
