// src/physics/sphere.rs

use crate::model::structure::{AtomSite, Structure};
use crate::utils::geometry;
use crate::utils::linalg::frac_to_cart;

/// A metal atom (always position 0) and its bonded neighbours, every
/// neighbour moved to the periodic image closest to the metal.
///
/// `AtomSite::index` keeps the index of the atom in the parent structure.
#[derive(Clone, Debug)]
pub struct CoordinationSphere {
    pub lattice: [[f64; 3]; 3],
    pub sites: Vec<AtomSite>,
}

impl CoordinationSphere {
    pub fn metal(&self) -> &str {
        &self.sites[0].element
    }

    /// Coordination number
    pub fn num_ligands(&self) -> usize {
        self.sites.len() - 1
    }

    pub fn cart(&self, i: usize) -> [f64; 3] {
        frac_to_cart(self.sites[i].frac_coords, self.lattice)
    }

    /// Angle i-center-j in degrees
    pub fn angle(&self, i: usize, center: usize, j: usize) -> f64 {
        geometry::calculate_angle(self.cart(i), self.cart(center), self.cart(j))
    }

    /// Signed dihedral i-j-k-l in degrees
    pub fn dihedral(&self, i: usize, j: usize, k: usize, l: usize) -> f64 {
        geometry::calculate_dihedral(self.cart(i), self.cart(j), self.cart(k), self.cart(l))
    }

    /// The cluster as a standalone structure on the parent lattice, for output.
    pub fn to_structure(&self, name: impl Into<String>) -> Structure {
        Structure::new(name, self.lattice, self.sites.clone())
    }
}

/// Builds the coordination sphere of `bonded[0]` from its bonded-neighbour
/// list (as returned by `bonding::find_bonded_indices`).
pub fn build_coordination_sphere(structure: &Structure, bonded: &[usize]) -> CoordinationSphere {
    let center = &structure.atoms[bonded[0]];
    let lattice = structure.lattice;

    let mut sites = Vec::with_capacity(bonded.len());
    sites.push(center.clone());
    for &i in &bonded[1..] {
        let neighbor = &structure.atoms[i];
        sites.push(AtomSite {
            frac_coords: closest_image(lattice, center.frac_coords, neighbor.frac_coords),
            ..neighbor.clone()
        });
    }

    CoordinationSphere { lattice, sites }
}

/// Translates `neighbor` by the integer cell vector nearest to
/// `center - neighbor`, but only if that does not move it further away.
///
/// Half-way components are first rounded away from zero and then, if that
/// does not help, to even. Otherwise the neighbour is returned unchanged.
pub fn closest_image(lattice: [[f64; 3]; 3], center: [f64; 3], neighbor: [f64; 3]) -> [f64; 3] {
    let center_cart = frac_to_cart(center, lattice);
    let dist_before = geometry::calculate_distance(center_cart, frac_to_cart(neighbor, lattice));
    let diff = [
        center[0] - neighbor[0],
        center[1] - neighbor[1],
        center[2] - neighbor[2],
    ];

    let roundings: [fn(f64) -> f64; 2] = [f64::round, f64::round_ties_even];
    for rounding in roundings {
        let shifted = [
            neighbor[0] + rounding(diff[0]),
            neighbor[1] + rounding(diff[1]),
            neighbor[2] + rounding(diff[2]),
        ];
        let dist_after = geometry::calculate_distance(center_cart, frac_to_cart(shifted, lattice));
        if dist_after <= dist_before {
            return shifted;
        }
    }

    neighbor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::bonding::find_bonded_indices;

    const CUBIC: [[f64; 3]; 3] = [[10.0, 0.0, 0.0], [0.0, 10.0, 0.0], [0.0, 0.0, 10.0]];

    #[test]
    fn test_neighbor_moved_next_to_center() {
        let shifted = closest_image(CUBIC, [0.02, 0.5, 0.5], [0.85, 0.5, 0.5]);
        assert!((shifted[0] - (-0.15)).abs() < 1e-12);
        assert_eq!(shifted[1], 0.5);
    }

    #[test]
    fn test_already_close_neighbor_untouched() {
        let shifted = closest_image(CUBIC, [0.5, 0.5, 0.5], [0.6, 0.4, 0.5]);
        assert_eq!(shifted, [0.6, 0.4, 0.5]);
    }

    #[test]
    fn test_correction_never_increases_distance() {
        let lattice = [[7.0, 0.0, 0.0], [3.5, 6.0621778, 0.0], [1.0, 1.0, 9.0]];
        let center = [0.95, 0.05, 0.5];
        let c_cart = frac_to_cart(center, lattice);
        for &n in &[
            [0.1, 0.9, 0.5],
            [0.45, 0.55, 0.0],
            [0.05, 0.05, 0.95],
            [0.5, 0.5, 0.5],
            [0.45, 0.55, 1.0],
        ] {
            let before = geometry::calculate_distance(c_cart, frac_to_cart(n, lattice));
            let after = geometry::calculate_distance(c_cart, frac_to_cart(closest_image(lattice, center, n), lattice));
            assert!(after <= before + 1e-12, "{:?}: {} > {}", n, after, before);
        }
    }

    #[test]
    fn test_sphere_layout() {
        let s = Structure::new(
            "s",
            CUBIC,
            vec![
                AtomSite::new("O", [0.8, 0.5, 0.5], 0),
                AtomSite::new("Zn", [0.02, 0.5, 0.5], 0),
                AtomSite::new("O", [0.22, 0.5, 0.5], 0),
            ],
        );
        let bonded = find_bonded_indices(&s, 1, &s.distance_matrix()[1]).unwrap();
        let sphere = build_coordination_sphere(&s, &bonded);

        assert_eq!(sphere.metal(), "Zn");
        assert_eq!(sphere.num_ligands(), 2);
        assert_eq!(sphere.sites[1].index, 0);
        assert!((sphere.sites[1].frac_coords[0] - (-0.2)).abs() < 1e-12);
        assert!((sphere.angle(1, 0, 2) - 180.0).abs() < 1e-9);
        assert_eq!(sphere.to_structure("cs").len(), 3);
    }
}
