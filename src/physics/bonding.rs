// src/physics/bonding.rs

use crate::error::{OmsError, OmsResult};
use crate::model::elements;
use crate::model::structure::Structure;

/// Largest self-distance accepted as zero (Å)
pub const SELF_DISTANCE_EPS: f64 = 1e-7;

/// Bonded neighbours of `center`, given its row of the periodic distance matrix.
///
/// The returned list always starts with `center` itself, followed by the
/// bonded atoms in structure order. A non-zero self-distance means the
/// distance matrix is corrupt and aborts the analysis.
pub fn find_bonded_indices(
    structure: &Structure,
    center: usize,
    distances: &[f64],
) -> OmsResult<Vec<usize>> {
    let self_distance = distances[center];
    if self_distance.is_nan() || self_distance > SELF_DISTANCE_EPS {
        return Err(OmsError::CorruptDistanceMatrix {
            index: center,
            distance: self_distance,
        });
    }

    let max_bond = elements::max_bond_length();
    let center_el = structure.atoms[center].element.as_str();

    let mut bonded = vec![center];
    for (i, &dist) in distances.iter().enumerate() {
        if i == center || dist > max_bond {
            continue;
        }
        let other_el = structure.atoms[i].element.as_str();
        let tolerance = elements::bond_tolerance(center_el, other_el);
        if elements::bond_is_valid(center_el, other_el, dist, tolerance) {
            bonded.push(i);
        }
    }

    Ok(bonded)
}

/// Bonded-neighbour lists of every atom, each in the form returned by
/// [`find_bonded_indices`].
pub fn find_all_bonded_indices(structure: &Structure) -> OmsResult<Vec<Vec<usize>>> {
    let distances = structure.distance_matrix();
    (0..structure.len())
        .map(|i| find_bonded_indices(structure, i, &distances[i]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::structure::AtomSite;

    fn water_cluster() -> Structure {
        // Cu with two O at 2.0 Å, one C at 3.0 Å (too far) and an H on the first O
        Structure::new(
            "cluster",
            [[10.0, 0.0, 0.0], [0.0, 10.0, 0.0], [0.0, 0.0, 10.0]],
            vec![
                AtomSite::new("Cu", [0.5, 0.5, 0.5], 0),
                AtomSite::new("O", [0.7, 0.5, 0.5], 0),
                AtomSite::new("O", [0.3, 0.5, 0.5], 0),
                AtomSite::new("C", [0.5, 0.8, 0.5], 0),
                AtomSite::new("H", [0.8, 0.5, 0.5], 0),
            ],
        )
    }

    #[test]
    fn test_center_comes_first() {
        let s = water_cluster();
        let d = s.distance_matrix();
        let bonded = find_bonded_indices(&s, 0, &d[0]).unwrap();
        assert_eq!(bonded, vec![0, 1, 2]);

        let bonded = find_bonded_indices(&s, 1, &d[1]).unwrap();
        assert_eq!(bonded, vec![1, 0, 4]);
    }

    #[test]
    fn test_corrupt_self_distance_is_fatal() {
        let s = water_cluster();
        let mut row = s.distance_matrix()[0].clone();
        row[0] = 0.01;
        match find_bonded_indices(&s, 0, &row) {
            Err(OmsError::CorruptDistanceMatrix { index, .. }) => assert_eq!(index, 0),
            other => panic!("expected corrupt distance error, got {:?}", other),
        }

        row[0] = f64::NAN;
        assert!(find_bonded_indices(&s, 0, &row).is_err());
    }

    #[test]
    fn test_bonds_across_cell_boundary() {
        let s = Structure::new(
            "wrap",
            [[10.0, 0.0, 0.0], [0.0, 10.0, 0.0], [0.0, 0.0, 10.0]],
            vec![
                AtomSite::new("Zn", [0.02, 0.5, 0.5], 0),
                AtomSite::new("O", [0.82, 0.5, 0.5], 0),
                AtomSite::new("O", [0.22, 0.5, 0.5], 0),
            ],
        );
        let all = find_all_bonded_indices(&s).unwrap();
        assert_eq!(all[0], vec![0, 1, 2]);
        assert_eq!(all[1], vec![1, 0]);
    }
}
