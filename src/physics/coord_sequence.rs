// src/physics/coord_sequence.rs

use crate::model::structure::Structure;
use std::collections::HashSet;

/// Number of shells in a coordination sequence
pub const NUM_SHELLS: usize = 6;

pub type CoordinationSequence = [usize; NUM_SHELLS];

/// An atom in a specific periodic image. The atom sits at
/// `frac_coords - offset`.
type ImageAtom = (usize, [i32; 3]);

/// Coordination sequence of `center`: entry n counts the atom images first
/// reached n + 1 bonds away from it.
///
/// `bonded` holds the bonded-neighbour list of every atom of `structure`
/// (see `bonding::find_all_bonded_indices`).
pub fn coordination_sequence(
    structure: &Structure,
    bonded: &[Vec<usize>],
    center: usize,
) -> CoordinationSequence {
    let mut visited: HashSet<ImageAtom> = HashSet::new();
    let mut shell: HashSet<ImageAtom> = HashSet::new();
    shell.insert((center, [0, 0, 0]));
    visited.insert((center, [0, 0, 0]));

    let mut sequence = [0; NUM_SHELLS];
    for count in sequence.iter_mut() {
        let mut next = HashSet::new();
        for &(a, offset) in &shell {
            let fa = structure.atoms[a].frac_coords;
            for &c in &bonded[a] {
                let fc = structure.atoms[c].frac_coords;
                let image = (
                    c,
                    [
                        offset[0] - (fa[0] - fc[0]).round_ties_even() as i32,
                        offset[1] - (fa[1] - fc[1]).round_ties_even() as i32,
                        offset[2] - (fa[2] - fc[2]).round_ties_even() as i32,
                    ],
                );
                if !visited.contains(&image) {
                    next.insert(image);
                }
            }
        }

        *count = next.len();
        visited.extend(next.iter().copied());
        shell = next;
    }

    sequence
}

/// True if `sequence` matches none of the already seen ones
pub fn is_new_site(seen: &[CoordinationSequence], sequence: &CoordinationSequence) -> bool {
    !seen.iter().any(|s| s == sequence)
}
