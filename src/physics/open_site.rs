// src/physics/open_site.rs
//
// Open metal site classification of a single coordination sphere.
//
// A site is open when its ligands leave a side of the metal uncovered. The
// decision depends on the coordination number (num_l):
//
// - num_l <= 3: always open.
// - num_l = 4, 5: open if any four ligands are (nearly) coplanar.
// - num_l > 5: open if four ligands are coplanar, the metal lies in that
//   plane too, and every remaining ligand sits on the same side of it.
// - Otherwise, open if a plane through the metal and three ligands has all
//   remaining ligands on one side.

use crate::config::Tolerances;
use crate::model::elements;
use crate::model::summary::{SiteSummary, CLOSED, THREE_OR_LESS};
use crate::physics::sphere::CoordinationSphere;
use std::fmt;

/// Target dihedral of the planarity tests (degrees)
const PLANE_CRIT: f64 = 180.0;

/// Minimum coordination number before a site is flagged problematic
const MIN_COORDINATION: usize = 3;
const MIN_COORDINATION_LN_AC: usize = 5;

#[derive(Clone, Debug, PartialEq)]
pub enum SiteType {
    Closed,
    ThreeOrLess,
    /// Four ligands, coplanar (not tetrahedral)
    NonTetrahedral,
    /// Five ligands, four of them coplanar
    Plane5l,
    /// Six or more ligands, a metal-containing ligand plane with everything else on one side
    SameSide,
    /// Plane through the metal and three ligands with everything else on one side
    MetalPlane(String),
}

impl SiteType {
    pub fn is_open(&self) -> bool {
        !matches!(self, SiteType::Closed)
    }
}

impl fmt::Display for SiteType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SiteType::Closed => write!(f, "{}", CLOSED),
            SiteType::ThreeOrLess => write!(f, "{}", THREE_OR_LESS),
            SiteType::NonTetrahedral => write!(f, "plane,non_TD"),
            SiteType::Plane5l => write!(f, "plane_5l,plane_5l"),
            SiteType::SameSide => write!(f, "plane,same_side"),
            SiteType::MetalPlane(metal) => write!(f, "{},metal_plane", metal),
        }
    }
}

/// Absolute dihedral angle together with the sphere positions it was measured on
#[derive(Clone, Copy, Debug)]
struct Dihedral {
    value: f64,
    indices: [usize; 4],
}

/// Classifies one coordination sphere. The returned record is never marked
/// unique; that is decided at the structure level.
pub fn classify(sphere: &CoordinationSphere, tolerances: &Tolerances) -> SiteSummary {
    let metal = sphere.metal().to_string();
    let num_l = sphere.num_ligands();

    let min_coordination = if elements::is_lanthanide_or_actinide(&metal) {
        MIN_COORDINATION_LN_AC
    } else {
        MIN_COORDINATION
    };
    let problematic = num_l < min_coordination;
    let t_factor = t_factor(sphere);

    let (site_type, min_dihedral, all_dihedrals) = if num_l <= 3 {
        (SiteType::ThreeOrLess, 0.0, Vec::new())
    } else {
        let dihedrals = ligand_dihedrals(sphere);
        let min = dihedrals.iter().fold(f64::INFINITY, |m, d| m.min(d.value));
        let site_type = ligand_plane_test(sphere, &dihedrals, tolerances)
            .or_else(|| metal_plane_test(sphere, tolerances))
            .unwrap_or(SiteType::Closed);
        (site_type, min, dihedrals.iter().map(|d| d.value).collect())
    };

    log::debug!(
        "{} site with {} ligands: {} (t = {:.3})",
        metal,
        num_l,
        site_type,
        t_factor
    );

    SiteSummary {
        is_open: site_type.is_open(),
        site_type: site_type.to_string(),
        metal,
        unique: false,
        problematic,
        number_of_linkers: num_l,
        t_factor,
        min_dihedral: Some(min_dihedral),
        all_dihedrals: Some(all_dihedrals),
    }
}

// --- Shape factors ---

/// Four-coordinate shape factor: 1 for tetrahedral, 0 for square planar
pub fn t4_factor(alpha: f64, beta: f64) -> f64 {
    (360.0 - (alpha + beta)) / 141.0
}

/// Five-coordinate shape factor
pub fn t5_factor(alpha: f64, beta: f64) -> f64 {
    (beta - alpha) / 60.0
}

/// Six-coordinate shape factor
pub fn t6_factor(gamma: f64) -> f64 {
    gamma / 180.0
}

/// Shape factor from the largest ligand-metal-ligand angles (beta the largest,
/// alpha the second largest). -1 for coordination numbers other than 4, 5, 6.
pub fn t_factor(sphere: &CoordinationSphere) -> f64 {
    let n = sphere.sites.len();
    let mut angles: Vec<(f64, usize, usize)> = Vec::new();
    for i in 1..n {
        for j in (i + 1)..n {
            angles.push((sphere.angle(i, 0, j), i, j));
        }
    }
    angles.sort_by(|a, b| a.0.total_cmp(&b.0));

    match sphere.num_ligands() {
        4 => {
            let (beta, alpha) = (angles[angles.len() - 1].0, angles[angles.len() - 2].0);
            t4_factor(alpha, beta)
        }
        5 => {
            let (beta, alpha) = (angles[angles.len() - 1].0, angles[angles.len() - 2].0);
            t5_factor(alpha, beta)
        }
        6 => {
            // drop the pair spanning the largest angle, twice; gamma is what remains
            let (_, a1, b1) = angles[angles.len() - 1];
            let rest: Vec<_> = angles
                .iter()
                .copied()
                .filter(|&(_, i, j)| i != a1 && i != b1 && j != a1 && j != b1)
                .collect();
            let (_, a2, b2) = first_max(&rest);
            let rest: Vec<_> = rest
                .into_iter()
                .filter(|&(_, i, j)| i != a2 && i != b2 && j != a2 && j != b2)
                .collect();
            t6_factor(first_max(&rest).0)
        }
        _ => -1.0,
    }
}

fn first_max(angles: &[(f64, usize, usize)]) -> (f64, usize, usize) {
    angles
        .iter()
        .copied()
        .fold((f64::NEG_INFINITY, 0, 0), |best, a| if a.0 > best.0 { a } else { best })
}

// --- Dihedral tests ---

fn passes(dihedral: f64, crit: f64, tol: f64) -> bool {
    (dihedral - crit).abs() < tol || (dihedral - crit + 180.0).abs() < tol
}

/// |dihedral(i, j, k, l)| for every choice of four distinct ligands, with
/// (i, l) and (j, k) each taken as ordered pairs i < l, j < k.
fn ligand_dihedrals(sphere: &CoordinationSphere) -> Vec<Dihedral> {
    let n = sphere.sites.len();
    let mut out = Vec::new();
    for i in 1..n {
        for l in (i + 1)..n {
            for j in 1..n {
                for k in (j + 1)..n {
                    if j == i || j == l || k == i || k == l {
                        continue;
                    }
                    out.push(Dihedral {
                        value: sphere.dihedral(i, j, k, l).abs(),
                        indices: [i, j, k, l],
                    });
                }
            }
        }
    }
    out
}

/// |dihedral(metal, j, k, l)| over all ordered triples of distinct ligands
fn metal_dihedrals(sphere: &CoordinationSphere) -> Vec<Dihedral> {
    let n = sphere.sites.len();
    let mut out = Vec::new();
    for l in 1..n {
        for j in 1..n {
            for k in 1..n {
                if j == k || j == l || k == l {
                    continue;
                }
                out.push(Dihedral {
                    value: sphere.dihedral(0, j, k, l).abs(),
                    indices: [0, j, k, l],
                });
            }
        }
    }
    out
}

fn ligand_plane_test(
    sphere: &CoordinationSphere,
    dihedrals: &[Dihedral],
    tolerances: &Tolerances,
) -> Option<SiteType> {
    let num_l = sphere.num_ligands();
    let (tol, open_type) = match num_l {
        4 => (tolerances.plane, SiteType::NonTetrahedral),
        5 => (tolerances.plane_5l, SiteType::Plane5l),
        _ => (tolerances.plane, SiteType::SameSide),
    };

    for d in dihedrals {
        if !passes(d.value, PLANE_CRIT, tol) {
            continue;
        }
        if num_l <= 5 {
            return Some(open_type);
        }

        let [i, j, k, l] = d.indices;
        if plane_on_metal(sphere, &d.indices, tolerances.plane_on_metal) {
            let others = other_indices(sphere, &[0, i, j, k, l]);
            if all_on_same_side(sphere, &others, j, k, l) {
                return Some(open_type);
            }
        }
    }
    None
}

/// True if the metal and some three of `indices[1..]` lie (nearly) in one plane.
fn plane_on_metal(sphere: &CoordinationSphere, indices: &[usize; 4], tol: f64) -> bool {
    for a in 1..4 {
        for b in 1..4 {
            for c in 1..4 {
                if a == b || a == c || b == c {
                    continue;
                }
                let d = sphere
                    .dihedral(0, indices[a], indices[b], indices[c])
                    .abs();
                if passes(d, PLANE_CRIT, tol) {
                    return true;
                }
            }
        }
    }
    false
}

fn metal_plane_test(sphere: &CoordinationSphere, tolerances: &Tolerances) -> Option<SiteType> {
    for d in metal_dihedrals(sphere) {
        if !passes(d.value, PLANE_CRIT, tolerances.plane) {
            continue;
        }
        let [_, j, k, l] = d.indices;
        let others = other_indices(sphere, &d.indices);
        if all_on_same_side(sphere, &others, j, k, l) {
            return Some(SiteType::MetalPlane(sphere.metal().to_string()));
        }
    }
    None
}

fn other_indices(sphere: &CoordinationSphere, used: &[usize]) -> Vec<usize> {
    (0..sphere.sites.len())
        .filter(|i| !used.contains(i))
        .collect()
}

/// All `others` strictly on one side of the (j, k, l) plane
fn all_on_same_side(sphere: &CoordinationSphere, others: &[usize], j: usize, k: usize, l: usize) -> bool {
    let signed: Vec<f64> = others.iter().map(|&o| sphere.dihedral(j, k, l, o)).collect();
    signed.iter().all(|&d| d > 0.0) || signed.iter().all(|&d| d < 0.0)
}
