// src/utils/linalg.rs

use nalgebra::{Matrix3, Vector3};
use rayon::prelude::*;

fn lattice_matrix(lattice: [[f64; 3]; 3]) -> Matrix3<f64> {
  Matrix3::from_row_slice(&[
    lattice[0][0],
    lattice[0][1],
    lattice[0][2],
    lattice[1][0],
    lattice[1][1],
    lattice[1][2],
    lattice[2][0],
    lattice[2][1],
    lattice[2][2],
  ])
}

/// Convert fractional coordinates to Cartesian using lattice matrix
///
/// # Arguments
/// * `frac` - Fractional coordinates [x, y, z]
/// * `lattice` - Lattice vectors as row matrix [[ax, ay, az], [bx, by, bz], [cx, cy, cz]]
///
/// # Formula
/// ```text
/// Cartesian = Lattice^T × Fractional
/// ```
pub fn frac_to_cart(frac: [f64; 3], lattice: [[f64; 3]; 3]) -> [f64; 3] {
  let cart_vec = lattice_matrix(lattice).transpose() * Vector3::from(frac);
  [cart_vec.x, cart_vec.y, cart_vec.z]
}

/// Convert Cartesian coordinates to fractional using lattice matrix
///
/// Returns None if the lattice is singular.
///
/// # Formula
/// ```text
/// Fractional = (Lattice^T)^-1 × Cartesian
/// ```
pub fn cart_to_frac(cart: [f64; 3], lattice: [[f64; 3]; 3]) -> Option<[f64; 3]> {
  let inv_lat = lattice_matrix(lattice).transpose().try_inverse()?;
  let frac_vec = inv_lat * Vector3::from(cart);
  Some([frac_vec.x, frac_vec.y, frac_vec.z])
}

/// Unit cell volume |a · (b × c)| in Å³
pub fn cell_volume(lattice: [[f64; 3]; 3]) -> f64 {
  lattice_matrix(lattice).determinant().abs()
}

// The fractional difference is first wrapped to [-0.5, 0.5]; the 27
// surrounding images are then searched so skewed cells are handled too.
fn min_image_distance(lat_t: &Matrix3<f64>, fa: [f64; 3], fb: [f64; 3]) -> f64 {
  let mut diff = Vector3::new(fb[0] - fa[0], fb[1] - fa[1], fb[2] - fa[2]);
  diff.apply(|d| {
    let r = d.round();
    *d -= r;
  });

  let mut min_dist = f64::MAX;
  for dx in -1..=1 {
    for dy in -1..=1 {
      for dz in -1..=1 {
        let shift = Vector3::new(dx as f64, dy as f64, dz as f64);
        let dist = (lat_t * (diff + shift)).norm();
        if dist < min_dist {
          min_dist = dist;
        }
      }
    }
  }
  min_dist
}

/// Full N×N minimum image distance matrix. Rows are computed in parallel.
///
/// The diagonal is computed like every other entry, so corrupt coordinates
/// show up as a non-zero self-distance.
pub fn periodic_distance_matrix(frac: &[[f64; 3]], lattice: [[f64; 3]; 3]) -> Vec<Vec<f64>> {
  let lat_t = lattice_matrix(lattice).transpose();
  frac
    .par_iter()
    .map(|fa| {
      frac
        .iter()
        .map(|fb| min_image_distance(&lat_t, *fa, *fb))
        .collect()
    })
    .collect()
}
