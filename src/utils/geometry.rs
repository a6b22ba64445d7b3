// src/utils/geometry.rs

use nalgebra::Vector3;

type Point3 = [f64; 3];

fn vec3(p: Point3) -> Vector3<f64> {
    Vector3::from(p)
}

/// Distance between two Cartesian points (Angstroms)
pub fn calculate_distance(p1: Point3, p2: Point3) -> f64 {
    (vec3(p1) - vec3(p2)).norm()
}

/// Angle P1-CENTER-P3 in degrees, in [0, 180]
pub fn calculate_angle(p1: Point3, center: Point3, p3: Point3) -> f64 {
    let v1 = vec3(p1) - vec3(center);
    let v2 = vec3(p3) - vec3(center);
    let norms = v1.norm() * v2.norm();
    if norms == 0.0 {
        return 0.0;
    }
    (v1.dot(&v2) / norms).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Signed torsion (dihedral) angle P1-P2-P3-P4 in degrees, in (-180, 180]
///
/// Positive when P4 is rotated clockwise from P1 looking down P2 -> P3.
pub fn calculate_dihedral(p1: Point3, p2: Point3, p3: Point3, p4: Point3) -> f64 {
    let b1 = vec3(p2) - vec3(p1);
    let b2 = vec3(p3) - vec3(p2);
    let b3 = vec3(p4) - vec3(p3);

    // normals of the (b1, b2) and (b2, b3) planes
    let v = b1.cross(&b2);
    let w = b2.cross(&b3);

    let x = v.dot(&w);
    let y = b2.norm() * b1.dot(&w);

    y.atan2(x).to_degrees()
}
