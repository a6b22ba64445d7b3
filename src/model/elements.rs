// src/model/elements.rs

/// Covalent radii in Angstroms (Cordero et al., Dalton Trans. 2008, 2832).
/// Low-spin values for Mn, Fe and Co; sp3 value for C.
pub const COVALENT_RADII: &[(&str, f64)] = &[
    // --- Period 1 ---
    ("H", 0.31), ("He", 0.28),
    // --- Period 2 ---
    ("Li", 1.28), ("Be", 0.96), ("B", 0.84), ("C", 0.76), ("N", 0.71), ("O", 0.66),
    ("F", 0.57), ("Ne", 0.58),
    // --- Period 3 ---
    ("Na", 1.66), ("Mg", 1.41), ("Al", 1.21), ("Si", 1.11), ("P", 1.07), ("S", 1.05),
    ("Cl", 1.02), ("Ar", 1.06),
    // --- Period 4 ---
    ("K", 2.03), ("Ca", 1.76), ("Sc", 1.70), ("Ti", 1.60), ("V", 1.53), ("Cr", 1.39),
    ("Mn", 1.39), ("Fe", 1.32), ("Co", 1.26), ("Ni", 1.24), ("Cu", 1.32), ("Zn", 1.22),
    ("Ga", 1.22), ("Ge", 1.20), ("As", 1.19), ("Se", 1.20), ("Br", 1.20), ("Kr", 1.16),
    // --- Period 5 ---
    ("Rb", 2.20), ("Sr", 1.95), ("Y", 1.90), ("Zr", 1.75), ("Nb", 1.64), ("Mo", 1.54),
    ("Tc", 1.47), ("Ru", 1.46), ("Rh", 1.42), ("Pd", 1.39), ("Ag", 1.45), ("Cd", 1.44),
    ("In", 1.42), ("Sn", 1.39), ("Sb", 1.39), ("Te", 1.38), ("I", 1.39), ("Xe", 1.40),
    // --- Period 6 ---
    ("Cs", 2.44), ("Ba", 2.15),
    ("La", 2.07), ("Ce", 2.04), ("Pr", 2.03), ("Nd", 2.01), ("Pm", 1.99), ("Sm", 1.98),
    ("Eu", 1.98), ("Gd", 1.96), ("Tb", 1.94), ("Dy", 1.92), ("Ho", 1.92), ("Er", 1.89),
    ("Tm", 1.90), ("Yb", 1.87), ("Lu", 1.87),
    ("Hf", 1.75), ("Ta", 1.70), ("W", 1.62), ("Re", 1.51), ("Os", 1.44), ("Ir", 1.41),
    ("Pt", 1.36), ("Au", 1.36), ("Hg", 1.32), ("Tl", 1.45), ("Pb", 1.46), ("Bi", 1.48),
    ("Po", 1.40), ("At", 1.50), ("Rn", 1.50),
    // --- Period 7 ---
    ("Fr", 2.60), ("Ra", 2.21),
    ("Ac", 2.15), ("Th", 2.06), ("Pa", 2.00), ("U", 1.96), ("Np", 1.90), ("Pu", 1.87),
    ("Am", 1.80), ("Cm", 1.69),
];

const NON_METALS: &[&str] = &[
    "H", "He", "B", "C", "N", "O", "F", "Ne", "Si", "P", "S", "Cl", "Ar", "As", "Se", "Br",
    "Kr", "Te", "I", "Xe", "At", "Rn",
];

const LANTHANIDES_ACTINIDES: &[&str] = &[
    "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb", "Dy", "Ho", "Er", "Tm", "Yb", "Lu",
    "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk", "Cf", "Es", "Fm", "Md", "No", "Lr",
];

/// Bond tolerance for metal-metal contacts (Å)
pub const METAL_METAL_TOLERANCE: f64 = 0.3;
/// Bond tolerance for every other pair (Å)
pub const DEFAULT_TOLERANCE: f64 = 0.5;

pub fn covalent_radius(element: &str) -> Option<f64> {
    COVALENT_RADII
        .iter()
        .find(|(el, _)| *el == element)
        .map(|(_, r)| *r)
}

pub fn is_known(element: &str) -> bool {
    covalent_radius(element).is_some()
}

/// Every tabulated element that is not a non-metal or one of the lighter metalloids.
pub fn is_metal(element: &str) -> bool {
    is_known(element) && !NON_METALS.contains(&element)
}

pub fn is_lanthanide_or_actinide(element: &str) -> bool {
    LANTHANIDES_ACTINIDES.contains(&element)
}

/// Ideal bond length as the sum of covalent radii
pub fn bond_length(e1: &str, e2: &str) -> Option<f64> {
    Some(covalent_radius(e1)? + covalent_radius(e2)?)
}

pub fn bond_tolerance(e1: &str, e2: &str) -> f64 {
    if is_metal(e1) && is_metal(e2) {
        METAL_METAL_TOLERANCE
    } else {
        DEFAULT_TOLERANCE
    }
}

pub fn bond_is_valid(e1: &str, e2: &str, distance: f64, tolerance: f64) -> bool {
    match bond_length(e1, e2) {
        Some(length) => distance > 0.0 && distance <= length + tolerance,
        None => false,
    }
}

/// Upper bound on any bond the table can accept. Used as a coarse cutoff
/// before the per-pair check.
pub fn max_bond_length() -> f64 {
    let max_radius = COVALENT_RADII.iter().fold(0.0_f64, |m, (_, r)| m.max(*r));
    2.0 * max_radius + DEFAULT_TOLERANCE.max(METAL_METAL_TOLERANCE)
}

/// Turns a CIF label or type symbol ("Cu1A", "ZN", "O2-") into an element symbol.
/// Two-letter symbols are only kept when tabulated; otherwise the first letter wins.
pub fn normalize_symbol(raw: &str) -> String {
    let letters: Vec<char> = raw.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    if letters.is_empty() {
        return "X".to_string();
    }

    let first = letters[0].to_ascii_uppercase();
    if letters.len() >= 2 {
        let two: String = [first, letters[1].to_ascii_lowercase()].iter().collect();
        if is_known(&two) {
            return two;
        }
    }
    first.to_string()
}
