// src/io/xyz.rs

use crate::error::{OmsError, OmsResult};
use crate::model::elements::normalize_symbol;
use crate::model::structure::{AtomSite, Structure};
use crate::utils::linalg::{cart_to_frac, frac_to_cart};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Box used when the comment line carries no `Lattice=` entry
const DEFAULT_BOX: f64 = 20.0;

/// Reads an (extended) XYZ file. Cartesian positions are converted to
/// fractional coordinates of the `Lattice="..."` cell, or of a 20 Å box.
pub fn parse(path: &Path) -> OmsResult<Structure> {
    let text = fs::read_to_string(path)?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    parse_str(&text, &name).map_err(|detail| OmsError::parse(path, detail))
}

pub fn parse_str(text: &str, name: &str) -> Result<Structure, String> {
    let mut lines = text.lines();

    // 1. Number of Atoms
    let n_atoms: usize = lines
        .next()
        .ok_or("empty XYZ file")?
        .trim()
        .parse()
        .map_err(|_| "invalid atom count")?;

    // 2. Comment Line (Try to find "Lattice=...")
    let comment = lines.next().unwrap_or_default();
    let lattice = parse_lattice(comment).unwrap_or([
        [DEFAULT_BOX, 0.0, 0.0],
        [0.0, DEFAULT_BOX, 0.0],
        [0.0, 0.0, DEFAULT_BOX],
    ]);

    // 3. Atoms
    let mut atoms = Vec::with_capacity(n_atoms);
    for line in lines.take(n_atoms) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            return Err(format!("malformed atom line '{}'", line));
        }

        let mut cart = [0.0; 3];
        for (i, value) in parts[1..4].iter().enumerate() {
            cart[i] = value.parse().map_err(|_| format!("invalid coordinate '{}'", value))?;
        }
        let frac = cart_to_frac(cart, lattice).ok_or("singular lattice")?;
        atoms.push(AtomSite::new(normalize_symbol(parts[0]), frac, atoms.len()));
    }

    if atoms.len() != n_atoms {
        return Err(format!("expected {} atoms, found {}", n_atoms, atoms.len()));
    }

    Ok(Structure::new(name, lattice, atoms))
}

// Format: Lattice="ax ay az bx by bz cx cy cz"
fn parse_lattice(comment: &str) -> Option<[[f64; 3]; 3]> {
    let start = comment.find("Lattice=\"")?;
    let remainder = &comment[start + 9..];
    let end = remainder.find('"')?;
    let parts: Vec<f64> = remainder[..end]
        .split_whitespace()
        .filter_map(|s| s.parse().ok())
        .collect();

    if parts.len() != 9 {
        return None;
    }
    Some([
        [parts[0], parts[1], parts[2]],
        [parts[3], parts[4], parts[5]],
        [parts[6], parts[7], parts[8]],
    ])
}

pub fn write(path: &Path, structure: &Structure) -> OmsResult<()> {
    let mut file = BufWriter::new(File::create(path)?);

    // 1. Header
    writeln!(file, "{}", structure.len())?;

    // 2. Extended XYZ Comment Line
    let l = structure.lattice;
    writeln!(
        file,
        "Lattice=\"{:.6} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6}\" Properties=species:S:1:pos:R:3 pbc=\"T T T\" name={}",
        l[0][0], l[0][1], l[0][2],
        l[1][0], l[1][1], l[1][2],
        l[2][0], l[2][1], l[2][2],
        structure.name
    )?;

    // 3. Atoms
    for atom in &structure.atoms {
        let p = frac_to_cart(atom.frac_coords, l);
        writeln!(file, "{:<4} {:12.6} {:12.6} {:12.6}", atom.element, p[0], p[1], p[2])?;
    }

    file.flush()?;
    Ok(())
}
