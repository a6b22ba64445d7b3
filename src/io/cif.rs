// src/io/cif.rs

use crate::error::{OmsError, OmsResult};
use crate::model::elements::normalize_symbol;
use crate::model::{AtomSite, Structure};
use std::collections::HashMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Fractional tolerance for merging symmetry-generated duplicates
const DUPLICATE_EPS: f64 = 0.001;

#[derive(Default)]
struct Loop {
    headers: Vec<String>,
    values: Vec<String>,
}

impl Loop {
    fn column(&self, tag: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == tag)
    }

    fn rows(&self) -> impl Iterator<Item = &[String]> {
        self.values.chunks_exact(self.headers.len().max(1))
    }
}

pub fn parse(path: &Path) -> OmsResult<Structure> {
    let text = fs::read_to_string(path)?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    parse_str(&text, &name).map_err(|detail| OmsError::parse(path, detail))
}

pub fn parse_str(text: &str, name: &str) -> Result<Structure, String> {
    let mut tags: HashMap<String, String> = HashMap::new();
    let mut loops: Vec<Loop> = Vec::new();
    let mut current: Option<Loop> = None;
    let mut pending_tag: Option<String> = None;
    let mut in_text_field = false;
    let mut seen_data = false;

    for line in text.lines() {
        // multi-line ;-delimited text fields carry nothing we need
        if line.starts_with(';') {
            in_text_field = !in_text_field;
            continue;
        }
        if in_text_field {
            continue;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        // 1. Block and loop boundaries
        if trimmed.starts_with("data_") {
            if seen_data {
                break;
            }
            seen_data = true;
            continue;
        }
        if trimmed.starts_with("loop_") {
            loops.extend(current.take());
            current = Some(Loop::default());
            continue;
        }

        // 2. Tags: loop headers, or plain key-value pairs
        if trimmed.starts_with('_') {
            if let Some(lp) = current.as_mut() {
                if lp.values.is_empty() {
                    lp.headers.push(trimmed.to_lowercase());
                    continue;
                }
            }
            loops.extend(current.take());

            let mut parts = trimmed.splitn(2, char::is_whitespace);
            let tag = parts.next().unwrap_or_default().to_lowercase();
            match parts.next().map(str::trim).filter(|v| !v.is_empty()) {
                Some(value) => {
                    tags.insert(tag, unquote(value));
                }
                None => pending_tag = Some(tag),
            }
            continue;
        }

        // 3. Data
        if let Some(lp) = current.as_mut() {
            lp.values.extend(tokenize(trimmed));
        } else if let Some(tag) = pending_tag.take() {
            tags.insert(tag, unquote(trimmed));
        }
    }
    loops.extend(current.take());

    // 4. Cell
    let cell_value = |tag: &str, default: Option<f64>| -> Result<f64, String> {
        match tags.get(tag) {
            Some(v) => parse_cif_float(v).ok_or_else(|| format!("invalid value for {}: {}", tag, v)),
            None => default.ok_or_else(|| format!("missing {}", tag)),
        }
    };
    let a = cell_value("_cell_length_a", None)?;
    let b = cell_value("_cell_length_b", None)?;
    let c = cell_value("_cell_length_c", None)?;
    let alpha = cell_value("_cell_angle_alpha", Some(90.0))?;
    let beta = cell_value("_cell_angle_beta", Some(90.0))?;
    let gamma = cell_value("_cell_angle_gamma", Some(90.0))?;
    let lattice = lattice_from_parameters(a, b, c, alpha, beta, gamma)?;

    // 5. Atoms
    let atom_loop = loops
        .iter()
        .find(|lp| lp.column("_atom_site_fract_x").is_some())
        .ok_or("no _atom_site_fract_x loop found")?;
    let base_atoms = read_atom_loop(atom_loop)?;

    // 6. Symmetry
    let mut symmetry_ops: Vec<String> = loops
        .iter()
        .find_map(|lp| {
            lp.column("_symmetry_equiv_pos_as_xyz")
                .or_else(|| lp.column("_space_group_symop_operation_xyz"))
                .map(|col| lp.rows().map(|row| row[col].clone()).collect())
        })
        .unwrap_or_default();
    if symmetry_ops.is_empty() {
        symmetry_ops.push("x,y,z".to_string());
    }

    let mut final_atoms: Vec<AtomSite> = Vec::new();
    for (element, position) in base_atoms {
        for op in &symmetry_ops {
            let new_pos = apply_symmetry(position, op)
                .ok_or_else(|| format!("invalid symmetry operation '{}'", op))?;
            let wrapped = [
                new_pos[0].rem_euclid(1.0),
                new_pos[1].rem_euclid(1.0),
                new_pos[2].rem_euclid(1.0),
            ];

            let is_duplicate = final_atoms.iter().any(|existing| {
                (0..3).all(|i| {
                    let d = (existing.frac_coords[i] - wrapped[i]).abs();
                    d < DUPLICATE_EPS || (1.0 - d) < DUPLICATE_EPS
                })
            });

            if !is_duplicate {
                let index = final_atoms.len();
                final_atoms.push(AtomSite::new(element.clone(), wrapped, index));
            }
        }
    }

    Ok(Structure::new(name, lattice, final_atoms))
}

fn read_atom_loop(lp: &Loop) -> Result<Vec<(String, [f64; 3])>, String> {
    let symbol_col = lp
        .column("_atom_site_type_symbol")
        .or_else(|| lp.column("_atom_site_label"))
        .ok_or("atom loop has neither _atom_site_type_symbol nor _atom_site_label")?;
    let fx = lp.column("_atom_site_fract_x").ok_or("missing _atom_site_fract_x")?;
    let fy = lp.column("_atom_site_fract_y").ok_or("missing _atom_site_fract_y")?;
    let fz = lp.column("_atom_site_fract_z").ok_or("missing _atom_site_fract_z")?;

    if lp.values.len() % lp.headers.len() != 0 {
        return Err("atom loop has an incomplete row".into());
    }

    lp.rows()
        .map(|row| {
            let coord = |col: usize| {
                parse_cif_float(&row[col]).ok_or_else(|| format!("invalid coordinate '{}'", row[col]))
            };
            Ok((normalize_symbol(&row[symbol_col]), [coord(fx)?, coord(fy)?, coord(fz)?]))
        })
        .collect()
}

/// Standard setting: a along x, b in the xy plane
fn lattice_from_parameters(
    a: f64,
    b: f64,
    c: f64,
    alpha: f64,
    beta: f64,
    gamma: f64,
) -> Result<[[f64; 3]; 3], String> {
    let (alpha_r, beta_r, gamma_r) = (alpha.to_radians(), beta.to_radians(), gamma.to_radians());
    let v2 = 1.0 - alpha_r.cos().powi(2) - beta_r.cos().powi(2) - gamma_r.cos().powi(2)
        + 2.0 * alpha_r.cos() * beta_r.cos() * gamma_r.cos();
    if v2 <= 0.0 || a <= 0.0 || b <= 0.0 || c <= 0.0 {
        return Err(format!(
            "degenerate cell {} {} {} {} {} {}",
            a, b, c, alpha, beta, gamma
        ));
    }
    let v = v2.sqrt();

    Ok([
        [a, 0.0, 0.0],
        [b * gamma_r.cos(), b * gamma_r.sin(), 0.0],
        [
            c * beta_r.cos(),
            c * (alpha_r.cos() - beta_r.cos() * gamma_r.cos()) / gamma_r.sin(),
            c * v / gamma_r.sin(),
        ],
    ])
}

/// Splits a data line on whitespace, keeping quoted values together
fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();
    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
        } else if ch == '\'' || ch == '"' {
            chars.next();
            let mut token = String::new();
            while let Some(c) = chars.next() {
                // a quote only closes when followed by whitespace or end of line
                if c == ch && chars.peek().map_or(true, |n| n.is_whitespace()) {
                    break;
                }
                token.push(c);
            }
            tokens.push(token);
        } else {
            let mut token = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                token.push(c);
                chars.next();
            }
            tokens.push(token);
        }
    }
    tokens
}

fn unquote(value: &str) -> String {
    value.trim_matches(|c| c == '\'' || c == '"').to_string()
}

fn apply_symmetry(p: [f64; 3], op: &str) -> Option<[f64; 3]> {
    let parts: Vec<&str> = op.split(',').collect();
    if parts.len() != 3 {
        return None;
    }

    Some([
        evaluate_expr(parts[0], p)?,
        evaluate_expr(parts[1], p)?,
        evaluate_expr(parts[2], p)?,
    ])
}

/// Evaluates one component of a symmetry operation, e.g. "-x+1/2"
fn evaluate_expr(expr: &str, p: [f64; 3]) -> Option<f64> {
    let s = expr.replace(' ', "").to_lowercase();
    if s.is_empty() {
        return None;
    }

    let mut val = 0.0;
    let mut current_term = String::new();

    // Split by + or - but keep the delimiter
    for c in s.chars() {
        if (c == '+' || c == '-') && !current_term.is_empty() {
            val += evaluate_term(&current_term, p)?;
            current_term.clear();
        }
        current_term.push(c);
    }
    if !current_term.is_empty() {
        val += evaluate_term(&current_term, p)?;
    }

    Some(val)
}

fn evaluate_term(term: &str, p: [f64; 3]) -> Option<f64> {
    let (sign, t) = match term.as_bytes().first() {
        Some(b'-') => (-1.0, &term[1..]),
        Some(b'+') => (1.0, &term[1..]),
        _ => (1.0, term),
    };

    if let Some(axis) = ['x', 'y', 'z'].iter().position(|v| t.ends_with(*v)) {
        // optional multiplier, e.g. "2x"
        let factor = &t[..t.len() - 1];
        let factor = if factor.is_empty() { 1.0 } else { parse_number(factor)? };
        return Some(sign * factor * p[axis]);
    }

    Some(sign * parse_number(t)?)
}

fn parse_number(t: &str) -> Option<f64> {
    match t.split_once('/') {
        Some((num, den)) => {
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                return None;
            }
            Some(num.parse::<f64>().ok()? / den)
        }
        None => t.parse().ok(),
    }
}

/// Parses "1.2345(6)" as 1.2345
fn parse_cif_float(s: &str) -> Option<f64> {
    let clean: String = s.chars().take_while(|c| *c != '(').collect();
    clean.trim().parse().ok()
}

pub fn write(path: &Path, structure: &Structure) -> OmsResult<()> {
    let mut file = BufWriter::new(fs::File::create(path)?);

    writeln!(file, "data_{}", structure.name)?;
    writeln!(file, "_symmetry_space_group_name_H-M 'P 1'")?;
    writeln!(file, "_symmetry_Int_Tables_number 1")?;

    let a_vec = structure.lattice[0];
    let b_vec = structure.lattice[1];
    let c_vec = structure.lattice[2];

    let dot = |u: [f64; 3], v: [f64; 3]| u[0] * v[0] + u[1] * v[1] + u[2] * v[2];
    let a = dot(a_vec, a_vec).sqrt();
    let b = dot(b_vec, b_vec).sqrt();
    let c = dot(c_vec, c_vec).sqrt();

    // alpha = angle between b and c
    let alpha = (dot(b_vec, c_vec) / (b * c)).acos().to_degrees();
    let beta = (dot(a_vec, c_vec) / (a * c)).acos().to_degrees();
    let gamma = (dot(a_vec, b_vec) / (a * b)).acos().to_degrees();

    writeln!(file, "_cell_length_a    {:.6}", a)?;
    writeln!(file, "_cell_length_b    {:.6}", b)?;
    writeln!(file, "_cell_length_c    {:.6}", c)?;
    writeln!(file, "_cell_angle_alpha {:.6}", alpha)?;
    writeln!(file, "_cell_angle_beta  {:.6}", beta)?;
    writeln!(file, "_cell_angle_gamma {:.6}", gamma)?;
    writeln!(file, "_cell_volume      {:.6}", structure.volume())?;

    writeln!(file, "loop_")?;
    writeln!(file, " _symmetry_equiv_pos_as_xyz")?;
    writeln!(file, " 'x, y, z'")?;

    writeln!(file, "loop_")?;
    writeln!(file, " _atom_site_label")?;
    writeln!(file, " _atom_site_type_symbol")?;
    writeln!(file, " _atom_site_fract_x")?;
    writeln!(file, " _atom_site_fract_y")?;
    writeln!(file, " _atom_site_fract_z")?;

    for (i, atom) in structure.atoms.iter().enumerate() {
        let f = atom.frac_coords;
        // Ensure unique label e.g., Fe1, Fe2
        writeln!(
            file,
            " {}{} {} {:.6} {:.6} {:.6}",
            atom.element,
            i + 1,
            atom.element,
            f[0],
            f[1],
            f[2]
        )?;
    }

    file.flush()?;
    Ok(())
}
