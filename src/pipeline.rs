// src/pipeline.rs

use crate::config::{AnalysisConfig, OutputLevel, StructureFormat, Tolerances};
use crate::error::OmsResult;
use crate::io;
use crate::model::structure::Structure;
use crate::model::summary::{StructureSummary, SummaryBuilder};
use crate::physics::bonding::find_all_bonded_indices;
use crate::physics::coord_sequence::{coordination_sequence, is_new_site, CoordinationSequence};
use crate::physics::open_site::classify;
use crate::physics::sphere::{build_coordination_sphere, CoordinationSphere};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Empty file present in a result folder while its analysis runs
pub const MARKER: &str = "analysis_running";

/// Everything one analysis produces, ready to be written out.
#[derive(Debug)]
pub struct StructureAnalysis {
    pub summary: StructureSummary,
    /// One per metal atom, in structure order
    pub spheres: Vec<CoordinationSphere>,
    pub metal: Structure,
    pub organic: Structure,
}

#[derive(Debug)]
pub enum Outcome {
    Completed { summary: StructureSummary, formula: String },
    /// Complete results already on disk
    Skipped,
}

pub fn analyze_structure(structure: &Structure, tolerances: &Tolerances) -> OmsResult<StructureAnalysis> {
    let bonded = find_all_bonded_indices(structure)?;
    let (metal, organic) = structure.split_metal_organic();

    let mut builder = SummaryBuilder::new(structure.name.clone(), structure.volume());
    let mut spheres = Vec::new();
    // sites are only compared within their own open/closed class
    let mut seen_open: Vec<CoordinationSequence> = Vec::new();
    let mut seen_closed: Vec<CoordinationSequence> = Vec::new();

    for m in structure.metal_indices() {
        let sphere = build_coordination_sphere(structure, &bonded[m]);
        let site = classify(&sphere, tolerances);
        let cs = coordination_sequence(structure, &bonded, m);

        let seen = if site.is_open { &mut seen_open } else { &mut seen_closed };
        let unique = is_new_site(seen, &cs);
        if unique {
            seen.push(cs);
        }

        builder = builder.push(site.with_unique(unique));
        spheres.push(sphere);
    }

    let summary = builder.build();
    log::info!(
        "{}: {} metal sites, {} unique open, density {:.3e} 1/Å³{}",
        summary.material_name,
        summary.metal_sites.len(),
        summary.unique_open_sites(),
        summary.open_metal_density,
        if summary.problematic { " (problematic)" } else { "" }
    );

    Ok(StructureAnalysis {
        summary,
        spheres,
        metal,
        organic,
    })
}

/// Writes the summary JSON and the structure files of `analysis` into `folder`.
pub fn write_results(
    analysis: &StructureAnalysis,
    folder: &Path,
    level: OutputLevel,
    format: StructureFormat,
) -> OmsResult<()> {
    fs::create_dir_all(folder)?;
    let ext = format.extension();

    for (i, sphere) in analysis.spheres.iter().enumerate() {
        let name = format!("first_coordination_sphere{}", i);
        io::save_structure(
            &folder.join(format!("{}.{}", name, ext)),
            &sphere.to_structure(name),
        )?;
    }

    io::save_structure(
        &folder.join(format!("{}.{}", analysis.metal.name, ext)),
        &analysis.metal,
    )?;
    io::save_structure(
        &folder.join(format!("{}.{}", analysis.organic.name, ext)),
        &analysis.organic,
    )?;

    let summary = match level {
        OutputLevel::Normal => analysis.summary.without_dihedrals(),
        OutputLevel::Debug => analysis.summary.clone(),
    };
    let json_path = summary_path(folder, &summary.material_name);
    serde_json::to_writer_pretty(BufWriter::new(File::create(json_path)?), &summary)?;

    Ok(())
}

fn summary_path(folder: &Path, name: &str) -> PathBuf {
    folder.join(format!("{}.json", name))
}

/// True when `folder` holds a finished analysis of `name`.
pub fn results_exist(folder: &Path, name: &str) -> bool {
    summary_path(folder, name).is_file() && !folder.join(MARKER).exists()
}

/// Analyses the structure file at `path` into `<output_root>/<name>`, where
/// `name` is the file stem.
///
/// The marker file is created before parsing and removed only after all
/// results are written, so a failed or interrupted run is retried next time.
pub fn analyze_into_folder(
    path: &Path,
    output_root: &Path,
    overwrite: bool,
    config: &AnalysisConfig,
) -> OmsResult<Outcome> {
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let folder = output_root.join(&name);

    if !overwrite && results_exist(&folder, &name) {
        log::debug!("{}: results exist, skipping", name);
        return Ok(Outcome::Skipped);
    }

    fs::create_dir_all(&folder)?;
    let marker = folder.join(MARKER);
    File::create(&marker)?;

    let structure = io::load_structure(path)?;
    let analysis = analyze_structure(&structure, &config.tolerances)?;
    write_results(&analysis, &folder, config.output_level, config.structure_format)?;

    fs::remove_file(&marker)?;
    Ok(Outcome::Completed {
        summary: analysis.summary,
        formula: structure.formula(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OmsError;
    use crate::model::structure::AtomSite;

    const BOX: [[f64; 3]; 3] = [[10.0, 0.0, 0.0], [0.0, 10.0, 0.0], [0.0, 0.0, 10.0]];

    /// Cu with three O at 1.9 Å in a trigonal planar arrangement
    fn trigonal_cu() -> Structure {
        let r = 0.19;
        let s = (120.0f64).to_radians();
        let mut atoms = vec![AtomSite::new("Cu", [0.5, 0.5, 0.5], 0)];
        for k in 0..3 {
            let phi = s * k as f64;
            atoms.push(AtomSite::new(
                "O",
                [0.5 + r * phi.cos(), 0.5 + r * phi.sin(), 0.5],
                0,
            ));
        }
        Structure::new("trigonal", BOX, atoms)
    }

    /// Metal with four O in a square of radius `r` (fractional)
    fn square(metal: &str, r: f64) -> Structure {
        Structure::new(
            format!("square_{}", metal),
            BOX,
            vec![
                AtomSite::new(metal, [0.5, 0.5, 0.5], 0),
                AtomSite::new("O", [0.5 + r, 0.5, 0.5], 0),
                AtomSite::new("O", [0.5 - r, 0.5, 0.5], 0),
                AtomSite::new("O", [0.5, 0.5 + r, 0.5], 0),
                AtomSite::new("O", [0.5, 0.5 - r, 0.5], 0),
            ],
        )
    }

    /// Cu-O-Cu-O chain along x (8 Å cell) plus an isolated Cu
    fn chain_with_lonely_cu() -> Structure {
        let lattice = [[8.0, 0.0, 0.0], [0.0, 8.0, 0.0], [0.0, 0.0, 8.0]];
        Structure::new(
            "chain",
            lattice,
            vec![
                AtomSite::new("Cu", [0.0, 0.5, 0.5], 0),
                AtomSite::new("O", [0.25, 0.5, 0.5], 0),
                AtomSite::new("Cu", [0.5, 0.5, 0.5], 0),
                AtomSite::new("O", [0.75, 0.5, 0.5], 0),
                AtomSite::new("Cu", [0.0, 0.0, 0.0], 0),
            ],
        )
    }

    fn write_cif(dir: &Path, structure: &Structure) -> PathBuf {
        let path = dir.join(format!("{}.cif", structure.name));
        io::cif::write(&path, structure).unwrap();
        path
    }

    #[test]
    fn test_three_ligand_site() {
        let analysis = analyze_structure(&trigonal_cu(), &Tolerances::default()).unwrap();
        let summary = &analysis.summary;
        assert_eq!(summary.metal_sites.len(), 1);

        let site = &summary.metal_sites[0];
        assert!(site.is_open);
        assert!(site.unique);
        assert!(!site.problematic);
        assert_eq!(site.site_type, "3_or_less");
        assert_eq!(site.number_of_linkers, 3);

        assert!(summary.metal_sites_found);
        assert!(!summary.problematic);
        assert!((summary.open_metal_density - 1.0 / 1000.0).abs() < 1e-12);
        assert_eq!(analysis.metal.len(), 1);
        assert_eq!(analysis.organic.len(), 3);
        assert_eq!(analysis.spheres[0].num_ligands(), 3);
    }

    #[test]
    fn test_lanthanide_minimum_coordination() {
        let tol = Tolerances::default();

        let la = analyze_structure(&square("La", 0.24), &tol).unwrap();
        assert_eq!(la.summary.metal_sites[0].number_of_linkers, 4);
        assert!(la.summary.metal_sites[0].problematic);
        assert!(la.summary.problematic);

        let cu = analyze_structure(&square("Cu", 0.195), &tol).unwrap();
        assert_eq!(cu.summary.metal_sites[0].number_of_linkers, 4);
        assert!(!cu.summary.metal_sites[0].problematic);
        assert_eq!(cu.summary.metal_sites[0].site_type, "plane,non_TD");
    }

    #[test]
    fn test_equivalent_sites_counted_once() {
        let analysis = analyze_structure(&chain_with_lonely_cu(), &Tolerances::default()).unwrap();
        let sites = &analysis.summary.metal_sites;
        assert_eq!(sites.len(), 3);
        assert!(sites.iter().all(|s| s.is_open));

        // both chain atoms share a coordination sequence, the isolated one differs
        assert!(sites[0].unique);
        assert!(!sites[1].unique);
        assert!(sites[2].unique);
        assert_eq!(analysis.summary.unique_open_sites(), 2);
        assert!((analysis.summary.open_metal_density - 2.0 / 512.0).abs() < 1e-12);
    }

    #[test]
    fn test_corrupt_coordinates_abort() {
        let s = Structure::new(
            "broken",
            BOX,
            vec![
                AtomSite::new("Cu", [f64::NAN, 0.5, 0.5], 0),
                AtomSite::new("O", [0.7, 0.5, 0.5], 0),
            ],
        );
        assert!(matches!(
            analyze_structure(&s, &Tolerances::default()),
            Err(OmsError::CorruptDistanceMatrix { index: 0, .. })
        ));
    }

    #[test]
    fn test_output_files() {
        let dir = tempfile::tempdir().unwrap();
        let analysis = analyze_structure(&trigonal_cu(), &Tolerances::default()).unwrap();
        let folder = dir.path().join("trigonal");

        write_results(&analysis, &folder, OutputLevel::Normal, StructureFormat::Xyz).unwrap();
        assert!(folder.join("trigonal_metal.xyz").is_file());
        assert!(folder.join("trigonal_organic.xyz").is_file());
        assert!(folder.join("first_coordination_sphere0.xyz").is_file());

        let json = fs::read_to_string(folder.join("trigonal.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let site = &value["metal_sites"][0];
        assert_eq!(site["type"], "3_or_less");
        assert!(site.get("min_dihedral").is_none());
        assert!(site.get("all_dihedrals").is_none());

        write_results(&analysis, &folder, OutputLevel::Debug, StructureFormat::Cif).unwrap();
        let json = fs::read_to_string(folder.join("trigonal.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["metal_sites"][0]["min_dihedral"], 0.0);
        assert!(folder.join("first_coordination_sphere0.cif").is_file());
    }

    #[test]
    fn test_second_run_skips_existing_results() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_cif(dir.path(), &trigonal_cu());
        let output = dir.path().join("out");
        let config = AnalysisConfig::default();

        let first = analyze_into_folder(&input, &output, false, &config).unwrap();
        match first {
            Outcome::Completed { summary, formula } => {
                assert_eq!(summary.material_name, "trigonal");
                assert_eq!(formula, "Cu1 O3");
            }
            Outcome::Skipped => panic!("first run must analyse"),
        }

        let folder = output.join("trigonal");
        let json_path = folder.join("trigonal.json");
        assert!(results_exist(&folder, "trigonal"));
        assert!(!folder.join(MARKER).exists());
        let content = fs::read_to_string(&json_path).unwrap();
        let modified = fs::metadata(&json_path).unwrap().modified().unwrap();

        let second = analyze_into_folder(&input, &output, false, &config).unwrap();
        assert!(matches!(second, Outcome::Skipped));
        assert_eq!(fs::read_to_string(&json_path).unwrap(), content);
        assert_eq!(fs::metadata(&json_path).unwrap().modified().unwrap(), modified);

        let forced = analyze_into_folder(&input, &output, true, &config).unwrap();
        assert!(matches!(forced, Outcome::Completed { .. }));
    }

    #[test]
    fn test_stale_marker_forces_rerun() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_cif(dir.path(), &trigonal_cu());
        let output = dir.path().join("out");
        let config = AnalysisConfig::default();

        analyze_into_folder(&input, &output, false, &config).unwrap();
        let folder = output.join("trigonal");
        File::create(folder.join(MARKER)).unwrap();
        assert!(!results_exist(&folder, "trigonal"));

        let rerun = analyze_into_folder(&input, &output, false, &config).unwrap();
        assert!(matches!(rerun, Outcome::Completed { .. }));
        assert!(!folder.join(MARKER).exists());
    }

    #[test]
    fn test_parse_failure_leaves_marker() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("garbage.cif");
        fs::write(&input, "data_garbage\nnothing here\n").unwrap();
        let output = dir.path().join("out");

        let result = analyze_into_folder(&input, &output, false, &AnalysisConfig::default());
        assert!(matches!(result, Err(OmsError::Parse { .. })));
        assert!(output.join("garbage").join(MARKER).exists());
        assert!(!results_exist(&output.join("garbage"), "garbage"));
    }
}
