// src/utils/report.rs

use crate::model::StructureSummary;
use crate::scheduler::{CollectionStatus, RunReport};

/// Text summary of one analysed structure, printed by `omsd analyze`
pub fn structure_summary(summary: &StructureSummary, formula: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("Material: {}\n", summary.material_name));
    out.push_str(&format!("Formula: {}\n", formula));
    out.push_str(&format!("Cell volume: {:.3} Å³\n", summary.uc_volume));
    out.push_str("--------------------------------------------------------------\n");
    out.push_str(&format!(
        "{:<6} {:<6} {:<22} {:<6} {:<7} {:<4} {:<8}\n",
        "Site", "Metal", "Type", "Open", "Unique", "CN", "t"
    ));
    out.push_str("--------------------------------------------------------------\n");

    for (i, site) in summary.metal_sites.iter().enumerate() {
        let t = if site.t_factor < 0.0 {
            "-".to_string()
        } else {
            format!("{:.3}", site.t_factor)
        };
        out.push_str(&format!(
            "{:<6} {:<6} {:<22} {:<6} {:<7} {:<4} {:<8}{}\n",
            i,
            site.metal,
            site.site_type,
            yes_no(site.is_open),
            yes_no(site.unique),
            site.number_of_linkers,
            t,
            if site.problematic { " (problematic)" } else { "" }
        ));
    }

    if summary.metal_sites.is_empty() {
        out.push_str("No metal sites.\n");
    }
    out.push_str("--------------------------------------------------------------\n");
    out.push_str(&format!(
        "Open metal sites found: {}\n",
        yes_no(summary.metal_sites_found)
    ));
    out.push_str(&format!(
        "Unique open sites: {} ({:.4e} per Å³)\n",
        summary.unique_open_sites(),
        summary.open_metal_density
    ));
    if summary.problematic {
        out.push_str("Warning: at least one site is under-coordinated.\n");
    }

    out
}

pub fn collection_status(status: &CollectionStatus) -> String {
    let mut out = String::new();
    if status.done > 0 {
        out.push_str(&format!(
            "Analysis for {} out of {} structures has been completed.\n",
            status.done, status.total
        ));
    } else {
        out.push_str("Analysis for no structures has been completed.\n");
    }

    if !status.missing.is_empty() {
        out.push_str("The following structures are missing:\n");
        for folder in &status.missing {
            out.push_str(&format!("  {}\n", folder.display()));
        }
    }
    out
}

pub fn run_summary(report: &RunReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("Completed: {}\n", report.completed.len()));
    out.push_str(&format!("Skipped:   {}\n", report.skipped.len()));
    out.push_str(&format!("Failed:    {}\n", report.failed.len()));

    for (name, message) in &report.failed {
        out.push_str(&format!("  {}: {}\n", name, message));
    }
    if !report.failed_workers.is_empty() {
        let ids: Vec<String> = report.failed_workers.iter().map(|b| (b + 1).to_string()).collect();
        out.push_str(&format!("Workers that did not finish: batch {}\n", ids.join(", ")));
    }
    out
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::summary::{SiteSummary, SummaryBuilder};
    use std::path::PathBuf;

    #[test]
    fn test_structure_summary_lists_sites() {
        let summary = SummaryBuilder::new("mof-5", 1000.0)
            .push(SiteSummary {
                metal: "Zn".into(),
                site_type: "closed".into(),
                is_open: false,
                unique: true,
                problematic: false,
                number_of_linkers: 4,
                t_factor: 0.98,
                min_dihedral: None,
                all_dihedrals: None,
            })
            .build();

        let text = structure_summary(&summary, "C24 O13 Zn4");
        assert!(text.contains("Material: mof-5"));
        assert!(text.contains("closed"));
        assert!(text.contains("0.980"));
        assert!(text.contains("Open metal sites found: no"));
    }

    #[test]
    fn test_collection_status_text() {
        let status = CollectionStatus {
            total: 2,
            done: 1,
            missing: vec![PathBuf::from("out/b")],
        };
        let text = collection_status(&status);
        assert!(text.contains("1 out of 2"));
        assert!(text.contains("out/b"));

        let none = collection_status(&CollectionStatus::default());
        assert!(none.starts_with("Analysis for no structures"));
    }

    #[test]
    fn test_run_summary_names_failures() {
        let report = RunReport {
            completed: vec!["a".into()],
            failed: vec![("b".into(), "bad cell".into())],
            failed_workers: vec![2],
            ..Default::default()
        };
        let text = run_summary(&report);
        assert!(text.contains("b: bad cell"));
        assert!(text.contains("batch 3"));
    }
}
