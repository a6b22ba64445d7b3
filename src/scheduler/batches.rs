// src/scheduler/batches.rs

use crate::error::{OmsError, OmsResult};
use crate::scheduler::collection::StructureEntry;
use crate::scheduler::load_balance::LoadBalanceIndex;
use serde::{Deserialize, Serialize};

/// Structures processed, in order, by one worker
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: usize,
    pub entries: Vec<StructureEntry>,
}

impl Batch {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn load(&self, index: &LoadBalanceIndex) -> u64 {
        self.entries.iter().map(|e| index.get(&e.name).unwrap_or(0)).sum()
    }
}

/// Splits `entries` into `num_batches` contiguous runs of the list sorted by
/// load, each holding roughly `total / num_batches`.
///
/// Single greedy sweep: a structure joins the batch selected by the load
/// accumulated before it. This is not an optimal bin packing. Entries absent
/// from `index` count as zero load. With `max_size`, only the lightest
/// `max_size` structures are kept.
pub fn make_batches(
    entries: &[StructureEntry],
    index: &LoadBalanceIndex,
    num_batches: usize,
    max_size: Option<usize>,
) -> OmsResult<Vec<Batch>> {
    if num_batches == 0 {
        return Err(OmsError::InvalidArgument(
            "the number of batches must be at least 1".into(),
        ));
    }
    if let Ok(cpus) = std::thread::available_parallelism() {
        if cpus.get() < num_batches {
            log::warn!(
                "You requested {} batches but there are only {} CPUs available",
                num_batches,
                cpus
            );
        }
    }

    let load_of = |e: &StructureEntry| index.get(&e.name).unwrap_or(0);

    let mut sorted: Vec<&StructureEntry> = entries.iter().collect();
    sorted.sort_by_key(|e| load_of(e));
    if let Some(max) = max_size {
        sorted.truncate(max);
    }

    let total: u64 = sorted.iter().map(|e| load_of(e)).sum();
    let per_batch = total as f64 / num_batches as f64;

    let mut batches: Vec<Batch> = (0..num_batches)
        .map(|id| Batch {
            id,
            entries: Vec::new(),
        })
        .collect();

    let mut running = 0u64;
    for entry in sorted {
        let b = if per_batch > 0.0 {
            ((running as f64 / per_batch) as usize).min(num_batches - 1)
        } else {
            0
        };
        batches[b].entries.push(entry.clone());
        running += load_of(entry);
    }

    for batch in &batches {
        log::info!(
            "Batch {} has {} structures (load {})",
            batch.id + 1,
            batch.entries.len(),
            batch.load(index)
        );
    }

    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::path::PathBuf;

    fn collection(loads: &[u64]) -> (Vec<StructureEntry>, LoadBalanceIndex) {
        let mut index = LoadBalanceIndex::default();
        let entries = loads
            .iter()
            .enumerate()
            .map(|(i, &load)| {
                let name = format!("s{:03}", i);
                index.insert(name.clone(), load);
                StructureEntry {
                    path: PathBuf::from(format!("{}.cif", name)),
                    name,
                }
            })
            .collect();
        (entries, index)
    }

    #[test]
    fn test_zero_batches_rejected() {
        let (entries, index) = collection(&[1, 2]);
        assert!(matches!(
            make_batches(&entries, &index, 0, None),
            Err(OmsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_batches_are_sorted_contiguous_runs() {
        let (entries, index) = collection(&[5, 1, 4, 2, 3, 6]);
        let batches = make_batches(&entries, &index, 3, None).unwrap();
        // sorted loads 1..=6, 7 per batch
        let loads: Vec<Vec<u64>> = batches
            .iter()
            .map(|b| b.entries.iter().map(|e| index.get(&e.name).unwrap()).collect())
            .collect();
        assert_eq!(loads, vec![vec![1, 2, 3, 4], vec![5], vec![6]]);
    }

    #[test]
    fn test_partition_conservation_and_balance() {
        for n_structures in [5usize, 10, 37] {
            let loads: Vec<u64> = (1..=n_structures as u64).rev().collect();
            let (entries, index) = collection(&loads);
            let max_load = n_structures as f64;

            for num_batches in [1, 2, 3, n_structures / 2] {
                let batches = make_batches(&entries, &index, num_batches, None).unwrap();
                assert_eq!(batches.len(), num_batches);

                let mut seen = HashSet::new();
                for b in &batches {
                    for e in &b.entries {
                        assert!(seen.insert(e.name.clone()), "{} assigned twice", e.name);
                    }
                }
                assert_eq!(seen.len(), n_structures);

                let target = loads.iter().sum::<u64>() as f64 / num_batches as f64;
                for b in &batches[..num_batches - 1] {
                    let load = b.load(&index) as f64;
                    assert!(
                        (load - target).abs() <= max_load + 1e-9,
                        "{} structures, {} batches: load {} vs {}",
                        n_structures,
                        num_batches,
                        load,
                        target
                    );
                }
            }
        }
    }

    #[test]
    fn test_max_size_keeps_lightest() {
        let (entries, index) = collection(&[9, 1, 8, 2]);
        let batches = make_batches(&entries, &index, 2, Some(2)).unwrap();
        let names: Vec<&str> = batches
            .iter()
            .flat_map(|b| b.entries.iter().map(|e| e.name.as_str()))
            .collect();
        assert_eq!(names, vec!["s001", "s003"]);
    }

    #[test]
    fn test_zero_load_goes_to_first_batch() {
        let (entries, _) = collection(&[1, 1, 1]);
        let batches = make_batches(&entries, &LoadBalanceIndex::default(), 2, None).unwrap();
        assert_eq!(batches[0].entries.len(), 3);
        assert!(batches[1].is_empty());
    }
}
