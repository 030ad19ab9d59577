use crate::opcodes::Category;
use color_eyre::eyre::{self, WrapErr};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Counters of one compute unit.
#[derive(Clone, Default, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeUnit {
    /// Cycles with at least one mapped work-group
    pub cycles: u64,
    /// Fetched instructions
    pub instructions: u64,
    /// Issued uops per functional unit class
    pub issued: IndexMap<Category, u64>,
    pub completed_uops: u64,
    /// Cycles a fetched uop waited in a fetch buffer past its ready cycle
    pub issue_stalls: u64,
    pub mapped_work_groups: u64,
    pub unmapped_work_groups: u64,
}

impl ComputeUnit {
    pub fn inc_issued(&mut self, category: Category) {
        *self.issued.entry(category).or_insert(0) += 1;
    }
}

impl std::ops::AddAssign<&ComputeUnit> for ComputeUnit {
    fn add_assign(&mut self, other: &Self) {
        self.cycles = self.cycles.max(other.cycles);
        self.instructions += other.instructions;
        for (category, count) in &other.issued {
            *self.issued.entry(*category).or_insert(0) += count;
        }
        self.completed_uops += other.completed_uops;
        self.issue_stalls += other.issue_stalls;
        self.mapped_work_groups += other.mapped_work_groups;
        self.unmapped_work_groups += other.unmapped_work_groups;
    }
}

/// Device level statistics of one simulation.
#[derive(Clone, Default, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sim {
    pub cycles: u64,
    pub instructions: u64,
    pub work_groups_completed: u64,
    pub finish_reason: Option<String>,
    /// Sum over all compute units
    pub total: ComputeUnit,
    pub compute_units: Vec<ComputeUnit>,
}

/// Writes `stats` as pretty JSON to `path`, creating missing directories.
pub fn save(stats: &Sim, path: &Path) -> eyre::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .wrap_err_with(|| format!("failed to create stats directory {}", parent.display()))?;
    }
    let file = std::fs::File::create(path)
        .wrap_err_with(|| format!("failed to write stats to {}", path.display()))?;
    let writer = std::io::BufWriter::new(file);
    let mut serializer = serde_json::Serializer::with_formatter(
        writer,
        serde_json::ser::PrettyFormatter::with_indent(b"    "),
    );
    stats.serialize(&mut serializer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ComputeUnit, Sim};
    use crate::opcodes::Category;

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("gpupipesim-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = scratch_dir("save");
        let path = dir.join("nested").join("stats.json");
        let stats = Sim {
            cycles: 42,
            ..Sim::default()
        };
        super::save(&stats, &path).unwrap();
        let saved: Sim = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved, stats);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_save_reports_uncreatable_directory() {
        let dir = scratch_dir("save-err");
        let file = dir.join("not-a-dir");
        std::fs::write(&file, "").unwrap();
        let err = super::save(&Sim::default(), &file.join("stats.json")).unwrap_err();
        assert!(
            err.to_string().contains("failed to create stats directory"),
            "unexpected error: {err}"
        );
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_aggregate_compute_units() {
        let mut a = ComputeUnit {
            cycles: 10,
            instructions: 3,
            ..ComputeUnit::default()
        };
        a.inc_issued(Category::Simd);
        let mut b = ComputeUnit {
            cycles: 12,
            instructions: 2,
            ..ComputeUnit::default()
        };
        b.inc_issued(Category::Simd);
        b.inc_issued(Category::Branch);

        let mut total = ComputeUnit::default();
        total += &a;
        total += &b;
        assert_eq!(total.cycles, 12);
        assert_eq!(total.instructions, 5);
        assert_eq!(total.issued.get(&Category::Simd), Some(&2));
        assert_eq!(total.issued.get(&Category::Branch), Some(&1));
    }
}
