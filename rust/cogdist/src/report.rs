//! Reporting helpers over tables of precomputed intervals.
//!
//! An [`IntervalTable`] has one column per group and rows keyed by
//! `(entity, stat)` where `stat` is one of `actual`, `lower`, `upper`.
//! Tables exported from spreadsheets leave the entity blank on every row
//! but the first of a merged block; [`fix_merged_cells`] repairs that.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CogdistError, Result};
use crate::interval::{intervals_overlap, ConfidenceInterval};

/// Aggregate rows that are not individual entities.
pub const PANEL_LABELS: &[&str] = &["PanelTogether", "Panel together", "Panel Together"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    #[serde(default)]
    pub entity: Option<String>,
    pub stat: String,
    /// One cell per group; `None` for a blank cell.
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalTable {
    pub groups: Vec<String>,
    pub rows: Vec<TableRow>,
}

/// One entity's estimate and interval within a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupEntry {
    pub entity: String,
    pub actual: f64,
    pub lower: f64,
    pub upper: f64,
}

impl GroupEntry {
    pub fn interval(&self) -> ConfidenceInterval {
        ConfidenceInterval {
            lower: self.lower,
            upper: self.upper,
        }
    }
}

impl IntervalTable {
    /// Load a table from JSON and check every row has one cell per group.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let table: IntervalTable = serde_json::from_str(&text)?;
        table.check_widths()?;
        Ok(table)
    }

    fn check_widths(&self) -> Result<()> {
        for row in &self.rows {
            if row.values.len() != self.groups.len() {
                return Err(CogdistError::DimensionMismatch {
                    context: "interval table row",
                    expected: self.groups.len(),
                    found: row.values.len(),
                });
            }
        }
        Ok(())
    }

    /// Entries of one group, in order of first appearance.
    ///
    /// Entities missing any of `actual`, `lower`, `upper` in this group are
    /// skipped with a warning. Rows without an entity are an error; run
    /// [`fix_merged_cells`] first.
    pub fn group(&self, name: &str) -> Result<Vec<GroupEntry>> {
        let col = self
            .groups
            .iter()
            .position(|g| g == name)
            .ok_or_else(|| CogdistError::Table(format!("unknown group '{}'", name)))?;

        // (entity, [actual, lower, upper])
        let mut cells: Vec<(String, [Option<f64>; 3])> = Vec::new();
        for (i, row) in self.rows.iter().enumerate() {
            let entity = row.entity.as_deref().ok_or_else(|| {
                CogdistError::Table(format!("row {} has no entity label", i))
            })?;
            let slot = match row.stat.as_str() {
                "actual" => 0,
                "lower" => 1,
                "upper" => 2,
                _ => continue,
            };
            let value = row.values.get(col).copied().flatten();
            match cells.iter_mut().find(|(e, _)| e == entity) {
                Some((_, stats)) => stats[slot] = value,
                None => {
                    let mut stats = [None; 3];
                    stats[slot] = value;
                    cells.push((entity.to_string(), stats));
                }
            }
        }

        let mut entries = Vec::with_capacity(cells.len());
        for (entity, stats) in cells {
            match stats {
                [Some(actual), Some(lower), Some(upper)] => entries.push(GroupEntry {
                    entity,
                    actual,
                    lower,
                    upper,
                }),
                _ => log::warn!("Group '{}': incomplete row for '{}', skipping", name, entity),
            }
        }
        Ok(entries)
    }
}

/// Forward-fill blank entity labels from the row above.
pub fn fix_merged_cells(mut table: IntervalTable) -> Result<IntervalTable> {
    let mut current: Option<String> = None;
    for (i, row) in table.rows.iter_mut().enumerate() {
        match row.entity.as_deref().map(str::trim) {
            Some(label) if !label.is_empty() => current = Some(label.to_string()),
            _ => match &current {
                Some(label) => row.entity = Some(label.clone()),
                None => {
                    return Err(CogdistError::Table(format!(
                        "row {} has no entity and nothing above to fill from",
                        i
                    )))
                }
            },
        }
    }
    Ok(table)
}

/// Reference entity of a group and the entities whose intervals overlap it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlapReport {
    pub reference: String,
    pub overlapping: Vec<String>,
}

fn is_excluded(entry: &GroupEntry, excluded: &[&str]) -> bool {
    excluded.contains(&entry.entity.as_str())
}

/// Sort by `actual` (ascending or descending), take the first entity as the
/// reference and report every other entity whose interval overlaps it.
///
/// Returns `None` when nothing is left after exclusion.
pub fn overlap_report(
    entries: &[GroupEntry],
    ascending: bool,
    excluded: &[&str],
) -> Option<OverlapReport> {
    let mut sorted: Vec<&GroupEntry> = entries
        .iter()
        .filter(|e| !is_excluded(e, excluded))
        .collect();
    sorted.sort_by(|a, b| {
        if ascending {
            a.actual.total_cmp(&b.actual)
        } else {
            b.actual.total_cmp(&a.actual)
        }
    });

    let (reference, rest) = sorted.split_first()?;
    let reference_ci = reference.interval();
    let overlapping = rest
        .iter()
        .filter(|e| intervals_overlap(&reference_ci, &e.interval()))
        .map(|e| e.entity.clone())
        .collect();

    Some(OverlapReport {
        reference: reference.entity.clone(),
        overlapping,
    })
}

/// Entity with the lowest `actual` (or highest, when `low_is_close` is
/// false). Ties go to the earlier entry.
pub fn closest_entity<'a>(
    entries: &'a [GroupEntry],
    low_is_close: bool,
    excluded: &[&str],
) -> Option<&'a GroupEntry> {
    let mut best: Option<&GroupEntry> = None;
    for entry in entries.iter().filter(|e| !is_excluded(e, excluded)) {
        let better = match best {
            None => true,
            Some(b) if low_is_close => entry.actual < b.actual,
            Some(b) => entry.actual > b.actual,
        };
        if better {
            best = Some(entry);
        }
    }
    best
}

/// Error-bar lengths around an estimate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBar {
    pub entity: String,
    pub actual: f64,
    pub below: f64,
    pub above: f64,
}

/// Entries sorted by `actual` ascending with `|lower - actual|` and
/// `|upper - actual|`, ready for an error-bar plot.
pub fn errorbar_offsets(entries: &[GroupEntry]) -> Vec<ErrorBar> {
    let mut sorted: Vec<&GroupEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.actual.total_cmp(&b.actual));
    sorted
        .into_iter()
        .map(|e| ErrorBar {
            entity: e.entity.clone(),
            actual: e.actual,
            below: (e.lower - e.actual).abs(),
            above: (e.upper - e.actual).abs(),
        })
        .collect()
}
