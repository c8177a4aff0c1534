use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading the cached round data.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// One (model, round) observation from the cached CSV.
///
/// Extra columns in the source data are ignored; empty corr/mmc cells
/// deserialize to `None` rather than failing the row.
#[derive(Debug, Clone, Deserialize)]
pub struct RoundRecord {
    pub model: String,
    pub round: u32,
    pub corr: Option<f64>,
    pub mmc: Option<f64>,
}

/// A model-by-round matrix: one row per model, one column per round,
/// with `None` marking rounds a model did not participate in.
#[derive(Debug, Clone, PartialEq)]
pub struct WideMatrix {
    pub models: Vec<String>,
    pub rounds: Vec<u32>,
    /// Row-major values, `values[i][j]` for `models[i]` at `rounds[j]`.
    pub values: Vec<Vec<Option<f64>>>,
}

/// Read all round records from the cache file.
pub fn read_records(path: &Path) -> Result<Vec<RoundRecord>, TableError> {
    let mut reader = csv::Reader::from_path(path).map_err(|source| TableError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    let mut records = Vec::new();
    for result in reader.deserialize() {
        let record: RoundRecord = result.map_err(|source| TableError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Pivot the long table into wide corr and mmc matrices.
///
/// Models are sorted by name, rounds are the ascending union over all
/// records. Missing (model, round) pairs stay `None`; no imputation. If the
/// feed repeats a (model, round) pair the last value wins.
pub fn pivot(records: &[RoundRecord]) -> (WideMatrix, WideMatrix) {
    let rounds: BTreeSet<u32> = records.iter().map(|r| r.round).collect();
    let rounds: Vec<u32> = rounds.into_iter().collect();
    let round_index: HashMap<u32, usize> =
        rounds.iter().enumerate().map(|(i, r)| (*r, i)).collect();

    let mut cells: BTreeMap<&str, Vec<(Option<f64>, Option<f64>)>> = BTreeMap::new();
    for record in records {
        let row = cells
            .entry(record.model.as_str())
            .or_insert_with(|| vec![(None, None); rounds.len()]);
        row[round_index[&record.round]] = (record.corr, record.mmc);
    }

    let models: Vec<String> = cells.keys().map(|name| name.to_string()).collect();
    let mut corr_values = Vec::with_capacity(models.len());
    let mut mmc_values = Vec::with_capacity(models.len());
    for row in cells.values() {
        corr_values.push(row.iter().map(|(corr, _)| *corr).collect());
        mmc_values.push(row.iter().map(|(_, mmc)| *mmc).collect());
    }

    (
        WideMatrix {
            models: models.clone(),
            rounds: rounds.clone(),
            values: corr_values,
        },
        WideMatrix {
            models,
            rounds,
            values: mmc_values,
        },
    )
}

impl WideMatrix {
    /// Slice to the inclusive round window `[first, last]`. Only rounds
    /// actually present in the data are kept.
    pub fn window(&self, first: u32, last: u32) -> WideMatrix {
        let keep: Vec<usize> = self
            .rounds
            .iter()
            .enumerate()
            .filter(|(_, round)| (first..=last).contains(round))
            .map(|(j, _)| j)
            .collect();

        WideMatrix {
            models: self.models.clone(),
            rounds: keep.iter().map(|&j| self.rounds[j]).collect(),
            values: self
                .values
                .iter()
                .map(|row| keep.iter().map(|&j| row[j]).collect())
                .collect(),
        }
    }

    /// Drop every row with at least one missing value. The embedding cannot
    /// accept holes, so a model survives iff it has a value at every round.
    pub fn drop_incomplete(&self) -> WideMatrix {
        let keep: Vec<usize> = (0..self.models.len())
            .filter(|&i| self.values[i].iter().all(|v| v.is_some()))
            .collect();

        WideMatrix {
            models: keep.iter().map(|&i| self.models[i].clone()).collect(),
            rounds: self.rounds.clone(),
            values: keep.iter().map(|&i| self.values[i].clone()).collect(),
        }
    }

    /// Fully-present rows as dense vectors, aligned with `models` after
    /// `drop_incomplete` (rows that still contain holes are skipped).
    pub fn dense_rows(&self) -> Vec<Vec<f64>> {
        self.values
            .iter()
            .filter(|row| row.iter().all(|v| v.is_some()))
            .map(|row| row.iter().map(|v| v.unwrap_or_default()).collect())
            .collect()
    }

    /// Per-model mean over the present values of each row.
    pub fn row_means(&self) -> Vec<f64> {
        self.values
            .iter()
            .map(|row| {
                let present: Vec<f64> = row.iter().filter_map(|v| *v).collect();
                if present.is_empty() {
                    0.0
                } else {
                    present.iter().sum::<f64>() / present.len() as f64
                }
            })
            .collect()
    }

    /// Row position of a model, if it is present in this matrix.
    pub fn row_index(&self, model: &str) -> Option<usize> {
        self.models.iter().position(|name| name == model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(model: &str, round: u32, corr: f64, mmc: f64) -> RoundRecord {
        RoundRecord {
            model: model.to_string(),
            round,
            corr: Some(corr),
            mmc: Some(mmc),
        }
    }

    #[test]
    fn test_pivot_shape_and_values() {
        let records = vec![
            record("A", 1, 0.01, 0.001),
            record("A", 2, 0.02, 0.002),
            record("A", 3, 0.03, 0.003),
            record("B", 1, -0.01, -0.001),
            record("B", 2, -0.02, -0.002),
            record("B", 3, -0.03, -0.003),
        ];

        let (corr, mmc) = pivot(&records);

        assert_eq!(corr.models, vec!["A", "B"]);
        assert_eq!(corr.rounds, vec![1, 2, 3]);
        assert_eq!(corr.values[0], vec![Some(0.01), Some(0.02), Some(0.03)]);
        assert_eq!(corr.values[1], vec![Some(-0.01), Some(-0.02), Some(-0.03)]);
        assert_eq!(mmc.values[0], vec![Some(0.001), Some(0.002), Some(0.003)]);
        assert_eq!(mmc.values[1], vec![Some(-0.001), Some(-0.002), Some(-0.003)]);
    }

    #[test]
    fn test_pivot_missing_pair_is_none_not_zero() {
        // B skipped round 2 entirely.
        let records = vec![
            record("A", 1, 0.1, 0.0),
            record("A", 2, 0.2, 0.0),
            record("B", 1, 0.3, 0.0),
        ];

        let (corr, _) = pivot(&records);

        assert_eq!(corr.values[1], vec![Some(0.3), None]);
        assert_ne!(corr.values[1][1], Some(0.0));
    }

    #[test]
    fn test_window_is_inclusive() {
        let records = vec![
            record("A", 220, 0.0, 0.0),
            record("A", 221, 0.1, 0.0),
            record("A", 245, 0.2, 0.0),
            record("A", 246, 0.3, 0.0),
        ];

        let (corr, _) = pivot(&records);
        let windowed = corr.window(221, 245);

        assert_eq!(windowed.rounds, vec![221, 245]);
        assert_eq!(windowed.values[0], vec![Some(0.1), Some(0.2)]);
    }

    #[test]
    fn test_drop_incomplete_filtering_invariant() {
        let records = vec![
            record("A", 1, 0.1, 0.0),
            record("A", 2, 0.2, 0.0),
            record("B", 1, 0.3, 0.0),
            record("C", 1, 0.4, 0.0),
            record("C", 2, 0.5, 0.0),
        ];

        let (corr, _) = pivot(&records);
        let filtered = corr.drop_incomplete();

        // A row survives iff it has a value at every round in the window.
        assert_eq!(filtered.models, vec!["A", "C"]);
        for row in &filtered.values {
            assert!(row.iter().all(|v| v.is_some()));
        }
        assert_eq!(filtered.dense_rows().len(), filtered.models.len());
    }

    #[test]
    fn test_drop_incomplete_can_remove_everything() {
        let records = vec![record("A", 1, 0.1, 0.0), record("B", 2, 0.2, 0.0)];

        let (corr, _) = pivot(&records);
        let filtered = corr.drop_incomplete();

        assert!(filtered.models.is_empty());
        assert!(filtered.dense_rows().is_empty());
    }

    #[test]
    fn test_row_means() {
        let records = vec![
            record("A", 1, 0.1, 0.0),
            record("A", 2, 0.3, 0.0),
            record("B", 1, -0.2, 0.0),
            record("B", 2, -0.4, 0.0),
        ];

        let (corr, _) = pivot(&records);
        let means = corr.row_means();

        assert!((means[0] - 0.2).abs() < 1e-12);
        assert!((means[1] + 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_row_index_lookup() {
        let records = vec![record("krat", 1, 0.0, 0.0), record("trivial", 1, 0.0, 0.0)];
        let (corr, _) = pivot(&records);

        assert_eq!(corr.row_index("krat"), Some(0));
        assert_eq!(corr.row_index("trivial"), Some(1));
        assert_eq!(corr.row_index("ghost"), None);
    }

    #[test]
    fn test_empty_corr_cell_parses_as_none() {
        let mut reader = csv::Reader::from_reader("model,round,corr,mmc\nA,1,,0.5\n".as_bytes());
        let record: RoundRecord = reader.deserialize().next().unwrap().unwrap();

        assert_eq!(record.corr, None);
        assert_eq!(record.mmc, Some(0.5));
    }
}
