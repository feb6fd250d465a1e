//! The parsed log table.

use crate::cameras::CameraSet;
use crate::error::{ParseError, Result};
use crate::format::AUX_FIELDS;
use crate::json::{Rows, serialize_optional, serialize_values};
use nalgebra::DMatrix;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::{info, warn};

/// Training statistics, one entry per iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IterationInfo {
    /// L1 loss.
    #[serde(rename = "L1", serialize_with = "serialize_values")]
    pub l1: Vec<f64>,
    /// Seconds since training started.
    #[serde(serialize_with = "serialize_values")]
    pub time: Vec<f64>,
    /// Number of Gaussians in the scene.
    pub nr_gaussians: Vec<u64>,
    /// Memory usage in bytes.
    #[serde(serialize_with = "serialize_values")]
    pub mem_usage: Vec<f64>,
}

impl IterationInfo {
    pub fn push(&mut self, l1: f64, time: f64, nr_gaussians: u64, mem_usage: f64) {
        self.l1.push(l1);
        self.time.push(time);
        self.nr_gaussians.push(nr_gaussians);
        self.mem_usage.push(mem_usage);
    }

    /// Keys in file order.
    pub fn keys() -> Vec<&'static str> {
        AUX_FIELDS.iter().map(|f| f.key()).collect()
    }
}

/// PSNR, SSIM and LPIPS over one set of cameras, shaped (iterations x cameras).
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSet {
    pub psnrs: DMatrix<f64>,
    pub ssims: DMatrix<f64>,
    pub lpips: DMatrix<f64>,
}

impl MetricSet {
    /// Keep the columns whose flag in `is_training` equals `training`.
    fn split(&self, is_training: &[bool], training: bool) -> Self {
        let columns: Vec<usize> = is_training
            .iter()
            .enumerate()
            .filter(|&(_, &flag)| flag == training)
            .map(|(i, _)| i)
            .collect();
        Self {
            psnrs: self.psnrs.select_columns(&columns),
            ssims: self.ssims.select_columns(&columns),
            lpips: self.lpips.select_columns(&columns),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.psnrs.shape()
    }

    fn matrices(&self) -> [&DMatrix<f64>; 3] {
        [&self.psnrs, &self.ssims, &self.lpips]
    }
}

/// Which cameras the metric columns of a log cover.
#[derive(Debug, Clone, PartialEq)]
pub enum TableMode {
    /// Every camera, with the test/train split derived from `is_training`.
    Full {
        is_training: Vec<bool>,
        all: MetricSet,
        train: MetricSet,
    },
    /// Test cameras only (log written in eval mode).
    EvalOnly,
}

/// Result of reading a benchmark log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogTable {
    pub iterations: Vec<i64>,
    pub names: Vec<String>,
    pub test: MetricSet,
    pub mode: TableMode,
    pub it_info: IterationInfo,
}

/// Shape description of one table entry, used for summaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableField {
    Array {
        key: &'static str,
        shape: Vec<usize>,
    },
    List {
        key: &'static str,
        len: usize,
    },
    Dict {
        key: &'static str,
        keys: Vec<&'static str>,
    },
}

impl TableField {
    pub fn key(&self) -> &'static str {
        match self {
            TableField::Array { key, .. }
            | TableField::List { key, .. }
            | TableField::Dict { key, .. } => *key,
        }
    }
}

/// Mean PSNR, SSIM and LPIPS over a set of cameras.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricMeans {
    pub cameras: usize,
    #[serde(serialize_with = "serialize_optional")]
    pub psnr: Option<f64>,
    #[serde(serialize_with = "serialize_optional")]
    pub ssim: Option<f64>,
    #[serde(serialize_with = "serialize_optional")]
    pub lpips: Option<f64>,
}

impl MetricMeans {
    fn last_row(set: &MetricSet) -> Self {
        let last = |m: &DMatrix<f64>| {
            if m.nrows() == 0 || m.ncols() == 0 {
                None
            } else {
                Some(m.row(m.nrows() - 1).mean())
            }
        };
        Self {
            cameras: set.psnrs.ncols(),
            psnr: last(&set.psnrs),
            ssim: last(&set.ssims),
            lpips: last(&set.lpips),
        }
    }
}

/// Metric means of the last logged iteration, per camera split.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitSummary {
    pub iteration: i64,
    pub all: Option<MetricMeans>,
    pub test: MetricMeans,
    pub train: Option<MetricMeans>,
}

const ALL_KEYS: [&str; 3] = ["all_psnrs", "all_ssims", "all_lpips"];
const TEST_KEYS: [&str; 3] = ["test_psnrs", "test_ssims", "test_lpips"];
const TRAIN_KEYS: [&str; 3] = ["train_psnrs", "train_ssims", "train_lpips"];

/// One entry of the table as listed in summaries and JSON output.
enum Entry<'a> {
    Iterations(&'a [i64]),
    Names(&'a [String]),
    Flags(&'a [bool]),
    Matrix(&'a DMatrix<f64>),
    Info(&'a IterationInfo),
}

impl LogTable {
    /// Validate the metric shape against the cameras and build the table.
    pub(crate) fn assemble(
        cameras: CameraSet,
        iterations: Vec<i64>,
        metrics: MetricSet,
        it_info: IterationInfo,
    ) -> Result<Self> {
        let (rows, columns) = metrics.shape();
        if rows == 0 {
            warn!("Log has no iteration blocks");
            return Err(ParseError::EmptyLog);
        }

        let (test, mode) = if columns == cameras.len() {
            info!("Parsed full log: {} iterations, {} cameras", rows, columns);
            let test = metrics.split(&cameras.is_training, false);
            let train = metrics.split(&cameras.is_training, true);
            let mode = TableMode::Full {
                is_training: cameras.is_training,
                all: metrics,
                train,
            };
            (test, mode)
        } else if columns == cameras.test_count() {
            info!(
                "Parsed eval-mode log: {} iterations, {} test cameras",
                rows, columns
            );
            (metrics, TableMode::EvalOnly)
        } else {
            warn!(
                "Metric columns ({}) match neither {} cameras nor {} test cameras",
                columns,
                cameras.len(),
                cameras.test_count()
            );
            return Err(ParseError::ColumnCountMismatch {
                columns,
                cameras: cameras.len(),
                test_cameras: cameras.test_count(),
            });
        };

        Ok(Self {
            iterations,
            names: cameras.names,
            test,
            mode,
            it_info,
        })
    }

    pub fn is_eval_only(&self) -> bool {
        matches!(self.mode, TableMode::EvalOnly)
    }

    /// Entries in the order the benchmark reader lists them.
    fn entries(&self) -> Vec<(&'static str, Entry<'_>)> {
        let mut entries = vec![
            ("iterations", Entry::Iterations(&self.iterations)),
            ("names", Entry::Names(&self.names)),
        ];
        let test = TEST_KEYS.into_iter().zip(self.test.matrices());
        match &self.mode {
            TableMode::Full {
                is_training,
                all,
                train,
            } => {
                entries.push(("is_training", Entry::Flags(is_training)));
                let all = ALL_KEYS.into_iter().zip(all.matrices());
                let train = TRAIN_KEYS.into_iter().zip(train.matrices());
                entries.extend(all.chain(test).chain(train).map(|(k, m)| (k, Entry::Matrix(m))));
            }
            TableMode::EvalOnly => {
                entries.extend(test.map(|(k, m)| (k, Entry::Matrix(m))));
            }
        }
        entries.push(("it_info", Entry::Info(&self.it_info)));
        entries
    }

    /// Entries of the table with their shapes.
    pub fn fields(&self) -> Vec<TableField> {
        self.entries()
            .into_iter()
            .map(|(key, entry)| match entry {
                Entry::Iterations(v) => TableField::Array {
                    key,
                    shape: vec![v.len()],
                },
                Entry::Names(v) => TableField::List { key, len: v.len() },
                Entry::Flags(v) => TableField::Array {
                    key,
                    shape: vec![v.len()],
                },
                Entry::Matrix(m) => TableField::Array {
                    key,
                    shape: vec![m.nrows(), m.ncols()],
                },
                Entry::Info(_) => TableField::Dict {
                    key,
                    keys: IterationInfo::keys(),
                },
            })
            .collect()
    }

    /// Mean metrics of the last iteration for every split present.
    pub fn final_summary(&self) -> Option<SplitSummary> {
        let iteration = *self.iterations.last()?;
        let (all, train) = match &self.mode {
            TableMode::Full { all, train, .. } => {
                (Some(MetricMeans::last_row(all)), Some(MetricMeans::last_row(train)))
            }
            TableMode::EvalOnly => (None, None),
        };
        Some(SplitSummary {
            iteration,
            all,
            test: MetricMeans::last_row(&self.test),
            train,
        })
    }
}

/// Flat map keyed like the summary (`all_psnrs`, `test_psnrs`, ...), with
/// matrices written as arrays of rows.
impl Serialize for LogTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let entries = self.entries();
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (key, entry) in entries {
            match entry {
                Entry::Iterations(v) => map.serialize_entry(key, v)?,
                Entry::Names(v) => map.serialize_entry(key, v)?,
                Entry::Flags(v) => map.serialize_entry(key, v)?,
                Entry::Matrix(m) => map.serialize_entry(key, &Rows(m))?,
                Entry::Info(v) => map.serialize_entry(key, v)?,
            }
        }
        map.end()
    }
}
