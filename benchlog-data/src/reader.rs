//! Benchmark log reading.

use crate::cameras::CameraSet;
use crate::error::{ParseError, Result};
use crate::format::{
    AUX_FIELDS, AuxField, BLOCK_LAYOUT, BLOCK_STRIDE, BlockLine, HEADER_LINES, TEST_CAMS_MARKER,
    TRAINING_CAMS_MARKER, split_fields,
};
use crate::table::{IterationInfo, LogTable, MetricSet};
use nalgebra::DMatrix;
use std::io::ErrorKind;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

/// Read and validate a benchmark log file.
///
/// The whole file is loaded before parsing starts. Any failure aborts the read
/// and no partial table is returned.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn read<P: AsRef<Path>>(path: P) -> Result<LogTable> {
    let path = path.as_ref();
    debug!("Reading benchmark log");

    if !path.is_file() {
        warn!("Log file not found");
        return Err(ParseError::FileNotFound(path.to_path_buf()));
    }

    let text = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            ParseError::FileNotFound(path.to_path_buf())
        } else {
            ParseError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    parse_str(&text)
}

/// Parse the contents of a benchmark log.
pub fn parse_str(text: &str) -> Result<LogTable> {
    let mut lines: Vec<&str> = text.lines().collect();
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }

    let (test_line, training_line) = match lines.as_slice() {
        [test, training, ..] => (*test, *training),
        [_] => {
            return Err(ParseError::MalformedHeader {
                line: 2,
                expected: TRAINING_CAMS_MARKER,
            });
        }
        [] => {
            return Err(ParseError::MalformedHeader {
                line: 1,
                expected: TEST_CAMS_MARKER,
            });
        }
    };
    let cameras = CameraSet::from_header(test_line, training_line)?;

    let mut collector = BlockCollector::default();
    for (index, block) in lines[HEADER_LINES..].chunks(BLOCK_STRIDE).enumerate() {
        let first_line = HEADER_LINES + index * BLOCK_STRIDE + 1;
        if block.len() < BLOCK_STRIDE {
            warn!("Log ends in a partial iteration block");
            return Err(ParseError::TruncatedBlock {
                line: first_line,
                expected: BLOCK_STRIDE,
                found: block.len(),
            });
        }
        collector.push_block(block, first_line)?;
    }
    debug!("Collected {} iteration blocks", collector.iterations.len());

    let (iterations, metrics, it_info) = collector.finish();
    LogTable::assemble(cameras, iterations, metrics, it_info)
}

/// Accumulates row-major metric values while walking the iteration blocks.
#[derive(Default)]
struct BlockCollector {
    iterations: Vec<i64>,
    width: Option<usize>,
    psnrs: Vec<f64>,
    ssims: Vec<f64>,
    lpips: Vec<f64>,
    it_info: IterationInfo,
}

impl BlockCollector {
    fn push_block(&mut self, block: &[&str], first_line: usize) -> Result<()> {
        let mut iteration = 0;
        let mut width = 0;

        for (offset, (kind, raw)) in BLOCK_LAYOUT.iter().zip(block).enumerate() {
            let line = first_line + offset;
            let fields = split_fields(raw);

            match kind {
                BlockLine::Psnr => {
                    let (first, values) = fields.split_first().ok_or(
                        ParseError::FieldCountMismatch {
                            line,
                            expected: self.width.unwrap_or(0) + 1,
                            found: 0,
                        },
                    )?;
                    iteration = parse_value(first, line, 1)?;
                    let values = parse_floats(values, line, 2)?;

                    // the first PSNR line fixes the column count for the file
                    width = *self.width.get_or_insert(values.len());
                    if values.len() != width {
                        return Err(ParseError::FieldCountMismatch {
                            line,
                            expected: width,
                            found: values.len(),
                        });
                    }
                    self.psnrs.extend(values);
                }
                BlockLine::Ssim => {
                    self.ssims.extend(metric_row(&fields, width, iteration, line)?);
                }
                BlockLine::Lpips => {
                    self.lpips.extend(metric_row(&fields, width, iteration, line)?);
                }
                BlockLine::Aux => self.push_aux(&fields, iteration, line)?,
            }
        }

        self.iterations.push(iteration);
        Ok(())
    }

    fn push_aux(&mut self, fields: &[&str], iteration: i64, line: usize) -> Result<()> {
        let (fields, first_column) =
            strip_iteration(fields, AUX_FIELDS.len(), iteration, line)?;

        let mut l1 = 0.0;
        let mut time = 0.0;
        let mut nr_gaussians = 0;
        let mut mem_usage = 0.0;
        for (i, (field, raw)) in AUX_FIELDS.iter().zip(fields).enumerate() {
            let column = first_column + i;
            match field {
                AuxField::L1 => l1 = parse_value(raw, line, column)?,
                AuxField::Time => time = parse_value(raw, line, column)?,
                AuxField::NrGaussians => nr_gaussians = parse_value(raw, line, column)?,
                AuxField::MemUsage => mem_usage = parse_value(raw, line, column)?,
            }
        }

        self.it_info.push(l1, time, nr_gaussians, mem_usage);
        Ok(())
    }

    /// Shape the collected values into (iterations x width) matrices.
    fn finish(self) -> (Vec<i64>, MetricSet, IterationInfo) {
        let rows = self.iterations.len();
        let cols = self.width.unwrap_or(0);
        let metrics = MetricSet {
            psnrs: DMatrix::from_row_slice(rows, cols, &self.psnrs),
            ssims: DMatrix::from_row_slice(rows, cols, &self.ssims),
            lpips: DMatrix::from_row_slice(rows, cols, &self.lpips),
        };
        (self.iterations, metrics, self.it_info)
    }
}

/// Values of an SSIM or LPIPS line, `width` wide.
fn metric_row(fields: &[&str], width: usize, iteration: i64, line: usize) -> Result<Vec<f64>> {
    let (values, first_column) = strip_iteration(fields, width, iteration, line)?;
    parse_floats(values, line, first_column)
}

/// Drop a leading iteration column if the line carries one.
///
/// Returns the remaining fields and the 1-based column of the first of them.
fn strip_iteration<'a, 'b>(
    fields: &'a [&'b str],
    width: usize,
    iteration: i64,
    line: usize,
) -> Result<(&'a [&'b str], usize)> {
    if fields.len() == width {
        return Ok((fields, 1));
    }
    if fields.len() == width + 1 {
        let found: i64 = parse_value(fields[0], line, 1)?;
        if found != iteration {
            return Err(ParseError::InconsistentIteration {
                line,
                expected: iteration,
                found,
            });
        }
        return Ok((&fields[1..], 2));
    }
    Err(ParseError::FieldCountMismatch {
        line,
        expected: width,
        found: fields.len(),
    })
}

fn parse_floats(fields: &[&str], line: usize, first_column: usize) -> Result<Vec<f64>> {
    fields
        .iter()
        .enumerate()
        .map(|(i, raw)| parse_value(raw, line, first_column + i))
        .collect()
}

fn parse_value<T: FromStr>(raw: &str, line: usize, column: usize) -> Result<T> {
    raw.parse().map_err(|_| ParseError::InvalidValue {
        line,
        column,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{TableField, TableMode};
    use std::path::PathBuf;

    const EXAMPLE: &str = "test cams A, B\n\
                           training cams C\n\
                           0, 1.0, 2.0, 3.0\n\
                           0.9,0.8,0.7\n\
                           0.1,0.2,0.3\n\
                           0.01,5.0,1000,2048\n";

    /// Log in the layout the benchmark writes: a colon after each marker and
    /// the iteration index leading every block line.
    const BENCHMARK: &str = "test cams: r_2, r_0\n\
                             training cams: r_3, r_1, r_4\n\
                             0, 20.5, 21.0, 22.5, 23.0, 24.5\n\
                             0, 0.70, 0.71, 0.72, 0.73, 0.74\n\
                             0, 0.30, 0.31, 0.32, 0.33, 0.34\n\
                             0, 0.120, 1.5, 100000, 5.0e8\n\
                             7000, 25.0, 26.0, 27.0, 28.0, 29.0\n\
                             7000, 0.80, 0.81, 0.82, 0.83, 0.84\n\
                             7000, 0.20, 0.21, 0.22, 0.23, 0.24\n\
                             7000, 0.045, 310.25, 250000, 1.2e9\n\
                             \n";

    fn temp_log(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "benchlog-{}-{}.txt",
            name,
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn row(m: &DMatrix<f64>, r: usize) -> Vec<f64> {
        m.row(r).iter().copied().collect()
    }

    #[test]
    fn test_example_log() {
        let table = parse_str(EXAMPLE).unwrap();
        let TableMode::Full {
            is_training,
            all,
            train,
        } = &table.mode
        else {
            panic!("expected full table");
        };

        assert_eq!(table.names, ["A", "B", "C"]);
        assert_eq!(is_training, &[false, false, true]);
        assert_eq!(table.iterations, [0]);
        assert_eq!(all.psnrs, DMatrix::from_row_slice(1, 3, &[1.0, 2.0, 3.0]));
        assert_eq!(table.test.psnrs, DMatrix::from_row_slice(1, 2, &[1.0, 2.0]));
        assert_eq!(train.psnrs, DMatrix::from_row_slice(1, 1, &[3.0]));
        assert_eq!(row(&all.ssims, 0), [0.9, 0.8, 0.7]);
        assert_eq!(row(&all.lpips, 0), [0.1, 0.2, 0.3]);
        assert_eq!(table.it_info.l1, [0.01]);
        assert_eq!(table.it_info.time, [5.0]);
        assert_eq!(table.it_info.nr_gaussians, [1000]);
        assert_eq!(table.it_info.mem_usage, [2048.0]);
    }

    #[test]
    fn test_benchmark_layout() {
        let table = parse_str(BENCHMARK).unwrap();
        let TableMode::Full {
            is_training,
            all,
            train,
        } = &table.mode
        else {
            panic!("expected full table");
        };

        assert_eq!(table.names, ["r_0", "r_1", "r_2", "r_3", "r_4"]);
        assert_eq!(is_training, &[false, true, false, true, true]);
        assert_eq!(table.iterations, [0, 7000]);
        assert_eq!(all.shape(), (2, 5));
        assert_eq!(table.test.shape(), (2, 2));
        assert_eq!(train.shape(), (2, 3));
        assert_eq!(row(&table.test.psnrs, 1), [25.0, 27.0]);
        assert_eq!(row(&train.ssims, 0), [0.71, 0.73, 0.74]);
        assert_eq!(table.it_info.nr_gaussians, [100000, 250000]);
        assert_eq!(table.it_info.mem_usage, [5.0e8, 1.2e9]);
    }

    #[test]
    fn test_full_mode_slices_match_flags() {
        let table = parse_str(BENCHMARK).unwrap();
        let TableMode::Full {
            is_training,
            all,
            train,
        } = &table.mode
        else {
            panic!("expected full table");
        };

        for (all, (test, train)) in [
            (&all.psnrs, (&table.test.psnrs, &train.psnrs)),
            (&all.ssims, (&table.test.ssims, &train.ssims)),
            (&all.lpips, (&table.test.lpips, &train.lpips)),
        ] {
            for r in 0..all.nrows() {
                let values = row(all, r);
                let pick = |training: bool| -> Vec<f64> {
                    values
                        .iter()
                        .zip(is_training)
                        .filter(|&(_, &t)| t == training)
                        .map(|(v, _)| *v)
                        .collect()
                };
                assert_eq!(row(test, r), pick(false));
                assert_eq!(row(train, r), pick(true));
            }
        }
    }

    #[test]
    fn test_eval_mode() {
        let log = "test cams: A, B\n\
                   training cams: C, D, E\n\
                   10, 30.0, 31.0\n\
                   0.9, 0.91\n\
                   0.05, 0.06\n\
                   0.02, 12.0, 5000, 1e6\n";
        let table = parse_str(log).unwrap();
        assert!(table.is_eval_only());
        assert_eq!(table.names.len(), 5);
        assert_eq!(table.test.shape(), (1, 2));
        assert_eq!(row(&table.test.lpips, 0), [0.05, 0.06]);
        assert_eq!(table.it_info.l1.len(), 1);
    }

    #[test]
    fn test_no_training_cameras_is_full() {
        let log = "test cams: A\n\
                   training cams:\n\
                   0, 30.0\n\
                   0.9\n\
                   0.05\n\
                   0.02, 12.0, 5000, 1e6\n";
        let table = parse_str(log).unwrap();
        let TableMode::Full { train, .. } = &table.mode else {
            panic!("expected full table");
        };
        assert_eq!(train.shape(), (1, 0));
        assert_eq!(table.test.shape(), (1, 1));
    }

    #[test]
    fn test_comma_inside_camera_name() {
        let log = "test cams: a,b, c\n\
                   training cams: d\n\
                   0, 1.0, 2.0, 3.0\n\
                   0.9, 0.8, 0.7\n\
                   0.1, 0.2, 0.3\n\
                   0.01, 5.0, 1000, 2048\n";
        let table = parse_str(log).unwrap();
        assert_eq!(table.names, ["a,b", "c", "d"]);
        assert!(!table.is_eval_only());
        assert_eq!(row(&table.test.psnrs, 0), [1.0, 2.0]);
    }

    #[test]
    fn test_column_count_mismatch() {
        let log = "test cams: A, B\n\
                   training cams: C\n\
                   0, 1.0\n\
                   0.9\n\
                   0.1\n\
                   0.01, 5.0, 1000, 2048\n";
        let err = parse_str(log).unwrap_err();
        assert!(matches!(
            err,
            ParseError::ColumnCountMismatch {
                columns: 1,
                cameras: 3,
                test_cameras: 2
            }
        ));
    }

    #[test]
    fn test_header_only_is_empty() {
        let err = parse_str("test cams: A\ntraining cams: B\n").unwrap_err();
        assert!(matches!(err, ParseError::EmptyLog));

        let err = parse_str("test cams: A\ntraining cams: B\n\n\n").unwrap_err();
        assert!(matches!(err, ParseError::EmptyLog));
    }

    #[test]
    fn test_missing_header() {
        let err = parse_str("").unwrap_err();
        assert!(matches!(err, ParseError::MalformedHeader { line: 1, .. }));

        let err = parse_str("test cams: A\n").unwrap_err();
        assert!(matches!(err, ParseError::MalformedHeader { line: 2, .. }));

        let err = parse_str("0, 1.0\ntraining cams: A\n").unwrap_err();
        assert!(matches!(err, ParseError::MalformedHeader { line: 1, .. }));
    }

    #[test]
    fn test_truncated_block() {
        let log = format!("{EXAMPLE}1, 1.0, 2.0, 3.0\n0.9, 0.8, 0.7\n");
        let err = parse_str(&log).unwrap_err();
        assert!(matches!(
            err,
            ParseError::TruncatedBlock {
                line: 7,
                expected: 4,
                found: 2
            }
        ));
    }

    #[test]
    fn test_invalid_value_reports_position() {
        let log = EXAMPLE.replace("0.9,0.8,0.7", "0.9,oops,0.7");
        let err = parse_str(&log).unwrap_err();
        match err {
            ParseError::InvalidValue {
                line,
                column,
                value,
            } => {
                assert_eq!(line, 4);
                assert_eq!(column, 2);
                assert_eq!(value, "oops");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_fractional_gaussian_count_rejected() {
        let log = EXAMPLE.replace("0.01,5.0,1000,2048", "0.01,5.0,1000.5,2048");
        let err = parse_str(&log).unwrap_err();
        assert!(matches!(
            err,
            ParseError::InvalidValue { line: 6, column: 3, .. }
        ));
    }

    #[test]
    fn test_ssim_width_must_match_psnr() {
        let log = EXAMPLE.replace("0.9,0.8,0.7", "0.9,0.8");
        let err = parse_str(&log).unwrap_err();
        assert!(matches!(
            err,
            ParseError::FieldCountMismatch {
                line: 4,
                expected: 3,
                found: 2
            }
        ));
    }

    #[test]
    fn test_width_must_stay_constant() {
        let log = format!(
            "{EXAMPLE}1, 1.0, 2.0\n0.9, 0.8\n0.1, 0.2\n0.01, 6.0, 1000, 2048\n"
        );
        let err = parse_str(&log).unwrap_err();
        assert!(matches!(
            err,
            ParseError::FieldCountMismatch { line: 7, expected: 3, found: 2 }
        ));
    }

    #[test]
    fn test_aux_field_count() {
        let log = EXAMPLE.replace("0.01,5.0,1000,2048", "0.01,5.0,1000");
        let err = parse_str(&log).unwrap_err();
        assert!(matches!(
            err,
            ParseError::FieldCountMismatch {
                line: 6,
                expected: 4,
                found: 3
            }
        ));
    }

    #[test]
    fn test_leading_iteration_must_match_block() {
        let log = BENCHMARK.replace("7000, 0.80", "6999, 0.80");
        let err = parse_str(&log).unwrap_err();
        assert!(matches!(
            err,
            ParseError::InconsistentIteration {
                line: 8,
                expected: 7000,
                found: 6999
            }
        ));
    }

    #[test]
    fn test_duplicate_camera_rejected() {
        let log = EXAMPLE.replace("training cams C", "training cams B");
        let err = parse_str(&log).unwrap_err();
        assert!(matches!(err, ParseError::DuplicateCamera(name) if name == "B"));
    }

    #[test]
    fn test_read_file() {
        let path = temp_log("read", BENCHMARK);
        let table = read(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(table.iterations, [0, 7000]);
        assert_eq!(
            table.fields().first(),
            Some(&TableField::Array {
                key: "iterations",
                shape: vec![2]
            })
        );
    }

    #[test]
    fn test_read_missing_file() {
        let path = std::env::temp_dir().join("benchlog-definitely-missing.txt");
        let err = read(&path).unwrap_err();
        assert!(matches!(err, ParseError::FileNotFound(p) if p == path));
    }

    #[test]
    fn test_read_directory_is_not_found() {
        let err = read(std::env::temp_dir()).unwrap_err();
        assert!(matches!(err, ParseError::FileNotFound(_)));
    }

    #[test]
    fn test_table_serializes_with_log_keys() {
        let table = parse_str(EXAMPLE).unwrap();
        let json = serde_json::to_value(&table).unwrap();

        assert_eq!(json["names"], serde_json::json!(["A", "B", "C"]));
        assert_eq!(json["is_training"], serde_json::json!([false, false, true]));
        assert_eq!(json["all_psnrs"], serde_json::json!([[1.0, 2.0, 3.0]]));
        assert_eq!(json["test_psnrs"], serde_json::json!([[1.0, 2.0]]));
        assert_eq!(json["train_lpips"], serde_json::json!([[0.3]]));
        assert_eq!(json["it_info"]["L1"], serde_json::json!([0.01]));
        assert_eq!(json["it_info"]["nr_gaussians"], serde_json::json!([1000]));
    }

    #[test]
    fn test_infinite_psnr_survives_json() {
        let log = EXAMPLE.replace("0, 1.0, 2.0, 3.0", "0, inf, 2.0, 3.0");
        let table = parse_str(&log).unwrap();
        assert_eq!(table.test.psnrs[(0, 0)], f64::INFINITY);

        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json["all_psnrs"], serde_json::json!([["inf", 2.0, 3.0]]));
        assert_eq!(json["test_psnrs"], serde_json::json!([["inf", 2.0]]));
    }
}
