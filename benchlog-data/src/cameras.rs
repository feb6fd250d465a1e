//! Camera lists from the two header lines.

use crate::error::{ParseError, Result};
use crate::format::{HEADER_SEPARATOR, TEST_CAMS_MARKER, TRAINING_CAMS_MARKER};
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

/// Test and training cameras of a benchmark run.
///
/// `names` is sorted, and `is_training[i]` belongs to `names[i]`. Metric columns
/// use the same order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CameraSet {
    /// All camera names, sorted.
    pub names: Vec<String>,
    /// Whether the camera at the same index in `names` is a training camera.
    pub is_training: Vec<bool>,
    /// Test camera names, sorted.
    pub test: Vec<String>,
    /// Training camera names, sorted.
    pub train: Vec<String>,
}

impl CameraSet {
    /// Build from unsorted test and training lists.
    ///
    /// A name that appears twice, in one list or across both, is rejected.
    pub fn new(mut test: Vec<String>, mut train: Vec<String>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(test.len() + train.len());
        for name in test.iter().chain(train.iter()) {
            if !seen.insert(name.as_str()) {
                return Err(ParseError::DuplicateCamera(name.clone()));
            }
        }

        test.sort();
        train.sort();

        let mut flagged: Vec<(&str, bool)> = test
            .iter()
            .map(|name| (name.as_str(), false))
            .chain(train.iter().map(|name| (name.as_str(), true)))
            .collect();
        flagged.sort_by(|a, b| a.0.cmp(b.0));

        let (names, is_training): (Vec<String>, Vec<bool>) = flagged
            .into_iter()
            .map(|(name, training)| (name.to_string(), training))
            .unzip();

        Ok(Self {
            names,
            is_training,
            test,
            train,
        })
    }

    /// Parse the `test cams` and `training cams` header lines.
    pub fn from_header(test_line: &str, training_line: &str) -> Result<Self> {
        let test = parse_camera_line(test_line, TEST_CAMS_MARKER, 1)?;
        let train = parse_camera_line(training_line, TRAINING_CAMS_MARKER, 2)?;
        debug!("Header lists {} test and {} training cameras", test.len(), train.len());
        Self::new(test, train)
    }

    /// Total number of cameras.
    pub(crate) fn len(&self) -> usize {
        self.names.len()
    }

    pub(crate) fn test_count(&self) -> usize {
        self.test.len()
    }
}

fn parse_camera_line(line: &str, marker: &'static str, line_no: usize) -> Result<Vec<String>> {
    let rest = line
        .strip_prefix(marker)
        .ok_or(ParseError::MalformedHeader {
            line: line_no,
            expected: marker,
        })?;
    let rest = rest.strip_prefix(':').unwrap_or(rest);

    // names may contain a bare comma, only ", " separates them
    Ok(rest
        .trim()
        .split(HEADER_SEPARATOR)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect())
}
