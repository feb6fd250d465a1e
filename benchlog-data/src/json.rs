//! Serialization helpers for metric values.
//!
//! JSON has no representation for infinite or NaN numbers and `serde_json`
//! writes them as `null`. PSNR is infinite for a pixel-perfect render, so
//! non-finite values are written as the strings `"inf"`, `"-inf"` and `"nan"`.

use nalgebra::DMatrix;
use serde::{Serialize, Serializer};

/// A metric value, labelled when it is not finite.
pub(crate) struct Metric(pub f64);

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let v = self.0;
        if v.is_finite() {
            serializer.serialize_f64(v)
        } else if v.is_nan() {
            serializer.serialize_str("nan")
        } else if v > 0.0 {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }
}

/// A matrix written as one array per row.
pub(crate) struct Rows<'a>(pub &'a DMatrix<f64>);

impl Serialize for Rows<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let m = self.0;
        serializer.collect_seq((0..m.nrows()).map(|r| Row(m, r)))
    }
}

struct Row<'a>(&'a DMatrix<f64>, usize);

impl Serialize for Row<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let Row(m, r) = *self;
        serializer.collect_seq((0..m.ncols()).map(|c| Metric(m[(r, c)])))
    }
}

pub(crate) fn serialize_values<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(values.iter().map(|&v| Metric(v)))
}

pub(crate) fn serialize_optional<S: Serializer>(
    value: &Option<f64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => Metric(*v).serialize(serializer),
        None => serializer.serialize_none(),
    }
}
