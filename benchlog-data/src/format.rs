//! Layout of the benchmark log.
//!
//! ```text
//! test cams: <name>, <name>, ...
//! training cams: <name>, <name>, ...
//! <iter>, <psnr>, <psnr>, ...
//! <ssim>, <ssim>, ...
//! <lpips>, <lpips>, ...
//! <L1>, <time>, <nr_gaussians>, <mem_usage>
//! ```
//!
//! The last four lines repeat once per evaluated iteration.

/// Prefix of the first header line.
pub const TEST_CAMS_MARKER: &str = "test cams";

/// Prefix of the second header line.
pub const TRAINING_CAMS_MARKER: &str = "training cams";

/// Number of header lines before the first iteration block.
pub const HEADER_LINES: usize = 2;

/// Separator between camera names on the header lines.
pub const HEADER_SEPARATOR: &str = ", ";

/// Field separator on the iteration block lines.
pub const SEPARATOR: char = ',';

/// What a line inside an iteration block holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockLine {
    /// Iteration index followed by one PSNR per camera.
    Psnr,
    /// One SSIM per camera.
    Ssim,
    /// One LPIPS per camera.
    Lpips,
    /// Training statistics, see [`AUX_FIELDS`].
    Aux,
}

/// Lines of one iteration block, in file order.
pub const BLOCK_LAYOUT: [BlockLine; 4] = [
    BlockLine::Psnr,
    BlockLine::Ssim,
    BlockLine::Lpips,
    BlockLine::Aux,
];

/// Number of lines per iteration block.
pub const BLOCK_STRIDE: usize = BLOCK_LAYOUT.len();

/// A value on the training statistics line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuxField {
    L1,
    Time,
    NrGaussians,
    MemUsage,
}

impl AuxField {
    /// Key used for this field in summaries and JSON output.
    pub fn key(self) -> &'static str {
        match self {
            AuxField::L1 => "L1",
            AuxField::Time => "time",
            AuxField::NrGaussians => "nr_gaussians",
            AuxField::MemUsage => "mem_usage",
        }
    }
}

/// Fields of the training statistics line, in file order.
pub const AUX_FIELDS: [AuxField; 4] = [
    AuxField::L1,
    AuxField::Time,
    AuxField::NrGaussians,
    AuxField::MemUsage,
];

/// Split a line into trimmed fields.
///
/// Both `", "` and `","` separate fields; a blank line has no fields.
pub fn split_fields(line: &str) -> Vec<&str> {
    let line = line.trim();
    if line.is_empty() {
        return Vec::new();
    }
    line.split(SEPARATOR).map(str::trim).collect()
}
