//! Benchlog Data Crate
//!
//! Reader for the text log written by the Gaussian splatting training benchmark.
//! The log holds PSNR, SSIM and LPIPS per camera for every evaluated iteration,
//! followed by a line of training statistics (L1 loss, elapsed time, number of
//! Gaussians, memory usage).
//!
//! ## Example
//!
//! ```ignore
//! use benchlog_data::{TableMode, read};
//!
//! let table = read("output/log.txt")?;
//! println!("test PSNR: {:?}", table.test.psnrs.shape());
//! if let TableMode::Full { train, .. } = &table.mode {
//!     println!("train PSNR: {:?}", train.psnrs.shape());
//! }
//! ```

mod cameras;
mod error;
pub mod format;
mod json;
mod reader;
mod table;

pub use cameras::CameraSet;
pub use error::{ParseError, Result};
pub use reader::{parse_str, read};
pub use table::{
    IterationInfo, LogTable, MetricMeans, MetricSet, SplitSummary, TableField, TableMode,
};
