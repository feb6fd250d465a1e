//! Text and JSON output for a parsed log.

use benchlog_data::{LogTable, MetricMeans, SplitSummary, TableField};
use serde::Serialize;
use std::io::{self, Write};

/// Print every table entry with its shape.
pub fn write_summary<W: Write>(out: &mut W, table: &LogTable) -> io::Result<()> {
    writeln!(out, "The variable 'log' is now a dictionary:")?;
    writeln!(out, "{{")?;
    for field in table.fields() {
        writeln!(out, "\t\"{}\": {}", field.key(), describe(&field))?;
    }
    writeln!(out, "}}")?;
    if table.is_eval_only() {
        writeln!(out, "Metrics cover the test cameras only (eval mode).")?;
    }
    Ok(())
}

fn describe(field: &TableField) -> String {
    match field {
        TableField::Array { shape, .. } => format!("array of shape {}", format_shape(shape)),
        TableField::List { len, .. } => format!("list of length {len}"),
        TableField::Dict { keys, .. } => format!("dictionary with keys {keys:?}"),
    }
}

/// `(3,)` for one dimension, `(2, 3)` for more.
fn format_shape(shape: &[usize]) -> String {
    match shape {
        [n] => format!("({n},)"),
        dims => {
            let dims: Vec<String> = dims.iter().map(usize::to_string).collect();
            format!("({})", dims.join(", "))
        }
    }
}

/// Print mean metrics of the last iteration for each camera split.
pub fn write_stats<W: Write>(out: &mut W, table: &LogTable) -> io::Result<()> {
    let Some(summary) = table.final_summary() else {
        return Ok(());
    };

    writeln!(out, "Mean metrics at iteration {}:", summary.iteration)?;
    if let Some(all) = &summary.all {
        write_means(out, "all", all)?;
    }
    write_means(out, "test", &summary.test)?;
    if let Some(train) = &summary.train {
        write_means(out, "train", train)?;
    }
    Ok(())
}

fn write_means<W: Write>(out: &mut W, split: &str, means: &MetricMeans) -> io::Result<()> {
    writeln!(
        out,
        "\t{:<5} ({} cameras): PSNR {}  SSIM {}  LPIPS {}",
        split,
        means.cameras,
        format_metric(means.psnr),
        format_metric(means.ssim),
        format_metric(means.lpips),
    )
}

fn format_metric(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.4}"))
}

#[derive(Serialize)]
struct JsonReport<'a> {
    log: &'a LogTable,
    final_summary: Option<SplitSummary>,
}

/// Print the table as pretty JSON, optionally wrapped with the final summary.
pub fn write_json<W: Write>(out: &mut W, table: &LogTable, stats: bool) -> io::Result<()> {
    if stats {
        let report = JsonReport {
            log: table,
            final_summary: table.final_summary(),
        };
        serde_json::to_writer_pretty(&mut *out, &report)?;
    } else {
        serde_json::to_writer_pretty(&mut *out, table)?;
    }
    writeln!(out)
}
