//! Grouped bar charts of a comparison table

use super::aggregate::{ComparisonTable, Stat};
use crate::error::{Error, Result};
use plotters::prelude::*;
use std::fs;
use std::path::Path;

const GROUP_WIDTH: f64 = 0.8;
const CAP: f64 = 0.02;

fn plot_err<E: std::fmt::Display>(e: E) -> Error {
    Error::Plot(e.to_string())
}

fn category(columns: &[String], x: f64) -> String {
    let nearest = x.round();
    if (x - nearest).abs() > 1e-6 || nearest < 0.0 {
        return String::new();
    }
    columns.get(nearest as usize).cloned().unwrap_or_default()
}

/// Render `table` as an SVG bar chart: one group per column, one bar per
/// configuration, whiskers at one standard deviation.
pub fn render_comparison(table: &ComparisonTable, title: &str, path: &Path) -> Result<()> {
    if table.is_empty() || table.columns.is_empty() {
        return Err(Error::Plot(format!("no {} results to plot", table.protocol)));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let n_columns = table.columns.len();
    let bar_width = GROUP_WIDTH / table.rows.len() as f64;
    let y_max = table
        .rows
        .iter()
        .flat_map(|row| row.stats.iter())
        .map(|s| f64::from(s.mean + s.std))
        .filter(|v| v.is_finite())
        .fold(1.0f64, f64::max)
        * 1.05;

    let root = SVGBackend::new(path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5f64..(n_columns as f64 - 0.5), 0f64..y_max)
        .map_err(plot_err)?;

    let columns = table.columns.clone();
    let label = |x: &f64| category(&columns, *x);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n_columns)
        .x_label_formatter(&label)
        .y_desc("Accuracy")
        .draw()
        .map_err(plot_err)?;

    for (r, row) in table.rows.iter().enumerate() {
        let color = Palette99::pick(r).to_rgba();
        let left = |c: usize| c as f64 - GROUP_WIDTH / 2.0 + r as f64 * bar_width;
        let drawn: Vec<(usize, Stat)> = row
            .stats
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, s)| s.mean.is_finite())
            .collect();

        chart
            .draw_series(drawn.iter().map(|(c, s)| {
                let x0 = left(*c);
                Rectangle::new(
                    [(x0, 0.0), (x0 + bar_width * 0.9, f64::from(s.mean))],
                    color.filled(),
                )
            }))
            .map_err(plot_err)?
            .label(row.tag.clone())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 15, y + 5)], color.filled()));

        for (c, s) in drawn.iter().filter(|(_, s)| s.std.is_finite()) {
            let x = left(*c) + bar_width * 0.45;
            let (lo, hi) = (f64::from(s.mean - s.std), f64::from(s.mean + s.std));
            for segment in [
                vec![(x, lo), (x, hi)],
                vec![(x - CAP, lo), (x + CAP, lo)],
                vec![(x - CAP, hi), (x + CAP, hi)],
            ] {
                chart
                    .draw_series(std::iter::once(PathElement::new(segment, BLACK)))
                    .map_err(plot_err)?;
            }
        }
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}
