//! SVG trend chart.

use crate::cli::Part;
use crate::error::ReportError;
use crate::models::{AggregateRow, Report};
use crate::report::generator::ensure_rows;
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;

const CHART_SIZE: (u32, u32) = (960, 540);

/// Series label used for Part A rows.
const ALL_ROUTES: &str = "all routes";

fn chart_error<E: std::fmt::Display>(err: E) -> ReportError {
    ReportError::Chart(err.to_string())
}

/// Split rows into one (year, average) series per route.
///
/// Part B rows are keyed by route. Part A rows form a single series.
fn series<'a, I>(rows: I) -> BTreeMap<String, Vec<(i32, f64)>>
where
    I: IntoIterator<Item = &'a AggregateRow>,
{
    let mut series: BTreeMap<String, Vec<(i32, f64)>> = BTreeMap::new();
    for row in rows {
        let name = row.route.clone().unwrap_or_else(|| ALL_ROUTES.to_string());
        series
            .entry(name)
            .or_default()
            .push((row.year, row.avg_number_of_ingredients));
    }
    for points in series.values_mut() {
        points.sort_by_key(|(year, _)| *year);
    }
    series
}

/// Render the average-ingredient trend to an SVG file.
///
/// Part B draws one line per route and Part A a single "all routes" line.
/// With both parts requested the per-year line is drawn next to the
/// per-route lines.
pub fn render_chart(report: &Report, part: Part, path: &Path) -> Result<(), ReportError> {
    ensure_rows(report, part)?;

    let title = match part {
        Part::A => "Average ingredients per year",
        Part::B | Part::Both => "Average ingredients per year and route",
    };

    let mut rows: Vec<&AggregateRow> = Vec::new();
    if part.includes_a() {
        rows.extend(&report.by_year);
    }
    if part.includes_b() {
        rows.extend(&report.by_year_and_route);
    }

    let series = series(rows.iter().copied());
    let min_year = rows.iter().map(|r| r.year).min().unwrap_or_default();
    let max_year = rows.iter().map(|r| r.year).max().unwrap_or_default();
    let max_avg = rows
        .iter()
        .map(|r| r.avg_number_of_ingredients)
        .fold(0.0_f64, f64::max);

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(chart_error)?;

    let caption = format!("{} ({})", title, report.metadata.manufacturer);
    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 22))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(min_year - 1..max_year + 1, 0.0..max_avg * 1.1 + 1.0)
        .map_err(chart_error)?;

    chart
        .configure_mesh()
        .x_desc("year")
        .y_desc("avg_number_of_ingredients")
        .x_label_formatter(&|year| year.to_string())
        .draw()
        .map_err(chart_error)?;

    for (index, (route, points)) in series.into_iter().enumerate() {
        let color = Palette99::pick(index).to_rgba();

        chart
            .draw_series(LineSeries::new(points.clone(), color.stroke_width(2)))
            .map_err(chart_error)?
            .label(route)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));

        chart
            .draw_series(
                points
                    .into_iter()
                    .map(|point| Circle::new(point, 3, color.filled())),
            )
            .map_err(chart_error)?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(chart_error)?;

    root.present().map_err(chart_error)?;
    Ok(())
}
