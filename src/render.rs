use base64::Engine;
use plotters::prelude::*;

use crate::error::ForecastError;
use crate::pipeline::reconcile::ReconciledSeries;

const CHART_SIZE: (u32, u32) = (800, 480);

fn render_err<E: std::fmt::Display>(e: E) -> ForecastError {
    ForecastError::Render(e.to_string())
}

/// Draw actual and forecast closes against the positional index as SVG.
///
/// Null values are skipped per line, so a series with no actual values
/// draws only the forecast.
pub fn render_chart_svg(title: &str, series: &ReconciledSeries) -> Result<String, ForecastError> {
    let n = series.len().max(2);
    let (lo, hi) = series.value_range().unwrap_or((0.0, 1.0));
    let pad = if hi > lo { (hi - lo) * 0.05 } else { 1.0 };
    let (y_lo, y_hi) = (lo - pad, hi + pad);

    let actual: Vec<(usize, f64)> = series
        .records()
        .iter()
        .filter_map(|r| r.actual.map(|v| (r.index, v)))
        .collect();
    let forecast: Vec<(usize, f64)> = series
        .records()
        .iter()
        .filter_map(|r| r.forecast.map(|v| (r.index, v)))
        .collect();

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 24))
            .margin(16)
            .x_label_area_size(32)
            .y_label_area_size(56)
            .build_cartesian_2d(0usize..n - 1, y_lo..y_hi)
            .map_err(render_err)?;

        chart
            .configure_mesh()
            .x_desc("day")
            .y_desc("close")
            .draw()
            .map_err(render_err)?;

        if !actual.is_empty() {
            chart
                .draw_series(LineSeries::new(actual, &BLUE))
                .map_err(render_err)?
                .label("Actual")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));
        }
        if !forecast.is_empty() {
            chart
                .draw_series(LineSeries::new(forecast, &RED))
                .map_err(render_err)?
                .label("Forecast")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(render_err)?;

        root.present().map_err(render_err)?;
    }
    Ok(svg)
}

/// Inline `<img>` tag carrying the chart as a base64 data URI.
pub fn chart_img_tag(svg: &str) -> String {
    let data = base64::engine::general_purpose::STANDARD.encode(svg.as_bytes());
    format!("<img src='data:image/svg+xml;base64,{data}'/>")
}
