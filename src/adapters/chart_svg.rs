//! SVG rendering of cumulative strategy returns.

use crate::domain::backtest::{StrategyRun, cumulative_returns};
use crate::domain::error::RiskbalError;
use std::fs;
use std::path::Path;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 400.0;
const PADDING: f64 = 50.0;
const LEGEND_WIDTH: f64 = 180.0;

const PALETTE: [&str; 8] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
];

/// One polyline per run over its compounded return path. Non-finite points
/// are left out of the line.
pub fn format_cumulative_chart(runs: &[StrategyRun]) -> String {
    let paths: Vec<Vec<f64>> = runs.iter().map(|r| cumulative_returns(&r.returns)).collect();
    let finite = || paths.iter().flatten().copied().filter(|v| v.is_finite());

    let Some(first) = finite().next() else {
        return format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH:.0}" height="{HEIGHT:.0}"><text x="{PADDING:.0}" y="{PADDING:.0}">No return data available.</text></svg>"#
        );
    };
    let min = finite().fold(first.min(0.0), f64::min);
    let max = finite().fold(first.max(0.0), f64::max);

    let plot_width = WIDTH - 2.0 * PADDING - LEGEND_WIDTH;
    let plot_height = HEIGHT - 2.0 * PADDING;
    let range = max - min;
    let scale_y = if range > 0.0 { plot_height / range } else { 1.0 };
    let longest = paths.iter().map(Vec::len).max().unwrap_or(0);
    let scale_x = if longest > 1 {
        plot_width / (longest - 1) as f64
    } else {
        0.0
    };
    let y_of = |v: f64| HEIGHT - PADDING - (v - min) * scale_y;

    let mut svg = format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH:.0}" height="{HEIGHT:.0}" viewBox="0 0 {WIDTH:.0} {HEIGHT:.0}">
<rect width="100%" height="100%" fill="white"/>
<text x="{PADDING:.0}" y="{:.0}" font-size="14">Cumulative Returns</text>
<line x1="{PADDING:.0}" y1="{PADDING:.0}" x2="{PADDING:.0}" y2="{:.1}" stroke="black"/>
<line x1="{PADDING:.0}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="black"/>
<line x1="{PADDING:.0}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="#cccccc" stroke-dasharray="4"/>
<text x="5" y="{:.1}" font-size="10">{:.1}%</text>
<text x="5" y="{:.1}" font-size="10">{:.1}%</text>
"##,
        PADDING / 2.0,
        HEIGHT - PADDING,
        HEIGHT - PADDING,
        PADDING + plot_width,
        HEIGHT - PADDING,
        y_of(0.0),
        PADDING + plot_width,
        y_of(0.0),
        y_of(max) + 4.0,
        max * 100.0,
        y_of(min),
        min * 100.0,
    );

    for (i, (run, path)) in runs.iter().zip(&paths).enumerate() {
        let colour = PALETTE[i % PALETTE.len()];
        let points: Vec<String> = path
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_finite())
            .map(|(x, v)| format!("{:.1},{:.1}", PADDING + x as f64 * scale_x, y_of(*v)))
            .collect();
        svg.push_str(&format!(
            "<polyline fill=\"none\" stroke=\"{colour}\" stroke-width=\"1.5\" points=\"{}\"/>\n",
            points.join(" ")
        ));

        let legend_x = WIDTH - LEGEND_WIDTH;
        let legend_y = PADDING + 16.0 * i as f64;
        svg.push_str(&format!(
            "<line x1=\"{legend_x:.0}\" y1=\"{legend_y:.0}\" x2=\"{:.0}\" y2=\"{legend_y:.0}\" stroke=\"{colour}\" stroke-width=\"2\"/>\n\
             <text x=\"{:.0}\" y=\"{:.0}\" font-size=\"10\">{}</text>\n",
            legend_x + 20.0,
            legend_x + 25.0,
            legend_y + 4.0,
            run.id
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

pub fn write_cumulative_chart(path: &Path, runs: &[StrategyRun]) -> Result<(), RiskbalError> {
    fs::write(path, format_cumulative_chart(runs))?;
    Ok(())
}
