use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::FontTransform;

use crate::config::PipelineConfig;
use crate::table::WideMatrix;

/// RdBu diverging colormap anchors (red → white → blue), matching the
/// matplotlib palette the chart is calibrated against.
const RDBU_ANCHORS: [(u8, u8, u8); 5] = [
    (103, 0, 31),
    (214, 96, 77),
    (247, 247, 247),
    (67, 147, 195),
    (5, 48, 97),
];

/// Map a value to the diverging scale fixed to `[vmin, vmax]`.
/// Values outside the range clamp to the red/blue extremes.
pub fn diverging_color(value: f64, vmin: f64, vmax: f64) -> RGBColor {
    let t = if vmax > vmin {
        ((value - vmin) / (vmax - vmin)).clamp(0.0, 1.0)
    } else {
        0.5
    };
    let scaled = t * (RDBU_ANCHORS.len() - 1) as f64;
    let idx = (scaled.floor() as usize).min(RDBU_ANCHORS.len() - 2);
    let frac = scaled - idx as f64;
    let (r0, g0, b0) = RDBU_ANCHORS[idx];
    let (r1, g1, b1) = RDBU_ANCHORS[idx + 1];
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
    RGBColor(lerp(r0, r1), lerp(g0, g1), lerp(b0, b1))
}

/// Resolve the configured annotation table against the filtered matrix.
///
/// Models that did not survive filtering are simply absent from the result;
/// a configured name that is missing must never abort rendering or affect
/// the other annotations.
pub fn resolve_annotations<'a>(
    matrix: &WideMatrix,
    known_models: &'a [(String, (f64, f64))],
) -> Vec<(usize, &'a str, (f64, f64))> {
    let mut resolved = Vec::new();
    for (name, offset) in known_models {
        match matrix.row_index(name) {
            Some(row) => resolved.push((row, name.as_str(), *offset)),
            None => println!("⚠️  Model '{}' not in filtered data, skipping label", name),
        }
    }
    resolved
}

/// Sampled quadratic Bézier from the label position to the point, bowing
/// sideways like matplotlib's `arc3` connection style.
fn leader_line_points(from: (f64, f64), to: (f64, f64), bend: f64) -> Vec<(f64, f64)> {
    let mid = ((from.0 + to.0) / 2.0, (from.1 + to.1) / 2.0);
    let control = (
        mid.0 - (to.1 - from.1) * bend,
        mid.1 + (to.0 - from.0) * bend,
    );

    let steps = 24;
    (0..=steps)
        .map(|step| {
            let t = step as f64 / steps as f64;
            let u = 1.0 - t;
            (
                u * u * from.0 + 2.0 * u * t * control.0 + t * t * to.0,
                u * u * from.1 + 2.0 * u * t * control.1 + t * t * to.1,
            )
        })
        .collect()
}

/// Render the embedding map: one point per surviving model colored by mean
/// correlation, a colorbar on the right, and labels with curved leader
/// lines for the configured models of interest. Axes stay hidden since
/// embedding units are not meaningful.
pub fn plot_model_map(
    coords: &[(f64, f64)],
    mean_corrs: &[f64],
    matrix: &WideMatrix,
    config: &PipelineConfig,
    output_path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(output_path, (1200, 900)).into_drawing_area();
    root.fill(&WHITE)?;

    let (plot_area, bar_area) = root.split_horizontally(1040);

    let annotations = resolve_annotations(matrix, &config.known_models);

    // The chart range has to cover both the points and the label offsets.
    let mut extents: Vec<(f64, f64)> = coords.to_vec();
    for (row, _, (dx, dy)) in &annotations {
        let (x, y) = coords[*row];
        extents.push((x + dx, y + dy));
    }
    let (x_range, y_range) = padded_ranges(&extents);
    let x_extent = x_range.end - x_range.start;

    let mut chart = ChartBuilder::on(&plot_area)
        .caption("Model embedding map", ("sans-serif", 30).into_font())
        .margin(30)
        .build_cartesian_2d(x_range, y_range)?;

    chart.draw_series(coords.iter().zip(mean_corrs.iter()).map(|((x, y), corr)| {
        Circle::new(
            (*x, *y),
            4,
            diverging_color(*corr, config.color_min, config.color_max).filled(),
        )
    }))?;

    let label_font = ("sans-serif", 14)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center));
    for (row, name, (dx, dy)) in &annotations {
        let point = coords[*row];
        let label_pos = (point.0 + dx, point.1 + dy);

        let curve = leader_line_points(label_pos, point, 0.2);
        let tip = arrow_head(&curve, x_extent);
        chart.draw_series(std::iter::once(PathElement::new(
            curve,
            BLACK.stroke_width(1),
        )))?;
        chart.draw_series(std::iter::once(Polygon::new(tip, BLACK.filled())))?;
        chart.draw_series(std::iter::once(Text::new(
            name.to_string(),
            label_pos,
            label_font.clone(),
        )))?;
    }

    draw_colorbar(&bar_area, config.color_min, config.color_max)?;

    root.present()?;
    println!("📊 Model map saved to: {}", output_path);
    Ok(())
}

/// Triangular arrow head at the end of the leader curve, sized relative to
/// the chart extent.
fn arrow_head(curve: &[(f64, f64)], extent: f64) -> Vec<(f64, f64)> {
    let tip = curve[curve.len() - 1];
    let prev = curve[curve.len() - 2];
    let (mut dx, mut dy) = (tip.0 - prev.0, tip.1 - prev.1);
    let len = (dx * dx + dy * dy).sqrt().max(1e-12);
    dx /= len;
    dy /= len;

    let size = extent * 0.015;
    let base = (tip.0 - dx * size, tip.1 - dy * size);
    let half = size * 0.5;
    vec![
        tip,
        (base.0 - dy * half, base.1 + dx * half),
        (base.0 + dy * half, base.1 - dx * half),
    ]
}

fn padded_ranges(points: &[(f64, f64)]) -> (std::ops::Range<f64>, std::ops::Range<f64>) {
    let pad_range = |min: f64, max: f64| {
        if min.is_finite() && max.is_finite() && max > min {
            let pad = (max - min) * 0.08;
            (min - pad)..(max + pad)
        } else {
            let center = if min.is_finite() { min } else { 0.0 };
            (center - 1.0)..(center + 1.0)
        }
    };

    let x_min = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let x_max = points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let y_min = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let y_max = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);

    (pad_range(x_min, x_max), pad_range(y_min, y_max))
}

/// Vertical colorbar strip with min/mid/max ticks and a fixed label.
fn draw_colorbar<DB: DrawingBackend>(
    area: &DrawingArea<DB, plotters::coord::Shift>,
    vmin: f64,
    vmax: f64,
) -> Result<(), Box<dyn std::error::Error>>
where
    DB::ErrorType: 'static,
{
    let mut chart = ChartBuilder::on(area)
        .margin_top(120)
        .margin_bottom(120)
        .margin_left(10)
        .margin_right(10)
        .build_cartesian_2d(0.0f64..1.0f64, vmin..vmax)?;

    let strips = 64;
    let step = (vmax - vmin) / strips as f64;
    chart.draw_series((0..strips).map(|i| {
        let lo = vmin + i as f64 * step;
        let hi = lo + step;
        Rectangle::new(
            [(0.0, lo), (0.3, hi)],
            diverging_color((lo + hi) / 2.0, vmin, vmax).filled(),
        )
    }))?;

    let tick_font = ("sans-serif", 12)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Left, VPos::Center));
    let mid = (vmin + vmax) / 2.0;
    for value in [vmin, mid, vmax] {
        chart.draw_series(std::iter::once(Text::new(
            format!("{:.2}", value),
            (0.38, value),
            tick_font.clone(),
        )))?;
    }

    let label_font = ("sans-serif", 14)
        .into_font()
        .transform(FontTransform::Rotate270)
        .color(&BLACK);
    chart.draw_series(std::iter::once(Text::new(
        "Mean end-of-round correlation".to_string(),
        (0.95, vmin),
        label_font,
    )))?;

    Ok(())
}
