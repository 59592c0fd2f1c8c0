use eframe::egui::{pos2, vec2, Align2, Color32, FontId, Rect, Sense, Stroke, Ui};
use egui_plot::{Bar, BarChart, GridMark, Legend, Line, Plot, PlotPoints};

use crate::color::{heat_color, ColorMap};
use crate::data::aggregate::{CategoryCount, HourlyHeatmap, PeriodCounts, WEEKDAYS};

// ---------------------------------------------------------------------------
// Category bar chart
// ---------------------------------------------------------------------------

/// Bar chart of category counts, one coloured bar per category.
pub fn category_bar_chart(ui: &mut Ui, id: &str, counts: &[CategoryCount], colors: &ColorMap) {
    let bars: Vec<Bar> = counts
        .iter()
        .enumerate()
        .map(|(i, c)| {
            Bar::new(i as f64, c.count as f64)
                .name(&c.label)
                .fill(colors.color_for(&c.label))
                .width(0.6)
        })
        .collect();
    let labels: Vec<String> = counts.iter().map(|c| c.label.clone()).collect();

    Plot::new(id.to_string())
        .legend(Legend::default())
        .y_axis_label("Count")
        .x_axis_formatter(move |mark: GridMark, _range: &std::ops::RangeInclusive<f64>| axis_label(&labels, mark))
        .show_grid(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars));
        });
}

// ---------------------------------------------------------------------------
// Period / frequency charts
// ---------------------------------------------------------------------------

/// Line chart of chronologically ordered bucket counts.
pub fn frequency_line(ui: &mut Ui, id: &str, series: &PeriodCounts) {
    let points: PlotPoints = series
        .buckets
        .iter()
        .enumerate()
        .map(|(i, b)| [i as f64, b.count as f64])
        .collect();
    let labels: Vec<String> = series.buckets.iter().map(|b| b.label.clone()).collect();

    Plot::new(id.to_string())
        .y_axis_label("Count")
        .x_axis_formatter(move |mark: GridMark, _range: &std::ops::RangeInclusive<f64>| axis_label(&labels, mark))
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new(points).color(Color32::LIGHT_BLUE).width(1.5));
        });
}

/// Yearly trend: one bar per bucket with a connecting line, matching the
/// combined product-trend figure of the original dashboard.
pub fn trend_chart(ui: &mut Ui, id: &str, series: &PeriodCounts) {
    let bars: Vec<Bar> = series
        .buckets
        .iter()
        .enumerate()
        .map(|(i, b)| {
            Bar::new(i as f64, b.count as f64)
                .name(&b.label)
                .fill(Color32::from_rgb(50, 171, 96).gamma_multiply(0.7))
                .width(0.8)
        })
        .collect();
    let points: PlotPoints = series
        .buckets
        .iter()
        .enumerate()
        .map(|(i, b)| [i as f64, b.count as f64])
        .collect();
    let labels: Vec<String> = series.buckets.iter().map(|b| b.label.clone()).collect();

    Plot::new(id.to_string())
        .y_axis_label("Number of products")
        .x_axis_formatter(move |mark: GridMark, _range: &std::ops::RangeInclusive<f64>| axis_label(&labels, mark))
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars));
            plot_ui.line(Line::new(points).color(Color32::LIGHT_BLUE).width(1.0));
        });
}

/// Map an integer grid mark back to its bucket label; fractional marks get
/// no label.
fn axis_label(labels: &[String], mark: GridMark) -> String {
    let idx = mark.value.round();
    if (mark.value - idx).abs() > f64::EPSILON || idx < 0.0 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Weekday × hour heatmap
// ---------------------------------------------------------------------------

const CELL: f32 = 30.0;
const LEFT_MARGIN: f32 = 82.0;
const BOTTOM_MARGIN: f32 = 24.0;

/// Painter-drawn heatmap grid: 13 opening-hour slots across, seven weekdays
/// down, cell colour scaled to the maximum count. Hovering a cell shows its
/// exact count.
pub fn heatmap_grid(ui: &mut Ui, heatmap: &HourlyHeatmap) {
    let slots = heatmap.hour_labels.len();
    let size = vec2(
        LEFT_MARGIN + CELL * slots as f32,
        CELL * WEEKDAYS.len() as f32 + BOTTOM_MARGIN,
    );
    let (response, painter) = ui.allocate_painter(size, Sense::hover());
    let origin = response.rect.min;
    let max = heatmap.max_count().max(1) as f32;

    for (day, row) in heatmap.counts.iter().enumerate() {
        for (slot, &count) in row.iter().enumerate() {
            let cell = Rect::from_min_size(
                pos2(
                    origin.x + LEFT_MARGIN + CELL * slot as f32,
                    origin.y + CELL * day as f32,
                ),
                vec2(CELL, CELL),
            )
            .shrink(1.0);
            painter.rect_filled(cell, 2.0, heat_color(count as f32 / max));
        }
    }

    let text_color = ui.visuals().text_color();
    for (day, name) in WEEKDAYS.iter().enumerate() {
        painter.text(
            pos2(
                origin.x + LEFT_MARGIN - 6.0,
                origin.y + CELL * day as f32 + CELL / 2.0,
            ),
            Align2::RIGHT_CENTER,
            name,
            FontId::proportional(12.0),
            text_color,
        );
    }
    for (slot, label) in heatmap.hour_labels.iter().enumerate() {
        // Every other label, so they fit under the cells.
        if slot % 2 == 0 {
            painter.text(
                pos2(
                    origin.x + LEFT_MARGIN + CELL * slot as f32 + CELL / 2.0,
                    origin.y + CELL * WEEKDAYS.len() as f32 + 4.0,
                ),
                Align2::CENTER_TOP,
                label,
                FontId::proportional(11.0),
                text_color,
            );
        }
    }
    painter.rect_stroke(
        Rect::from_min_size(
            pos2(origin.x + LEFT_MARGIN, origin.y),
            vec2(CELL * slots as f32, CELL * WEEKDAYS.len() as f32),
        ),
        2.0,
        Stroke::new(1.0, ui.visuals().weak_text_color()),
        eframe::egui::StrokeKind::Outside,
    );

    if let Some(pos) = response.hover_pos() {
        let grid = pos - origin - vec2(LEFT_MARGIN, 0.0);
        let slot = (grid.x / CELL).floor() as isize;
        let day = (grid.y / CELL).floor() as isize;
        if (0..slots as isize).contains(&slot) && (0..WEEKDAYS.len() as isize).contains(&day) {
            let count = heatmap.counts[day as usize][slot as usize];
            response.on_hover_text(format!(
                "{} {}: {} consultations",
                WEEKDAYS[day as usize], heatmap.hour_labels[slot as usize], count
            ));
        }
    }
}
