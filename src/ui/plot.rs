use eframe::egui::{Color32, Stroke, Ui};
use egui_plot::{Bar, BarChart, BoxElem, BoxPlot, BoxSpread as PlotSpread, Legend, Plot};
use rfm_dashboard::data::aggregate::{box_spread, histogram, LabelCount, DEFAULT_HISTOGRAM_BINS};
use rfm_dashboard::Label;

use crate::color::ColorMap;

const PLOT_HEIGHT: f32 = 220.0;

fn color_of(color_map: Option<&ColorMap>, label: &Label) -> Color32 {
    color_map.map_or(Color32::LIGHT_BLUE, |cm| cm.color_for(label))
}

// ---------------------------------------------------------------------------
// Label distribution
// ---------------------------------------------------------------------------

/// One bar per label, named so the legend doubles as the axis.
pub fn distribution_chart(ui: &mut Ui, id: &str, counts: &[LabelCount], color_map: Option<&ColorMap>) {
    Plot::new(id)
        .legend(Legend::default())
        .height(PLOT_HEIGHT)
        .y_axis_label("Customers")
        .show_x(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for (i, entry) in counts.iter().enumerate() {
                let name = entry.label.to_string();
                let color = color_of(color_map, &entry.label);
                let bar = Bar::new(i as f64, entry.count as f64)
                    .width(0.7)
                    .name(&name)
                    .fill(color);
                plot_ui.bar_chart(BarChart::new(vec![bar]).name(&name).color(color));
            }
        });
}

// ---------------------------------------------------------------------------
// Metric histograms
// ---------------------------------------------------------------------------

/// Histogram of one metric over the filtered customers.
pub fn histogram_chart(ui: &mut Ui, id: &str, metric_name: &str, values: &[f64]) {
    let bins = histogram(values, DEFAULT_HISTOGRAM_BINS);
    let bars: Vec<Bar> = bins
        .iter()
        .map(|bin| {
            // A constant column yields one zero-width bin.
            let width = if bin.end > bin.start { bin.end - bin.start } else { 1.0 };
            Bar::new((bin.start + bin.end) / 2.0, bin.count as f64).width(width)
        })
        .collect();

    Plot::new(id)
        .height(PLOT_HEIGHT)
        .x_axis_label(metric_name)
        .y_axis_label("Customers")
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(
                BarChart::new(bars)
                    .name(format!("{metric_name} distribution"))
                    .color(Color32::LIGHT_BLUE),
            );
        });
}

// ---------------------------------------------------------------------------
// Per-label box plot
// ---------------------------------------------------------------------------

/// Box plot of one metric per label, for the cluster view.
pub fn box_chart(
    ui: &mut Ui,
    id: &str,
    metric_name: &str,
    groups: &[(Label, Vec<f64>)],
    color_map: Option<&ColorMap>,
) {
    Plot::new(id)
        .legend(Legend::default())
        .height(PLOT_HEIGHT)
        .y_axis_label(metric_name)
        .show_x(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for (i, (label, values)) in groups.iter().enumerate() {
                let Some(spread) = box_spread(values) else {
                    continue;
                };
                let name = label.to_string();
                let color = color_of(color_map, label);
                let elem = BoxElem::new(
                    i as f64,
                    PlotSpread::new(spread.min, spread.q1, spread.median, spread.q3, spread.max),
                )
                .name(&name)
                .box_width(0.6)
                .fill(color.gamma_multiply(0.4))
                .stroke(Stroke::new(1.5, color));
                plot_ui.box_plot(BoxPlot::new(vec![elem]).name(&name).color(color));
            }
        });
}

