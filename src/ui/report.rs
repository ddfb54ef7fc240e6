use eframe::egui::{self, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};
use rfm_dashboard::data::aggregate::{grouped_values, LabelMeans, Metric, Summary};
use rfm_dashboard::data::export::{cell_text, export_columns};
use rfm_dashboard::{CustomerTable, LabelingMode};

use super::plot;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Central panel – metrics, charts and the filtered table
// ---------------------------------------------------------------------------

/// Render the dashboard in the central panel.
pub fn central_panel(ui: &mut Ui, state: &AppState) {
    let (Some(table), Some(report)) = (&state.table, &state.report) else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open an RFM file to begin  (File → Open…)");
        });
        return;
    };
    let color_map = state.color_map.as_ref();
    let visible = &state.visible_indices;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.heading("RFM Customer Segmentation");
            ui.label("Customer behaviour by Recency, Frequency and Monetary value.");
            ui.add_space(8.0);

            let group_name = match state.mode {
                LabelingMode::ScoreBased => "Segment",
                LabelingMode::ClusterBased => "Cluster",
            };

            ui.heading(format!("{group_name} overview"));
            metrics_row(ui, state.mode, table, &report.overall, visible.len());
            plot::distribution_chart(ui, "label_distribution", &report.overall.counts, color_map);

            ui.add_space(8.0);
            ui.heading(format!("Average RFM by {}", group_name.to_lowercase()));
            means_grid(ui, &report.overall.means);

            ui.add_space(8.0);
            ui.heading("RFM distributions");
            if visible.is_empty() {
                ui.label(RichText::new("No customers match the current filters.").italics());
                return;
            }
            for metric in Metric::ALL {
                let values = metric.values(table, visible);
                plot::histogram_chart(ui, &format!("hist_{}", metric.name()), metric.name(), &values);
            }

            if state.mode == LabelingMode::ClusterBased {
                ui.add_space(8.0);
                ui.heading("Monetary by cluster");
                let groups: Vec<_> =
                    grouped_values(table, visible, state.mode, Metric::Monetary).into_iter().collect();
                plot::box_chart(ui, "monetary_by_cluster", Metric::Monetary.name(), &groups, color_map);
            }

            ui.add_space(8.0);
            ui.heading(format!("Filtered customers ({})", visible.len()));
            data_table(ui, table, visible);
        });
}

fn metric_tile(ui: &mut Ui, caption: &str, value: usize) {
    ui.vertical(|ui: &mut Ui| {
        ui.label(caption);
        ui.label(RichText::new(value.to_string()).size(24.0).strong());
    });
}

fn metrics_row(ui: &mut Ui, mode: LabelingMode, table: &CustomerTable, summary: &Summary, visible: usize) {
    let m = &summary.metrics;
    ui.columns(4, |cols: &mut [Ui]| match mode {
        LabelingMode::ScoreBased => {
            metric_tile(&mut cols[0], "Total Customers", m.total);
            metric_tile(&mut cols[1], "Best Customers", m.best_customers);
            metric_tile(&mut cols[2], "Loyal Customers", m.loyal_customers);
            metric_tile(&mut cols[3], "At Risk", m.at_risk);
        }
        LabelingMode::ClusterBased => {
            metric_tile(&mut cols[0], "Total Customers", m.total);
            metric_tile(&mut cols[1], "Clusters", table.clusters.len());
            metric_tile(&mut cols[2], "Visible Customers", visible);
            metric_tile(&mut cols[3], "Largest Cluster", summary.counts.iter().map(|c| c.count).max().unwrap_or(0));
        }
    });
}

fn means_grid(ui: &mut Ui, means: &[LabelMeans]) {
    let fmt = |v: Option<f64>| v.map_or_else(|| "–".to_string(), |v| format!("{v:.2}"));

    egui::Grid::new("label_means")
        .striped(true)
        .num_columns(5)
        .show(ui, |ui: &mut Ui| {
            for header in ["", "Customers", "Recency", "Frequency", "Monetary"] {
                ui.strong(header);
            }
            ui.end_row();

            for row in means {
                ui.label(row.label.to_string());
                ui.label(row.count.to_string());
                ui.label(fmt(row.recency));
                ui.label(fmt(row.frequency));
                ui.label(fmt(row.monetary));
                ui.end_row();
            }
        });
}

fn data_table(ui: &mut Ui, table: &CustomerTable, visible: &[usize]) {
    let columns = export_columns(table);

    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .vscroll(true)
        .max_scroll_height(320.0)
        .columns(Column::auto().at_least(60.0), columns.len())
        .header(20.0, |mut header| {
            for col in &columns {
                header.col(|ui: &mut Ui| {
                    ui.strong(col);
                });
            }
        })
        .body(|body| {
            body.rows(18.0, visible.len(), |mut row| {
                let rec = &table.records[visible[row.index()]];
                for col in &columns {
                    row.col(|ui: &mut Ui| {
                        ui.label(cell_text(table, rec, col));
                    });
                }
            });
        });
}
