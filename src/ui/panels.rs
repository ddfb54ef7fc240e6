use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use rfm_dashboard::data::export::{export_file, EXPORT_FILE_NAME};
use rfm_dashboard::{FilterSpec, Interval, LabelingMode};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – mode and filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Segmentation");
    ui.separator();

    let mut mode = state.mode;
    egui::ComboBox::from_id_salt("labeling_mode")
        .selected_text(mode.to_string())
        .show_ui(ui, |ui: &mut Ui| {
            for candidate in LabelingMode::ALL {
                ui.selectable_value(&mut mode, candidate, candidate.to_string());
            }
        });
    if mode != state.mode {
        state.set_mode(mode);
    }

    ui.add_space(8.0);
    ui.heading("Filters");
    ui.separator();

    if state.table.is_none() {
        ui.label("No dataset loaded.");
        return;
    }

    if ui.small_button("Reset filters").clicked() {
        state.reset_filter();
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| match state.mode {
            LabelingMode::ScoreBased => range_filters(ui, state),
            LabelingMode::ClusterBased => cluster_filters(ui, state),
        });
}

fn range_filters(ui: &mut Ui, state: &mut AppState) {
    let Some(bounds) = state.bounds else {
        return;
    };
    let Some(FilterSpec::Ranges(ranges)) = &mut state.filter else {
        return;
    };

    let mut changed = false;
    changed |= interval_sliders(ui, "Recency", &mut ranges.recency, bounds.recency);
    changed |= interval_sliders(ui, "Frequency", &mut ranges.frequency, bounds.frequency);
    changed |= interval_sliders(ui, "Monetary", &mut ranges.monetary, bounds.monetary);

    // Recompute visible indices after any slider change.
    if changed {
        state.refilter();
    }
}

/// A min and a max slider over the observed range. Returns whether either moved.
fn interval_sliders(ui: &mut Ui, name: &str, interval: &mut Interval, bounds: Interval) -> bool {
    ui.strong(format!("{name} range"));
    let range = bounds.min..=bounds.max;
    let min_changed = ui
        .add(egui::Slider::new(&mut interval.min, range.clone()).text("min"))
        .changed();
    let max_changed = ui
        .add(egui::Slider::new(&mut interval.max, range).text("max"))
        .changed();

    // Keep the interval non-empty; the slider that moved wins.
    if interval.min > interval.max {
        if min_changed {
            interval.max = interval.min;
        } else {
            interval.min = interval.max;
        }
    }
    ui.add_space(4.0);
    min_changed || max_changed
}

fn cluster_filters(ui: &mut Ui, state: &mut AppState) {
    let Some(table) = &state.table else {
        return;
    };
    let clusters = table.clusters.clone();

    let n_selected = match &state.filter {
        Some(FilterSpec::Clusters(selection)) => selection.selected.len(),
        _ => 0,
    };
    ui.strong(format!("Cluster  ({n_selected}/{})", clusters.len()));

    // Select all / none buttons
    ui.horizontal(|ui: &mut Ui| {
        if ui.small_button("All").clicked() {
            state.select_all_clusters();
        }
        if ui.small_button("None").clicked() {
            state.select_no_clusters();
        }
    });

    for cluster in &clusters {
        let mut checked = matches!(
            &state.filter,
            Some(FilterSpec::Clusters(selection)) if selection.contains(cluster)
        );

        let label = rfm_dashboard::Label::Cluster(cluster.clone());
        let mut text = RichText::new(label.to_string());
        if let Some(cm) = &state.color_map {
            text = text.color(cm.color_for(&label));
        }

        if ui.checkbox(&mut checked, text).changed() {
            state.toggle_cluster(cluster);
        }
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            let can_export = state.table.is_some();
            if ui
                .add_enabled(can_export, egui::Button::new("Export CSV…"))
                .clicked()
            {
                save_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if state.loading {
            ui.spinner();
        }

        if let Some(table) = &state.table {
            ui.label(format!(
                "{} customers loaded, {} visible",
                table.len(),
                state.visible_indices.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open RFM data")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    let Some(path) = file else {
        return;
    };

    state.loading = true;
    let loaded = rfm_dashboard::data::loader::load_file(&path)
        .and_then(|table| state.set_dataset(table));
    if let Err(e) = loaded {
        log::error!("Failed to load {}: {e}", path.display());
        state.status_message = Some(format!("Error: {e}"));
        state.loading = false;
    }
}

pub fn save_file_dialog(state: &mut AppState) {
    let Some(table) = &state.table else {
        return;
    };
    let file = rfd::FileDialog::new()
        .set_title("Export segmented data")
        .set_file_name(EXPORT_FILE_NAME)
        .add_filter("CSV", &["csv"])
        .save_file();

    if let Some(path) = file {
        if let Err(e) = export_file(table, &path) {
            log::error!("Failed to export: {e}");
            state.status_message = Some(format!("Error: {e}"));
        }
    }
}
