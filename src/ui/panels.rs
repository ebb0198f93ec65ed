use eframe::egui::{self, Color32, RichText, Ui};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu and the year-range selectors.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open databank…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Use statistics API").clicked() {
                state.use_api();
                ui.close_menu();
            }
            ui.separator();
            if ui.button("Reload charts").clicked() {
                state.refresh();
                ui.close_menu();
            }
        });

        ui.separator();
        year_selectors(ui, state);

        if state.is_refreshing() {
            ui.separator();
            ui.spinner();
        }
    });
}

fn year_selectors(ui: &mut Ui, state: &mut AppState) {
    let filter = *state.filter();

    ui.label("From");
    let mut start = filter.start();
    egui::ComboBox::from_id_salt("start_year")
        .selected_text(start.to_string())
        .width(70.0)
        .show_ui(ui, |ui: &mut Ui| {
            for year in filter.start_options() {
                ui.selectable_value(&mut start, year, year.to_string());
            }
        });
    if start != filter.start() {
        state.set_start(start);
    }

    // Options follow the start year, which may just have changed.
    let filter = *state.filter();
    ui.label("to");
    let mut end = filter.end();
    egui::ComboBox::from_id_salt("end_year")
        .selected_text(end.to_string())
        .width(70.0)
        .show_ui(ui, |ui: &mut Ui| {
            for year in filter.end_options() {
                ui.selectable_value(&mut end, year, year.to_string());
            }
        });
    if end != filter.end() {
        state.set_end(end);
    }
}

// ---------------------------------------------------------------------------
// Status line
// ---------------------------------------------------------------------------

pub fn status_bar(ui: &mut Ui, state: &AppState) {
    ui.horizontal(|ui: &mut Ui| {
        ui.label(state.source_description());
        ui.separator();
        let filter = state.filter();
        if filter.is_filtered() {
            ui.label(format!("Years {}", filter.effective_range()));
        } else {
            ui.label(format!("All years ({})", filter.effective_range()));
        }
        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open databank export")
        .add_filter("Supported files", &["parquet", "pq", "json", "csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"])
        .add_filter("CSV", &["csv"])
        .pick_file();

    if let Some(path) = file {
        state.open_databank(&path);
    }
}
