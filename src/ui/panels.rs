use eframe::egui::{self, Color32, DragValue, RichText, Ui};

use crate::state::{AppState, Tab};

const AGENTS: [&str; 2] = ["Air", "Oxygen"];
const SAMPLES: [&str; 2] = ["TWTS", "Leather scraps"];
const CATALYSTS: [&str; 3] = ["Al-Ni", "Marble dust", "None"];

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
        });

        ui.separator();
        ui.selectable_value(&mut state.tab, Tab::Scatter, "Scatter");
        ui.selectable_value(&mut state.tab, Tab::Predict, "KNN prediction");
        ui.selectable_value(&mut state.tab, Tab::Table, "Data");
        ui.separator();

        let cache = state.cache();
        match &state.snapshot {
            Some(ds) => {
                ui.label(format!(
                    "{}: {} rows, {} columns (reloads: {})",
                    cache.path().display(),
                    ds.len(),
                    ds.columns().len(),
                    cache.reload_count()
                ));
            }
            None => {
                ui.label(cache.path().display().to_string());
            }
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Left side panel – scatter selections
// ---------------------------------------------------------------------------

pub fn scatter_controls(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Scatter");
    ui.separator();

    let Some(snapshot) = state.snapshot.clone() else {
        ui.label("No dataset loaded.");
        return;
    };
    let numeric = snapshot.numeric_column_names();
    let strings = snapshot.string_column_names();
    let request = &mut state.scatter.request;

    ui.strong("X column *");
    required_combo(ui, "scatter_x", &mut request.x, &numeric);
    ui.strong("Y column *");
    required_combo(ui, "scatter_y", &mut request.y, &numeric);

    ui.separator();
    ui.strong("Size (optional)");
    optional_combo(ui, "scatter_size", &mut request.size_col, &numeric);
    ui.strong("Hue (optional)");
    optional_combo(ui, "scatter_hue", &mut request.hue, &strings);
}

fn required_combo(ui: &mut Ui, id: &str, value: &mut String, options: &[&str]) {
    let shown = if value.is_empty() { "Select…" } else { value.as_str() };
    egui::ComboBox::from_id_salt(id)
        .selected_text(shown.to_string())
        .show_ui(ui, |ui: &mut Ui| {
            for &opt in options {
                if ui.selectable_label(*value == opt, opt).clicked() {
                    *value = opt.to_string();
                }
            }
        });
}

fn optional_combo(ui: &mut Ui, id: &str, value: &mut Option<String>, options: &[&str]) {
    let shown = value.clone().unwrap_or_else(|| "(none)".to_string());
    egui::ComboBox::from_id_salt(id)
        .selected_text(shown)
        .show_ui(ui, |ui: &mut Ui| {
            if ui.selectable_label(value.is_none(), "(none)").clicked() {
                *value = None;
            }
            for &opt in options {
                if ui
                    .selectable_label(value.as_deref() == Some(opt), opt)
                    .clicked()
                {
                    *value = Some(opt.to_string());
                }
            }
        });
}

// ---------------------------------------------------------------------------
// Prediction form
// ---------------------------------------------------------------------------

pub fn prediction_form(ui: &mut Ui, state: &mut AppState) {
    ui.heading("KNN prediction");
    ui.separator();

    let input = &mut state.prediction_input;
    egui::Grid::new("prediction_inputs")
        .num_columns(2)
        .spacing([12.0, 6.0])
        .show(ui, |ui: &mut Ui| {
            ui.label("time");
            ui.add(DragValue::new(&mut input.time).speed(1.0));
            ui.end_row();

            ui.label("t_in");
            ui.add(DragValue::new(&mut input.t_in).speed(5.0));
            ui.end_row();

            ui.label("t_pr");
            ui.add(DragValue::new(&mut input.t_pr).speed(5.0));
            ui.end_row();

            ui.label("q_agent");
            ui.add(DragValue::new(&mut input.q_agent).speed(0.0001).max_decimals(4));
            ui.end_row();

            ui.label("agent_type");
            choice_combo(ui, "agent_type", &mut input.agent_type, &AGENTS);
            ui.end_row();

            ui.label("sample_type");
            choice_combo(ui, "sample_type", &mut input.sample_type, &SAMPLES);
            ui.end_row();

            ui.label("catalyst_type");
            if choice_combo(ui, "catalyst_type", &mut input.catalyst_type, &CATALYSTS)
                && input.catalyst_type == "None"
            {
                input.catalyst_rate = 0.0;
            }
            ui.end_row();

            ui.label("catalyst_rate");
            ui.add_enabled(
                input.catalyst_type != "None",
                DragValue::new(&mut input.catalyst_rate)
                    .speed(1.0)
                    .range(0.0..=f64::MAX),
            );
            ui.end_row();
        });

    ui.add_space(8.0);
    if ui.button("Predict").clicked() {
        state.run_prediction();
    }

    if let Some(resp) = &state.prediction {
        ui.separator();
        ui.strong("Results");
        let d = &resp.data;
        egui::Grid::new("prediction_results")
            .num_columns(2)
            .striped(true)
            .show(ui, |ui: &mut Ui| {
                for (label, value) in [
                    ("H₂ %", d.h2_perc),
                    ("CO %", d.co_perc),
                    ("CO₂ %", d.co2_perc),
                    ("CH₄ %", d.ch4_perc),
                    ("O₂ %", d.o2_perc),
                    ("Calorific value", d.calorific_value),
                ] {
                    ui.label(label);
                    ui.label(RichText::new(format!("{value:.3}")).strong());
                    ui.end_row();
                }
            });
        ui.label(RichText::new(&resp.message).weak());
    }
}

/// Returns `true` when the selection changed.
fn choice_combo(ui: &mut Ui, id: &str, value: &mut String, options: &[&str]) -> bool {
    let mut changed = false;
    egui::ComboBox::from_id_salt(id)
        .selected_text(value.clone())
        .show_ui(ui, |ui: &mut Ui| {
            for &opt in options {
                if ui.selectable_label(*value == opt, opt).clicked() && *value != opt {
                    *value = opt.to_string();
                    changed = true;
                }
            }
        });
    changed
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open gasification dataset")
        .add_filter("Supported files", &["parquet", "pq", "csv", "txt"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("Delimited text", &["csv", "txt"])
        .pick_file();

    if let Some(path) = file {
        state.open_dataset(path);
    }
}
