use eframe::egui::{ScrollArea, Ui};
use egui_extras::{Column as TableColumn, TableBuilder};

use crate::state::AppState;

/// Rows shown in the data preview.
const PREVIEW_ROWS: usize = 500;

/// Read-only preview of the first rows of the current snapshot.
pub fn preview(ui: &mut Ui, state: &AppState) {
    let Some(snapshot) = &state.snapshot else {
        ui.label("No dataset loaded.");
        return;
    };

    let shown = snapshot.len().min(PREVIEW_ROWS);
    ui.label(format!("Showing {shown} of {} rows", snapshot.len()));
    ui.separator();

    let columns = snapshot.columns();
    ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .columns(TableColumn::auto().at_least(60.0), columns.len())
            .header(20.0, |mut header| {
                for col in columns {
                    header.col(|ui| {
                        ui.strong(&col.name).on_hover_text(col.column_type().to_string());
                    });
                }
            })
            .body(|body| {
                body.rows(18.0, shown, |mut row| {
                    let i = row.index();
                    for col in columns {
                        row.col(|ui| {
                            ui.label(col.values.get(i).to_string());
                        });
                    }
                });
            });
    });
}
