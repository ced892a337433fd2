use std::time::Duration;

use eframe::egui;

use crate::state::{AppState, Tab};
use crate::ui::{panels, plot, table};

/// How often the viewer re-checks the dataset file while idle.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct GasviewApp {
    pub state: AppState,
}

impl GasviewApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for GasviewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Every frame is one request against the dataset cache.
        self.state.refresh();

        // ---- Top panel: menu bar + tabs ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        match self.state.tab {
            Tab::Scatter => {
                egui::SidePanel::left("scatter_controls")
                    .default_width(220.0)
                    .resizable(true)
                    .show(ctx, |ui| {
                        panels::scatter_controls(ui, &mut self.state);
                    });
                egui::CentralPanel::default().show(ctx, |ui| {
                    plot::scatter_plot(ui, &mut self.state);
                });
            }
            Tab::Predict => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    panels::prediction_form(ui, &mut self.state);
                });
            }
            Tab::Table => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    table::preview(ui, &self.state);
                });
            }
        }

        ctx.request_repaint_after(POLL_INTERVAL);
    }
}
