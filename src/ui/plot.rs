use std::collections::BTreeMap;

use eframe::egui::{Color32, RichText, Ui};
use egui_plot::{Legend, MarkerShape, Plot, PlotPoints, Points};

use crate::scatter::ScatterFigure;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Scatter plot (central panel)
// ---------------------------------------------------------------------------

/// Render the scatter plot for the current selections.
pub fn scatter_plot(ui: &mut Ui, state: &mut AppState) {
    let Some(snapshot) = state.snapshot.clone() else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("No dataset loaded  (File → Open…)");
        });
        return;
    };

    match state.scatter.figure(&snapshot) {
        None => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("Pick the X and Y columns to plot");
            });
        }
        Some(Err(e)) => {
            ui.label(RichText::new(e.to_string()).color(Color32::RED));
        }
        Some(Ok(figure)) => draw_figure(ui, figure),
    }
}

fn draw_figure(ui: &mut Ui, figure: &ScatterFigure) {
    ui.heading(&figure.title);

    Plot::new("scatter_plot")
        .legend(Legend::default())
        .x_axis_label(figure.x_label.as_str())
        .y_axis_label(figure.y_label.as_str())
        .width(figure.width)
        .height(figure.height)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .label_formatter(|name, value| {
            if name.is_empty() {
                format!("{:.2}, {:.2}", value.x, value.y)
            } else {
                format!("{name}\n{:.2}, {:.2}", value.x, value.y)
            }
        })
        .show(ui, |plot_ui| {
            for series in &figure.series {
                let [r, g, b] = series.color;
                let color =
                    Color32::from_rgba_unmultiplied(r, g, b, (figure.alpha * 255.0) as u8);
                let name = series.name.clone().unwrap_or_default();

                // One marker radius per `Points`, so bucket by rounded size.
                // Items sharing a name share one legend entry.
                let mut by_radius: BTreeMap<u32, Vec<[f64; 2]>> = BTreeMap::new();
                for p in &series.points {
                    let radius = (p.size / 2.0).round().max(1.0) as u32;
                    by_radius.entry(radius).or_default().push([p.x, p.y]);
                }

                for (radius, coords) in by_radius {
                    let points = Points::new(PlotPoints::from(coords))
                        .name(&name)
                        .color(color)
                        .filled(true)
                        .shape(MarkerShape::Circle)
                        .radius(radius as f32);
                    plot_ui.points(points);
                }
            }
        });
}
