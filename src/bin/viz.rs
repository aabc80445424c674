use eframe::egui;
use egui_plot::{HLine, Legend, Line, LineStyle, Plot, PlotPoints};
use tracing::{error, info};

use freefall_sim::physics::{cities, DragModel, EnergyProfile};
use freefall_sim::{run_form, SimConfig, SimError, SimRun};

fn main() -> eframe::Result {
    freefall_sim::init_logging();
    let config = SimConfig::load_or_default();

    let app = FreefallApp::new(config);
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([900.0, 760.0]),
        ..Default::default()
    };
    info!("Launching UI");
    eframe::run_native(
        "Free Fall with Air Resistance",
        options,
        Box::new(|_| Ok(Box::new(app))),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Velocity,
    VelocityAndEnergy,
}

struct Outcome {
    run: SimRun,
    energy: EnergyProfile,
}

struct ErrorDialog {
    title: &'static str,
    message: String,
}

struct FreefallApp {
    config: SimConfig,
    city: String,
    model: DragModel,
    area_text: String,
    view: View,
    outcome: Option<Outcome>,
    dialog: Option<ErrorDialog>,
}

impl FreefallApp {
    fn new(config: SimConfig) -> Self {
        Self {
            config,
            city: "Seoul".into(),
            model: DragModel::Linear,
            area_text: String::new(),
            view: View::VelocityAndEnergy,
            outcome: None,
            dialog: None,
        }
    }

    /// Validate, simulate, keep the result for drawing. A failure leaves the
    /// previous plot and the form untouched.
    fn run(&mut self) {
        match run_form(&self.city, self.model.as_str(), &self.area_text, &self.config) {
            Ok(run) => {
                let energy = EnergyProfile::from_trajectory(
                    &run.trajectory,
                    self.config.mass,
                    self.config.initial_height,
                );
                self.outcome = Some(Outcome { run, energy });
            }
            Err(e) => {
                error!("{}: {}", e.title(), e);
                self.dialog = Some(dialog_for(&e));
            }
        }
    }

    fn form(&mut self, ui: &mut egui::Ui) {
        egui::Grid::new("form").num_columns(2).spacing([20.0, 8.0]).show(ui, |ui| {
            ui.label("City");
            egui::ComboBox::from_id_salt("city")
                .selected_text(self.city.as_str())
                .show_ui(ui, |ui| {
                    for c in cities() {
                        ui.selectable_value(&mut self.city, c.to_string(), c);
                    }
                });
            ui.end_row();

            ui.label("Drag model");
            egui::ComboBox::from_id_salt("model")
                .selected_text(self.model.as_str())
                .show_ui(ui, |ui| {
                    for m in DragModel::ALL {
                        ui.selectable_value(&mut self.model, m, m.as_str());
                    }
                });
            ui.end_row();

            ui.label("Cross-sectional area (m²)");
            ui.text_edit_singleline(&mut self.area_text);
            ui.end_row();

            ui.label("Plots");
            ui.horizontal(|ui| {
                ui.radio_value(&mut self.view, View::Velocity, "Velocity");
                ui.radio_value(&mut self.view, View::VelocityAndEnergy, "Velocity + energy");
            });
            ui.end_row();
        });

        ui.add_space(8.0);
        if ui.button("Run").clicked() {
            self.run();
        }
    }
}

fn dialog_for(e: &SimError) -> ErrorDialog {
    let message = if e.is_input_error() {
        "Enter a positive number for the cross-sectional area.".to_string()
    } else {
        e.to_string()
    };
    ErrorDialog { title: e.title(), message }
}

impl eframe::App for FreefallApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let modal_open = self.dialog.is_some();

        egui::TopBottomPanel::top("form").show(ctx, |ui| {
            ui.add_enabled_ui(!modal_open, |ui| self.form(ui));
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(outcome) = &self.outcome else {
                ui.centered_and_justified(|ui| {
                    ui.label("Choose parameters and press Run.");
                });
                return;
            };
            draw_plots(ui, outcome, self.view, self.config.mass);
        });

        if let Some(dialog) = &self.dialog {
            let mut dismissed = false;
            egui::Window::new(dialog.title)
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.label(&dialog.message);
                    ui.add_space(8.0);
                    if ui.button("OK").clicked() {
                        dismissed = true;
                    }
                });
            if dismissed {
                self.dialog = None;
            }
        }
    }
}

fn draw_plots(ui: &mut egui::Ui, outcome: &Outcome, view: View, mass: f64) {
    let run = &outcome.run;
    let traj = &run.trajectory;
    let terminal = traj.terminal_velocity().unwrap_or(0.0);

    ui.label(format!(
        "{} / {} — k = {:.5}, last sample {:.3} m/s, analytic terminal {:.3} m/s",
        run.params.city,
        run.params.model,
        run.k,
        terminal,
        run.analytic_terminal_velocity(mass),
    ));

    let available = ui.available_size();
    let plot_h = match view {
        View::Velocity => available.y - 8.0,
        View::VelocityAndEnergy => available.y / 2.0 - 8.0,
    };

    let velocity: PlotPoints = traj.samples().map(|(t, v)| [t, v]).collect();
    Plot::new("velocity")
        .height(plot_h)
        .legend(Legend::default())
        .x_axis_label("Time (s)")
        .y_axis_label("Velocity (m/s)")
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new("Velocity v(t)", velocity).color(egui::Color32::LIGHT_BLUE));
            plot_ui.hline(
                HLine::new("Terminal velocity", terminal)
                    .style(LineStyle::dashed_loose())
                    .color(egui::Color32::RED),
            );
        });

    if view == View::VelocityAndEnergy {
        let energy = &outcome.energy;
        let series = |values: &[f64]| -> PlotPoints {
            traj.times.iter().zip(values).map(|(t, e)| [*t, *e]).collect()
        };
        Plot::new("energy")
            .height(plot_h)
            .legend(Legend::default())
            .x_axis_label("Time (s)")
            .y_axis_label("Energy (J)")
            .show(ui, |plot_ui| {
                plot_ui.line(
                    Line::new("Potential E_p(t)", series(&energy.potential))
                        .color(egui::Color32::GREEN),
                );
                plot_ui.line(
                    Line::new("Kinetic E_k(t)", series(&energy.kinetic))
                        .color(egui::Color32::ORANGE),
                );
                plot_ui.line(
                    Line::new("Total E(t)", series(&energy.total))
                        .color(egui::Color32::from_rgb(128, 0, 128)),
                );
            });
    }
}
