use std::path::Path;

use eframe::egui::{self, Color32, RichText};

use crate::state::{ActivePage, AppState};
use crate::ui::{consultations, dashboard, inventory};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct VetboardApp {
    pub state: AppState,
}

impl VetboardApp {
    /// Build the app and try the conventional data location so a checkout
    /// with data in place opens straight onto the dashboards.
    pub fn new() -> Self {
        let mut state = AppState::default();
        let default_dir = Path::new("data");
        if default_dir.is_dir() {
            state.load_data_dir(default_dir);
        }
        Self { state }
    }
}

impl eframe::App for VetboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar, page tabs, status ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            top_bar(ui, &mut self.state);
        });

        // ---- Central panel: active page ----
        egui::CentralPanel::default().show(ctx, |ui| {
            if self.state.consultations.is_empty() && self.state.inventory.is_empty() {
                ui.centered_and_justified(|ui| {
                    ui.heading("Open a clinic data folder to begin  (File → Open…)");
                });
                return;
            }
            match self.state.active_page {
                ActivePage::Dashboards => dashboard::show(ui, &mut self.state),
                ActivePage::Consultations => consultations::show(ui, &mut self.state),
                ActivePage::Inventory => inventory::show(ui, &mut self.state),
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

fn top_bar(ui: &mut egui::Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui| {
        ui.menu_button("File", |ui| {
            if ui.button("Open data folder…").clicked() {
                open_data_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        for (page, label) in [
            (ActivePage::Dashboards, "Dashboards"),
            (ActivePage::Consultations, "Consultations"),
            (ActivePage::Inventory, "Inventory"),
        ] {
            if ui
                .selectable_label(state.active_page == page, label)
                .clicked()
            {
                state.active_page = page;
            }
        }

        ui.separator();

        let consultation_total: usize = state.consultations.values().map(|ds| ds.len()).sum();
        let product_total: usize = state.inventory.values().map(|ds| ds.len()).sum();
        if consultation_total + product_total > 0 {
            ui.label(format!(
                "{consultation_total} consultations, {product_total} products loaded"
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Folder dialog
// ---------------------------------------------------------------------------

pub fn open_data_dialog(state: &mut AppState) {
    let folder = rfd::FileDialog::new()
        .set_title("Open clinic data folder")
        .pick_folder();

    if let Some(dir) = folder {
        log::info!("Loading datasets from {}", dir.display());
        state.load_data_dir(&dir);
    }
}
