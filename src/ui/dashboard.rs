use eframe::egui::{self, RichText, ScrollArea, Ui};

use crate::state::{AppState, SPECIES_TABS};
use crate::ui::{charts, tables};

// ---------------------------------------------------------------------------
// Dashboards page
// ---------------------------------------------------------------------------

pub fn show(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui| {
        for tab in SPECIES_TABS {
            let active = state.dashboard.species == tab;
            if ui.selectable_label(active, tab).clicked() && !active {
                state.set_dashboard_species(tab);
            }
        }
    });
    ui.separator();

    if !state.consultations.contains_key(&state.dashboard.species) {
        ui.label("No consultation dataset loaded for this species.");
        return;
    }

    let mut changed = filter_row(ui, state);
    changed |= type_filter(ui, state);
    if changed {
        state.recompute_dashboard();
    }

    ui.add_space(6.0);
    ui.label(format!(
        "{} consultations match the current filters",
        state.dashboard.view.len()
    ));
    ui.separator();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            ui.columns(2, |cols| {
                cols[0].heading("Filtered Consultation Counts");
                tables::counts_table(&mut cols[0], &state.dashboard.counts);

                cols[1].heading("Filtered Consultation Distribution");
                charts::category_bar_chart(
                    &mut cols[1],
                    "dashboard_counts",
                    &state.dashboard.counts,
                    &state.dashboard.colors,
                );
            });

            ui.add_space(12.0);
            ui.columns(2, |cols| {
                cols[0].heading("Consultation Frequency Over Time");
                charts::frequency_line(&mut cols[0], "dashboard_frequency", &state.dashboard.daily);

                cols[1].heading("Consultation Heatmap");
                if let Some(heatmap) = &state.dashboard.heatmap {
                    charts::heatmap_grid(&mut cols[1], heatmap);
                }
            });
        });
}

/// Year select-box. Returns true when the selection changed.
fn filter_row(ui: &mut Ui, state: &mut AppState) -> bool {
    let years = state.dashboard_year_options();
    let mut changed = false;

    ui.horizontal(|ui| {
        ui.strong("Year");
        let current = state
            .dashboard
            .year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "All".to_string());
        egui::ComboBox::from_id_salt("dashboard_year")
            .selected_text(current)
            .show_ui(ui, |ui| {
                for year in years {
                    if ui
                        .selectable_label(state.dashboard.year == Some(year), year.to_string())
                        .clicked()
                    {
                        state.dashboard.year = Some(year);
                        changed = true;
                    }
                }
            });
    });
    changed
}

/// Consultation-type multiselect. Returns true when any checkbox toggled.
fn type_filter(ui: &mut Ui, state: &mut AppState) -> bool {
    let options = state.dashboard_type_options();
    let mut changed = false;

    let header = format!(
        "Consultation types  ({}/{})",
        state.dashboard.selected_types.len(),
        options.len()
    );
    egui::CollapsingHeader::new(RichText::new(header).strong())
        .id_salt("dashboard_types")
        .default_open(false)
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                if ui.small_button("All").clicked() {
                    state.dashboard.selected_types = options.iter().cloned().collect();
                    changed = true;
                }
                if ui.small_button("None").clicked() {
                    state.dashboard.selected_types.clear();
                    changed = true;
                }
            });
            for option in &options {
                let mut checked = state.dashboard.selected_types.contains(option);
                if ui.checkbox(&mut checked, option).changed() {
                    if checked {
                        state.dashboard.selected_types.insert(option.clone());
                    } else {
                        state.dashboard.selected_types.remove(option);
                    }
                    changed = true;
                }
            }
        });
    changed
}
