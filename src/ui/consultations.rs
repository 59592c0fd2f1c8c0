use std::collections::BTreeMap;

use eframe::egui::{self, RichText, ScrollArea, Ui};

use crate::data::model::Record;
use crate::state::{col, AppState, SPECIES_TABS};
use crate::text::{annotate_abbreviations, to_pascal_case, Segment};

// ---------------------------------------------------------------------------
// Consultation history page
// ---------------------------------------------------------------------------

pub fn show(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Consultation History");
    ui.add_space(4.0);

    let mut changed = false;
    ui.horizontal(|ui| {
        ui.strong("Species");
        egui::ComboBox::from_id_salt("consult_species")
            .selected_text(state.consults.species.clone())
            .show_ui(ui, |ui| {
                for tab in SPECIES_TABS {
                    if ui
                        .selectable_label(state.consults.species == tab, tab)
                        .clicked()
                        && state.consults.species != tab
                    {
                        state.consults.species = tab.to_string();
                        changed = true;
                    }
                }
            });
    });

    changed |= type_filter(ui, state);
    if changed {
        state.recompute_consultations();
    }

    if !state.consultations.contains_key(&state.consults.species) {
        ui.separator();
        ui.label("No consultation dataset loaded for this species.");
        return;
    }

    ui.separator();
    pagination_controls(ui, state);
    ui.add_space(6.0);

    let Some(dataset) = state.consultations.get(&state.consults.species) else {
        return;
    };
    let slice = state.consults.page.slice(state.consults.view.indices());

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            for &index in slice {
                consultation_card(ui, &dataset.records[index], &state.abbreviations);
            }
            if slice.is_empty() {
                ui.label("No consultations match the current filters.");
            }
        });
}

/// Pooled consultation-type multiselect. Returns true when any checkbox
/// toggled.
fn type_filter(ui: &mut Ui, state: &mut AppState) -> bool {
    let options = state.pooled_type_options();
    let mut changed = false;

    let header = format!(
        "Filter by Consultation Type  ({}/{})",
        state.consults.selected_types.len(),
        options.len()
    );
    egui::CollapsingHeader::new(RichText::new(header).strong())
        .id_salt("consult_types")
        .default_open(false)
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                if ui.small_button("All").clicked() {
                    state.consults.selected_types = options.iter().cloned().collect();
                    changed = true;
                }
                if ui.small_button("None").clicked() {
                    state.consults.selected_types.clear();
                    changed = true;
                }
            });
            for option in &options {
                let mut checked = state.consults.selected_types.contains(option);
                if ui.checkbox(&mut checked, option).changed() {
                    if checked {
                        state.consults.selected_types.insert(option.clone());
                    } else {
                        state.consults.selected_types.remove(option);
                    }
                    changed = true;
                }
            }
        });
    changed
}

fn pagination_controls(ui: &mut Ui, state: &mut AppState) {
    let len = state.consults.view.len();
    let total = state.consults.page.total_pages(len);
    let current = state.consults.page.current_page(len);

    ui.horizontal(|ui| {
        if ui.button("Previous").clicked() {
            state.consults.page.previous(len);
        }
        ui.label(format!("Page {current} of {}", total.max(1)));
        if ui.button("Next").clicked() {
            state.consults.page.next(len);
        }
        ui.separator();
        ui.label(format!("{len} consultations"));
    });
}

/// One consultation rendered as a card: identity on the left, annotated
/// notes on the right.
fn consultation_card(ui: &mut Ui, record: &Record, abbreviations: &BTreeMap<String, String>) {
    let id = record
        .get(col::CONSULT_ID)
        .map(|v| v.to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    let kind = record
        .get(col::CONSULT_TYPE)
        .map(|v| to_pascal_case(&v.to_string()))
        .unwrap_or_else(|| "Unknown".to_string());
    let date = record
        .get(col::CONSULT_DATE)
        .map(|v| v.to_string())
        .unwrap_or_else(|| "Unknown".to_string());

    ui.columns(2, |cols| {
        cols[0].strong(format!("Consultation ID: {id}"));
        cols[0].label(format!("Type: {kind}"));
        cols[0].label(format!("Date: {date}"));

        if let Some(notes) = record.get(col::NARRATIVE) {
            annotated_notes(&mut cols[1], &notes.to_string(), abbreviations);
        }
    });
    ui.separator();
}

/// Render note text with recognised abbreviations underlined; hovering one
/// shows its expansion.
fn annotated_notes(ui: &mut Ui, notes: &str, abbreviations: &BTreeMap<String, String>) {
    ui.horizontal_wrapped(|ui| {
        ui.spacing_mut().item_spacing.x = 0.0;
        ui.strong("Notes: ");
        for segment in annotate_abbreviations(notes, abbreviations) {
            match segment {
                Segment::Plain(text) => {
                    ui.label(text);
                }
                Segment::Abbrev { text, meaning } => {
                    ui.label(RichText::new(text).underline().italics())
                        .on_hover_text(meaning);
                }
            }
        }
    });
}
