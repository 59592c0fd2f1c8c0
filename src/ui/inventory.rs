use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::data::model::Dataset;
use crate::state::{col, AppState, CONTROLLED_DRUG_CLASSES, INVENTORY_SHEETS};
use crate::text::split_pascal_case;
use crate::ui::charts;

/// Product fields shown on a card, in display order. Expired products carry
/// a reduced column set in the source export.
const EXPIRED_CARD_COLUMNS: [&str; 6] = [
    col::MA_HOLDER,
    col::VM_NO,
    col::DATE_OF_EXPIRATION,
    col::AUTHORISATION_ROUTE,
    col::TERRITORY,
    col::ACTIVE_SUBSTANCES,
];
const CARD_COLUMNS: [&str; 8] = [
    col::MA_HOLDER,
    col::VM_NO,
    col::CONTROLLED_DRUG,
    col::ACTIVE_SUBSTANCES,
    col::TARGET_SPECIES,
    col::DISTRIBUTION_CATEGORY,
    col::PHARMACEUTICAL_FORM,
    col::THERAPEUTIC_GROUP,
];

const EXPIRED_SHEET: &str = "Expired Products";

// ---------------------------------------------------------------------------
// Product inventory page
// ---------------------------------------------------------------------------

pub fn show(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Product Inventory");
    ui.add_space(4.0);

    let mut changed = false;
    ui.horizontal(|ui| {
        ui.strong("Sheet");
        egui::ComboBox::from_id_salt("inventory_sheet")
            .selected_text(state.stock.sheet.clone())
            .show_ui(ui, |ui| {
                for sheet in INVENTORY_SHEETS {
                    if ui
                        .selectable_label(state.stock.sheet == sheet, sheet)
                        .clicked()
                        && state.stock.sheet != sheet
                    {
                        state.stock.sheet = sheet.to_string();
                        state.stock.controlled.clear();
                        changed = true;
                    }
                }
            });
    });

    if state.stock.sheet == EXPIRED_SHEET {
        ui.label("Controlled Drug filter not applicable for expired products.");
    } else {
        changed |= controlled_drug_filter(ui, state);
    }
    changed |= search_filters(ui, state);

    if changed {
        state.recompute_inventory();
    }

    if !state.inventory.contains_key(&state.stock.sheet) {
        ui.separator();
        ui.label("No inventory dataset loaded for this sheet.");
        return;
    }

    ui.separator();

    if let Some(trend) = &state.stock.trend {
        ui.heading("Trend Analysis Over Time");
        charts::trend_chart(ui, "inventory_trend", trend);
        if let Some(peak) = &trend.peak {
            ui.label(format!(
                "Busiest year: {} ({} products issued)",
                peak.label, peak.count
            ));
        }
        ui.separator();
    }

    ui.label(format!("{} results available", state.stock.view.len()));
    pagination_controls(ui, state);
    ui.add_space(6.0);

    let Some(dataset) = state.inventory.get(&state.stock.sheet) else {
        return;
    };
    let card_columns: &[&str] = if state.stock.sheet == EXPIRED_SHEET {
        &EXPIRED_CARD_COLUMNS
    } else {
        &CARD_COLUMNS
    };
    let slice = state.stock.page.slice(state.stock.view.indices());

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            for &index in slice {
                product_card(ui, dataset, index, card_columns);
            }
            if slice.is_empty() {
                ui.label("No products match the current filters.");
            }
        });
}

/// Controlled-drug class multiselect. An empty selection leaves the filter
/// unset, so every product passes.
fn controlled_drug_filter(ui: &mut Ui, state: &mut AppState) -> bool {
    let mut changed = false;
    ui.horizontal(|ui| {
        ui.strong("Controlled Drug");
        for class in CONTROLLED_DRUG_CLASSES {
            let mut checked = state.stock.controlled.contains(class);
            if ui.checkbox(&mut checked, class).changed() {
                if checked {
                    state.stock.controlled.insert(class.to_string());
                } else {
                    state.stock.controlled.remove(class);
                }
                changed = true;
            }
        }
    });
    changed
}

/// Collapsible free-text searches. Only columns the active sheet actually
/// has get a search box.
fn search_filters(ui: &mut Ui, state: &mut AppState) -> bool {
    let present: Vec<(&str, &str)> = {
        let dataset = state.inventory.get(&state.stock.sheet);
        [
            (col::TARGET_SPECIES, "Search by Target Species"),
            (col::ACTIVE_SUBSTANCES, "Search by Active Substances"),
            (col::THERAPEUTIC_GROUP, "Search by Therapeutic Group"),
        ]
        .into_iter()
        .filter(|(column, _)| dataset.map(|ds| ds.has_column(column)).unwrap_or(false))
        .collect()
    };
    if present.is_empty() {
        return false;
    }

    let mut changed = false;
    egui::CollapsingHeader::new(RichText::new("More Filters").strong())
        .id_salt("inventory_more_filters")
        .default_open(false)
        .show(ui, |ui| {
            for (column, label) in present {
                let needle = match column {
                    col::TARGET_SPECIES => &mut state.stock.search_species,
                    col::ACTIVE_SUBSTANCES => &mut state.stock.search_substances,
                    _ => &mut state.stock.search_group,
                };
                ui.label(label);
                if ui.text_edit_singleline(needle).changed() {
                    changed = true;
                }
            }
        });
    changed
}

fn pagination_controls(ui: &mut Ui, state: &mut AppState) {
    let len = state.stock.view.len();
    let total = state.stock.page.total_pages(len);
    let current = state.stock.page.current_page(len);

    ui.horizontal(|ui| {
        ui.label(format!("Page {current} of {}", total.max(1)));
        if ui.button("Previous").clicked() {
            state.stock.page.previous(len);
        }
        if ui.button("Next").clicked() {
            state.stock.page.next(len);
        }
    });
}

/// One product rendered as a card: name as a coloured heading, then a
/// two-column field grid.
fn product_card(ui: &mut Ui, dataset: &Dataset, index: usize, card_columns: &[&str]) {
    let record = &dataset.records[index];
    let name = record
        .get(col::PRODUCT_NAME)
        .map(|v| v.to_string())
        .unwrap_or_else(|| "Unnamed product".to_string());
    ui.label(
        RichText::new(name)
            .heading()
            .color(Color32::from_rgb(0xca, 0x9c, 0xe1)),
    );
    if let Some(no) = record.get(col::PRODUCT_NO) {
        ui.label(format!("Product No: {no}"));
    }

    egui::Grid::new(("product_card", index))
        .num_columns(2)
        .spacing([24.0, 2.0])
        .show(ui, |ui| {
            for column in card_columns {
                if !dataset.has_column(column) {
                    continue;
                }
                let value = record
                    .get(column)
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "Unknown".to_string());
                ui.label(
                    RichText::new(format!("{}:", split_pascal_case(column)))
                        .color(Color32::from_rgb(0xf2, 0xbe, 0xfc)),
                );
                ui.label(value);
                ui.end_row();
            }
        });
    ui.separator();
}
