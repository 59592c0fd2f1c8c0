use eframe::egui::Ui;
use egui_extras::{Column, TableBuilder};

use crate::data::aggregate::CategoryCount;

/// Two-column table of category counts, already ordered by the aggregator.
pub fn counts_table(ui: &mut Ui, counts: &[CategoryCount]) {
    if counts.is_empty() {
        ui.label("No consultations match the current filters.");
        return;
    }

    TableBuilder::new(ui)
        .striped(true)
        .column(Column::remainder().at_least(140.0))
        .column(Column::auto().at_least(60.0))
        .header(22.0, |mut header| {
            header.col(|ui| {
                ui.strong("Consultation Type");
            });
            header.col(|ui| {
                ui.strong("Count");
            });
        })
        .body(|body| {
            body.rows(20.0, counts.len(), |mut row| {
                let item = &counts[row.index()];
                row.col(|ui| {
                    ui.label(&item.label);
                });
                row.col(|ui| {
                    ui.label(item.count.to_string());
                });
            });
        });
}
