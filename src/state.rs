use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::color::ColorMap;
use crate::data::aggregate::{
    category_counts, period_counts, weekday_hour_counts, CategoryCount, HourlyHeatmap, Period,
    PeriodCounts,
};
use crate::data::filter::{FilterSpec, FilteredView, Selection};
use crate::data::loader;
use crate::data::model::Dataset;
use crate::data::page::PageState;
use crate::text::to_pascal_case;

// ---------------------------------------------------------------------------
// Column names used by the cleaned exports
// ---------------------------------------------------------------------------

pub mod col {
    // Consultations
    pub const CONSULT_ID: &str = "SAVSNET_consult_id";
    pub const CONSULT_DATE: &str = "Consult_date";
    pub const CONSULT_TYPE: &str = "SAVSNET MPC";
    pub const NARRATIVE: &str = "Narrative";

    // Inventory
    pub const PRODUCT_NAME: &str = "Name";
    pub const PRODUCT_NO: &str = "VMDProductNo";
    pub const MA_HOLDER: &str = "MAHolder";
    pub const VM_NO: &str = "VMNo";
    pub const CONTROLLED_DRUG: &str = "ControlledDrug";
    pub const ACTIVE_SUBSTANCES: &str = "ActiveSubstances";
    pub const TARGET_SPECIES: &str = "TargetSpecies";
    pub const DISTRIBUTION_CATEGORY: &str = "DistributionCategory";
    pub const PHARMACEUTICAL_FORM: &str = "PharmaceuticalForm";
    pub const THERAPEUTIC_GROUP: &str = "TherapeuticGroup";
    pub const AUTHORISATION_ROUTE: &str = "AuthorisationRoute";
    pub const TERRITORY: &str = "Territory";
    pub const DATE_OF_ISSUE: &str = "DateOfIssue";
    pub const DATE_OF_EXPIRATION: &str = "DateOfExpiration";
}

/// Species tabs, in display order. Each maps to one cleaned CSV.
pub const SPECIES_TABS: [&str; 3] = ["Cats", "Dogs", "Other Species"];

/// Inventory sheets, in display order. Each maps to one cleaned CSV.
pub const INVENTORY_SHEETS: [&str; 4] = [
    "Current Authorised Products",
    "Suspended Products",
    "Expired Products",
    "Homeopathic Products",
];

/// The controlled-drug schedule classes, plus `N` for unscheduled products.
pub const CONTROLLED_DRUG_CLASSES: [&str; 5] = ["2", "3", "4", "5", "N"];

pub fn consultation_file(species_tab: &str) -> String {
    format!(
        "{}_consultations.csv",
        species_tab.to_lowercase().replace(' ', "_")
    )
}

pub fn inventory_file(sheet: &str) -> String {
    format!("{}.csv", sheet.split_whitespace().collect::<String>())
}

pub const ABBREVIATIONS_FILE: &str = "commonly_used_terms.json";

// ---------------------------------------------------------------------------
// Per-page session state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivePage {
    Dashboards,
    Consultations,
    Inventory,
}

/// Dashboards page: one species at a time, year + type filters, aggregate
/// outputs for the table, bar chart, frequency line, and heatmap.
pub struct DashboardState {
    pub species: String,
    pub year: Option<i32>,
    /// Pascal-Case consultation type labels currently ticked. An empty set
    /// means nothing is selected, so the view is empty.
    pub selected_types: BTreeSet<String>,

    pub view: FilteredView,
    pub counts: Vec<CategoryCount>,
    pub heatmap: Option<HourlyHeatmap>,
    pub daily: PeriodCounts,
    pub colors: ColorMap,
}

impl Default for DashboardState {
    fn default() -> Self {
        DashboardState {
            species: SPECIES_TABS[0].to_string(),
            year: None,
            selected_types: BTreeSet::new(),
            view: FilteredView::default(),
            counts: Vec::new(),
            heatmap: None,
            daily: PeriodCounts::default(),
            colors: ColorMap::default(),
        }
    }
}

/// Consultation history page: species selector, type filter, paginated cards.
pub struct ConsultationsState {
    pub species: String,
    /// Pascal-Case type labels ticked; options are pooled across species.
    pub selected_types: BTreeSet<String>,
    pub view: FilteredView,
    pub page: PageState,
}

impl Default for ConsultationsState {
    fn default() -> Self {
        ConsultationsState {
            species: SPECIES_TABS[0].to_string(),
            selected_types: BTreeSet::new(),
            view: FilteredView::default(),
            page: PageState::new(10),
        }
    }
}

/// Inventory page: sheet selector, controlled-drug filter, text searches,
/// yearly trend, paginated product cards.
pub struct InventoryState {
    pub sheet: String,
    /// Selected controlled-drug classes; empty means the filter is unset
    /// (show everything), unlike the type multiselects above.
    pub controlled: BTreeSet<String>,
    pub search_species: String,
    pub search_substances: String,
    pub search_group: String,

    pub view: FilteredView,
    pub page: PageState,
    pub trend: Option<PeriodCounts>,
}

impl Default for InventoryState {
    fn default() -> Self {
        InventoryState {
            sheet: INVENTORY_SHEETS[0].to_string(),
            controlled: BTreeSet::new(),
            search_species: String::new(),
            search_substances: String::new(),
            search_group: String::new(),
            view: FilteredView::default(),
            page: PageState::new(6),
            trend: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering. Every filter edit triggers a
/// full, synchronous recomputation of Filter → Aggregate for the affected
/// page and resets its pagination; datasets themselves are never mutated.
pub struct AppState {
    pub data_dir: Option<PathBuf>,

    /// Species tab label → consultation dataset.
    pub consultations: BTreeMap<String, Dataset>,
    /// Sheet label → inventory dataset.
    pub inventory: BTreeMap<String, Dataset>,
    /// Abbreviation → definition, for annotating consultation notes.
    pub abbreviations: BTreeMap<String, String>,

    pub active_page: ActivePage,
    pub dashboard: DashboardState,
    pub consults: ConsultationsState,
    pub stock: InventoryState,

    /// Status / error message shown in the top bar.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        AppState {
            data_dir: None,
            consultations: BTreeMap::new(),
            inventory: BTreeMap::new(),
            abbreviations: BTreeMap::new(),
            active_page: ActivePage::Dashboards,
            dashboard: DashboardState::default(),
            consults: ConsultationsState::default(),
            stock: InventoryState::default(),
            status_message: None,
        }
    }
}

impl AppState {
    /// Load every dataset found under a data directory (either the directory
    /// itself or its `cleaned/` subdirectory) and reset all page state to
    /// fresh defaults.
    pub fn load_data_dir(&mut self, dir: &Path) {
        let root = if dir.join(consultation_file(SPECIES_TABS[0])).exists() {
            dir.to_path_buf()
        } else {
            dir.join("cleaned")
        };

        self.consultations.clear();
        self.inventory.clear();
        self.status_message = None;

        for tab in SPECIES_TABS {
            let path = root.join(consultation_file(tab));
            match loader::load_file(&path) {
                Ok(ds) => {
                    log::info!("Loaded {} consultations from {}", ds.len(), path.display());
                    self.consultations.insert(tab.to_string(), ds);
                }
                Err(e) => log::warn!("Skipping {}: {e:#}", path.display()),
            }
        }

        for sheet in INVENTORY_SHEETS {
            let path = root.join(inventory_file(sheet));
            match loader::load_file(&path) {
                Ok(ds) => {
                    log::info!("Loaded {} products from {}", ds.len(), path.display());
                    self.inventory.insert(sheet.to_string(), ds);
                }
                Err(e) => log::warn!("Skipping {}: {e:#}", path.display()),
            }
        }

        for candidate in [
            root.join(ABBREVIATIONS_FILE),
            dir.join("raw").join(ABBREVIATIONS_FILE),
        ] {
            if candidate.exists() {
                match loader::load_abbreviations(&candidate) {
                    Ok(map) => {
                        log::info!("Loaded {} abbreviations", map.len());
                        self.abbreviations = map;
                    }
                    Err(e) => log::warn!("Bad abbreviations file: {e:#}"),
                }
                break;
            }
        }

        if self.consultations.is_empty() && self.inventory.is_empty() {
            self.status_message = Some(format!("No datasets found in {}", dir.display()));
            log::error!("No datasets found in {}", dir.display());
        }

        self.data_dir = Some(dir.to_path_buf());
        self.dashboard = DashboardState::default();
        self.consults = ConsultationsState::default();
        self.stock = InventoryState::default();
        self.init_defaults();
        self.recompute_all();
    }

    /// Consultation type options for the dashboard's active species.
    pub fn dashboard_type_options(&self) -> Vec<String> {
        self.consultations
            .get(&self.dashboard.species)
            .map(|ds| pascal_options(ds, col::CONSULT_TYPE))
            .unwrap_or_default()
    }

    /// Consultation type options pooled across every species dataset.
    pub fn pooled_type_options(&self) -> Vec<String> {
        let mut options: BTreeSet<String> = BTreeSet::new();
        for ds in self.consultations.values() {
            options.extend(pascal_options(ds, col::CONSULT_TYPE));
        }
        options.into_iter().collect()
    }

    /// Years available for the dashboard's active species.
    pub fn dashboard_year_options(&self) -> Vec<i32> {
        self.consultations
            .get(&self.dashboard.species)
            .map(|ds| ds.years(col::CONSULT_DATE))
            .unwrap_or_default()
    }

    fn init_defaults(&mut self) {
        // Dashboard: 2018 is the reference year for the study data; fall
        // back to the earliest year present.
        let years = self.dashboard_year_options();
        self.dashboard.year = if years.contains(&2018) {
            Some(2018)
        } else {
            years.first().copied()
        };

        let options = self.dashboard_type_options();
        self.dashboard.selected_types = if options.iter().any(|o| o == "Vaccination") {
            BTreeSet::from(["Vaccination".to_string()])
        } else {
            options.into_iter().collect()
        };

        // Consultation history defaults to every type selected.
        self.consults.selected_types = self.pooled_type_options().into_iter().collect();
    }

    pub fn recompute_all(&mut self) {
        self.recompute_dashboard();
        self.recompute_consultations();
        self.recompute_inventory();
    }

    /// Switch the dashboard species tab: re-derive the filter defaults for
    /// the new dataset, then recompute.
    pub fn set_dashboard_species(&mut self, species: &str) {
        self.dashboard.species = species.to_string();
        let years = self.dashboard_year_options();
        if !self
            .dashboard
            .year
            .map(|y| years.contains(&y))
            .unwrap_or(false)
        {
            self.dashboard.year = if years.contains(&2018) {
                Some(2018)
            } else {
                years.first().copied()
            };
        }
        let options: BTreeSet<String> = self.dashboard_type_options().into_iter().collect();
        self.dashboard
            .selected_types
            .retain(|t| options.contains(t));
        if self.dashboard.selected_types.is_empty() && options.contains("Vaccination") {
            self.dashboard
                .selected_types
                .insert("Vaccination".to_string());
        }
        self.recompute_dashboard();
    }

    /// Recompute the dashboard view and all of its aggregates.
    pub fn recompute_dashboard(&mut self) {
        let AppState {
            consultations,
            dashboard,
            status_message,
            ..
        } = self;

        let Some(dataset) = consultations.get(&dashboard.species) else {
            dashboard.view = FilteredView::default();
            dashboard.counts = Vec::new();
            dashboard.heatmap = None;
            dashboard.daily = PeriodCounts::default();
            return;
        };

        let mut spec = FilterSpec::new().category_in(
            col::CONSULT_TYPE,
            raw_selection(dataset, col::CONSULT_TYPE, &dashboard.selected_types),
        );
        if let Some(year) = dashboard.year {
            spec = spec.year_equals(col::CONSULT_DATE, year);
        }

        let result = (|| {
            let view = spec.apply(dataset)?;
            let counts = category_counts(dataset, &view, col::CONSULT_TYPE)?;
            let heatmap = weekday_hour_counts(dataset, &view, col::CONSULT_DATE)?;
            let daily = period_counts(dataset, &view, col::CONSULT_DATE, Period::Day)?;
            Ok::<_, crate::data::DataError>((view, counts, heatmap, daily))
        })();

        match result {
            Ok((view, counts, heatmap, daily)) => {
                dashboard.colors = ColorMap::new(counts.iter().map(|c| c.label.clone()));
                dashboard.view = view;
                dashboard.counts = counts;
                dashboard.heatmap = Some(heatmap);
                dashboard.daily = daily;
            }
            Err(e) => {
                log::error!("Dashboard recompute failed: {e}");
                *status_message = Some(e.to_string());
            }
        }
    }

    /// Recompute the consultation-history view; the page always resets
    /// because the view identity changed.
    pub fn recompute_consultations(&mut self) {
        let AppState {
            consultations,
            consults,
            status_message,
            ..
        } = self;

        let Some(dataset) = consultations.get(&consults.species) else {
            consults.view = FilteredView::default();
            consults.page.reset();
            return;
        };

        let spec = FilterSpec::new().category_in(
            col::CONSULT_TYPE,
            raw_selection(dataset, col::CONSULT_TYPE, &consults.selected_types),
        );
        match spec.apply(dataset) {
            Ok(view) => {
                consults.view = view;
                consults.page.reset();
            }
            Err(e) => {
                log::error!("Consultation filter failed: {e}");
                *status_message = Some(e.to_string());
            }
        }
    }

    /// Recompute the inventory view, trend, and pagination.
    pub fn recompute_inventory(&mut self) {
        let AppState {
            inventory,
            stock,
            status_message,
            ..
        } = self;

        let Some(dataset) = inventory.get(&stock.sheet) else {
            stock.view = FilteredView::default();
            stock.trend = None;
            stock.page.reset();
            return;
        };

        let mut spec = FilterSpec::new();
        if !stock.controlled.is_empty() {
            spec = spec.category_in(
                col::CONTROLLED_DRUG,
                Selection::only(stock.controlled.iter()),
            );
        }
        for (column, needle) in [
            (col::TARGET_SPECIES, stock.search_species.as_str()),
            (col::ACTIVE_SUBSTANCES, stock.search_substances.as_str()),
            (col::THERAPEUTIC_GROUP, stock.search_group.as_str()),
        ] {
            if !needle.is_empty() {
                spec = spec.contains(column, needle);
            }
        }

        let result = (|| {
            let view = spec.apply(dataset)?;
            let trend = if dataset.has_column(col::DATE_OF_ISSUE) {
                Some(period_counts(
                    dataset,
                    &view,
                    col::DATE_OF_ISSUE,
                    Period::Year,
                )?)
            } else {
                None
            };
            Ok::<_, crate::data::DataError>((view, trend))
        })();

        match result {
            Ok((view, trend)) => {
                stock.view = view;
                stock.trend = trend;
                stock.page.reset();
            }
            Err(e) => {
                log::error!("Inventory recompute failed: {e}");
                *status_message = Some(e.to_string());
            }
        }
    }
}

/// Pascal-Case unique values of a column, for filter widget options.
fn pascal_options(dataset: &Dataset, column: &str) -> Vec<String> {
    let mut options: BTreeSet<String> = BTreeSet::new();
    if let Some(values) = dataset.unique_values.get(column) {
        for val in values {
            if !val.is_null() {
                options.insert(to_pascal_case(&val.to_string()));
            }
        }
    }
    options.into_iter().collect()
}

/// Translate a set of Pascal-Case labels back to the raw column values they
/// normalize from, so the engine can match records verbatim.
fn raw_selection(dataset: &Dataset, column: &str, selected: &BTreeSet<String>) -> Selection {
    let raw: Vec<String> = dataset
        .unique_values
        .get(column)
        .map(|values| {
            values
                .iter()
                .map(|v| v.to_string())
                .filter(|raw| selected.contains(&to_pascal_case(raw)))
                .collect()
        })
        .unwrap_or_default();
    Selection::only(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{FieldValue, Record};
    use chrono::NaiveDate;

    fn consult(mpc: &str, year: i32) -> Record {
        [
            (
                col::CONSULT_TYPE.to_string(),
                FieldValue::String(mpc.to_string()),
            ),
            (
                col::CONSULT_DATE.to_string(),
                FieldValue::Date(
                    NaiveDate::from_ymd_opt(year, 4, 2)
                        .unwrap()
                        .and_hms_opt(10, 0, 0)
                        .unwrap(),
                ),
            ),
        ]
        .into_iter()
        .collect()
    }

    fn state_with_cats(records: Vec<Record>) -> AppState {
        let mut state = AppState::default();
        state
            .consultations
            .insert("Cats".to_string(), Dataset::from_records(records));
        state.init_defaults();
        state.recompute_all();
        state
    }

    #[test]
    fn defaults_pick_2018_and_vaccination_when_present() {
        let state = state_with_cats(vec![
            consult("vaccination", 2018),
            consult("checkup", 2018),
            consult("vaccination", 2019),
        ]);
        assert_eq!(state.dashboard.year, Some(2018));
        assert_eq!(
            state.dashboard.selected_types,
            BTreeSet::from(["Vaccination".to_string()])
        );
        // One vaccination consult in 2018.
        assert_eq!(state.dashboard.view.len(), 1);
    }

    #[test]
    fn filter_edit_resets_consultation_page() {
        let records: Vec<Record> = (0..25).map(|_| consult("vaccination", 2018)).collect();
        let mut state = state_with_cats(records);

        let len = state.consults.view.len();
        assert_eq!(len, 25);
        state.consults.page.next(len);
        assert_eq!(state.consults.page.current_page(len), 2);

        state.consults.selected_types = BTreeSet::from(["Vaccination".to_string()]);
        state.recompute_consultations();
        assert_eq!(state.consults.page.current_page(state.consults.view.len()), 1);
    }

    #[test]
    fn pascal_labels_map_back_to_raw_values() {
        let state = state_with_cats(vec![
            consult("road_traffic_accident", 2018),
            consult("vaccination", 2018),
        ]);
        let options = state.dashboard_type_options();
        assert!(options.contains(&"Road Traffic Accident".to_string()));

        let ds = &state.consultations["Cats"];
        let selection = raw_selection(
            ds,
            col::CONSULT_TYPE,
            &BTreeSet::from(["Road Traffic Accident".to_string()]),
        );
        let view = FilterSpec::new()
            .category_in(col::CONSULT_TYPE, selection)
            .apply(ds)
            .unwrap();
        assert_eq!(view.len(), 1);
    }

    #[test]
    fn empty_type_selection_yields_empty_dashboard_view() {
        let mut state = state_with_cats(vec![consult("vaccination", 2018)]);
        state.dashboard.selected_types.clear();
        state.recompute_dashboard();
        assert!(state.dashboard.view.is_empty());
        assert!(state.dashboard.counts.is_empty());
    }
}
