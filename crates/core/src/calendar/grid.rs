use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::classify::tooltip::product_link_tooltip;
use crate::classify::{classify, CellState, Classification, TooltipModel};
use crate::domain::availability::{AvailabilityMap, FareAvailabilityResponse};
use crate::domain::product::Product;
use crate::time::month::{weekday_abbrev, DayWindow, MonthSelection};

/// Identifies one (product, day) cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CellId {
    pub product_id: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayHeader {
    pub date: NaiveDate,
    pub day: u32,
    pub weekday: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayCell {
    pub date: NaiveDate,
    /// `false` when the API returned nothing for the day.
    pub has_data: bool,
    pub responses: Vec<FareAvailabilityResponse>,
    pub classification: Classification,
}

impl DayCell {
    fn build(date: NaiveDate, responses: Option<&[FareAvailabilityResponse]>) -> Self {
        match responses {
            Some(responses) => Self {
                date,
                has_data: true,
                responses: responses.to_vec(),
                classification: classify(responses),
            },
            None => Self {
                date,
                has_data: false,
                responses: Vec::new(),
                classification: Classification::no_data(),
            },
        }
    }

    pub fn state(&self) -> CellState {
        self.classification.state
    }
}

/// Row of the products overview table.
#[derive(Debug, Clone, Serialize)]
pub struct ProductSummary {
    pub product_id: String,
    pub name: String,
    pub link: String,
    pub duration: String,
    pub fare_ids: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductRow {
    pub product_id: String,
    pub name: String,
    pub supplier: String,
    pub link: String,
    pub link_tooltip: TooltipModel,
    pub duration: String,
    /// The availability request failed; every cell is "no data".
    pub fetch_failed: bool,
    pub cells: Vec<DayCell>,
}

impl ProductRow {
    pub fn build(
        product: &Product,
        window: DayWindow,
        availability: &AvailabilityMap,
        link_base: &str,
        fetch_failed: bool,
    ) -> Self {
        Self {
            product_id: product.product_id.clone(),
            name: product.name.clone(),
            supplier: product.supplier_label().to_string(),
            link: product_link(link_base, product),
            link_tooltip: product_link_tooltip(product),
            duration: product.duration_label(),
            fetch_failed,
            cells: window
                .dates()
                .map(|date| DayCell::build(date, availability.day(date)))
                .collect(),
        }
    }

    pub fn label(&self) -> String {
        format!("{} - {}", self.name, self.supplier)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarGrid {
    pub month: MonthSelection,
    pub month_label: String,
    pub window: DayWindow,
    pub days: Vec<DayHeader>,
    pub summary: Vec<ProductSummary>,
    pub rows: Vec<ProductRow>,
}

impl CalendarGrid {
    /// Headers and the products overview; availability rows are appended as they arrive.
    pub fn new(
        month: MonthSelection,
        window: DayWindow,
        products: &[Product],
        link_base: &str,
    ) -> Self {
        Self {
            month,
            month_label: month.label(),
            window,
            days: window
                .dates()
                .map(|date| DayHeader {
                    date,
                    day: chrono::Datelike::day(&date),
                    weekday: weekday_abbrev(date),
                })
                .collect(),
            summary: products
                .iter()
                .map(|p| ProductSummary {
                    product_id: p.product_id.clone(),
                    name: p.name.clone(),
                    link: product_link(link_base, p),
                    duration: p.duration_label(),
                    fare_ids: p.fare_ids_label(),
                })
                .collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: ProductRow) {
        self.rows.push(row);
    }

    pub fn cell(&self, id: &CellId) -> Option<&DayCell> {
        self.rows
            .iter()
            .find(|r| r.product_id == id.product_id)?
            .cells
            .iter()
            .find(|c| c.date == id.date)
    }

    pub fn tooltip(&self, id: &CellId) -> Option<&TooltipModel> {
        self.cell(id)?.classification.tooltip.as_ref()
    }

    pub fn link_tooltip(&self, product_id: &str) -> Option<&TooltipModel> {
        self.rows
            .iter()
            .find(|r| r.product_id == product_id)
            .map(|r| &r.link_tooltip)
    }

    /// Cell count per state, for logs and summaries.
    pub fn state_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut out = BTreeMap::new();
        for cell in self.rows.iter().flat_map(|r| r.cells.iter()) {
            *out.entry(cell.state().as_str()).or_insert(0) += 1;
        }
        out
    }
}

/// What the pointer is over. Hover is modelled as plain state resolved against the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hover {
    Cell(CellId),
    ProductLink(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub hovered: Option<Hover>,
}

impl ViewState {
    pub fn enter(&mut self, target: Hover) {
        self.hovered = Some(target);
    }

    pub fn leave(&mut self) {
        self.hovered = None;
    }

    pub fn tooltip<'g>(&self, grid: &'g CalendarGrid) -> Option<&'g TooltipModel> {
        match self.hovered.as_ref()? {
            Hover::Cell(id) => grid.tooltip(id),
            Hover::ProductLink(product_id) => grid.link_tooltip(product_id),
        }
    }
}

fn product_link(link_base: &str, product: &Product) -> String {
    format!("{link_base}{}", product.product_id)
}
