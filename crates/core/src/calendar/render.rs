use askama::Template;

use crate::calendar::grid::{CalendarGrid, DayCell, ProductRow};
use crate::classify::{CellState, FareRow, TooltipModel};
use crate::domain::preset::Preset;
use crate::time::month::MonthSelection;

/// Inputs for the full calendar page. `grid` is absent when the load failed or has not run.
#[derive(Debug, Clone)]
pub struct PageContext<'a> {
    pub month: MonthSelection,
    pub months: &'a [MonthSelection],
    pub presets: &'a [Preset],
    pub product_ids: String,
    pub preset_id: Option<String>,
    pub session: Option<String>,
    pub message: Option<String>,
    pub grid: Option<&'a CalendarGrid>,
}

#[derive(Template)]
#[template(path = "calendar.html")]
struct CalendarPage {
    month_label: String,
    prev_month: String,
    next_month: String,
    months: Vec<MonthOption>,
    presets: Vec<PresetButton>,
    product_ids: String,
    preset_id: String,
    session: String,
    message: String,
    has_grid: bool,
    grid: GridView,
}

struct MonthOption {
    label: String,
    selected: bool,
}

struct PresetButton {
    id: String,
    name: String,
}

#[derive(Default)]
struct GridView {
    summary: Vec<SummaryView>,
    weekdays: Vec<&'static str>,
    day_numbers: Vec<u32>,
    rows: Vec<RowView>,
}

struct SummaryView {
    link: String,
    name: String,
    duration: String,
    fare_ids: String,
}

struct RowView {
    link: String,
    label: String,
    duration: String,
    link_tooltip: TooltipView,
    cells: Vec<CellView>,
}

struct CellView {
    state: &'static str,
    style: String,
    text: String,
    has_tooltip: bool,
    tooltip: TooltipView,
}

#[derive(Default)]
struct TooltipView {
    kind: &'static str,
    text: String,
    header: String,
    rows: Vec<FareRow>,
}

impl From<&TooltipModel> for TooltipView {
    fn from(t: &TooltipModel) -> Self {
        match t {
            TooltipModel::Message { text } => Self {
                kind: "message",
                text: text.clone(),
                ..Default::default()
            },
            TooltipModel::FareTable { header, rows } => Self {
                kind: "table",
                header: header.clone().unwrap_or_default(),
                rows: rows.clone(),
                ..Default::default()
            },
            TooltipModel::ProductLink { supplier, name } => Self {
                kind: "link",
                header: supplier.clone(),
                text: name.clone(),
                ..Default::default()
            },
        }
    }
}

impl From<&DayCell> for CellView {
    fn from(cell: &DayCell) -> Self {
        let state = cell.state();
        let tooltip = cell.classification.tooltip.as_ref();
        Self {
            state: state.as_str(),
            style: state
                .color()
                .map(|c| format!("background-color: {c};"))
                .unwrap_or_default(),
            text: cell.classification.display_text.clone(),
            has_tooltip: tooltip.is_some(),
            tooltip: tooltip.map(TooltipView::from).unwrap_or_default(),
        }
    }
}

impl From<&ProductRow> for RowView {
    fn from(row: &ProductRow) -> Self {
        Self {
            link: row.link.clone(),
            label: row.label(),
            duration: row.duration.clone(),
            link_tooltip: TooltipView::from(&row.link_tooltip),
            cells: row.cells.iter().map(CellView::from).collect(),
        }
    }
}

impl From<&CalendarGrid> for GridView {
    fn from(grid: &CalendarGrid) -> Self {
        Self {
            summary: grid
                .summary
                .iter()
                .map(|s| SummaryView {
                    link: s.link.clone(),
                    name: s.name.clone(),
                    duration: s.duration.clone(),
                    fare_ids: s.fare_ids.clone(),
                })
                .collect(),
            weekdays: grid.days.iter().map(|d| d.weekday).collect(),
            day_numbers: grid.days.iter().map(|d| d.day).collect(),
            rows: grid.rows.iter().map(RowView::from).collect(),
        }
    }
}

/// Renders the calendar page. All text is HTML-escaped by the template engine.
pub fn render_page(ctx: &PageContext<'_>) -> anyhow::Result<String> {
    let page = CalendarPage {
        month_label: ctx.month.label(),
        prev_month: ctx.month.shift(-1).label(),
        next_month: ctx.month.shift(1).label(),
        months: ctx
            .months
            .iter()
            .map(|m| MonthOption {
                label: m.label(),
                selected: *m == ctx.month,
            })
            .collect(),
        presets: ctx
            .presets
            .iter()
            .map(|p| PresetButton {
                id: p.id.clone(),
                name: p.name.clone(),
            })
            .collect(),
        product_ids: ctx.product_ids.clone(),
        preset_id: ctx.preset_id.clone().unwrap_or_default(),
        session: ctx.session.clone().unwrap_or_default(),
        message: ctx.message.clone().unwrap_or_default(),
        has_grid: ctx.grid.is_some(),
        grid: ctx.grid.map(GridView::from).unwrap_or_default(),
    };
    Ok(page.render()?)
}

/// Compact terminal view: one glyph per day, one line per product.
pub fn render_text(grid: &CalendarGrid) -> String {
    let name_width = grid
        .rows
        .iter()
        .map(|r| r.name.chars().count())
        .max()
        .unwrap_or(0)
        .clamp(12, 40);

    let mut out = format!("{}\n", grid.month_label);

    let tens: String = grid
        .days
        .iter()
        .map(|d| match d.day / 10 {
            0 => ' ',
            t => char::from_digit(t, 10).unwrap_or(' '),
        })
        .collect();
    let ones: String = grid
        .days
        .iter()
        .map(|d| char::from_digit(d.day % 10, 10).unwrap_or(' '))
        .collect();
    out.push_str(&format!("{:name_width$}  {tens}\n", ""));
    out.push_str(&format!("{:name_width$}  {ones}\n", ""));

    for row in &grid.rows {
        let name: String = row.name.chars().take(name_width).collect();
        let glyphs: String = row.cells.iter().map(|c| c.state().glyph()).collect();
        out.push_str(&format!("{name:name_width$}  {glyphs}\n"));
    }

    out.push_str(&legend());
    out
}

fn legend() -> String {
    let entries = [
        (CellState::Available, "available"),
        (CellState::SoldOut, "sold out"),
        (CellState::Unsupported, "not supported"),
        (CellState::WrongSeason, "wrong season"),
        (CellState::Other, "other error"),
        (CellState::Unknown, "no data"),
    ];
    let parts: Vec<String> = entries
        .iter()
        .map(|(s, label)| format!("{} {label}", s.glyph()))
        .collect();
    format!("\n{}\n", parts.join("  "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::grid::ProductRow;
    use crate::domain::availability::AvailabilityMap;
    use crate::domain::preset::SortingMethod;
    use crate::domain::product::{Fare, Product};
    use crate::time::month::DayWindow;
    use chrono::NaiveDate;
    use serde_json::json;

    fn grid() -> CalendarGrid {
        let month = MonthSelection::new(2026, 11).unwrap();
        let window = DayWindow {
            start: NaiveDate::from_ymd_opt(2026, 11, 9).unwrap(),
            days: 3,
        };
        let product = Product {
            product_id: "7".to_string(),
            name: "Tom & Jerry <Tours>".to_string(),
            supplier_name: Some("\"Quoted\" Ltd".to_string()),
            fares: vec![Fare {
                product_prices_details_id: "70".to_string(),
            }],
            ..Default::default()
        };
        let availability: AvailabilityMap = serde_json::from_value(json!({
            "2026-11-09": [{"ProductPricesDetailsId": 70, "NumAvailable": 2, "FareName": "<script>x</script>"}],
            "2026-11-10": [{"ProductPricesDetailsId": 70, "Error": "Sold via agent"}],
        }))
        .unwrap();

        let mut g = CalendarGrid::new(month, window, std::slice::from_ref(&product), "https://t/");
        g.push_row(ProductRow::build(&product, window, &availability, "https://t/", false));
        g
    }

    #[test]
    fn page_escapes_all_remote_text() {
        let g = grid();
        let months = [g.month, g.month.shift(1)];
        let presets = [Preset {
            id: "p1".to_string(),
            name: "Fjords & Falls".to_string(),
            product_ids: "7".to_string(),
            sorting: SortingMethod::List,
        }];
        let html = render_page(&PageContext {
            month: g.month,
            months: &months,
            presets: &presets,
            product_ids: "7".to_string(),
            preset_id: None,
            session: None,
            message: None,
            grid: Some(&g),
        })
        .unwrap();

        assert!(!html.contains("Tom & Jerry <Tours>"));
        assert!(html.contains("Tom &#38; Jerry &#60;Tours&#62;"));
        assert!(!html.contains("<script>x</script>"));
        assert!(html.contains("&#60;script&#62;x&#60;/script&#62;"));
        assert!(!html.contains("Fjords & Falls"));
        assert!(html.contains("Fjords &#38; Falls"));
        assert!(html.contains("&#34;Quoted&#34; Ltd"));
        assert!(html.contains("background-color: green;"));
        assert!(html.contains("Sold via agent"));
        assert!(html.contains("November 2026"));
        assert!(html.contains("December 2026"));
    }

    #[test]
    fn page_shows_inline_message_without_grid() {
        let month = MonthSelection::new(2026, 9).unwrap();
        let html = render_page(&PageContext {
            month,
            months: &[],
            presets: &[],
            product_ids: String::new(),
            preset_id: None,
            session: None,
            message: Some("No future dates available for the selected month.".to_string()),
            grid: None,
        })
        .unwrap();
        assert!(html.contains("No future dates available for the selected month."));
        assert!(!html.contains("<table class=\"availability-table\">"));
    }

    #[test]
    fn text_grid_uses_state_glyphs() {
        let text = render_text(&grid());
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "November 2026");
        assert!(lines[1].ends_with(" 11"));
        assert!(lines[2].ends_with("901"));
        assert!(lines[3].starts_with("Tom & Jerry"));
        assert!(lines[3].ends_with("+!?"));
        assert!(text.contains("s wrong season"));
    }
}
