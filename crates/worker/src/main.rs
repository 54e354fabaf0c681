use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use availcal_core::calendar::grid::{CalendarGrid, CellId, Hover, ViewState};
use availcal_core::calendar::render::{render_page, render_text, PageContext};
use availcal_core::config::Settings;
use availcal_core::domain::preset::{PresetsDocument, SortingMethod};
use availcal_core::load::{CalendarLoader, LoadRequest, LoadTicket};
use availcal_core::remote::build_http_client;
use availcal_core::remote::presets::load_presets;
use availcal_core::time::month::{month_options, MonthSelection, MONTH_OPTIONS};

#[derive(Debug, Parser)]
#[command(name = "availcal_worker", about = "Load one availability calendar month")]
struct Args {
    /// Month to load, "November 2026" or "2026-11". Defaults to the current month.
    #[arg(long)]
    month: Option<String>,

    /// Comma-separated product ids.
    #[arg(long)]
    products: Option<String>,

    /// Preset id from the presets document.
    #[arg(long)]
    preset: Option<String>,

    /// Presets file or URL. Overrides PRESETS_PATH.
    #[arg(long)]
    presets_path: Option<String>,

    /// "alphabetical" or "list". Unknown values fall back to alphabetical.
    #[arg(long)]
    sorting: Option<String>,

    /// Write the HTML page here instead of printing the text grid.
    #[arg(long)]
    out: Option<std::path::PathBuf>,

    /// Availability requests in flight at once.
    #[arg(long, default_value_t = 1)]
    concurrency: usize,

    /// Print the tooltip of one cell, as <productId>@<YYYY-MM-DD>. Repeatable.
    #[arg(long, value_parser = parse_cell_id)]
    inspect: Vec<CellId>,

    /// Print the selectable months and exit.
    #[arg(long)]
    list_months: bool,

    /// Print the presets and exit.
    #[arg(long)]
    list_presets: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    if let Err(err) = run(args, &settings).await {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %format!("{err:#}"), "calendar run failed");
        return Err(err);
    }
    Ok(())
}

async fn run(args: Args, settings: &Settings) -> anyhow::Result<()> {
    let today = chrono::Local::now().date_naive();

    if args.list_months {
        for m in month_options(today, MONTH_OPTIONS) {
            println!("{m}");
        }
        return Ok(());
    }

    let presets_path = args
        .presets_path
        .as_deref()
        .unwrap_or(&settings.presets_path);

    if args.list_presets {
        let doc = fetch_presets(settings, presets_path).await?;
        for p in &doc.presets {
            println!("{}\t{}\t{}\t{}", p.id, p.name, p.sorting, p.product_ids);
        }
        return Ok(());
    }

    let month = resolve_month(args.month.as_deref(), today)?;

    let presets = match args.preset.as_deref() {
        Some(_) => fetch_presets(settings, presets_path).await?,
        None => PresetsDocument::default(),
    };
    let preset = match args.preset.as_deref() {
        Some(id) => Some(
            presets
                .find(id)
                .with_context(|| format!("unknown preset {id:?} in {presets_path}"))?,
        ),
        None => None,
    };
    let sorting = args
        .sorting
        .as_deref()
        .map(|s| s.parse::<SortingMethod>().unwrap_or_default());

    let request = LoadRequest::resolve(month, args.products.as_deref(), preset, sorting);
    let loader = CalendarLoader::from_settings(settings, args.concurrency)?;

    let grid = loader
        .load(&request, today, &LoadTicket::detached(), &mut |p| {
            eprintln!("Processing {}/{}", p.processed, p.total);
        })
        .await
        .map_err(|e| {
            eprintln!("{}", e.user_message());
            anyhow::Error::new(e)
        })?;

    tracing::info!(
        month = %month,
        rows = grid.rows.len(),
        states = ?grid.state_counts(),
        "calendar loaded"
    );

    match &args.out {
        Some(path) => {
            let months = month_options(today, MONTH_OPTIONS);
            let html = render_page(&PageContext {
                month,
                months: &months,
                presets: &presets.presets,
                product_ids: request.product_ids.join(", "),
                preset_id: args.preset.clone(),
                session: None,
                message: None,
                grid: Some(&grid),
            })?;
            tokio::fs::write(path, html)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "calendar page written");
        }
        None => print!("{}", render_text(&grid)),
    }

    for id in &args.inspect {
        println!("{}", describe_cell(&grid, id));
    }

    Ok(())
}

async fn fetch_presets(settings: &Settings, source: &str) -> anyhow::Result<PresetsDocument> {
    let http = build_http_client(settings)?;
    load_presets(&http, source).await
}

fn resolve_month(arg: Option<&str>, today: NaiveDate) -> anyhow::Result<MonthSelection> {
    match arg {
        Some(s) => s.parse(),
        None => Ok(MonthSelection::containing(today)),
    }
}

fn parse_cell_id(s: &str) -> Result<CellId, String> {
    let (product_id, date) = s
        .split_once('@')
        .ok_or_else(|| format!("expected <productId>@<YYYY-MM-DD>, got {s:?}"))?;
    let product_id = product_id.trim();
    if product_id.is_empty() {
        return Err(format!("missing product id in {s:?}"));
    }
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|e| format!("invalid date in {s:?}: {e}"))?;
    Ok(CellId {
        product_id: product_id.to_string(),
        date,
    })
}

/// One line per inspected cell: state, display text, then the tooltip contents.
fn describe_cell(grid: &CalendarGrid, id: &CellId) -> String {
    let Some(cell) = grid.cell(id) else {
        return format!("{}@{}: not in calendar", id.product_id, id.date);
    };

    let mut view = ViewState::default();
    view.enter(Hover::Cell(id.clone()));
    let tooltip = view
        .tooltip(grid)
        .map(|t| t.to_plain_text())
        .unwrap_or_else(|| "(no tooltip)".to_string());

    let text = &cell.classification.display_text;
    if text.is_empty() {
        format!("{}@{}: {}\n{tooltip}", id.product_id, id.date, cell.state().as_str())
    } else {
        format!(
            "{}@{}: {} \"{text}\"\n{tooltip}",
            id.product_id,
            id.date,
            cell.state().as_str()
        )
    }
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use availcal_core::calendar::grid::ProductRow;
    use availcal_core::domain::availability::AvailabilityMap;
    use availcal_core::domain::product::{Fare, Product};
    use availcal_core::time::month::DayWindow;
    use serde_json::json;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 11, day).unwrap()
    }

    #[test]
    fn parses_cell_ids() {
        let id = parse_cell_id("42@2026-11-03").unwrap();
        assert_eq!(id.product_id, "42");
        assert_eq!(id.date, d(3));

        assert!(parse_cell_id("42").is_err());
        assert!(parse_cell_id("@2026-11-03").is_err());
        assert!(parse_cell_id("42@2026-13-01").is_err());
    }

    #[test]
    fn resolves_month_argument() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(
            resolve_month(None, today).unwrap(),
            MonthSelection::new(2026, 10).unwrap()
        );
        assert_eq!(
            resolve_month(Some("2027-01"), today).unwrap(),
            MonthSelection::new(2027, 1).unwrap()
        );
        assert!(resolve_month(Some("13/2026"), today).is_err());
    }

    #[test]
    fn describes_inspected_cells() {
        let product = Product {
            product_id: "42".to_string(),
            name: "Glacier Walk".to_string(),
            fares: vec![Fare {
                product_prices_details_id: "7".to_string(),
            }],
            ..Default::default()
        };
        let window = DayWindow { start: d(1), days: 2 };
        let availability: AvailabilityMap = serde_json::from_value(json!({
            "2026-11-01": [{"ProductPricesDetailsId": 7, "Error": "Closed for maintenance"}],
        }))
        .unwrap();
        let month = MonthSelection::new(2026, 11).unwrap();
        let mut grid = CalendarGrid::new(month, window, std::slice::from_ref(&product), "https://t/");
        grid.push_row(ProductRow::build(&product, window, &availability, "https://t/", false));

        let first = describe_cell(&grid, &parse_cell_id("42@2026-11-01").unwrap());
        assert!(first.starts_with("42@2026-11-01: other \"Closed for maintenance\""));

        let second = describe_cell(&grid, &parse_cell_id("42@2026-11-02").unwrap());
        assert_eq!(second, "42@2026-11-02: unknown \"N/A\"\n(no tooltip)");

        let missing = describe_cell(&grid, &parse_cell_id("9@2026-11-02").unwrap());
        assert_eq!(missing, "9@2026-11-02: not in calendar");
    }
}
