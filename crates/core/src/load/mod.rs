pub mod coordinator;
pub mod stream;

use chrono::NaiveDate;
use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;

use crate::calendar::grid::{CalendarGrid, ProductRow};
use crate::config::{Settings, DEFAULT_PRODUCT_LINK_BASE};
use crate::domain::preset::{parse_product_ids, Preset, SortingMethod};
use crate::domain::product::{sort_products, Product};
use crate::error::LoadError;
use crate::remote::booking::{BookingApi, TdmsClient};
use crate::remote::build_http_client;
use crate::remote::token::{ScriptTokenClient, TokenSource};
use crate::time::month::MonthSelection;

pub use coordinator::{LoadCoordinator, LoadTicket};
pub use stream::{availability_stream, ProductAvailability};

/// Everything one load needs to know, built fresh per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub month: MonthSelection,
    pub product_ids: Vec<String>,
    pub sorting: SortingMethod,
    /// Product order applied by [`SortingMethod::List`].
    pub preset_order: Vec<String>,
}

impl LoadRequest {
    /// A load from a typed id list. `list` sorting keeps the typed order.
    pub fn manual(month: MonthSelection, product_ids: Vec<String>) -> Self {
        Self {
            month,
            preset_order: product_ids.clone(),
            product_ids,
            sorting: SortingMethod::Alphabetical,
        }
    }

    pub fn from_preset(month: MonthSelection, preset: &Preset) -> Self {
        let ids = preset.product_id_list();
        Self {
            month,
            preset_order: ids.clone(),
            product_ids: ids,
            sorting: preset.sorting,
        }
    }

    /// Combines the inputs of the calendar controls. A typed id list replaces the preset's
    /// ids while the preset still decides ordering; an explicit `sorting` wins over both.
    pub fn resolve(
        month: MonthSelection,
        products: Option<&str>,
        preset: Option<&Preset>,
        sorting: Option<SortingMethod>,
    ) -> Self {
        let typed = products
            .map(parse_product_ids)
            .filter(|ids| !ids.is_empty());

        let mut request = match preset {
            Some(p) => {
                let mut r = Self::from_preset(month, p);
                if let Some(ids) = typed {
                    r.product_ids = ids;
                }
                r
            }
            None => Self::manual(month, typed.unwrap_or_default()),
        };

        if let Some(s) = sorting {
            request.sorting = s;
        }
        request
    }
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Availability requests in flight at once. `1` is strictly sequential.
    pub concurrency: usize,
    pub link_base: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            link_base: DEFAULT_PRODUCT_LINK_BASE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadProgress {
    pub processed: usize,
    pub total: usize,
}

pub struct CalendarLoader {
    api: Arc<dyn BookingApi>,
    tokens: Arc<dyn TokenSource>,
    options: LoadOptions,
}

impl CalendarLoader {
    pub fn new(api: Arc<dyn BookingApi>, tokens: Arc<dyn TokenSource>, options: LoadOptions) -> Self {
        Self {
            api,
            tokens,
            options,
        }
    }

    pub fn from_settings(settings: &Settings, concurrency: usize) -> anyhow::Result<Self> {
        let http = build_http_client(settings)?;
        let tokens = ScriptTokenClient::from_settings(settings, http.clone())?;
        let api = TdmsClient::from_settings(settings, http);
        Ok(Self::new(
            Arc::new(api),
            Arc::new(tokens),
            LoadOptions {
                concurrency: concurrency.max(1),
                link_base: settings.product_link_base.clone(),
            },
        ))
    }

    /// Runs one load: token, products, then availability product by product.
    ///
    /// `ticket` is checked before every suspension point; a superseded load stops with
    /// [`LoadError::Superseded`]. `on_progress` fires after each product with fares.
    pub async fn load(
        &self,
        request: &LoadRequest,
        today: NaiveDate,
        ticket: &LoadTicket,
        on_progress: &mut (dyn FnMut(LoadProgress) + Send),
    ) -> Result<CalendarGrid, LoadError> {
        if request.product_ids.is_empty() {
            return Err(LoadError::NoData);
        }
        let window = request.month.window(today)?;

        ticket.ensure_current()?;
        let token = self.tokens.access_token().await?;

        ticket.ensure_current()?;
        let mut products = self
            .api
            .fetch_products(&token, &request.product_ids)
            .await?;
        if products.is_empty() {
            return Err(LoadError::NoData);
        }
        sort_products(&mut products, request.sorting, &request.preset_order);

        let mut grid = CalendarGrid::new(request.month, window, &products, &self.options.link_base);

        let with_fares: Vec<Product> = products.into_iter().filter(Product::has_fares).collect();
        let total = with_fares.len();
        tracing::info!(
            month = %request.month,
            requested = request.product_ids.len(),
            with_fares = total,
            start_date = %window.start,
            end_date = %window.end(),
            days = window.days,
            sorting = %request.sorting,
            "loading calendar"
        );

        let mut stream = availability_stream(
            self.api.as_ref(),
            &token,
            with_fares,
            window,
            self.options.concurrency,
        );

        let mut processed = 0;
        loop {
            ticket.ensure_current()?;
            let Some(item) = stream.next().await else {
                break;
            };
            ticket.ensure_current()?;

            grid.push_row(ProductRow::build(
                &item.product,
                window,
                &item.availability,
                &self.options.link_base,
                item.failed,
            ));

            processed += 1;
            on_progress(LoadProgress { processed, total });
            tracing::info!(
                processed,
                total,
                product_id = %item.product.product_id,
                days_with_data = item.availability.len(),
                failed = item.failed,
                "availability progress"
            );
        }

        Ok(grid)
    }
}
