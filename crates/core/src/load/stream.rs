use futures::stream::{self, BoxStream, StreamExt};

use crate::domain::availability::AvailabilityMap;
use crate::domain::product::Product;
use crate::remote::booking::BookingApi;
use crate::remote::token::AccessToken;
use crate::time::month::DayWindow;

/// Availability of one product, yielded in product order.
#[derive(Debug, Clone)]
pub struct ProductAvailability {
    pub product: Product,
    pub availability: AvailabilityMap,
    /// The fetch failed and `availability` is empty as a result.
    pub failed: bool,
}

/// Fetches availability product by product.
///
/// `concurrency` bounds how many requests are in flight; `1` keeps the strictly
/// sequential behaviour. Output order always follows `products`. A failed fetch yields
/// an empty map instead of ending the stream.
pub fn availability_stream<'a>(
    api: &'a dyn BookingApi,
    token: &'a AccessToken,
    products: Vec<Product>,
    window: DayWindow,
    concurrency: usize,
) -> BoxStream<'a, ProductAvailability> {
    stream::iter(products)
        .map(move |product| async move {
            match api.fetch_availability(token, &product, window).await {
                Ok(availability) => {
                    if availability.is_empty() {
                        tracing::debug!(
                            product_id = %product.product_id,
                            "availability response carried no days"
                        );
                    }
                    ProductAvailability {
                        product,
                        availability,
                        failed: false,
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        product_id = %product.product_id,
                        product = %product.name,
                        error = %format!("{err:#}"),
                        "availability fetch failed; showing no data for product"
                    );
                    ProductAvailability {
                        product,
                        availability: AvailabilityMap::empty(),
                        failed: true,
                    }
                }
            }
        })
        .buffered(concurrency.max(1))
        .boxed()
}
