use tracing::{debug, instrument};
use crate::domain::{Product, ProductPatch};
use crate::error::ODataError;
use crate::odata_framework::{Entity, ODataClient};

/// Client for the gateway's `Products` entity set.
#[derive(Clone)]
pub struct ProductClient {
    inner: ODataClient<Product>,
}

impl_basic_client!(ProductClient, Product, product);

impl ProductClient {
    #[instrument(skip(self))]
    pub async fn update_product(&self, id: &str, patch: ProductPatch) -> Result<Product, ODataError> {
        debug!("Sending request");
        self.inner.update_by_key(Product::ENTITY_SET, id, &patch).await
    }

    pub async fn update_price(&self, id: &str, price: f64) -> Result<Product, ODataError> {
        self.update_product(id, ProductPatch::price(price)).await
    }
}
