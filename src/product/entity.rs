use crate::domain::{Product, ProductPatch};
use crate::odata_framework::Entity;

impl Entity for Product {
    type Patch = ProductPatch;

    const ENTITY_SET: &'static str = "Products";
}
