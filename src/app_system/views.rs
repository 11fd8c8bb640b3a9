use askama::Template;

use crate::domain::Product;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexView<'a> {
    pub products: &'a [Product],
}

/// Edit form. Also used to re-render a rejected submission, in which case
/// only the submitted values are known.
#[derive(Template)]
#[template(path = "edit.html")]
pub struct EditView<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub price: String,
    pub fields: Vec<(String, String)>,
    pub error: &'a str,
}

impl<'a> EditView<'a> {
    pub fn for_product(product: &'a Product) -> Self {
        Self {
            id: &product.id,
            name: product.display_name(),
            price: product.price.to_string(),
            fields: product.extra_fields(),
            error: "",
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorView<'a> {
    pub status: u16,
    pub reason: &'a str,
    pub message: &'a str,
    /// Also logged with the failure so the page can be matched to the logs.
    pub request_id: &'a str,
}

#[derive(Template)]
#[template(path = "page.html")]
pub struct PageView<'a> {
    pub title: &'a str,
    pub message: &'a str,
}
