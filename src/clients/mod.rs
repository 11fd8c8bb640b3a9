#[macro_use]
mod macros;

mod gateway;
mod product_client;

pub use gateway::*;
pub use product_client::ProductClient;
