//! Binds the product record to the `Products` entity set.

pub mod entity;
