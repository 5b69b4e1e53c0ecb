//! JSON settings storage

mod store;

pub use store::JsonStore;
