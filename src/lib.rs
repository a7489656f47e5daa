pub mod app;
pub mod catalog;
pub mod console;
pub mod form;
pub mod models;
pub mod notify;
pub mod router;
pub mod store;
pub mod sync;
pub mod validate;
