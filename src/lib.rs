#![forbid(unsafe_code)]

pub mod api;
pub mod book;
pub mod book_id;
pub mod cli;
pub mod gemini;
pub mod logging;
pub mod model;
pub mod proxy;
pub mod scrape;
pub mod status;
pub mod store;
pub mod translate;
