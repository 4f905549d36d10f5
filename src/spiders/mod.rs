//! Bundled spiders

mod page;

pub use page::{parse_html, PageRecord, PageSpider, ParsedPage};
