//! Car catalog: stored documents, query filters, search and reindexing.

pub mod filters;
pub mod indexer;
pub mod search;
pub mod service;
pub mod store;

pub use filters::{BrandFilters, CarFilters, CategoryFilters, CategoryType};
pub use indexer::ReindexOutcome;
pub use search::{HttpSearchIndex, SearchHit, SearchIndex, SearchOptions};
pub use service::CatalogService;
pub use store::{Document, DocumentStore, FieldFilter, collections};
