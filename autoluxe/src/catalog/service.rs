//! Catalog service used by the HTTP layer.

use std::sync::Arc;

use tracing::{debug, instrument};

use super::filters::{BrandFilters, CarFilters, CategoryFilters, CategoryType};
use super::indexer::{self, ReindexOutcome};
use super::search::{self, SearchIndex, SearchOptions};
use super::store::{Document, DocumentStore, FieldFilter, collections};
use crate::{Error, Result};

pub struct CatalogService {
    store: Arc<dyn DocumentStore>,
    search: Option<Arc<dyn SearchIndex>>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            search: None,
        }
    }

    pub fn with_search(mut self, search: Arc<dyn SearchIndex>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn search_available(&self) -> bool {
        self.search.is_some()
    }

    #[instrument(skip(self))]
    pub async fn list_cars(&self, filters: &CarFilters) -> Result<Vec<Document>> {
        let filters = filters.to_field_filters()?;
        let cars = self.store.query(collections::CARS, &filters).await?;
        debug!(count = cars.len(), "Fetched cars");
        Ok(cars)
    }

    pub async fn featured_cars(&self) -> Result<Vec<Document>> {
        self.list_cars(&CarFilters::featured_only()).await
    }

    pub async fn get_car(&self, id: &str) -> Result<Document> {
        self.store
            .get(collections::CARS, id)
            .await?
            .ok_or_else(|| Error::not_found("car", id))
    }

    pub async fn list_brands(&self, filters: &BrandFilters) -> Result<Vec<Document>> {
        self.store
            .query(collections::BRANDS, &filters.to_field_filters())
            .await
    }

    pub async fn list_categories(&self, filters: &CategoryFilters) -> Result<Vec<Document>> {
        self.store
            .query(collections::CATEGORIES, &filters.to_field_filters())
            .await
    }

    pub async fn categories_by_type(&self, category_type: CategoryType) -> Result<Vec<Document>> {
        self.store
            .query(
                collections::CATEGORIES,
                &[FieldFilter::equals("type", category_type.as_str())],
            )
            .await
    }

    /// Full-text search over cars. Empty when no index is configured.
    pub async fn search_cars(&self, text: &str, options: &SearchOptions) -> Result<Vec<Document>> {
        match &self.search {
            Some(index) => {
                search::search_cars(self.store.as_ref(), index.as_ref(), text, options).await
            }
            None => {
                debug!("Search index not configured, returning no results");
                Ok(Vec::new())
            }
        }
    }

    pub async fn reindex(&self) -> Result<ReindexOutcome> {
        match &self.search {
            Some(index) => indexer::reindex_all(self.store.as_ref(), index.as_ref()).await,
            None => Ok(ReindexOutcome::Skipped {
                reason: "search index is not configured".to_string(),
            }),
        }
    }

    pub async fn index_car(&self, id: &str) -> Result<()> {
        let index = self.writable_index()?;
        indexer::index_car(self.store.as_ref(), index.as_ref(), id).await
    }

    pub async fn remove_car_from_index(&self, id: &str) -> Result<()> {
        self.writable_index()?.delete_object(id).await
    }

    pub async fn configure_search_index(&self) -> Result<()> {
        self.writable_index()?
            .set_settings(&search::car_index_settings())
            .await
    }

    fn writable_index(&self) -> Result<&Arc<dyn SearchIndex>> {
        self.search
            .as_ref()
            .filter(|index| index.can_write())
            .ok_or_else(|| Error::config("search admin credentials are not configured"))
    }
}
