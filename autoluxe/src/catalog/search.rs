//! Hosted search index client and result enrichment.

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, instrument, warn};

use super::store::{Document, DocumentStore, collections};
use crate::config::SearchConfig;
use crate::{Error, Result};

const APP_ID_HEADER: &str = "X-Algolia-Application-Id";
const API_KEY_HEADER: &str = "X-Algolia-API-Key";

/// Paging and filtering passed through to the index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    pub hits_per_page: Option<u32>,
    pub page: Option<u32>,
    /// Filter expression in the index's own syntax.
    pub filters: Option<String>,
}

/// One index hit. Fields starting with `_` (highlighting, ranking info) are
/// dropped during enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "objectID")]
    pub object_id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Search index contract.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn search(&self, text: &str, options: &SearchOptions) -> Result<Vec<SearchHit>>;

    /// Whether the write operations below are available.
    fn can_write(&self) -> bool;

    /// Add or replace records, keyed by their `objectID`. Returns how many were sent.
    async fn save_objects(&self, records: &[Value]) -> Result<usize>;

    async fn delete_object(&self, object_id: &str) -> Result<()>;

    async fn set_settings(&self, settings: &Value) -> Result<()>;
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

/// REST client for the hosted search index.
pub struct HttpSearchIndex {
    client: Client,
    base_url: String,
    app_id: String,
    search_key: SecretString,
    admin_key: Option<SecretString>,
    index_name: String,
}

impl HttpSearchIndex {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        app_id: impl Into<String>,
        search_key: SecretString,
        index_name: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            app_id: app_id.into(),
            search_key,
            admin_key: None,
            index_name: index_name.into(),
        }
    }

    pub fn with_admin_key(mut self, admin_key: SecretString) -> Self {
        self.admin_key = Some(admin_key);
        self
    }

    /// Build from configuration. `None` when search credentials are missing.
    pub fn from_config(client: Client, config: &SearchConfig) -> Option<Self> {
        let app_id = config.app_id.clone()?;
        let base_url = config.base_url()?;
        // Fall back to the admin key for reads when no search key is configured.
        let search_key = config.search_key.as_ref().or(config.admin_key.as_ref())?;

        let index = Self::new(
            client,
            base_url,
            app_id,
            SecretString::from(search_key.expose_secret().to_owned()),
            config.index_name.clone(),
        );
        Some(match &config.admin_key {
            Some(admin_key) => {
                index.with_admin_key(SecretString::from(admin_key.expose_secret().to_owned()))
            }
            None => index,
        })
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    fn index_url(&self, suffix: &str) -> String {
        format!(
            "{}/1/indexes/{}{}",
            self.base_url,
            urlencoding::encode(&self.index_name),
            suffix
        )
    }

    fn authed(&self, builder: RequestBuilder, key: &SecretString) -> RequestBuilder {
        builder
            .header(APP_ID_HEADER, &self.app_id)
            .header(API_KEY_HEADER, key.expose_secret())
    }

    fn admin_key(&self) -> Result<&SecretString> {
        self.admin_key
            .as_ref()
            .ok_or_else(|| Error::config("search admin key is not configured"))
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or(body);
        Err(Error::search(format!("HTTP {}: {}", status.as_u16(), message)))
    }
}

#[async_trait]
impl SearchIndex for HttpSearchIndex {
    #[instrument(skip(self, options), fields(index = %self.index_name))]
    async fn search(&self, text: &str, options: &SearchOptions) -> Result<Vec<SearchHit>> {
        let request = self
            .client
            .post(self.index_url("/query"))
            .json(&json!({ "params": query_params(text, options) }));
        let response = Self::check(self.authed(request, &self.search_key).send().await?).await?;
        let body: QueryResponse = response.json().await?;

        debug!(hits = body.hits.len(), "Search completed");
        Ok(body.hits)
    }

    fn can_write(&self) -> bool {
        self.admin_key.is_some()
    }

    async fn save_objects(&self, records: &[Value]) -> Result<usize> {
        let key = self.admin_key()?;
        let requests: Vec<Value> = records
            .iter()
            .map(|record| json!({ "action": "updateObject", "body": record }))
            .collect();

        let request = self
            .client
            .post(self.index_url("/batch"))
            .json(&json!({ "requests": requests }));
        Self::check(self.authed(request, key).send().await?).await?;
        Ok(records.len())
    }

    async fn delete_object(&self, object_id: &str) -> Result<()> {
        let key = self.admin_key()?;
        let url = self.index_url(&format!("/{}", urlencoding::encode(object_id)));
        let response = self.authed(self.client.delete(url), key).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(object_id, "Object already absent from index");
            return Ok(());
        }
        Self::check(response).await?;
        Ok(())
    }

    async fn set_settings(&self, settings: &Value) -> Result<()> {
        let key = self.admin_key()?;
        let request = self.client.put(self.index_url("/settings")).json(settings);
        Self::check(self.authed(request, key).send().await?).await?;
        Ok(())
    }
}

/// Encode a query and its options as the index's `params` string.
fn query_params(text: &str, options: &SearchOptions) -> String {
    let mut params = url::form_urlencoded::Serializer::new(String::new());
    params.append_pair("query", text);
    if let Some(hits_per_page) = options.hits_per_page {
        params.append_pair("hitsPerPage", &hits_per_page.to_string());
    }
    if let Some(page) = options.page {
        params.append_pair("page", &page.to_string());
    }
    if let Some(filters) = &options.filters {
        params.append_pair("filters", filters);
    }
    params.finish()
}

/// Index settings for the car catalog.
pub fn car_index_settings() -> Value {
    json!({
        "searchableAttributes": [
            "unordered(name)",
            "unordered(brand)",
            "unordered(model)",
            "unordered(type)",
            "unordered(fuelType)",
            "unordered(description)"
        ],
        "attributesForFaceting": [
            "searchable(brand)",
            "searchable(type)",
            "searchable(fuelType)",
            "searchable(transmission)",
            "filterOnly(price)",
            "filterOnly(year)"
        ],
        "distinct": true,
        "ranking": ["typo", "geo", "words", "filters", "proximity", "attribute", "exact", "custom"]
    })
}

/// Search cars and merge every hit with its stored document.
///
/// A blank query returns nothing without calling the index. Stored fields
/// win over hit fields; a hit whose document cannot be loaded is returned
/// as is.
pub async fn search_cars(
    store: &dyn DocumentStore,
    index: &dyn SearchIndex,
    text: &str,
    options: &SearchOptions,
) -> Result<Vec<Document>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let hits = index.search(text, options).await?;
    Ok(join_all(hits.into_iter().map(|hit| enrich_hit(store, hit))).await)
}

async fn enrich_hit(store: &dyn DocumentStore, hit: SearchHit) -> Document {
    let mut fields: Map<String, Value> = hit
        .fields
        .into_iter()
        .filter(|(key, _)| !key.starts_with('_'))
        .collect();

    match store.get(collections::CARS, &hit.object_id).await {
        Ok(Some(document)) => fields.extend(document.fields),
        Ok(None) => debug!(id = %hit.object_id, "Search hit has no stored document"),
        Err(e) => warn!(id = %hit.object_id, error = %e, "Failed to load stored document for hit"),
    }

    Document::new(hit.object_id, fields)
}
