//! Search record construction and reindexing.

use chrono::{Datelike, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

use super::search::{SearchIndex, car_index_settings};
use super::store::{Document, DocumentStore, collections};
use crate::Result;

const DEFAULT_TYPE: &str = "Unknown";
const NOT_SPECIFIED: &str = "Not specified";
const DEFAULT_LOCATION_NAME: &str = "Dubai";
const DEFAULT_LAT: f64 = 25.2048;
const DEFAULT_LNG: f64 = 55.2708;

/// Outcome of a reindex run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReindexOutcome {
    Indexed { count: usize },
    NoDocuments,
    Skipped { reason: String },
}

impl ReindexOutcome {
    pub fn message(&self) -> String {
        match self {
            Self::Indexed { count } => format!("Successfully reindexed {count} cars"),
            Self::NoDocuments => "No cars found to index".to_string(),
            Self::Skipped { reason } => format!("Skipping reindex: {reason}"),
        }
    }
}

/// Convert a stored car into a search record, filling in defaults.
pub fn search_record(document: &Document, current_year: i32) -> Value {
    let text = |field: &str, default: &str| -> Value {
        match document.get_str(field).filter(|s| !s.is_empty()) {
            Some(value) => Value::from(value),
            None => Value::from(default),
        }
    };
    let number = |field: &str, default: Value| -> Value {
        match document.get(field) {
            Some(value) if value.as_f64().is_some_and(|n| n != 0.0) => value.clone(),
            _ => default,
        }
    };

    let name = text("name", "");
    let model = match document.get_str("model").filter(|s| !s.is_empty()) {
        Some(model) => Value::from(model),
        None => name.clone(),
    };
    let images = match document.get("images") {
        Some(Value::Array(images)) => Value::Array(images.clone()),
        _ => Value::Array(Vec::new()),
    };
    let location = match document.get("location") {
        Some(location @ Value::Object(_)) => location.clone(),
        _ => json!({
            "name": DEFAULT_LOCATION_NAME,
            "coordinates": { "lat": DEFAULT_LAT, "lng": DEFAULT_LNG }
        }),
    };

    json!({
        "objectID": document.id,
        "name": name,
        "brand": text("brand", ""),
        "model": model,
        "type": text("type", DEFAULT_TYPE),
        "fuelType": text("fuelType", NOT_SPECIFIED),
        "transmission": text("transmission", NOT_SPECIFIED),
        "seats": number("seats", json!(0)),
        "year": number("year", json!(current_year)),
        "rating": number("rating", json!(0)),
        "dailyPrice": number("dailyPrice", json!(0)),
        "images": images,
        "location": location,
        "description": text("description", ""),
    })
}

/// Configure the index, then push every stored car to it.
#[instrument(skip_all)]
pub async fn reindex_all(
    store: &dyn DocumentStore,
    index: &dyn SearchIndex,
) -> Result<ReindexOutcome> {
    if !index.can_write() {
        warn!("Missing search admin credentials, reindexing skipped");
        return Ok(ReindexOutcome::Skipped {
            reason: "search admin credentials are not configured".to_string(),
        });
    }

    index.set_settings(&car_index_settings()).await?;
    debug!("Index settings applied");

    let cars = store.query(collections::CARS, &[]).await?;
    if cars.is_empty() {
        info!("No cars found to index");
        return Ok(ReindexOutcome::NoDocuments);
    }

    let year = Utc::now().year();
    let records: Vec<Value> = cars.iter().map(|car| search_record(car, year)).collect();
    let count = index.save_objects(&records).await?;

    info!(count, "Reindexing completed");
    Ok(ReindexOutcome::Indexed { count })
}

/// Push a single stored car to the search index.
pub async fn index_car(
    store: &dyn DocumentStore,
    index: &dyn SearchIndex,
    id: &str,
) -> Result<()> {
    let car = store
        .get(collections::CARS, id)
        .await?
        .ok_or_else(|| crate::Error::not_found("car", id))?;
    index
        .save_objects(&[search_record(&car, Utc::now().year())])
        .await?;
    Ok(())
}
