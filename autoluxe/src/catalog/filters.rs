//! Query-string filters for the catalog collections.

use serde::Deserialize;
use strum::VariantNames;

use super::store::FieldFilter;
use crate::{Error, Result};

/// Wildcard value accepted by the brand and category filters.
const ALL: &str = "all";

/// `GET /api/cars` query parameters.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarFilters {
    pub featured: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    #[serde(rename = "type")]
    pub car_type: Option<String>,
    pub tag: Option<String>,
    pub fuel_type: Option<String>,
}

impl CarFilters {
    pub fn featured_only() -> Self {
        Self {
            featured: Some("true".to_string()),
            ..Default::default()
        }
    }

    pub fn to_field_filters(&self) -> Result<Vec<FieldFilter>> {
        let mut filters = Vec::new();

        if is_true(&self.featured) {
            filters.push(FieldFilter::equals("featured", true));
        }
        if let Some(brand) = non_blank(&self.brand).filter(|b| *b != ALL) {
            filters.push(FieldFilter::equals("brand", brand));
        }
        if let Some(category) = non_blank(&self.category).filter(|c| *c != ALL) {
            filters.push(FieldFilter::equals("category", category));
        }
        if let Some(min) = non_blank(&self.min_price) {
            filters.push(FieldFilter::at_least("price", parse_price("minPrice", min)?));
        }
        if let Some(max) = non_blank(&self.max_price) {
            filters.push(FieldFilter::at_most("price", parse_price("maxPrice", max)?));
        }
        if let Some(car_type) = non_blank(&self.car_type) {
            filters.push(FieldFilter::equals("type", car_type));
        }
        if let Some(tag) = non_blank(&self.tag) {
            filters.push(FieldFilter::contains("tags", tag));
        }
        if let Some(fuel_type) = non_blank(&self.fuel_type) {
            filters.push(FieldFilter::equals("fuel_type", fuel_type));
        }

        Ok(filters)
    }
}

/// `GET /api/brands` query parameters.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct BrandFilters {
    pub featured: Option<String>,
}

impl BrandFilters {
    pub fn to_field_filters(&self) -> Vec<FieldFilter> {
        if is_true(&self.featured) {
            vec![FieldFilter::equals("featured", true)]
        } else {
            Vec::new()
        }
    }
}

/// `GET /api/categories` query parameters.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CategoryFilters {
    pub featured: Option<String>,
    #[serde(rename = "type")]
    pub category_type: Option<String>,
}

impl CategoryFilters {
    pub fn to_field_filters(&self) -> Vec<FieldFilter> {
        let mut filters = Vec::new();
        if is_true(&self.featured) {
            filters.push(FieldFilter::equals("featured", true));
        }
        if let Some(category_type) = non_blank(&self.category_type) {
            filters.push(FieldFilter::equals("type", category_type));
        }
        filters
    }
}

/// Category kinds accepted by the typed category listing.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
    strum::VariantNames,
)]
#[strum(serialize_all = "camelCase")]
pub enum CategoryType {
    CarType,
    FuelType,
    Tag,
}

impl CategoryType {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// Parse a request value, listing the accepted kinds on failure.
    pub fn parse_param(raw: &str) -> Result<Self> {
        raw.parse().map_err(|_| {
            Error::validation(format!(
                "Invalid category type: {}. Valid types are: {}",
                raw,
                Self::VARIANTS.join(", ")
            ))
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn is_true(value: &Option<String>) -> bool {
    non_blank(value) == Some("true")
}

fn parse_price(name: &str, raw: &str) -> Result<f64> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| Error::validation(format!("{name} must be a number, got '{raw}'")))
}
