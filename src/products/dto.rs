use serde::Deserialize;

use crate::error::ApiError;
use crate::products::repo_types::{ProductFields, ProductFilter};

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

/// Body of `POST /products` and `PUT /products/{id}`. Everything is optional
/// here so missing fields surface as a validation error, not a parse error.
#[derive(Debug, Default, Deserialize)]
pub struct ProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub stock: Option<i32>,
}

impl ProductInput {
    pub fn validate(self) -> Result<ProductFields, ApiError> {
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ApiError::Validation("name is required".into()))?;
        let price_cents = self
            .price_cents
            .ok_or_else(|| ApiError::Validation("price_cents is required".into()))?;
        if price_cents < 0 {
            return Err(ApiError::Validation("price_cents must not be negative".into()));
        }
        let stock = self.stock.unwrap_or(0);
        if stock < 0 {
            return Err(ApiError::Validation("stock must not be negative".into()));
        }
        Ok(ProductFields {
            name,
            description: self.description.unwrap_or_default(),
            price_cents,
            category: self.category.filter(|c| !c.trim().is_empty()),
            image_url: self.image_url,
            stock,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    pub category: Option<String>,
}
fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

impl From<ListQuery> for ProductFilter {
    fn from(q: ListQuery) -> Self {
        Self {
            category: q.category,
            limit: q.limit.clamp(1, MAX_LIMIT),
            offset: q.offset.max(0),
        }
    }
}
