//! Product catalog contract
//!
//! The storefront grid is fed by a [`CatalogService`]. Sort and view values
//! use the same strings the front end sends; sorting itself is left to the
//! service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, StorefrontError};

/// A product card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub price: f64,
    pub rating: f32,
    pub review_count: u32,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
}

impl Product {
    pub fn new(
        name: impl Into<String>,
        price: f64,
        rating: f32,
        review_count: u32,
        category: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            price,
            rating,
            review_count,
            category: category.into(),
            badge: None,
        }
    }

    pub fn with_badge(mut self, badge: impl Into<String>) -> Self {
        self.badge = Some(badge.into());
        self
    }
}

/// Requested sort order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    #[default]
    Featured,
    PriceLow,
    PriceHigh,
    Rating,
    Newest,
}

impl SortOrder {
    pub const ALL: [SortOrder; 5] = [
        SortOrder::Featured,
        SortOrder::PriceLow,
        SortOrder::PriceHigh,
        SortOrder::Rating,
        SortOrder::Newest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Featured => "featured",
            SortOrder::PriceLow => "price-low",
            SortOrder::PriceHigh => "price-high",
            SortOrder::Rating => "rating",
            SortOrder::Newest => "newest",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = StorefrontError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|order| order.as_str() == s)
            .ok_or_else(|| StorefrontError::Other(format!("unknown sort order: {}", s)))
    }
}

/// Grid or list layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Grid => "grid",
            ViewMode::List => "list",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewMode {
    type Err = StorefrontError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "grid" => Ok(ViewMode::Grid),
            "list" => Ok(ViewMode::List),
            other => Err(StorefrontError::Other(format!("unknown view mode: {}", other))),
        }
    }
}

/// Query sent to a catalog service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogQuery {
    pub sort_by: SortOrder,
    pub view_mode: ViewMode,
}

/// Source of products for the storefront grid
#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn products(&self, query: &CatalogQuery) -> Result<Vec<Product>>;
}

/// Fixed product list.
///
/// Always returns products in stored order; `sort_by` is accepted but not
/// applied.
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    products: Vec<Product>,
}

impl StaticCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl Default for StaticCatalog {
    fn default() -> Self {
        Self::new(vec![
            Product::new("Trail Runner Sneakers", 89.99, 4.6, 1284, "Shoes").with_badge("Best Seller"),
            Product::new("Leather Weekender Bag", 149.0, 4.8, 342, "Bags"),
            Product::new("Merino Crew Sweater", 74.5, 4.4, 611, "Clothing").with_badge("New"),
            Product::new("Canvas High Tops", 54.0, 4.1, 2096, "Shoes"),
            Product::new("Minimalist Watch", 199.0, 4.7, 158, "Accessories").with_badge("Sale"),
            Product::new("Wool Beanie", 24.99, 4.3, 905, "Accessories"),
        ])
    }
}

#[async_trait]
impl CatalogService for StaticCatalog {
    async fn products(&self, query: &CatalogQuery) -> Result<Vec<Product>> {
        tracing::debug!(sort_by = %query.sort_by, view_mode = %query.view_mode, "Listing static catalog");
        Ok(self.products.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_order_wire_strings() {
        let strings: Vec<_> = SortOrder::ALL.iter().map(|o| o.to_string()).collect();
        assert_eq!(strings, vec!["featured", "price-low", "price-high", "rating", "newest"]);

        assert_eq!("price-high".parse::<SortOrder>().unwrap(), SortOrder::PriceHigh);
        assert!("cheapest".parse::<SortOrder>().is_err());
    }

    #[test]
    fn test_sort_order_serde_matches_display() {
        for order in SortOrder::ALL {
            let json = serde_json::to_string(&order).unwrap();
            assert_eq!(json, format!("\"{}\"", order));
        }
    }

    #[test]
    fn test_view_mode_parse() {
        assert_eq!("list".parse::<ViewMode>().unwrap(), ViewMode::List);
        assert_eq!(ViewMode::default(), ViewMode::Grid);
        assert!("table".parse::<ViewMode>().is_err());
    }

    #[tokio::test]
    async fn test_static_catalog_ignores_sort() {
        let catalog = StaticCatalog::default();
        let featured = catalog.products(&CatalogQuery::default()).await.unwrap();
        let by_price = catalog
            .products(&CatalogQuery {
                sort_by: SortOrder::PriceLow,
                view_mode: ViewMode::List,
            })
            .await
            .unwrap();

        assert_eq!(featured.len(), catalog.len());
        assert_eq!(featured, by_price);
        assert_eq!(featured[0].name, "Trail Runner Sneakers");
    }
}
