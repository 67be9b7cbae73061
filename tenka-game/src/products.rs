//! Special-product catalog: named territory products and the bonuses they grant.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A named special product and its per-slot bonuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialProduct {
    pub name: String,
    /// Kokudaka added for each territory slot holding this product.
    #[serde(default)]
    pub kokudaka_bonus: i64,
    /// Recruitable soldiers added for each slot.
    #[serde(default)]
    pub soldier_bonus: i64,
}

/// Lookup table keyed by product name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductCatalog {
    products: HashMap<String, SpecialProduct>,
}

impl ProductCatalog {
    #[must_use]
    pub fn new(products: impl IntoIterator<Item = SpecialProduct>) -> Self {
        Self {
            products: products
                .into_iter()
                .map(|product| (product.name.clone(), product))
                .collect(),
        }
    }

    /// Parse a JSON array of products.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is not a list of products.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let products: Vec<SpecialProduct> = serde_json::from_str(json)?;
        Ok(Self::new(products))
    }

    /// Products shipped with the bundled scenario.
    #[must_use]
    pub fn bundled_products() -> Vec<SpecialProduct> {
        serde_json::from_str(include_str!("../data/products.json")).unwrap_or_default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SpecialProduct> {
        self.products.get(name)
    }

    /// Kokudaka bonus for a product name; unknown names contribute zero.
    #[must_use]
    pub fn kokudaka_bonus(&self, name: &str) -> i64 {
        self.get(name).map_or(0, |product| product.kokudaka_bonus)
    }

    /// Soldier bonus for a product name; unknown names contribute zero.
    #[must_use]
    pub fn soldier_bonus(&self, name: &str) -> i64 {
        self.get(name).map_or(0, |product| product.soldier_bonus)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Products sorted by name, for persistence.
    #[must_use]
    pub fn to_vec(&self) -> Vec<SpecialProduct> {
        let mut products: Vec<SpecialProduct> = self.products.values().cloned().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        products
    }
}
