//! Starting worlds loaded from JSON.
use serde::{Deserialize, Serialize};

use crate::audit::audit;
use crate::constants::MAX_PRODUCT_SLOTS;
use crate::error::{GameError, ValidationError};
use crate::model::World;
use crate::products::{ProductCatalog, SpecialProduct};
use crate::store::{DocumentStore, world_batch};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub world: World,
    /// Special-product table; the bundled table is used when empty.
    #[serde(default)]
    pub products: Vec<SpecialProduct>,
}

impl Scenario {
    /// Parse and validate a scenario document.
    ///
    /// # Errors
    ///
    /// `Consistency` for malformed JSON or broken cross-references,
    /// `Validation` for a territory with too many products.
    pub fn from_json(json: &str) -> Result<Self, GameError> {
        let scenario: Self = serde_json::from_str(json)
            .map_err(|err| GameError::Consistency(format!("scenario is malformed: {err}")))?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// The demo scenario shipped with the crate.
    ///
    /// # Errors
    ///
    /// As [`Scenario::from_json`].
    pub fn bundled() -> Result<Self, GameError> {
        Self::from_json(include_str!("../data/scenario.json"))
    }

    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), GameError> {
        if let Some(territory) = self
            .world
            .territories
            .iter()
            .find(|territory| territory.products.len() > MAX_PRODUCT_SLOTS)
        {
            return Err(ValidationError::TooManyProducts {
                territory: territory.id.to_string(),
                count: territory.products.len(),
            }
            .into());
        }
        let findings = audit(&self.world);
        if findings.is_empty() {
            Ok(())
        } else {
            Err(GameError::Consistency(findings.join("; ")))
        }
    }

    #[must_use]
    pub fn catalog(&self) -> ProductCatalog {
        if self.products.is_empty() {
            ProductCatalog::new(ProductCatalog::bundled_products())
        } else {
            ProductCatalog::new(self.products.iter().cloned())
        }
    }

    /// Write the world and product table into an empty store.
    ///
    /// # Errors
    ///
    /// `Storage` when the write fails.
    pub fn seed_store<S: DocumentStore>(&self, store: &S) -> Result<(), GameError> {
        let mut batch = world_batch(&self.world).map_err(GameError::storage)?;
        batch
            .put(&self.catalog().to_vec())
            .map_err(GameError::storage)?;
        store.commit(&batch).map_err(GameError::storage)
    }

    #[must_use]
    pub fn into_world(self) -> World {
        self.world
    }
}
