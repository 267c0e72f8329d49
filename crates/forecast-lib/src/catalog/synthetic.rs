//! Synthetic fallback catalog
//!
//! Generated when the catalog service is unavailable so the operator can
//! still exercise training and prediction. Records use the service's wire
//! shape and go through the same mapping as real data.

use super::CatalogEntry;
use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde_json::json;

/// Default number of synthetic records
pub const DEFAULT_SYNTHETIC_SIZE: usize = 50;

/// Upper bound for generated average sales per period
const MAX_AVG_SALES: f64 = 30.0;

/// Upper bound for generated lead time in days
const MAX_LEAD_TIME: f64 = 14.0;

/// Generator for plausible inventory records
#[derive(Debug, Clone)]
pub struct SyntheticCatalog {
    size: usize,
    seed: Option<u64>,
}

impl Default for SyntheticCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_SYNTHETIC_SIZE)
    }
}

impl SyntheticCatalog {
    pub fn new(size: usize) -> Self {
        Self { size, seed: None }
    }

    /// Fix the generator seed for reproducible catalogs
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Generate `size` records with ids `1..=size`.
    ///
    /// Inventory is drawn between 10% and 210% of projected demand, so the
    /// catalog contains a mix of items below and above their reorder point.
    pub fn generate(&self) -> Vec<CatalogEntry> {
        let mut rng = match self.seed {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        (1..=self.size)
            .map(|i| {
                let avg_sales = (rng.gen::<f64>() * MAX_AVG_SALES).round().max(1.0);
                let lead_time = (rng.gen::<f64>() * MAX_LEAD_TIME).round().max(1.0);
                let inventory =
                    (avg_sales * lead_time * (0.1 + rng.gen::<f64>() * 2.0)).round();

                CatalogEntry {
                    id: Some(json!(i)),
                    name: Some(json!(format!("Product {}", i))),
                    inventory: Some(json!(inventory)),
                    avg_sales: Some(json!(avg_sales)),
                    lead_time: Some(json!(lead_time)),
                    ..Default::default()
                }
            })
            .collect()
    }
}
