//! Running cart totals.

use cart_traits::Item;

/// Weight (lb) and cost of everything in the cart. Neither total goes
/// below zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Ledger {
    total_weight: f64,
    total_cost: f64,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, item: &Item) {
        self.total_cost += item.price;
        self.total_weight += item.weight;
        tracing::debug!(
            upc = %item.upc,
            cost = self.total_cost,
            weight = self.total_weight,
            "item added"
        );
    }

    /// Subtract an item. Each total is floored at zero on its own.
    pub fn remove(&mut self, item: &Item) {
        self.total_cost = (self.total_cost - item.price).max(0.0);
        self.total_weight = (self.total_weight - item.weight).max(0.0);
        tracing::debug!(
            upc = %item.upc,
            cost = self.total_cost,
            weight = self.total_weight,
            "item removed"
        );
    }

    #[inline]
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    #[inline]
    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }
}
