//! Delivery work unit: adds stock to one warehouse, in partial fills if needed.

use std::time::Instant;

use tracing::debug;

use crate::error::WarehouseError;
use crate::manifest::Manifest;
use crate::types::{Amount, Color};
use crate::warehouse::Warehouses;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub amount: Amount,
    pub color: Color,
}

impl Delivery {
    pub fn new(amount: Amount, color: Color) -> Self {
        Self { amount, color }
    }

    /// Deliver the full amount, blocking whenever the warehouse is full.
    ///
    /// When the whole amount does not fit, whatever space is free is filled
    /// immediately and the rest waits for orders to make room. Never gives
    /// up: if nothing ever frees space this call does not return.
    pub fn complete(&self, warehouses: &Warehouses) -> Result<Manifest, WarehouseError> {
        let start = Instant::now();
        let mut guard = warehouses.get(self.color).lock();

        if guard.free_space() >= self.amount {
            guard.receive(self.amount)?;
        } else {
            let mut remaining = self.amount;
            while remaining > 0 {
                let free = guard.free_space();
                if free > 0 {
                    let fill = free.min(remaining);
                    guard.receive(fill)?;
                    remaining -= fill;
                    debug!(color = %self.color, fill, remaining, "partial delivery");
                    // Orders may be waiting on the stock just added.
                    guard.notify_all();
                } else {
                    debug!(color = %self.color, remaining, "warehouse full, waiting");
                    guard = guard.wait();
                }
            }
        }

        guard.notify_all();
        drop(guard);

        Ok(Manifest::delivery(start.elapsed(), self.amount, self.color))
    }
}
