//! Order work unit: removes a full amount from each requested warehouse in turn.

use std::time::Instant;

use tracing::debug;

use crate::error::WarehouseError;
use crate::manifest::Manifest;
use crate::types::{Amount, COLORS, Color};
use crate::warehouse::{Warehouse, Warehouses};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Order {
    /// Requested units per color, in table order. Zero skips the warehouse.
    pub amounts: [Amount; 3],
}

impl Order {
    pub fn new(amounts: [Amount; 3]) -> Self {
        Self { amounts }
    }

    pub fn amount(&self, color: Color) -> Amount {
        self.amounts[color.index()]
    }

    /// Visit orange, blue, then aqua, taking each requested amount whole.
    ///
    /// Only one warehouse is locked at a time. Stock already taken from an
    /// earlier warehouse stays taken if a later one never fills up.
    pub fn complete(&self, warehouses: &Warehouses) -> Result<Manifest, WarehouseError> {
        let start = Instant::now();
        for color in COLORS {
            let wanted = self.amount(color);
            if wanted == 0 {
                continue;
            }
            take_whole(warehouses.get(color), wanted)?;
        }
        Ok(Manifest::order(start.elapsed(), self.amounts))
    }
}

/// Block until `wanted` units are in stock, then release them in one call.
fn take_whole(warehouse: &Warehouse, wanted: Amount) -> Result<(), WarehouseError> {
    let mut guard = warehouse.lock();
    while guard.current_stock() < wanted {
        debug!(
            color = %guard.color(),
            wanted,
            stock = guard.current_stock(),
            "insufficient stock, waiting"
        );
        guard = guard.wait();
    }
    guard.release(wanted)?;
    guard.notify_all();
    Ok(())
}
