//! Capacity-bounded warehouse monitor and the fixed per-color warehouse table.
//!
//! Each [`Warehouse`] is an independent monitor: one mutex guarding the stock
//! counters plus one condition variable that tasks block on. Exclusive access
//! is held for exactly as long as a [`WarehouseGuard`] is alive.

use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard};

use tracing::trace;

use crate::error::WarehouseError;
use crate::types::{Amount, COLORS, Capacities, Color};

struct StockState {
    stock: Amount,
    received: Amount,
    ordered: Amount,
}

/// One color's inventory pool.
pub struct Warehouse {
    color: Color,
    capacity: Amount,
    state: Mutex<StockState>,
    changed: Condvar,
}

impl Warehouse {
    /// Create an empty warehouse.
    pub fn new(color: Color, capacity: Amount) -> Self {
        Self {
            color,
            capacity,
            state: Mutex::new(StockState {
                stock: 0,
                received: 0,
                ordered: 0,
            }),
            changed: Condvar::new(),
        }
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn capacity(&self) -> Amount {
        self.capacity
    }

    /// Acquire exclusive access; released when the guard drops.
    pub fn lock(&self) -> WarehouseGuard<'_> {
        let state = self.state.lock().expect("warehouse mutex poisoned");
        WarehouseGuard {
            warehouse: self,
            state,
        }
    }

    /// Stock level read under a short-lived lock.
    pub fn current_stock(&self) -> Amount {
        self.lock().current_stock()
    }

    /// Free space read under a short-lived lock.
    pub fn free_space(&self) -> Amount {
        self.lock().free_space()
    }

    /// Consistent copy of all counters.
    pub fn snapshot(&self) -> WarehouseSnapshot {
        self.lock().snapshot()
    }

    /// `"<color> warehouse: <received> - <ordered>: <stock>"`
    pub fn describe(&self) -> String {
        self.snapshot().to_string()
    }
}

/// Exclusive access to one warehouse.
pub struct WarehouseGuard<'a> {
    warehouse: &'a Warehouse,
    state: MutexGuard<'a, StockState>,
}

impl<'a> WarehouseGuard<'a> {
    pub fn color(&self) -> Color {
        self.warehouse.color
    }

    pub fn current_stock(&self) -> Amount {
        self.state.stock
    }

    pub fn free_space(&self) -> Amount {
        self.warehouse.capacity - self.state.stock
    }

    /// Add stock. Fails without mutating if `amount` exceeds the free space.
    pub fn receive(&mut self, amount: Amount) -> Result<(), WarehouseError> {
        let free = self.free_space();
        if amount > free {
            return Err(WarehouseError::Overfill {
                color: self.warehouse.color,
                amount,
                free,
            });
        }
        self.state.stock += amount;
        self.state.received += amount;
        self.check_conservation();
        Ok(())
    }

    /// Remove stock. Fails without mutating if `amount` exceeds the stock.
    pub fn release(&mut self, amount: Amount) -> Result<(), WarehouseError> {
        let stock = self.state.stock;
        if amount > stock {
            return Err(WarehouseError::Overdraw {
                color: self.warehouse.color,
                amount,
                stock,
            });
        }
        self.state.stock -= amount;
        self.state.ordered += amount;
        self.check_conservation();
        Ok(())
    }

    /// Block until notified. The lock is released while suspended and held
    /// again on return; callers must re-check their condition.
    pub fn wait(self) -> Self {
        let WarehouseGuard { warehouse, state } = self;
        trace!(color = %warehouse.color, stock = state.stock, "waiting");
        let state = warehouse
            .changed
            .wait(state)
            .expect("warehouse condvar wait failed");
        WarehouseGuard { warehouse, state }
    }

    /// Wake every task blocked on this warehouse.
    pub fn notify_all(&self) {
        self.warehouse.changed.notify_all();
    }

    pub fn snapshot(&self) -> WarehouseSnapshot {
        WarehouseSnapshot {
            color: self.warehouse.color,
            capacity: self.warehouse.capacity,
            stock: self.state.stock,
            received: self.state.received,
            ordered: self.state.ordered,
        }
    }

    fn check_conservation(&self) {
        debug_assert!(
            self.snapshot().is_consistent(),
            "stock conservation broken: {}",
            self.snapshot()
        );
    }
}

/// Point-in-time copy of a warehouse's counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WarehouseSnapshot {
    pub color: Color,
    pub capacity: Amount,
    pub stock: Amount,
    pub received: Amount,
    pub ordered: Amount,
}

impl WarehouseSnapshot {
    /// `stock == received - ordered` and `stock <= capacity`.
    pub fn is_consistent(&self) -> bool {
        self.received >= self.ordered
            && self.stock == self.received - self.ordered
            && self.stock <= self.capacity
    }
}

impl fmt::Display for WarehouseSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} warehouse: {} - {}: {}",
            self.color, self.received, self.ordered, self.stock
        )
    }
}

/// Exactly one warehouse per color, built once at startup.
pub struct Warehouses {
    table: [Warehouse; 3],
}

impl Warehouses {
    pub fn new(capacities: Capacities) -> Self {
        Self {
            table: COLORS.map(|color| Warehouse::new(color, capacities.get(color))),
        }
    }

    pub fn get(&self, color: Color) -> &Warehouse {
        &self.table[color.index()]
    }

    /// Warehouses in color order.
    pub fn iter(&self) -> impl Iterator<Item = &Warehouse> {
        self.table.iter()
    }

    pub fn snapshots(&self) -> Vec<WarehouseSnapshot> {
        self.iter().map(Warehouse::snapshot).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn receive_and_release_keep_counters_consistent() {
        let warehouse = Warehouse::new(Color::Orange, 10);
        {
            let mut guard = warehouse.lock();
            guard.receive(7).expect("room for 7");
            guard.release(3).expect("stock for 3");
            assert_eq!(guard.current_stock(), 4);
            assert_eq!(guard.free_space(), 6);
        }
        let snap = warehouse.snapshot();
        assert_eq!((snap.stock, snap.received, snap.ordered), (4, 7, 3));
        assert!(snap.is_consistent());
    }

    #[test]
    fn overfill_is_rejected_without_clamping() {
        let warehouse = Warehouse::new(Color::Blue, 5);
        let mut guard = warehouse.lock();
        guard.receive(4).expect("room for 4");
        let err = guard.receive(2).expect_err("only 1 free");
        assert_eq!(
            err,
            WarehouseError::Overfill {
                color: Color::Blue,
                amount: 2,
                free: 1
            }
        );
        assert_eq!(guard.current_stock(), 4);
        assert_eq!(guard.snapshot().received, 4);
    }

    #[test]
    fn overdraw_is_rejected_without_clamping() {
        let warehouse = Warehouse::new(Color::Aqua, 5);
        let mut guard = warehouse.lock();
        guard.receive(2).expect("room for 2");
        assert!(matches!(
            guard.release(3),
            Err(WarehouseError::Overdraw { amount: 3, stock: 2, .. })
        ));
        assert_eq!(guard.current_stock(), 2);
        assert_eq!(guard.snapshot().ordered, 0);
    }

    #[test]
    fn describe_matches_report_format() {
        let warehouse = Warehouse::new(Color::Orange, 10);
        {
            let mut guard = warehouse.lock();
            guard.receive(8).expect("room");
            guard.release(3).expect("stock");
        }
        assert_eq!(warehouse.describe(), "orange warehouse: 8 - 3: 5");
    }

    #[test]
    fn zero_capacity_warehouse_has_no_space() {
        let warehouse = Warehouse::new(Color::Blue, 0);
        assert_eq!(warehouse.free_space(), 0);
        assert_eq!(warehouse.current_stock(), 0);
        assert!(warehouse.lock().receive(0).is_ok());
    }

    #[test]
    fn concurrent_mutations_preserve_conservation() {
        let warehouse = Arc::new(Warehouse::new(Color::Orange, 3));
        let contenders = 8;
        let rounds = 200;
        let barrier = Arc::new(Barrier::new(contenders));

        let mut handles = Vec::new();
        for _ in 0..contenders {
            let warehouse = Arc::clone(&warehouse);
            let barrier = Arc::clone(&barrier);
            handles.push(thread::spawn(move || {
                barrier.wait();
                for _ in 0..rounds {
                    let mut guard = warehouse.lock();
                    if guard.free_space() > 0 {
                        guard.receive(1).expect("checked free space");
                    } else {
                        guard.release(1).expect("full implies stock");
                    }
                    assert!(guard.snapshot().is_consistent());
                }
            }));
        }

        for handle in handles {
            handle.join().expect("mutator thread panicked");
        }

        let snap = warehouse.snapshot();
        assert!(snap.is_consistent());
        assert_eq!(snap.received + snap.ordered, (contenders * rounds) as Amount);
    }

    #[test]
    fn wait_releases_lock_and_wakes_on_notify_all() {
        let warehouse = Arc::new(Warehouse::new(Color::Aqua, 5));
        let waiters = 3;
        let (ready_tx, ready_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();

        let mut handles = Vec::new();
        for _ in 0..waiters {
            let warehouse = Arc::clone(&warehouse);
            let ready_tx = ready_tx.clone();
            let done_tx = done_tx.clone();
            handles.push(thread::spawn(move || {
                let mut guard = warehouse.lock();
                ready_tx.send(()).expect("ready");
                while guard.current_stock() == 0 {
                    guard = guard.wait();
                }
                done_tx.send(guard.current_stock()).expect("done");
            }));
        }

        for _ in 0..waiters {
            ready_rx
                .recv_timeout(Duration::from_secs(1))
                .expect("waiter ready");
        }
        {
            // Acquiring here proves every waiter released the lock while suspended.
            let mut guard = warehouse.lock();
            guard.receive(2).expect("room");
            guard.notify_all();
        }

        for _ in 0..waiters {
            let seen = done_rx
                .recv_timeout(Duration::from_secs(1))
                .expect("waiter woke");
            assert_eq!(seen, 2);
        }
        for handle in handles {
            handle.join().expect("waiter thread panicked");
        }
    }

    #[test]
    fn table_holds_one_warehouse_per_color() {
        let warehouses = Warehouses::new(Capacities::new(1, 2, 3));
        for color in COLORS {
            let warehouse = warehouses.get(color);
            assert_eq!(warehouse.color(), color);
            assert_eq!(warehouse.capacity(), Capacities::new(1, 2, 3).get(color));
        }
        let colors: Vec<Color> = warehouses.snapshots().iter().map(|s| s.color).collect();
        assert_eq!(colors, COLORS.to_vec());
    }
}
