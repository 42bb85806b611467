//! Capacity-bounded warehouses shared by concurrently running deliveries and
//! orders.
//!
//! Each warehouse is a mutex/condvar monitor. Deliveries add stock, filling
//! partially and waiting whenever the warehouse is full; orders wait until a
//! warehouse holds the whole requested amount and then take it in one step.
//! Every mutation wakes all waiters on that warehouse.

pub mod cli;
pub mod delivery;
pub mod dispatcher;
pub mod error;
pub mod input;
pub mod logging;
pub mod manifest;
pub mod order;
pub mod request;
pub mod sim;
pub mod task_queue;
pub mod types;
pub mod warehouse;
