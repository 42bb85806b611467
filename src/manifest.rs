//! Completion records produced by deliveries and orders.

use std::fmt;
use std::time::Duration;

use crate::types::{Amount, Color};

/// What a finished task did, with how long it took.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Manifest {
    pub elapsed: Duration,
    pub kind: ManifestKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ManifestKind {
    Delivery { amount: Amount, color: Color },
    Order { amounts: [Amount; 3] },
}

impl Manifest {
    pub fn delivery(elapsed: Duration, amount: Amount, color: Color) -> Self {
        Self {
            elapsed,
            kind: ManifestKind::Delivery { amount, color },
        }
    }

    pub fn order(elapsed: Duration, amounts: [Amount; 3]) -> Self {
        Self {
            elapsed,
            kind: ManifestKind::Order { amounts },
        }
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.elapsed.as_millis()
    }
}

impl fmt::Display for Manifest {
    /// Order lines keep their trailing space.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ManifestKind::Delivery { amount, color } => {
                write!(f, "{} deliver {} {}", self.elapsed_ms(), amount, color)
            }
            ManifestKind::Order {
                amounts: [orange, blue, aqua],
            } => write!(
                f,
                "{} order {} {} {} ",
                self.elapsed_ms(),
                orange,
                blue,
                aqua
            ),
        }
    }
}
