//! Shared identifiers and quantities used across the system.

use std::fmt;
use std::str::FromStr;

use crate::error::RequestError;

/// Unit count for stock, capacity, and request amounts.
pub type Amount = u64;

/// Warehouse color. Doubles as the index into the fixed warehouse table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Color {
    Orange,
    Blue,
    Aqua,
}

/// Every color in table order; orders visit warehouses in this order.
pub const COLORS: [Color; 3] = [Color::Orange, Color::Blue, Color::Aqua];

impl Color {
    /// Position of this color's warehouse in the table.
    pub fn index(self) -> usize {
        match self {
            Color::Orange => 0,
            Color::Blue => 1,
            Color::Aqua => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Color::Orange => "orange",
            Color::Blue => "blue",
            Color::Aqua => "aqua",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Color {
    type Err = RequestError;

    /// Case-sensitive: only the exact lowercase names are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "orange" => Ok(Color::Orange),
            "blue" => Ok(Color::Blue),
            "aqua" => Ok(Color::Aqua),
            other => Err(RequestError::UnknownColor(other.to_string())),
        }
    }
}

/// Startup capacities, one per color in table order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capacities {
    pub orange: Amount,
    pub blue: Amount,
    pub aqua: Amount,
}

impl Capacities {
    pub fn new(orange: Amount, blue: Amount, aqua: Amount) -> Self {
        Self { orange, blue, aqua }
    }

    /// Same capacity for every warehouse.
    pub fn uniform(capacity: Amount) -> Self {
        Self::new(capacity, capacity, capacity)
    }

    pub fn get(&self, color: Color) -> Amount {
        match color {
            Color::Orange => self.orange,
            Color::Blue => self.blue,
            Color::Aqua => self.aqua,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_names_round_trip_and_match_table_order() {
        for (position, color) in COLORS.iter().enumerate() {
            assert_eq!(color.index(), position);
            assert_eq!(color.name().parse::<Color>().expect("known color"), *color);
        }
    }

    #[test]
    fn color_parse_is_case_sensitive() {
        assert!(matches!(
            "Orange".parse::<Color>(),
            Err(RequestError::UnknownColor(name)) if name == "Orange"
        ));
        assert!("purple".parse::<Color>().is_err());
    }

    #[test]
    fn capacities_lookup_by_color() {
        let caps = Capacities::new(1, 2, 3);
        assert_eq!(caps.get(Color::Orange), 1);
        assert_eq!(caps.get(Color::Blue), 2);
        assert_eq!(caps.get(Color::Aqua), 3);
        assert_eq!(Capacities::uniform(7), Capacities::new(7, 7, 7));
    }
}
