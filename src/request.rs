//! Line format for work requests.
//!
//! ```text
//! delivery <amount> <color>
//! order <orange> <blue> <aqua>
//! ```
//!
//! The field count picks the kind; the leading keyword is not checked.

use crate::delivery::Delivery;
use crate::error::RequestError;
use crate::order::Order;
use crate::types::{Amount, Color};

/// A parsed line, ready to be scheduled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkRequest {
    Delivery(Delivery),
    Order(Order),
}

impl WorkRequest {
    /// Short label used for thread names and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkRequest::Delivery(_) => "delivery",
            WorkRequest::Order(_) => "order",
        }
    }
}

pub fn parse_request(line: &str) -> Result<WorkRequest, RequestError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    match fields.as_slice() {
        [_, amount, color] => {
            let amount = parse_amount("delivery", amount)?;
            let color = color.parse::<Color>()?;
            Ok(WorkRequest::Delivery(Delivery::new(amount, color)))
        }
        [_, orange, blue, aqua] => Ok(WorkRequest::Order(Order::new([
            parse_amount("orange", orange)?,
            parse_amount("blue", blue)?,
            parse_amount("aqua", aqua)?,
        ]))),
        other => Err(RequestError::FieldCount(other.len())),
    }
}

fn parse_amount(field: &'static str, value: &str) -> Result<Amount, RequestError> {
    value
        .parse::<Amount>()
        .map_err(|_| RequestError::InvalidAmount {
            field,
            value: value.to_string(),
        })
}
