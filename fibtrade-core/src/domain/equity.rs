use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account balance observed at a bar close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub balance: f64,
}
