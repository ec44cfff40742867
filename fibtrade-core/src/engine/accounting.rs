use chrono::{DateTime, Utc};

use crate::domain::EquityPoint;

/// Equity curve sampler: one seed point, then one point per processed bar.
#[derive(Debug, Clone)]
pub struct EquityRecorder {
    points: Vec<EquityPoint>,
}

impl EquityRecorder {
    /// Start a fresh curve with the initial balance at the first bar's timestamp.
    pub fn seed(balance: f64, first_timestamp: DateTime<Utc>) -> Self {
        Self {
            points: vec![EquityPoint {
                timestamp: first_timestamp,
                balance,
            }],
        }
    }

    /// Record the balance at a bar close. Called once per processed bar, trade or not.
    pub fn sample(&mut self, timestamp: DateTime<Utc>, balance: f64) -> EquityPoint {
        let point = EquityPoint { timestamp, balance };
        self.points.push(point);
        point
    }

    pub fn points(&self) -> &[EquityPoint] {
        &self.points
    }

    pub fn into_points(self) -> Vec<EquityPoint> {
        self.points
    }
}
