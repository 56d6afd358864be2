//! statistics over a history snapshot

use crate::domain::{round1, FieldStats, Reading, Stats};

use std::fmt;

/// why no statistics could be computed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoDataError {
    /// the snapshot was empty
    Empty,
    /// the snapshot held readings, but none of them were valid
    NoValidReadings,
}

impl fmt::Display for NoDataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "no data available"),
            Self::NoValidReadings => write!(f, "no valid readings"),
        }
    }
}

impl std::error::Error for NoDataError {}

/// compute current/min/max/avg for temperature and humidity
///
/// invalid entries are skipped even though the buffer never stores them.
pub fn compute(snapshot: &[Reading]) -> Result<Stats, NoDataError> {
    if snapshot.is_empty() {
        return Err(NoDataError::Empty);
    }

    let valid: Vec<(&Reading, f64, f64)> = snapshot
        .iter()
        .filter_map(|r| r.values().map(|(t, h)| (r, t, h)))
        .collect();

    let Some(&(last, _, _)) = valid.last() else {
        return Err(NoDataError::NoValidReadings);
    };

    let temps: Vec<f64> = valid.iter().map(|&(_, t, _)| t).collect();
    let hums: Vec<f64> = valid.iter().map(|&(_, _, h)| h).collect();

    Ok(Stats {
        temperature: field_stats(&temps),
        humidity: field_stats(&hums),
        readings_count: valid.len(),
        last_updated: last.timestamp(),
    })
}

// caller guarantees `values` is non-empty
fn field_stats(values: &[f64]) -> FieldStats {
    let current = values[values.len() - 1];
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg = values.iter().sum::<f64>() / values.len() as f64;

    FieldStats {
        current,
        min,
        max,
        avg: round1(avg),
    }
}
