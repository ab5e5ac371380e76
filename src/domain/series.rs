use super::error::ModelError;
use serde::{Deserialize, Serialize};

/// Dense `(nb_scn, horizon)` matrix of values, row-major by scenario.
///
/// Serialized as a nested list, one inner list per scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct TimeSeries {
    nb_scn: usize,
    horizon: usize,
    values: Vec<f64>,
}

impl TimeSeries {
    pub fn constant(nb_scn: usize, horizon: usize, value: f64) -> Self {
        Self {
            nb_scn,
            horizon,
            values: vec![value; nb_scn * horizon],
        }
    }

    pub fn zeros(nb_scn: usize, horizon: usize) -> Self {
        Self::constant(nb_scn, horizon, 0.0)
    }

    /// Build from one row per scenario. Rows must all have the same length.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, ModelError> {
        let nb_scn = rows.len();
        let horizon = rows.first().map_or(0, Vec::len);
        if let Some((scn, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != horizon) {
            return Err(ModelError::RaggedSeries {
                scenario: scn,
                expected: horizon,
                found: row.len(),
            });
        }

        Ok(Self {
            nb_scn,
            horizon,
            values: rows.into_iter().flatten().collect(),
        })
    }

    /// Build from a flat row-major buffer.
    pub fn from_flat(nb_scn: usize, horizon: usize, values: Vec<f64>) -> Result<Self, ModelError> {
        if values.len() != nb_scn * horizon {
            return Err(ModelError::RaggedSeries {
                scenario: 0,
                expected: nb_scn * horizon,
                found: values.len(),
            });
        }
        Ok(Self {
            nb_scn,
            horizon,
            values,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nb_scn, self.horizon)
    }

    pub fn nb_scn(&self) -> usize {
        self.nb_scn
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn at(&self, scn: usize, t: usize) -> Result<f64, ModelError> {
        if scn >= self.nb_scn || t >= self.horizon {
            return Err(ModelError::OutOfRange {
                scenario: scn,
                t,
                shape: self.shape(),
            });
        }
        Ok(self.values[scn * self.horizon + t])
    }

    pub fn set(&mut self, scn: usize, t: usize, value: f64) {
        self.values[scn * self.horizon + t] = value;
    }

    pub fn row(&self, scn: usize) -> &[f64] {
        &self.values[scn * self.horizon..(scn + 1) * self.horizon]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }
}

impl TryFrom<Vec<Vec<f64>>> for TimeSeries {
    type Error = ModelError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl From<TimeSeries> for Vec<Vec<f64>> {
    fn from(series: TimeSeries) -> Self {
        (0..series.nb_scn).map(|s| series.row(s).to_vec()).collect()
    }
}
