//! Monthly macroeconomic panel

use crate::error::{RegimeError, Result};
use chrono::{Datelike, Months, NaiveDate};
use ndarray::{s, Array1, Array2};
use std::collections::{BTreeMap, HashSet};

/// Contiguous monthly observations of raw macro variables.
///
/// Rows are months, columns are variables. Immutable once built.
#[derive(Debug, Clone)]
pub struct MacroPanel {
    months: Vec<NaiveDate>,
    names: Vec<String>,
    values: Array2<f64>,
}

impl MacroPanel {
    /// Build a panel from a value matrix.
    ///
    /// Months are normalized to the first day of the month and must be
    /// consecutive calendar months. All values must be finite.
    pub fn new(months: Vec<NaiveDate>, names: Vec<String>, values: Array2<f64>) -> Result<Self> {
        if months.is_empty() || names.is_empty() {
            return Err(RegimeError::InsufficientData(
                "panel needs at least one month and one variable".to_string(),
            ));
        }
        if values.nrows() != months.len() || values.ncols() != names.len() {
            return Err(RegimeError::InvalidInput(format!(
                "panel shape {}x{} does not match {} months x {} variables",
                values.nrows(),
                values.ncols(),
                months.len(),
                names.len()
            )));
        }

        let mut seen = HashSet::new();
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(RegimeError::InvalidInput(format!(
                    "duplicate variable name: {}",
                    name
                )));
            }
        }

        if let Some(((i, j), v)) = values.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(RegimeError::InvalidInput(format!(
                "non-finite value {} for {} at row {}",
                v, names[j], i
            )));
        }

        let months: Vec<NaiveDate> = months.into_iter().map(first_of_month).collect();
        for pair in months.windows(2) {
            let expected = pair[0].checked_add_months(Months::new(1));
            if expected != Some(pair[1]) {
                return Err(RegimeError::InvalidInput(format!(
                    "months are not contiguous: {} is followed by {}",
                    pair[0], pair[1]
                )));
            }
        }

        Ok(Self {
            months,
            names,
            values,
        })
    }

    /// Build a panel from per-month name/value maps.
    ///
    /// Every month must carry exactly the same variable set; otherwise the
    /// panel is ragged and rejected. Columns are ordered by name.
    pub fn from_observations(observations: Vec<(NaiveDate, BTreeMap<String, f64>)>) -> Result<Self> {
        let names: Vec<String> = match observations.first() {
            Some((_, first)) => first.keys().cloned().collect(),
            None => {
                return Err(RegimeError::InsufficientData(
                    "no observations supplied".to_string(),
                ))
            }
        };

        let mut months = Vec::with_capacity(observations.len());
        let mut values = Array2::zeros((observations.len(), names.len()));

        for (i, (month, obs)) in observations.into_iter().enumerate() {
            if obs.len() != names.len() || !obs.keys().zip(&names).all(|(a, b)| a == b) {
                return Err(RegimeError::InvalidInput(format!(
                    "ragged panel: month {} has variables {:?}, expected {:?}",
                    month,
                    obs.keys().collect::<Vec<_>>(),
                    names
                )));
            }
            for (j, v) in obs.values().enumerate() {
                values[[i, j]] = *v;
            }
            months.push(month);
        }

        Self::new(months, names, values)
    }

    /// Months covered by the panel
    pub fn months(&self) -> &[NaiveDate] {
        &self.months
    }

    /// Variable names in column order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Raw value matrix (months x variables)
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Number of months
    pub fn n_months(&self) -> usize {
        self.months.len()
    }

    /// Number of variables
    pub fn n_variables(&self) -> usize {
        self.names.len()
    }

    /// Get a variable's series by name
    pub fn column(&self, name: &str) -> Option<Array1<f64>> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.values.column(idx).to_owned())
    }

    /// Sub-panel covering months `start..end`
    pub fn slice(&self, start: usize, end: usize) -> Result<MacroPanel> {
        if start >= end || end > self.n_months() {
            return Err(RegimeError::InvalidInput(format!(
                "invalid month range {}..{} for panel of {} months",
                start,
                end,
                self.n_months()
            )));
        }
        Ok(MacroPanel {
            months: self.months[start..end].to_vec(),
            names: self.names.clone(),
            values: self.values.slice(s![start..end, ..]).to_owned(),
        })
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn month(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn test_new_normalizes_days() {
        let panel = MacroPanel::new(
            vec![
                NaiveDate::from_ymd_opt(2020, 11, 30).unwrap(),
                NaiveDate::from_ymd_opt(2020, 12, 15).unwrap(),
                month(2021, 1),
            ],
            vec!["UNRATE".to_string()],
            array![[3.5], [3.6], [3.7]],
        )
        .unwrap();

        assert_eq!(panel.months()[0], month(2020, 11));
        assert_eq!(panel.months()[2], month(2021, 1));
        assert_eq!(panel.n_months(), 3);
    }

    #[test]
    fn test_gap_rejected() {
        let result = MacroPanel::new(
            vec![month(2020, 1), month(2020, 3)],
            vec!["UNRATE".to_string()],
            array![[3.5], [3.6]],
        );
        assert!(matches!(result, Err(RegimeError::InvalidInput(_))));
    }

    #[test]
    fn test_non_finite_rejected() {
        let result = MacroPanel::new(
            vec![month(2020, 1), month(2020, 2)],
            vec!["UNRATE".to_string()],
            array![[3.5], [f64::NAN]],
        );
        assert!(matches!(result, Err(RegimeError::InvalidInput(_))));
    }

    #[test]
    fn test_ragged_observations_rejected() {
        let mut a = BTreeMap::new();
        a.insert("UNRATE".to_string(), 3.5);
        a.insert("INDPRO".to_string(), 100.0);
        let mut b = BTreeMap::new();
        b.insert("UNRATE".to_string(), 3.6);

        let result = MacroPanel::from_observations(vec![(month(2020, 1), a), (month(2020, 2), b)]);
        assert!(matches!(result, Err(RegimeError::InvalidInput(_))));
    }

    #[test]
    fn test_from_observations_orders_columns() {
        let mut a = BTreeMap::new();
        a.insert("UNRATE".to_string(), 3.5);
        a.insert("INDPRO".to_string(), 100.0);
        let mut b = BTreeMap::new();
        b.insert("INDPRO".to_string(), 101.0);
        b.insert("UNRATE".to_string(), 3.6);

        let panel =
            MacroPanel::from_observations(vec![(month(2020, 1), a), (month(2020, 2), b)]).unwrap();
        assert_eq!(panel.names(), &["INDPRO".to_string(), "UNRATE".to_string()]);
        assert_eq!(panel.column("INDPRO").unwrap().to_vec(), vec![100.0, 101.0]);
    }

    #[test]
    fn test_slice() {
        let panel = MacroPanel::new(
            vec![month(2020, 1), month(2020, 2), month(2020, 3)],
            vec!["UNRATE".to_string()],
            array![[3.5], [3.6], [3.7]],
        )
        .unwrap();

        let sub = panel.slice(1, 3).unwrap();
        assert_eq!(sub.n_months(), 2);
        assert_eq!(sub.months()[0], month(2020, 2));
        assert!(panel.slice(2, 2).is_err());
    }
}
