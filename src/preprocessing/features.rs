//! Feature engineering for the listing table
//!
//! Maps the cleaned listing table to the fixed five-feature matrix the
//! regressors consume: inverse mileage, registration year, power, monthly
//! payment, and the region-proximity flag. Every identifier, text, and
//! categorical column is excluded, as is the price target.

use ndarray::{Array1, Array2};
use polars::prelude::*;

use crate::data::{columns, Transmission};
use crate::error::{ArgusError, Result};

/// Feature columns, in matrix order. Mileage is inverted (1/km) before use:
/// price depreciation saturates at high mileage.
pub const FEATURE_COLUMNS: [&str; 5] = [
    columns::MILEAGE,
    columns::YEAR,
    columns::POWER,
    columns::MONTHLY,
    columns::REGION_FLAG,
];

/// Identity of one featurized listing, linking matrix rows back to the
/// source table.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRow {
    pub name: String,
    pub reference: String,
    /// Row position in the source table.
    pub row_index: usize,
}

/// Feature matrix and target for one transmission partition.
#[derive(Debug, Clone)]
pub struct ListingFeatures {
    pub x: Array2<f64>,
    pub y: Array1<f64>,
    pub rows: Vec<ListingRow>,
}

impl ListingFeatures {
    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }
}

/// Builds the feature matrix and price target for every listing of the
/// requested transmission type. Pure function of the table and filter.
///
/// A zero mileage would produce an infinite inverse-mileage feature; the
/// upstream cleaner guarantees strictly positive mileage and this function
/// does not defend against a violated contract.
pub fn features_for(df: &DataFrame, transmission: Transmission) -> Result<ListingFeatures> {
    let boite = df
        .column(columns::TRANSMISSION)
        .map_err(|_| ArgusError::ColumnNotFound(columns::TRANSMISSION.to_string()))?
        .as_materialized_series()
        .str()
        .map_err(|e| ArgusError::DataError(e.to_string()))?
        .clone();

    let label = transmission.label();
    let indices: Vec<usize> = boite
        .into_iter()
        .enumerate()
        .filter(|(_, v)| *v == Some(label))
        .map(|(i, _)| i)
        .collect();

    if indices.is_empty() {
        return Err(ArgusError::ValidationError(format!(
            "no listings with transmission {label:?}"
        )));
    }

    let col_data: Vec<Vec<f64>> = FEATURE_COLUMNS
        .iter()
        .map(|&name| column_as_f64(df, name))
        .collect::<Result<Vec<_>>>()?;

    let n_rows = indices.len();
    let n_cols = FEATURE_COLUMNS.len();
    let x = Array2::from_shape_fn((n_rows, n_cols), |(r, c)| {
        let v = col_data[c][indices[r]];
        if c == 0 {
            1.0 / v
        } else {
            v
        }
    });

    let prices = column_as_f64(df, columns::PRICE)?;
    let y = Array1::from_iter(indices.iter().map(|&i| prices[i]));

    let names = string_column(df, columns::NAME)?;
    let references = string_column(df, columns::REFERENCE)?;
    let rows = indices
        .iter()
        .map(|&i| ListingRow {
            name: names[i].clone(),
            reference: references[i].clone(),
            row_index: i,
        })
        .collect();

    Ok(ListingFeatures { x, y, rows })
}

/// Extracts one named column as f64 values (booleans become 0/1).
fn column_as_f64(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let series = df
        .column(name)
        .map_err(|_| ArgusError::ColumnNotFound(name.to_string()))?
        .as_materialized_series()
        .cast(&DataType::Float64)
        .map_err(|e| ArgusError::DataError(e.to_string()))?;

    Ok(series
        .f64()
        .map_err(|e| ArgusError::DataError(e.to_string()))?
        .into_iter()
        .map(|v| v.unwrap_or(0.0))
        .collect())
}

fn string_column(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let series = df
        .column(name)
        .map_err(|_| ArgusError::ColumnNotFound(name.to_string()))?
        .as_materialized_series()
        .clone();

    Ok(series
        .str()
        .map_err(|e| ArgusError::DataError(e.to_string()))?
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_df() -> DataFrame {
        df!(
            columns::REFERENCE => &["A-1", "A-2", "A-3", "A-4"],
            columns::NAME => &["RENAULT Zoe", "PEUGEOT 208", "FORD Fiesta", "MINI Cooper"],
            columns::BRAND => &["RENAULT", "PEUGEOT", "FORD", "MINI"],
            columns::MODEL => &["Zoe", "208", "Fiesta", "Cooper"],
            columns::POWER => &[90i64, 110, 75, 130],
            columns::ENERGY => &["Electrique", "Essence", "Essence", "Essence"],
            columns::YEAR => &[2020i64, 2018, 2016, 2021],
            columns::MILEAGE => &[8i64, 40_000, 90_000, 20_000],
            columns::TRANSMISSION => &["Manuelle", "Automatique", "Manuelle", "Automatique"],
            columns::PRICE => &[15_000i64, 13_500, 7_900, 21_000],
            columns::MONTHLY => &[210i64, 185, 120, 280],
            columns::LOCATION => &["75011 Paris", "92100 Boulogne", "33000 Bordeaux", "78000 Versailles"],
            columns::REGION_FLAG => &[true, true, false, true],
        )
        .unwrap()
    }

    #[test]
    fn test_inverse_mileage_is_exact() {
        let feats = features_for(&small_df(), Transmission::Manual).unwrap();
        // Mileage 8 inverts to exactly 0.125.
        assert_eq!(feats.x[[0, 0]], 1.0 / 8.0);
        assert_eq!(feats.x[[1, 0]], 1.0 / 90_000.0);
    }

    #[test]
    fn test_filters_by_transmission() {
        let feats = features_for(&small_df(), Transmission::Manual).unwrap();
        assert_eq!(feats.n_samples(), 2);
        assert_eq!(feats.rows[0].name, "RENAULT Zoe");
        assert_eq!(feats.rows[1].name, "FORD Fiesta");
        assert_eq!(feats.rows[0].row_index, 0);
        assert_eq!(feats.rows[1].row_index, 2);

        let feats = features_for(&small_df(), Transmission::Automatic).unwrap();
        assert_eq!(feats.n_samples(), 2);
        assert_eq!(feats.rows[1].reference, "A-4");
        assert_eq!(feats.rows[1].row_index, 3);
    }

    #[test]
    fn test_feature_order_and_target() {
        let feats = features_for(&small_df(), Transmission::Automatic).unwrap();
        // Row for A-2: [1/40000, 2018, 110, 185, 1.0]
        assert_eq!(feats.x[[0, 0]], 1.0 / 40_000.0);
        assert_eq!(feats.x[[0, 1]], 2018.0);
        assert_eq!(feats.x[[0, 2]], 110.0);
        assert_eq!(feats.x[[0, 3]], 185.0);
        assert_eq!(feats.x[[0, 4]], 1.0);
        assert_eq!(feats.y[0], 13_500.0);
    }

    #[test]
    fn test_region_flag_encodes_zero_one() {
        let feats = features_for(&small_df(), Transmission::Manual).unwrap();
        assert_eq!(feats.x[[0, 4]], 1.0);
        assert_eq!(feats.x[[1, 4]], 0.0);
    }

    #[test]
    fn test_empty_partition_is_fatal() {
        // First row only, which is a manual-transmission listing.
        let df = small_df().head(Some(1));
        let err = features_for(&df, Transmission::Automatic);
        assert!(matches!(err, Err(ArgusError::ValidationError(_))));
    }
}
