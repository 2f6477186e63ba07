//! Listing table schema and data sources
//!
//! The cleaned listing table is produced by an upstream scraping/cleaning
//! collaborator; this module owns the schema contract, the transmission
//! partition label, and the injectable [`ListingSource`] abstraction used to
//! hand tables to the pipeline without coupling it to acquisition.

use std::fmt;
use std::fs::File;
use std::path::PathBuf;
use std::str::FromStr;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{ArgusError, Result};

/// Column names of the cleaned listing table.
pub mod columns {
    pub const REFERENCE: &str = "Référence";
    pub const NAME: &str = "Nom";
    pub const BRAND: &str = "Marque";
    pub const MODEL: &str = "Modèle";
    pub const POWER: &str = "Puissance";
    pub const ENERGY: &str = "Energie";
    pub const YEAR: &str = "Année";
    pub const MILEAGE: &str = "Kilomètre";
    pub const TRANSMISSION: &str = "Boite";
    pub const PRICE: &str = "Prix";
    pub const MONTHLY: &str = "Mensualité";
    pub const LOCATION: &str = "Localisation";
    pub const REGION_FLAG: &str = "IDF";
}

/// Columns that must be present and null-free in every listing table.
pub const REQUIRED_COLUMNS: [&str; 13] = [
    columns::REFERENCE,
    columns::NAME,
    columns::BRAND,
    columns::MODEL,
    columns::POWER,
    columns::ENERGY,
    columns::YEAR,
    columns::MILEAGE,
    columns::TRANSMISSION,
    columns::PRICE,
    columns::MONTHLY,
    columns::LOCATION,
    columns::REGION_FLAG,
];

/// Transmission partition of the listing table.
///
/// Models are trained and selected independently per partition; a candidate
/// fitted on one partition is never applied to the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transmission {
    Manual,
    Automatic,
}

impl Transmission {
    /// Label used in the `Boite` column of the listing table.
    pub fn label(&self) -> &'static str {
        match self {
            Transmission::Manual => "Manuelle",
            Transmission::Automatic => "Automatique",
        }
    }
}

impl fmt::Display for Transmission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Transmission {
    type Err = ArgusError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Manuelle" => Ok(Transmission::Manual),
            "Automatique" => Ok(Transmission::Automatic),
            other => Err(ArgusError::ValidationError(format!(
                "unknown transmission type: {other:?} (expected \"Manuelle\" or \"Automatique\")"
            ))),
        }
    }
}

/// Source of cleaned listing tables.
///
/// Acquisition (network retrieval, parsing, cleaning) lives behind this trait
/// so the pipeline never depends on network timing or availability.
pub trait ListingSource {
    fn fetch_listings(&self) -> Result<DataFrame>;
}

/// Loads the listing table from a JSON file (array of listing objects, the
/// format the upstream cleaner writes).
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ListingSource for JsonFileSource {
    fn fetch_listings(&self) -> Result<DataFrame> {
        let file = File::open(&self.path)
            .map_err(|e| ArgusError::DataError(format!("{}: {e}", self.path.display())))?;

        let df = JsonReader::new(file)
            .finish()
            .map_err(|e| ArgusError::DataError(e.to_string()))?;

        validate_listings(&df)?;
        Ok(df)
    }
}

/// Hands out an already-built DataFrame. Used by tests and callers that load
/// the table themselves.
pub struct MemorySource {
    df: DataFrame,
}

impl MemorySource {
    pub fn new(df: DataFrame) -> Self {
        Self { df }
    }
}

impl ListingSource for MemorySource {
    fn fetch_listings(&self) -> Result<DataFrame> {
        validate_listings(&self.df)?;
        Ok(self.df.clone())
    }
}

/// Checks the upstream cleaning contract at the boundary: required columns
/// present and null-free, unique references, positive mileage and price.
pub fn validate_listings(df: &DataFrame) -> Result<()> {
    for col in REQUIRED_COLUMNS {
        let column = df
            .column(col)
            .map_err(|_| ArgusError::ColumnNotFound(col.to_string()))?;

        let nulls = column.null_count();
        if nulls > 0 {
            return Err(ArgusError::DataError(format!(
                "column {col:?} has {nulls} null values"
            )));
        }
    }

    let references = df
        .column(columns::REFERENCE)?
        .as_materialized_series()
        .clone();
    let unique = references
        .n_unique()
        .map_err(|e| ArgusError::DataError(e.to_string()))?;
    if unique != df.height() {
        return Err(ArgusError::DataError(format!(
            "duplicate references: {} rows, {} unique",
            df.height(),
            unique
        )));
    }

    for col in [columns::MILEAGE, columns::PRICE] {
        let series = df
            .column(col)?
            .as_materialized_series()
            .cast(&DataType::Int64)
            .map_err(|e| ArgusError::DataError(e.to_string()))?;
        let min = series
            .i64()
            .map_err(|e| ArgusError::DataError(e.to_string()))?
            .min();
        if let Some(min) = min {
            if min <= 0 {
                return Err(ArgusError::DataError(format!(
                    "column {col:?} must be strictly positive, found {min}"
                )));
            }
        }
    }

    Ok(())
}
