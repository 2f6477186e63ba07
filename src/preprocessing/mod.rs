//! Feature engineering and scaling

pub mod features;
pub mod scaler;

pub use features::{features_for, ListingFeatures, ListingRow, FEATURE_COLUMNS};
pub use scaler::{Scaler, ScalerKind};
