//! Statistical utilities shared by the thermocast crates.
//!
//! This crate provides:
//!
//! - **Descriptive statistics**: min, max, mean, median, variance and standard deviation
//! - **Quantiles**: nearest-rank quantiles and evenly spaced cut points over a sample
//! - **Regression metrics**: MAE, RMSE and R² between actual and predicted values
//!
//! # Modules
//!
//! - [`descriptive`]: Descriptive statistics for summarizing datasets
//! - [`quantile`]: Quantile computation and split-candidate selection
//! - [`metrics`]: Goodness-of-fit measures for regression models
//!
//! # Examples
//!
//! ## Computing descriptive statistics
//!
//! ```
//! use thermocast_stats::descriptive::DescriptiveStats;
//!
//! let values = [1.0, 2.0, 3.0, 4.0, 5.0];
//! let stats = DescriptiveStats::new(values).unwrap();
//! assert_eq!(stats.mean, 3.0);
//! ```
//!
//! ## Scoring a regression fit
//!
//! ```
//! use thermocast_stats::metrics::RegressionMetrics;
//!
//! let actual = [10.0, 12.0, 14.0];
//! let predicted = [10.0, 12.0, 14.0];
//! let metrics = RegressionMetrics::new(&actual, &predicted).unwrap();
//! assert_eq!(metrics.mae, 0.0);
//! assert_eq!(metrics.r2, 1.0);
//! ```

pub mod descriptive;
pub mod metrics;
pub mod quantile;
