//! # Forest Crate
//!
//! CART decision trees and bagged random forests for the score model.
//!
//! ## Main Components
//!
//! - **tree**: Structure-of-arrays CART tree, grown on sample indices
//! - **impurity**: Variance (regression) and Gini (classification) criteria
//! - **forest**: Random forests and single-tree learners
//! - **models**: `RegressionModel` / `ClassificationModel`, implementing the
//!   pipeline's learner traits
//! - **params**: Hyper-parameters
//!
//! ## Example Usage
//!
//! ```ignore
//! use forest::{Algo, ForestParams, RegressionModel};
//! use pipeline::{TrainingConfig, train_regression};
//!
//! let model = RegressionModel::new(Algo::RandomForest, ForestParams::default());
//! let trained = train_regression(&dataset, &TrainingConfig::default(), model)?;
//! ```

pub mod error;
pub mod params;
pub mod impurity;
pub mod tree;
pub mod forest;
pub mod models;

pub use error::{ForestError, Result};
pub use forest::{DecisionTreeClassifier, DecisionTreeRegressor, RandomForestClassifier, RandomForestRegressor};
pub use models::{Algo, ClassificationModel, RegressionModel};
pub use params::{ForestParams, MaxFeatures, TreeParams};
pub use tree::Tree;
