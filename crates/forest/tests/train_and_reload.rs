//! Train the real learners through the pipeline, persist them and load them
//! back the way the server does.

use data_loader::{Dataset, MovieRecord};
use forest::{Algo, ClassificationModel, ForestParams, RegressionModel};
use pipeline::{ArtifactStore, BinMode, ModelMode, TrainingConfig, train_classification, train_regression};
use std::path::PathBuf;
use tempfile::TempDir;

fn sample_dataset() -> Dataset {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../data-loader/tests/fixtures/movie_metadata_sample.csv");
    data_loader::load_movies(path).unwrap()
}

fn params() -> ForestParams {
    ForestParams {
        n_trees: 20,
        ..ForestParams::default()
    }
}

fn request(genres: Option<&str>) -> MovieRecord {
    MovieRecord {
        duration: Some(120.0),
        budget: Some(50_000_000.0),
        title_year: Some(2015.0),
        content_rating: Some("PG-13".into()),
        genres: genres.map(str::to_string),
    }
}

#[test]
fn test_forest_regression_round_trip() {
    let dataset = sample_dataset();
    let trained = train_regression(&dataset, &TrainingConfig::default(), RegressionModel::default()).unwrap();

    let dir = TempDir::new().unwrap();
    let store = ArtifactStore::open(dir.path());
    store.save(&trained.pipeline, &trained.metadata, &trained.metrics).unwrap();
    let loaded = store.load_regression::<RegressionModel>().unwrap();

    assert_eq!(loaded.pipeline.model().algo(), Algo::RandomForest);
    for genres in [Some("Action|Drama"), Some(""), None] {
        let before = trained.pipeline.predict_one(&request(genres)).unwrap();
        let after = loaded.pipeline.predict_one(&request(genres)).unwrap();
        assert_eq!(before, after);
        assert!((0.0..=10.0).contains(&after.predicted_score));
        assert!((0.0..=1.0).contains(&after.confidence));
    }
}

#[test]
fn test_forest_fits_training_split() {
    let dataset = sample_dataset();
    let model = RegressionModel::new(Algo::RandomForest, params());
    let trained = train_regression(&dataset, &TrainingConfig::default(), model).unwrap();
    let report = trained.metrics.regression.unwrap();
    // bagged trees grown to purity track the rows they were fit on
    assert!(report.train_r2 > 0.3, "train r2 {}", report.train_r2);
    assert!(report.train_rmse.is_finite());
}

#[test]
fn test_decision_tree_has_neutral_confidence() {
    let dataset = sample_dataset();
    let model = RegressionModel::new(Algo::DecisionTree, params());
    let trained = train_regression(&dataset, &TrainingConfig::default(), model).unwrap();
    let outcome = trained.pipeline.predict_one(&request(Some("Action"))).unwrap();
    assert_eq!(outcome.confidence, 0.5);
}

#[test]
fn test_forest_classification_round_trip() {
    let dataset = sample_dataset();
    let config = TrainingConfig {
        mode: ModelMode::Multiclass,
        bin_mode: BinMode::Fixed,
        ..TrainingConfig::default()
    };
    let model = ClassificationModel::new(Algo::RandomForest, ForestParams::classification());
    let trained = train_classification(&dataset, &config, model).unwrap();

    let dir = TempDir::new().unwrap();
    let store = ArtifactStore::open(dir.path());
    store.save(&trained.pipeline, &trained.metadata, &trained.metrics).unwrap();
    let loaded = store.load_classification::<ClassificationModel>().unwrap();

    assert_eq!(loaded.binning.n_classes(), 5);
    let before = trained
        .pipeline
        .classify(&request(Some("Action|Drama")), trained.binning.as_ref().unwrap())
        .unwrap();
    let after = loaded.pipeline.classify(&request(Some("Action|Drama")), &loaded.binning).unwrap();
    assert_eq!(before, after);

    let total: f64 = after.class_probabilities.values().sum();
    assert!((total - 1.0).abs() < 1e-9);
}
