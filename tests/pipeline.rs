use std::fs;

use gasview::data::cache::{DatasetCache, DatasetSource};
use gasview::predict::knn::KnnRegressor;
use gasview::predict::schema::PredictionRequest;
use gasview::predict;
use gasview::scatter::{build_scatter, ScatterRequest, ScatterStyle};
use tempfile::tempdir;

const DATASET: &str = "\
Time;Temperature;ProcessTemperature;AgentType;AgentFlow;SampleType;CatalystType;CatalystRatio;CarbonMonoxide;CarbonDioxide;Methane;Oxygen;Hydrogen;CalorificValue
29;500;1000;Oxygen;0.015;TWTS;Marble dust;10;20;12;4;1;30;6.5
29;500;1000;Oxygen;0.015;TWTS;Marble dust;10;22;13;5;1;32;6.9
10;480;800;Air;0.02;Leather scraps;None;0;14;15;6;3;18;4.2
12;470;900;Air;0.02;TWTS;Al-Ni;5;16;14;5;2;24;5.1
";

#[test]
fn cached_dataset_feeds_scatter_and_prediction() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("GasificationDataset.csv");
    fs::write(&path, DATASET).unwrap();
    let cache = DatasetCache::new(DatasetSource::new(&path));

    let snapshot = cache.get().unwrap();
    let figure = build_scatter(
        &snapshot,
        &ScatterRequest::new("Time", "Hydrogen")
            .with_size("CalorificValue")
            .with_hue("AgentType"),
        &ScatterStyle::default(),
    )
    .unwrap();
    assert_eq!(figure.point_count(), 4);
    assert_eq!(figure.series.len(), 2);

    let model = predict::load_or_fit(None, &cache, 2).unwrap();
    assert_eq!(model.sample_count(), 4);

    let response = predict::predict(&model, &PredictionRequest::default()).unwrap();
    assert_eq!(response.status, "200");
    assert!((response.data.h2_perc - 31.0).abs() < 1e-9);
    assert!((response.data.co_perc - 21.0).abs() < 1e-9);

    let saved = temp.path().join("model.json");
    model.save(&saved).unwrap();
    let reloaded: KnnRegressor = predict::load_or_fit(Some(&saved), &cache, 2).unwrap();
    assert_eq!(
        predict::predict(&reloaded, &PredictionRequest::default()).unwrap(),
        response
    );
    assert_eq!(cache.reload_count(), 1);
}
