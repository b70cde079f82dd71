//! End-to-end integration tests: TSV -> impute/train/ordinate -> JSON -> deserialize.

use std::fs;
use std::path::Path;

use taproot_impute::{ImputeConfig, ImputeError, StopRule};
use taproot_io::{ResultWriter, RunName, TableReader};
use taproot_mds::classical_mds;
use taproot_rf::{ForestConfig, ProximityMode};
use tempfile::TempDir;

/// Path to the test fixture directory.
fn fixture_path(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn classes() -> Vec<String> {
    vec![
        "leaf".to_string(),
        "root".to_string(),
        "rhizosphere".to_string(),
    ]
}

#[test]
fn train_round_trip() {
    // 1. Read TSV (4 cells are missing) and fill it
    let table = TableReader::new(&fixture_path("metabolite_18x6.tsv"), "Factor", &classes())
        .read()
        .expect("fixture should parse");
    assert_eq!(table.n_samples(), 18);
    assert_eq!(table.n_features(), 6);
    assert_eq!(table.n_missing(), 4);

    let outcome = ImputeConfig::new()
        .with_trees(100)
        .with_stop_rule(StopRule::FixedIterations(3))
        .with_seed(11)
        .run(table.values(), table.labels(), table.feature_names())
        .unwrap();
    let matrix = outcome.matrix().rows().to_vec();

    // 2. Train with proximity for the ordination
    let model = ForestConfig::new(200)
        .unwrap()
        .with_proximity(ProximityMode::Enabled)
        .with_n_classes(table.n_classes())
        .with_seed(42)
        .fit(&matrix, table.labels(), table.feature_names())
        .unwrap();

    let embedding = classical_mds(
        &model.proximity().expect("proximity was enabled").condensed_distances(),
        table.n_samples(),
        2,
    )
    .unwrap();

    // 3. Write JSON artifacts
    let dir = TempDir::new().unwrap();
    let run = RunName::new("train_rt".into()).unwrap();
    let writer = ResultWriter::new(dir.path(), run).unwrap();

    let meta = model.metadata();
    let metrics: Vec<(f64, f64, f64, usize)> = model
        .confusion()
        .class_metrics()
        .iter()
        .map(|m| (m.precision, m.recall, m.f1, m.support))
        .collect();
    writer
        .write_training(
            meta.n_trees,
            meta.mtry,
            meta.n_samples,
            meta.n_features,
            table.class_names(),
            model.oob().error(),
            model.oob().class_errors(),
            model.confusion().as_rows(),
            &metrics,
        )
        .unwrap();

    let curve: Vec<(usize, Option<f64>, Vec<Option<f64>>)> = model
        .oob()
        .curve()
        .iter()
        .map(|p| (p.n_trees, p.overall, p.per_class.clone()))
        .collect();
    writer.write_oob_curve(table.class_names(), &curve).unwrap();

    let names: Vec<String> = model.importances().iter().map(|f| f.name.clone()).collect();
    let imps: Vec<f64> = model.importances().iter().map(|f| f.importance).collect();
    let ranks: Vec<usize> = model.importances().iter().map(|f| f.rank).collect();
    writer.write_importance(&names, &imps, &ranks, 3).unwrap();

    writer
        .write_embedding(
            table.sample_ids(),
            table.class_names(),
            table.labels(),
            embedding.coordinates(),
            embedding.eigenvalues(),
            embedding.proportion_explained(),
        )
        .unwrap();

    // 4. Deserialize back and verify
    let train: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("train_rt_train.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(train["run"], "train_rt");
    assert_eq!(train["n_trees"], 200);
    assert_eq!(train["mtry"], 2, "default width for 6 features");
    assert_eq!(train["n_samples"], 18);

    // Three well-separated classes should classify almost perfectly
    let oob_error = train["oob_error"].as_f64().unwrap();
    assert!(oob_error < 0.2, "OOB error {oob_error} too high");

    // Confusion rows sum to the per-class sample counts
    let confusion = train["confusion_matrix"].as_array().unwrap();
    assert_eq!(confusion.len(), 3);
    for row in confusion {
        let total: u64 = row
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_u64().unwrap())
            .sum();
        assert_eq!(total, 6);
    }
    assert_eq!(train["class_metrics"][0]["class"], "leaf");

    let curve_json: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("train_rt_oob_curve.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(curve_json["n_points"], 200);
    let last = &curve_json["curve"][199];
    assert_eq!(last["n_trees"], 200);
    assert!((last["overall"].as_f64().unwrap() - oob_error).abs() < 1e-12);

    let importance: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("train_rt_importance.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(importance["n_features"], 6);
    assert_eq!(importance["top_features"].as_array().unwrap().len(), 3);
    assert_eq!(importance["features"][0]["rank"], 1);

    let mds: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("train_rt_mds.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(mds["n_samples"], 18);
    assert_eq!(mds["n_axes"], 2);
    let points = mds["points"].as_array().unwrap();
    assert_eq!(points[0]["sample_id"], "Leaf_1");
    for point in points {
        assert_eq!(point["coordinates"].as_array().unwrap().len(), 2);
    }
    let n_leaf = points.iter().filter(|p| p["class"] == "leaf").count();
    assert_eq!(n_leaf, 6);

    // Samples of one compartment should sit closer together in the
    // ordination than samples of different compartments.
    let coords = embedding.coordinates();
    let labels = table.labels();
    let mut within = Vec::new();
    let mut between = Vec::new();
    for i in 0..coords.len() {
        for j in 0..i {
            let d = ((coords[i][0] - coords[j][0]).powi(2)
                + (coords[i][1] - coords[j][1]).powi(2))
            .sqrt();
            if labels[i] == labels[j] {
                within.push(d);
            } else {
                between.push(d);
            }
        }
    }
    let mean = |v: &[f64]| v.iter().sum::<f64>() / v.len() as f64;
    assert!(
        mean(&within) < mean(&between),
        "within-class mean {} should be below between-class mean {}",
        mean(&within),
        mean(&between)
    );
}

#[test]
fn impute_round_trip() {
    let table = TableReader::new(&fixture_path("metabolite_18x6.tsv"), "Factor", &classes())
        .read()
        .expect("fixture should parse");

    let outcome = ImputeConfig::new()
        .with_trees(100)
        .with_stop_rule(StopRule::FixedIterations(3))
        .with_seed(11)
        .run(table.values(), table.labels(), table.feature_names())
        .unwrap();

    assert_eq!(outcome.n_filled(), 4);
    assert_eq!(outcome.iterations().len(), 3);
    assert!(!outcome.stopped_early());
    for stat in outcome.iterations() {
        let err = stat.oob_error;
        assert!((0.0..=1.0).contains(&err), "OOB error {err} out of range");
    }

    let dir = TempDir::new().unwrap();
    let run = RunName::new("impute_rt".into()).unwrap();
    let writer = ResultWriter::new(dir.path(), run).unwrap();

    let stats: Vec<(usize, f64)> = outcome
        .iterations()
        .iter()
        .map(|s| (s.iteration, s.oob_error))
        .collect();
    writer
        .write_impute_stats(
            table.n_samples(),
            table.n_features(),
            table.n_missing(),
            outcome.n_filled(),
            outcome.stopped_early(),
            &stats,
        )
        .unwrap();
    writer
        .write_imputed_table(&table, outcome.matrix().rows())
        .unwrap();

    let stats_json: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("impute_rt_impute.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(stats_json["n_missing"], 4);
    assert_eq!(stats_json["n_filled"], 4);
    assert_eq!(stats_json["iterations_run"], 3);
    assert_eq!(stats_json["stopped_early"], false);

    // The written table must re-read as a complete dataset with the
    // observed cells intact.
    let reread = TableReader::new(
        &dir.path().join("impute_rt_imputed.tsv"),
        "Factor",
        &classes(),
    )
    .read()
    .unwrap();
    assert_eq!(reread.n_samples(), 18);
    assert_eq!(reread.n_missing(), 0);
    assert_eq!(reread.labels(), table.labels());
    assert_eq!(reread.values()[0][0], Some(10.1), "observed cell changed");

    // Root_4's m1 was missing; its fill must stay inside the observed
    // span of that column.
    let filled = reread.values()[9][0].unwrap();
    assert!(
        (1.0..=10.4).contains(&filled),
        "imputed value {filled} outside the observed span"
    );
}

#[test]
fn tune_round_trip() {
    let table = TableReader::new(&fixture_path("metabolite_18x6.tsv"), "Factor", &classes())
        .read()
        .expect("fixture should parse");
    let matrix = ImputeConfig::new()
        .with_trees(100)
        .with_stop_rule(StopRule::FixedIterations(2))
        .with_seed(11)
        .run(table.values(), table.labels(), table.feature_names())
        .unwrap()
        .into_matrix()
        .into_rows();

    let base = ForestConfig::new(150)
        .unwrap()
        .with_n_classes(table.n_classes())
        .with_seed(3);
    let result = taproot_rf::MtrySearch::new()
        .with_max_steps(4)
        .search(&base, &matrix, table.labels(), table.feature_names())
        .unwrap();

    let dir = TempDir::new().unwrap();
    let run = RunName::new("tune_rt".into()).unwrap();
    let writer = ResultWriter::new(dir.path(), run).unwrap();

    let trials: Vec<(usize, f64)> = result
        .trials()
        .iter()
        .map(|t| (t.mtry, t.oob_error))
        .collect();
    writer
        .write_tuning(
            result.start_mtry(),
            result.best_mtry(),
            result.best_error(),
            &trials,
        )
        .unwrap();

    let content: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("tune_rt_tune.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(content["start_mtry"], 2, "default width for 6 features");
    let best = content["best_mtry"].as_u64().unwrap();
    assert!((1..=6).contains(&best));
    let entries = content["trials"].as_array().unwrap();
    assert!(!entries.is_empty());

    // Trials come out asc by width with no repeats, and the best error
    // is the minimum among them.
    let widths: Vec<u64> = entries.iter().map(|t| t["mtry"].as_u64().unwrap()).collect();
    let mut sorted = widths.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(widths, sorted);
    let min_error = entries
        .iter()
        .map(|t| t["oob_error"].as_f64().unwrap())
        .fold(f64::INFINITY, f64::min);
    assert!((content["best_error"].as_f64().unwrap() - min_error).abs() < 1e-12);
}

#[test]
fn reader_fixture_files_match_expected_errors() {
    // jagged.tsv -> InconsistentRowLength
    let result = TableReader::new(&fixture_path("jagged.tsv"), "Factor", &classes()).read();
    assert!(
        matches!(
            result,
            Err(taproot_io::IoError::InconsistentRowLength { .. })
        ),
        "jagged.tsv should give InconsistentRowLength, got: {result:?}"
    );

    // unknown_label.tsv -> UnknownClassLabel
    let result = TableReader::new(&fixture_path("unknown_label.tsv"), "Factor", &classes()).read();
    assert!(
        matches!(result, Err(taproot_io::IoError::UnknownClassLabel { .. })),
        "unknown_label.tsv should give UnknownClassLabel, got: {result:?}"
    );

    // all_missing_column.tsv parses, but the imputer must refuse the
    // column that has no observed value at all.
    let table = TableReader::new(
        &fixture_path("all_missing_column.tsv"),
        "Factor",
        &classes(),
    )
    .read()
    .expect("reader accepts a fully missing column");
    assert_eq!(table.n_missing(), 6);

    let result = ImputeConfig::new()
        .with_trees(50)
        .with_seed(1)
        .run(table.values(), table.labels(), table.feature_names());
    assert!(
        matches!(
            result,
            Err(ImputeError::AllMissingColumn { feature_index: 1 })
        ),
        "expected AllMissingColumn for m2, got: {result:?}"
    );
}
