//! Regression coverage on a synthetic metabolite-style profile: 90
//! samples over three balanced compartment classes and 172 features.
//!
//! Class 0 carries a strong offset on the first eight features; class 1
//! a moderate offset on the next twelve. Class 2 is baseline noise, so
//! classes 1 and 2 are the similar pair and any residual confusion
//! should land between them.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use taproot_rf::{ForestConfig, MtryRule, ProximityMode};

const N_PER_CLASS: usize = 30;
const N_FEATURES: usize = 172;

fn make_compartment_profiles() -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
    let mut rng = ChaCha8Rng::seed_from_u64(20_240_817);
    let mut features = Vec::with_capacity(3 * N_PER_CLASS);
    let mut labels = Vec::with_capacity(3 * N_PER_CLASS);
    for class in 0..3usize {
        for _ in 0..N_PER_CLASS {
            let mut row: Vec<f64> = (0..N_FEATURES).map(|_| rng.r#gen::<f64>()).collect();
            match class {
                0 => {
                    for value in &mut row[0..8] {
                        *value += 3.0;
                    }
                }
                1 => {
                    for value in &mut row[8..20] {
                        *value += 0.8;
                    }
                }
                _ => {}
            }
            features.push(row);
            labels.push(class);
        }
    }
    let names = (0..N_FEATURES).map(|i| format!("m{:03}", i + 1)).collect();
    (features, labels, names)
}

#[test]
fn ninety_sample_run_stays_under_five_percent_oob() {
    let (features, labels, names) = make_compartment_profiles();
    let model = ForestConfig::new(1000)
        .expect("valid config")
        .with_mtry(MtryRule::Fixed(13))
        .with_seed(8_675_309)
        .with_proximity(ProximityMode::Enabled)
        .fit(&features, &labels, &names)
        .expect("training succeeds");

    assert_eq!(model.metadata().mtry, 13);
    assert!(
        model.oob().error() < 0.05,
        "oob error {} not under 5%",
        model.oob().error()
    );

    // Every sample gets an OOB vote at this tree count, so confusion
    // rows account for the full class populations.
    let rows = model.confusion().as_rows();
    for row in rows {
        assert_eq!(row.iter().sum::<usize>(), N_PER_CLASS);
    }

    // Residual mistakes belong to the similar pair (classes 1 and 2),
    // not to the well-separated class 0.
    let class0_mixups = rows[0][1] + rows[0][2] + rows[1][0] + rows[2][0];
    let similar_pair_mixups = rows[1][2] + rows[2][1];
    assert!(
        class0_mixups <= similar_pair_mixups,
        "class 0 mixups {class0_mixups} exceed similar-pair mixups {similar_pair_mixups}"
    );

    let prox = model.proximity().expect("proximity enabled");
    assert_eq!(prox.n_samples(), 3 * N_PER_CLASS);
    for i in 0..prox.n_samples() {
        assert_eq!(prox.value(i, i), 1.0);
        for j in 0..i {
            let v = prox.value(i, j);
            assert!((0.0..=1.0).contains(&v));
            assert_eq!(v, prox.value(j, i));
        }
    }
}

#[test]
fn top_ten_importances_are_distinct_and_descending() {
    let (features, labels, names) = make_compartment_profiles();
    let model = ForestConfig::new(300)
        .expect("valid config")
        .with_mtry(MtryRule::Fixed(13))
        .with_seed(8_675_309)
        .fit(&features, &labels, &names)
        .expect("training succeeds");

    let top = model.top_features(10);
    assert_eq!(top.len(), 10);
    for pair in top.windows(2) {
        assert!(pair[0].importance >= pair[1].importance);
    }
    let mut seen: Vec<&str> = top.iter().map(|f| f.name.as_str()).collect();
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen.len(), 10, "duplicate names in top-10");

    // The informative columns are m001..m020; noise columns should not
    // crowd the head of the ranking.
    let informative = top
        .iter()
        .filter(|f| {
            f.name[1..]
                .parse::<usize>()
                .map(|column| column <= 20)
                .unwrap_or(false)
        })
        .count();
    assert!(informative >= 8, "only {informative} informative features in top-10");
}

#[test]
fn identical_seeds_reproduce_every_artifact() {
    let (features, labels, names) = make_compartment_profiles();
    let config = ForestConfig::new(150)
        .expect("valid config")
        .with_mtry(MtryRule::Fixed(13))
        .with_seed(8_675_309)
        .with_proximity(ProximityMode::Enabled);

    let first = config.fit(&features, &labels, &names).expect("training succeeds");
    let second = config.fit(&features, &labels, &names).expect("training succeeds");

    assert_eq!(first.oob().curve(), second.oob().curve());
    assert_eq!(first.confusion().as_rows(), second.confusion().as_rows());
    assert_eq!(first.importances(), second.importances());
    assert_eq!(
        first.proximity().expect("enabled").condensed(),
        second.proximity().expect("enabled").condensed()
    );
}

#[test]
fn default_width_is_rounded_square_root() {
    let (features, labels, names) = make_compartment_profiles();
    let model = ForestConfig::new(50)
        .expect("valid config")
        .with_seed(1)
        .fit(&features, &labels, &names)
        .expect("training succeeds");

    // sqrt(172) = 13.11 rounds to 13.
    assert_eq!(model.metadata().mtry, 13);
}

#[test]
fn oob_error_settles_after_a_few_hundred_trees() {
    let (features, labels, names) = make_compartment_profiles();
    let model = ForestConfig::new(500)
        .expect("valid config")
        .with_mtry(MtryRule::Fixed(13))
        .with_seed(4242)
        .fit(&features, &labels, &names)
        .expect("training succeeds");

    let tail: Vec<f64> = model.oob().curve()[300..]
        .iter()
        .map(|point| point.overall.expect("all samples voted by tree 300"))
        .collect();
    let max = tail.iter().cloned().fold(f64::MIN, f64::max);
    let min = tail.iter().cloned().fold(f64::MAX, f64::min);
    assert!(
        max - min <= 0.05,
        "late-curve spread {} exceeds tolerance",
        max - min
    );
}
