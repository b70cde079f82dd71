//! JSON and TSV result writers for analysis outputs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::{RunName, SampleId, SampleTable};

/// Writes analysis results to JSON and TSV files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{run}_train.json`, `{run}_oob_curve.json`,
/// `{run}_importance.json`, `{run}_mds.json`, `{run}_tune.json`,
/// `{run}_impute.json`, and `{run}_imputed.tsv`.
///
/// Accepts primitives rather than model types, so the crate carries no
/// dependency on the analysis crates.
pub struct ResultWriter {
    output_dir: PathBuf,
    run: RunName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and run name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), run = %run))]
    pub fn new(output_dir: &Path, run: RunName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            run,
        })
    }

    /// Write a training summary to `{run}_train.json`.
    ///
    /// `class_metrics` entries are `(precision, recall, f1, support)`
    /// per class, parallel to `class_names`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip_all)]
    pub fn write_training(
        &self,
        n_trees: usize,
        mtry: usize,
        n_samples: usize,
        n_features: usize,
        class_names: &[String],
        oob_error: f64,
        class_errors: &[Option<f64>],
        confusion_matrix: &[Vec<usize>],
        class_metrics: &[(f64, f64, f64, usize)],
    ) -> Result<(), IoError> {
        let path = self
            .output_dir
            .join(format!("{}_train.json", self.run.as_str()));

        let classes: Vec<ClassEntry> = class_names
            .iter()
            .zip(class_metrics)
            .map(|(name, &(precision, recall, f1, support))| ClassEntry {
                class: name.as_str(),
                precision,
                recall,
                f1,
                support,
            })
            .collect();

        let artifact = TrainArtifact {
            run: self.run.as_str(),
            n_trees,
            mtry,
            n_samples,
            n_features,
            classes: class_names,
            oob_error,
            class_errors,
            confusion_matrix,
            class_metrics: classes,
        };

        let json = serde_json::to_string_pretty(&artifact).expect("serialization cannot fail");
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "training summary written");
        Ok(())
    }

    /// Write the OOB error trajectory to `{run}_oob_curve.json`.
    ///
    /// Each point is `(n_trees, overall_error, per_class_errors)`;
    /// `None` marks error rates that are not yet defined because no
    /// sample (or no sample of that class) had been out-of-bag.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all)]
    pub fn write_oob_curve(
        &self,
        class_names: &[String],
        curve: &[(usize, Option<f64>, Vec<Option<f64>>)],
    ) -> Result<(), IoError> {
        let path = self
            .output_dir
            .join(format!("{}_oob_curve.json", self.run.as_str()));

        let points: Vec<CurvePoint> = curve
            .iter()
            .map(|(n_trees, overall, per_class)| CurvePoint {
                n_trees: *n_trees,
                overall: *overall,
                per_class,
            })
            .collect();

        let artifact = CurveArtifact {
            run: self.run.as_str(),
            classes: class_names,
            n_points: points.len(),
            curve: points,
        };

        let json = serde_json::to_string_pretty(&artifact).expect("serialization cannot fail");
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "OOB curve written");
        Ok(())
    }

    /// Write ranked feature importances to `{run}_importance.json`.
    ///
    /// The three slices are parallel and expected in rank order; the
    /// first `top_k` entries are repeated under `top_features`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all)]
    pub fn write_importance(
        &self,
        feature_names: &[String],
        importances: &[f64],
        ranks: &[usize],
        top_k: usize,
    ) -> Result<(), IoError> {
        let path = self
            .output_dir
            .join(format!("{}_importance.json", self.run.as_str()));

        let features: Vec<FeatureEntry> = feature_names
            .iter()
            .zip(importances)
            .zip(ranks)
            .map(|((name, &importance), &rank)| FeatureEntry {
                name: name.as_str(),
                importance,
                rank,
            })
            .collect();
        let top_features = features[..top_k.min(features.len())].to_vec();

        let artifact = ImportanceArtifact {
            run: self.run.as_str(),
            n_features: features.len(),
            top_k,
            top_features,
            features,
        };

        let json = serde_json::to_string_pretty(&artifact).expect("serialization cannot fail");
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "importance ranking written");
        Ok(())
    }

    /// Write ordination coordinates to `{run}_mds.json`.
    ///
    /// `coordinates[i]` is the embedded position of `sample_ids[i]`;
    /// classes are resolved through `labels` and `class_names`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all)]
    pub fn write_embedding(
        &self,
        sample_ids: &[SampleId],
        class_names: &[String],
        labels: &[usize],
        coordinates: &[Vec<f64>],
        eigenvalues: &[f64],
        proportion_explained: &[f64],
    ) -> Result<(), IoError> {
        let path = self
            .output_dir
            .join(format!("{}_mds.json", self.run.as_str()));

        let points: Vec<EmbeddingPoint> = sample_ids
            .iter()
            .zip(labels)
            .zip(coordinates)
            .map(|((id, &label), point)| EmbeddingPoint {
                sample_id: id.as_str(),
                class: class_names.get(label).map_or("", String::as_str),
                coordinates: point,
            })
            .collect();

        let artifact = EmbeddingArtifact {
            run: self.run.as_str(),
            n_samples: points.len(),
            n_axes: eigenvalues.len(),
            eigenvalues,
            proportion_explained,
            points,
        };

        let json = serde_json::to_string_pretty(&artifact).expect("serialization cannot fail");
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "ordination written");
        Ok(())
    }

    /// Write a width-search summary to `{run}_tune.json`.
    ///
    /// `trials` entries are `(mtry, oob_error)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all)]
    pub fn write_tuning(
        &self,
        start_mtry: usize,
        best_mtry: usize,
        best_error: f64,
        trials: &[(usize, f64)],
    ) -> Result<(), IoError> {
        let path = self
            .output_dir
            .join(format!("{}_tune.json", self.run.as_str()));

        let entries: Vec<TrialEntry> = trials
            .iter()
            .map(|&(mtry, oob_error)| TrialEntry { mtry, oob_error })
            .collect();

        let artifact = TuneArtifact {
            run: self.run.as_str(),
            start_mtry,
            best_mtry,
            best_error,
            trials: entries,
        };

        let json = serde_json::to_string_pretty(&artifact).expect("serialization cannot fail");
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "tuning summary written");
        Ok(())
    }

    /// Write an imputation summary to `{run}_impute.json`.
    ///
    /// `iterations` entries are `(iteration, oob_error)` pairs from the
    /// preliminary forests, in iteration order.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all)]
    pub fn write_impute_stats(
        &self,
        n_samples: usize,
        n_features: usize,
        n_missing: usize,
        n_filled: usize,
        stopped_early: bool,
        iterations: &[(usize, f64)],
    ) -> Result<(), IoError> {
        let path = self
            .output_dir
            .join(format!("{}_impute.json", self.run.as_str()));

        let entries: Vec<IterationEntry> = iterations
            .iter()
            .map(|&(iteration, oob_error)| IterationEntry {
                iteration,
                oob_error,
            })
            .collect();

        let artifact = ImputeArtifact {
            run: self.run.as_str(),
            n_samples,
            n_features,
            n_missing,
            n_filled,
            iterations_run: entries.len(),
            stopped_early,
            iterations: entries,
        };

        let json = serde_json::to_string_pretty(&artifact).expect("serialization cannot fail");
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "imputation summary written");
        Ok(())
    }

    /// Write a completed table to `{run}_imputed.tsv`.
    ///
    /// `matrix[i]` replaces the feature row of `table`'s sample `i`.
    /// Columns come out in canonical order — sample id, label, then the
    /// features in file order — regardless of where the label column
    /// sat in the input.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::CsvWrite`] | A record cannot be encoded or written |
    /// | [`IoError::WriteFile`] | The output stream cannot be flushed |
    #[instrument(skip_all)]
    pub fn write_imputed_table(
        &self,
        table: &SampleTable,
        matrix: &[Vec<f64>],
    ) -> Result<(), IoError> {
        let path = self
            .output_dir
            .join(format!("{}_imputed.tsv", self.run.as_str()));

        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(&path)
            .map_err(|e| IoError::CsvWrite {
                path: path.clone(),
                source: e,
            })?;

        let mut header = Vec::with_capacity(2 + table.n_features());
        header.push(table.id_column().to_string());
        header.push(table.label_column().to_string());
        header.extend(table.feature_names().iter().cloned());
        wtr.write_record(&header).map_err(|e| IoError::CsvWrite {
            path: path.clone(),
            source: e,
        })?;

        for ((id, &label), row) in table.sample_ids().iter().zip(table.labels()).zip(matrix) {
            let mut record = Vec::with_capacity(2 + row.len());
            record.push(id.as_str().to_string());
            record.push(
                table
                    .class_names()
                    .get(label)
                    .cloned()
                    .unwrap_or_default(),
            );
            record.extend(row.iter().map(|v| v.to_string()));
            wtr.write_record(&record).map_err(|e| IoError::CsvWrite {
                path: path.clone(),
                source: e,
            })?;
        }

        wtr.flush().map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), n_rows = matrix.len(), "imputed table written");
        Ok(())
    }
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct TrainArtifact<'a> {
    run: &'a str,
    n_trees: usize,
    mtry: usize,
    n_samples: usize,
    n_features: usize,
    classes: &'a [String],
    oob_error: f64,
    class_errors: &'a [Option<f64>],
    confusion_matrix: &'a [Vec<usize>],
    class_metrics: Vec<ClassEntry<'a>>,
}

#[derive(Serialize)]
struct ClassEntry<'a> {
    class: &'a str,
    precision: f64,
    recall: f64,
    f1: f64,
    support: usize,
}

#[derive(Serialize)]
struct CurveArtifact<'a> {
    run: &'a str,
    classes: &'a [String],
    n_points: usize,
    curve: Vec<CurvePoint<'a>>,
}

#[derive(Serialize)]
struct CurvePoint<'a> {
    n_trees: usize,
    overall: Option<f64>,
    per_class: &'a [Option<f64>],
}

#[derive(Serialize)]
struct ImportanceArtifact<'a> {
    run: &'a str,
    n_features: usize,
    top_k: usize,
    top_features: Vec<FeatureEntry<'a>>,
    features: Vec<FeatureEntry<'a>>,
}

#[derive(Serialize, Clone)]
struct FeatureEntry<'a> {
    name: &'a str,
    importance: f64,
    rank: usize,
}

#[derive(Serialize)]
struct EmbeddingArtifact<'a> {
    run: &'a str,
    n_samples: usize,
    n_axes: usize,
    eigenvalues: &'a [f64],
    proportion_explained: &'a [f64],
    points: Vec<EmbeddingPoint<'a>>,
}

#[derive(Serialize)]
struct EmbeddingPoint<'a> {
    sample_id: &'a str,
    class: &'a str,
    coordinates: &'a [f64],
}

#[derive(Serialize)]
struct TuneArtifact<'a> {
    run: &'a str,
    start_mtry: usize,
    best_mtry: usize,
    best_error: f64,
    trials: Vec<TrialEntry>,
}

#[derive(Serialize)]
struct TrialEntry {
    mtry: usize,
    oob_error: f64,
}

#[derive(Serialize)]
struct ImputeArtifact<'a> {
    run: &'a str,
    n_samples: usize,
    n_features: usize,
    n_missing: usize,
    n_filled: usize,
    iterations_run: usize,
    stopped_early: bool,
    iterations: Vec<IterationEntry>,
}

#[derive(Serialize)]
struct IterationEntry {
    iteration: usize,
    oob_error: f64,
}
