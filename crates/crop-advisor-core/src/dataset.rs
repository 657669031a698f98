//! Training corpus loading and stratified splitting.
//!
//! The corpus is a CSV file with a header row and the columns
//! `N,P,K,temperature,humidity,ph,rainfall,label`. Extra columns are
//! ignored. Every feature must be a finite number and every label a
//! non-empty string; anything else rejects the whole corpus.

use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::PredictorError;
use crate::features::{Feature, FeatureVector, FEATURE_COUNT};

/// Name of the label column.
pub const LABEL_COLUMN: &str = "label";

#[derive(Debug, Deserialize)]
struct CorpusRecord {
    #[serde(rename = "N")]
    n: f64,
    #[serde(rename = "P")]
    p: f64,
    #[serde(rename = "K")]
    k: f64,
    temperature: f64,
    humidity: f64,
    ph: f64,
    rainfall: f64,
    label: String,
}

/// A labelled training corpus held in memory.
#[derive(Debug, Clone)]
pub struct Corpus {
    pub rows: Vec<[f64; FEATURE_COUNT]>,
    pub labels: Vec<String>,
    /// SHA-256 of the raw file bytes (hex).
    pub fingerprint: String,
    pub source: PathBuf,
}

impl Corpus {
    /// Reads and validates a corpus file.
    pub fn from_csv(path: &Path) -> Result<Self, PredictorError> {
        let bytes = std::fs::read(path).map_err(|e| PredictorError::corpus(path, e))?;
        Self::from_bytes(path, &bytes)
    }

    /// Parses corpus bytes; `path` is only used for error context.
    pub fn from_bytes(path: &Path, bytes: &[u8]) -> Result<Self, PredictorError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let headers = reader
            .headers()
            .map_err(|e| PredictorError::corpus(path, e))?
            .clone();
        for column in Feature::ALL
            .iter()
            .map(|f| f.name())
            .chain(std::iter::once(LABEL_COLUMN))
        {
            if !headers.iter().any(|h| h == column) {
                return Err(PredictorError::corpus(
                    path,
                    format!("missing column '{}'", column),
                ));
            }
        }

        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for (i, result) in reader.deserialize::<CorpusRecord>().enumerate() {
            let record_no = i + 1;
            let rec = result
                .map_err(|e| PredictorError::corpus(path, format!("record {}: {}", record_no, e)))?;
            let features = FeatureVector {
                n: rec.n,
                p: rec.p,
                k: rec.k,
                temperature: rec.temperature,
                humidity: rec.humidity,
                ph: rec.ph,
                rainfall: rec.rainfall,
            };
            features
                .check_finite()
                .map_err(|e| PredictorError::corpus(path, format!("record {}: {}", record_no, e)))?;
            if rec.label.is_empty() {
                return Err(PredictorError::corpus(
                    path,
                    format!("record {}: empty label", record_no),
                ));
            }
            rows.push(features.to_array());
            labels.push(rec.label);
        }

        if rows.is_empty() {
            return Err(PredictorError::corpus(path, "corpus has no rows"));
        }
        let mut distinct: Vec<&str> = labels.iter().map(String::as_str).collect();
        distinct.sort_unstable();
        distinct.dedup();
        if distinct.len() < 2 {
            return Err(PredictorError::corpus(
                path,
                "corpus needs at least two distinct labels",
            ));
        }

        Ok(Self {
            rows,
            labels,
            fingerprint: hex::encode(Sha256::digest(bytes)),
            source: path.to_path_buf(),
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Row indices of the training and held-out partitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Splits rows so that every class keeps its proportion in both partitions.
///
/// Each class with at least two rows contributes `round(count * test_fraction)`
/// rows to the held-out set, clamped to `[1, count - 1]`. Singleton classes
/// stay in training. Both index lists are returned in ascending order.
pub fn stratified_split(targets: &[usize], n_classes: usize, test_fraction: f64, seed: u64) -> Split {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut per_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (row, &class) in targets.iter().enumerate() {
        per_class[class].push(row);
    }

    let mut train = Vec::with_capacity(targets.len());
    let mut test = Vec::new();
    for mut rows in per_class {
        let count = rows.len();
        if count < 2 {
            train.extend(rows);
            continue;
        }
        rows.shuffle(&mut rng);
        let n_test = ((count as f64 * test_fraction).round() as usize).clamp(1, count - 1);
        test.extend_from_slice(&rows[..n_test]);
        train.extend_from_slice(&rows[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    Split { train, test }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "N,P,K,temperature,humidity,ph,rainfall,label";

    fn write_csv(body: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", body).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_csv() {
        let file = write_csv(&format!(
            "{}\n90,42,43,20.88,82.0,6.5,202.94,rice\n71,54,16,22.6,63.7,5.7,87.8,maize\n",
            HEADER
        ));
        let corpus = Corpus::from_csv(file.path()).unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.rows[0], [90.0, 42.0, 43.0, 20.88, 82.0, 6.5, 202.94]);
        assert_eq!(corpus.labels, vec!["rice", "maize"]);
        assert_eq!(corpus.fingerprint.len(), 64);
    }

    #[test]
    fn test_column_order_does_not_matter() {
        let file = write_csv(
            "label,rainfall,ph,humidity,temperature,K,P,N\nrice,200,6.5,80,25,43,42,90\nmaize,80,6,60,22,20,50,70\n",
        );
        let corpus = Corpus::from_csv(file.path()).unwrap();
        assert_eq!(corpus.rows[0], [90.0, 42.0, 43.0, 25.0, 80.0, 6.5, 200.0]);
    }

    #[test]
    fn test_missing_file() {
        let err = Corpus::from_csv(Path::new("/nonexistent/corpus.csv")).unwrap_err();
        assert!(matches!(err, PredictorError::CorpusRead { .. }));
    }

    #[test]
    fn test_missing_column() {
        let file = write_csv("N,P,K,temperature,humidity,ph,label\n1,2,3,4,5,6,rice\n");
        let err = Corpus::from_csv(file.path()).unwrap_err();
        assert!(err.to_string().contains("rainfall"), "{}", err);
    }

    #[test]
    fn test_non_numeric_feature() {
        let file = write_csv(&format!("{}\n90,abc,43,20,82,6.5,202,rice\n", HEADER));
        let err = Corpus::from_csv(file.path()).unwrap_err();
        assert!(matches!(err, PredictorError::CorpusRead { .. }));
        assert!(err.to_string().contains("record 1"), "{}", err);
    }

    #[test]
    fn test_missing_value() {
        let file = write_csv(&format!(
            "{}\n90,42,43,20,82,6.5,202,rice\n90,42,,20,82,6.5,202,maize\n",
            HEADER
        ));
        let err = Corpus::from_csv(file.path()).unwrap_err();
        assert!(err.to_string().contains("record 2"), "{}", err);
    }

    #[test]
    fn test_empty_label() {
        let file = write_csv(&format!("{}\n90,42,43,20,82,6.5,202,\n", HEADER));
        assert!(Corpus::from_csv(file.path()).is_err());
    }

    #[test]
    fn test_single_label_rejected() {
        let file = write_csv(&format!(
            "{}\n90,42,43,20,82,6.5,202,rice\n91,42,43,20,82,6.5,202,rice\n",
            HEADER
        ));
        let err = Corpus::from_csv(file.path()).unwrap_err();
        assert!(err.to_string().contains("two distinct"), "{}", err);
    }

    #[test]
    fn test_header_only_rejected() {
        let file = write_csv(&format!("{}\n", HEADER));
        assert!(Corpus::from_csv(file.path()).is_err());
    }

    #[test]
    fn test_stratified_split_preserves_proportions() {
        // 20 of class 0, 10 of class 1, 5 of class 2
        let mut targets = vec![0usize; 20];
        targets.extend(vec![1usize; 10]);
        targets.extend(vec![2usize; 5]);

        let split = stratified_split(&targets, 3, 0.2, 42);
        assert_eq!(split.train.len() + split.test.len(), targets.len());

        let count = |idx: &[usize], class: usize| idx.iter().filter(|&&i| targets[i] == class).count();
        assert_eq!(count(&split.test, 0), 4);
        assert_eq!(count(&split.test, 1), 2);
        assert_eq!(count(&split.test, 2), 1);

        let mut all: Vec<usize> = split.train.iter().chain(split.test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..targets.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_stratified_split_deterministic() {
        let targets: Vec<usize> = (0..60).map(|i| i % 3).collect();
        let a = stratified_split(&targets, 3, 0.2, 42);
        let b = stratified_split(&targets, 3, 0.2, 42);
        assert_eq!(a, b);
        let c = stratified_split(&targets, 3, 0.2, 7);
        assert_ne!(a.test, c.test);
    }

    #[test]
    fn test_stratified_split_singleton_class_trains() {
        let targets = vec![0, 0, 0, 0, 1];
        let split = stratified_split(&targets, 2, 0.2, 42);
        assert!(split.train.contains(&4));
        assert_eq!(split.test.len(), 1);
    }
}
