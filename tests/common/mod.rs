#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

/// Soil/weather reading from the bundled corpus, labelled rice.
pub const RICE_READING: [f64; 7] = [90.0, 42.0, 43.0, 20.88, 82.0, 6.5, 202.94];

/// Writes a small four-crop corpus with well separated classes.
pub fn write_corpus(dir: &Path) -> PathBuf {
    let centres: [(&str, [f64; 7]); 4] = [
        ("rice", [80.0, 45.0, 40.0, 23.0, 82.0, 6.4, 230.0]),
        ("maize", [78.0, 48.0, 20.0, 22.0, 65.0, 6.2, 85.0]),
        ("chickpea", [40.0, 68.0, 80.0, 18.0, 16.0, 7.3, 80.0]),
        ("cotton", [118.0, 46.0, 20.0, 24.0, 80.0, 6.9, 80.0]),
    ];
    let spread = [8.0, 5.0, 4.0, 1.5, 2.0, 0.2, 15.0];

    let mut csv = String::from("N,P,K,temperature,humidity,ph,rainfall,label\n");
    csv.push_str("90,42,43,20.879744,82.002744,6.502985,202.935536,rice\n");
    for i in 0..25usize {
        for (c, (label, centre)) in centres.iter().enumerate() {
            let values: Vec<String> = centre
                .iter()
                .zip(spread.iter())
                .enumerate()
                .map(|(f, (m, s))| {
                    let step = ((i * 7 + f * 3 + c * 5) % 11) as f64 - 5.0;
                    format!("{:.3}", m + s * step / 5.0)
                })
                .collect();
            csv.push_str(&format!("{},{}\n", values.join(","), label));
        }
    }

    let path = dir.join("corpus.csv");
    fs::write(&path, csv).unwrap();
    path
}

/// TOML config rooted at `root`, training from `corpus` with a small forest.
pub fn config_toml(root: &Path, corpus: &Path) -> String {
    format!(
        r#"[db]
path = "{root}/data/crop.sqlite"

[model]
artifact_dir = "{root}/data/model"
corpus_path = "{corpus}"
n_trees = 15

[server]
bind = "127.0.0.1:0"

[logging]
level = "warn"
"#,
        root = root.display(),
        corpus = corpus.display()
    )
}
