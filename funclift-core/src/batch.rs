//! Many extraction requests from one manifest
//!
//! Generated units land next to their source file, so requests are grouped
//! by source directory: one group runs in manifest order, different
//! directories run in parallel. Outcomes come back in manifest order.

use crate::config::ResolvedConfig;
use crate::error::RefactorError;
use crate::pipeline::{self, Extraction};
use crate::range::SourceRange;
use crate::report::{ExtractionReport, FailureReport, OutcomeReport};
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// `{ "requests": [ { "path": "...", "range": "L:C-L:C" } ] }`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchManifest {
    pub requests: Vec<BatchRequest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchRequest {
    pub path: PathBuf,
    pub range: SourceRange,
}

/// Load a manifest; relative request paths are taken from the manifest's directory
pub fn load_manifest(path: &Path) -> Result<BatchManifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest: {}", path.display()))?;
    let mut manifest: BatchManifest = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse manifest: {}", path.display()))?;

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    for request in &mut manifest.requests {
        if request.path.is_relative() {
            request.path = base.join(&request.path);
        }
    }
    Ok(manifest)
}

/// Result of one manifest entry
#[derive(Debug)]
pub struct BatchOutcome {
    pub request: BatchRequest,
    pub result: Result<Extraction, RefactorError>,
    /// Whether the generated unit was written
    pub written: bool,
}

impl BatchOutcome {
    pub fn report(&self) -> OutcomeReport {
        match &self.result {
            Ok(extraction) => OutcomeReport::Done(ExtractionReport::new(extraction, self.written)),
            Err(error) => OutcomeReport::Failed(FailureReport::new(error)),
        }
    }
}

/// Run every request; `write` hands successful extractions to the writer
///
/// `on_done` is called once per finished request, from worker threads.
pub fn run_batch(
    manifest: &BatchManifest,
    config: &ResolvedConfig,
    write: bool,
    on_done: &(dyn Fn() + Sync),
) -> Vec<BatchOutcome> {
    let mut groups: BTreeMap<&Path, Vec<usize>> = BTreeMap::new();
    for (index, request) in manifest.requests.iter().enumerate() {
        let directory = request.path.parent().unwrap_or_else(|| Path::new(""));
        groups.entry(directory).or_default().push(index);
    }
    info!(
        requests = manifest.requests.len(),
        directories = groups.len(),
        "running batch"
    );

    let mut outcomes: Vec<(usize, BatchOutcome)> = groups
        .into_par_iter()
        .flat_map_iter(|(_, indices)| {
            indices
                .into_iter()
                .map(|index| {
                    let outcome = run_one(&manifest.requests[index], config, write);
                    on_done();
                    (index, outcome)
                })
                .collect::<Vec<_>>()
        })
        .collect();

    outcomes.sort_by_key(|(index, _)| *index);
    outcomes.into_iter().map(|(_, outcome)| outcome).collect()
}

fn run_one(request: &BatchRequest, config: &ResolvedConfig, write: bool) -> BatchOutcome {
    let result = pipeline::execute(&request.path, request.range, config).and_then(|extraction| {
        if write {
            pipeline::write(&extraction, config.strict)?;
        }
        Ok(extraction)
    });
    let written = write && result.is_ok();
    BatchOutcome {
        request: request.clone(),
        result,
        written,
    }
}

/// Exit code of the first failed request, or 0
pub fn exit_code(outcomes: &[BatchOutcome]) -> i32 {
    outcomes
        .iter()
        .find_map(|outcome| outcome.result.as_ref().err())
        .map(RefactorError::exit_code)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const CALC: &str = r#"class Calc {
    int x;
    int run(int p) {
        int a = p + 1;
        int b = a * x;
        return b;
    }
}
"#;

    const OTHER: &str = r#"class Other {
    void m() {
        String s = "hi";
    }
}
"#;

    fn request(path: &Path, range: &str) -> BatchRequest {
        BatchRequest {
            path: path.to_path_buf(),
            range: range.parse().unwrap(),
        }
    }

    #[test]
    fn test_manifest_paths_are_relative_to_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = dir.path().join("batch.json");
        fs::write(
            &manifest_path,
            r#"{ "requests": [ { "path": "src/Calc.java", "range": "4:9-4:22" } ] }"#,
        )
        .unwrap();

        let manifest = load_manifest(&manifest_path).unwrap();
        assert_eq!(manifest.requests.len(), 1);
        assert_eq!(manifest.requests[0].path, dir.path().join("src/Calc.java"));
        assert_eq!(manifest.requests[0].range.to_string(), "4:9-4:22");
    }

    #[test]
    fn test_manifest_rejects_bad_range() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = dir.path().join("batch.json");
        fs::write(
            &manifest_path,
            r#"{ "requests": [ { "path": "A.java", "range": "9:9-1:1" } ] }"#,
        )
        .unwrap();
        assert!(load_manifest(&manifest_path).is_err());
    }

    #[test]
    fn test_outcomes_in_manifest_order() {
        let dir = tempfile::tempdir().unwrap();
        let calc = dir.path().join("Calc.java");
        let other = dir.path().join("Other.java");
        fs::write(&calc, CALC).unwrap();
        fs::write(&other, OTHER).unwrap();

        let manifest = BatchManifest {
            requests: vec![
                request(&other, "3:9-3:9"),
                request(&calc, "5:9-5:9"),
                request(&calc, "6:9-6:9"),
                request(&calc, "4:9-4:9"),
            ],
        };
        let finished = AtomicUsize::new(0);
        let outcomes = run_batch(&manifest, &ResolvedConfig::defaults(), false, &|| {
            finished.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(finished.load(Ordering::SeqCst), 4);
        let units: Vec<String> = outcomes
            .iter()
            .map(|outcome| match &outcome.result {
                Ok(extraction) => extraction.unit.name.clone(),
                Err(error) => format!("error:{}", error.exit_code()),
            })
            .collect();
        assert_eq!(units, vec!["S", "B", "error:2", "A"]);
        assert_eq!(exit_code(&outcomes), 2);
        assert!(outcomes.iter().all(|outcome| !outcome.written));
    }

    #[test]
    fn test_batch_writes_units() {
        let dir = tempfile::tempdir().unwrap();
        let calc = dir.path().join("Calc.java");
        fs::write(&calc, CALC).unwrap();

        let manifest = BatchManifest {
            requests: vec![request(&calc, "4:9-4:9"), request(&calc, "5:9-5:9")],
        };
        let outcomes = run_batch(&manifest, &ResolvedConfig::defaults(), true, &|| {});
        assert_eq!(exit_code(&outcomes), 0);
        assert!(dir.path().join("A.java").exists());
        assert!(dir.path().join("B.java").exists());
        assert!(outcomes.iter().all(|outcome| outcome.written));
    }

    #[test]
    fn test_strict_batch_second_write_of_same_unit_fails() {
        let dir = tempfile::tempdir().unwrap();
        let calc = dir.path().join("Calc.java");
        fs::write(&calc, CALC).unwrap();

        let config = ResolvedConfig {
            strict: true,
            ..ResolvedConfig::defaults()
        };
        let manifest = BatchManifest {
            requests: vec![request(&calc, "4:9-4:9"), request(&calc, "4:13-4:13")],
        };
        let outcomes = run_batch(&manifest, &config, true, &|| {});
        assert!(outcomes[0].result.is_ok());
        assert!(outcomes[1].result.is_err());
        assert_eq!(exit_code(&outcomes), 4);
    }

    #[test]
    fn test_same_unit_from_two_files_in_one_directory() {
        let dir = tempfile::tempdir().unwrap();
        let calc = dir.path().join("Calc.java");
        let twin = dir.path().join("Twin.java");
        fs::write(&calc, CALC).unwrap();
        fs::write(
            &twin,
            "class Twin {\n    void m() {\n        int b = 7;\n    }\n}\n",
        )
        .unwrap();
        let manifest = BatchManifest {
            requests: vec![request(&calc, "5:9-5:9"), request(&twin, "3:9-3:9")],
        };

        // Strict: the first request in manifest order always wins
        let strict = ResolvedConfig {
            strict: true,
            ..ResolvedConfig::defaults()
        };
        for _ in 0..20 {
            let _ = fs::remove_file(dir.path().join("B.java"));
            let outcomes = run_batch(&manifest, &strict, true, &|| {});
            assert!(outcomes[0].written);
            assert!(outcomes[1].result.is_err());
            assert!(fs::read_to_string(dir.path().join("B.java"))
                .unwrap()
                .contains("return a * x;"));
        }

        // Overwriting: the last request in manifest order always wins
        let outcomes = run_batch(&manifest, &ResolvedConfig::defaults(), true, &|| {});
        assert!(outcomes.iter().all(|outcome| outcome.written));
        assert!(fs::read_to_string(dir.path().join("B.java"))
            .unwrap()
            .contains("return 7;"));
    }
}
