use super::DIAGNOSTIC_EXCERPT_CHARS;
use crate::core::models::candidate::Candidate;
use crate::core::process::{ProcessRunner, excerpt};
use crate::engine::config::ConverterConfig;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Failed to stage '{id}' for conversion at '{path}': {source}", path = .path.display())]
    Io {
        id: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to start converter '{program}' for '{id}': {source}")]
    Spawn {
        id: String,
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Conversion of '{id}' failed ({status}): {excerpt}", status = describe_exit(.exit_code))]
    Failed {
        id: String,
        exit_code: Option<i32>,
        excerpt: String,
    },

    #[error("Conversion of '{id}' produced no output file: {excerpt}")]
    MissingOutput { id: String, excerpt: String },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// Converted artifacts of one candidate, ready for docking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedPaths {
    pub ligand: PathBuf,
}

/// Removes the staged converter input when dropped, whatever the conversion outcome.
struct StagedInput(PathBuf);

impl Drop for StagedInput {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.0) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("Failed to remove staged converter input {:?}: {}", self.0, e);
            }
        }
    }
}

fn remove_if_present(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("Failed to remove {:?}: {}", path, e);
        }
    }
}

pub struct LigandConverter {
    runner: Arc<dyn ProcessRunner>,
    config: ConverterConfig,
}

impl LigandConverter {
    pub fn new(runner: Arc<dyn ProcessRunner>, config: ConverterConfig) -> Self {
        Self { runner, config }
    }

    /// Converts the candidate's raw record into a dock-ready file inside `work_dir`.
    ///
    /// Both files are named after the candidate's file stem, so two workers never share
    /// a path as long as they handle different candidates. The staged input is always
    /// removed; on failure any partial output is removed too.
    pub fn convert(
        &self,
        candidate: &Candidate,
        work_dir: &Path,
    ) -> Result<ConvertedPaths, ConvertError> {
        let stem = candidate.file_stem();
        let input = work_dir.join(format!("{}.{}", stem, self.config.input_format));
        let output = work_dir.join(format!("{}.{}", stem, self.config.output_format));

        // A leftover from an interrupted run would hide a converter that writes nothing.
        remove_if_present(&output);

        fs::write(&input, &candidate.payload).map_err(|source| ConvertError::Io {
            id: candidate.id.clone(),
            path: input.clone(),
            source,
        })?;
        let _staged = StagedInput(input.clone());

        let args = self.arguments(&input, &output);
        debug!(candidate = %candidate.id, "Converting ligand with {}.", self.config.program);
        let result = self
            .runner
            .invoke(&self.config.program, &args)
            .map_err(|source| ConvertError::Spawn {
                id: candidate.id.clone(),
                program: self.config.program.clone(),
                source,
            })?;

        if !result.success() {
            remove_if_present(&output);
            return Err(ConvertError::Failed {
                id: candidate.id.clone(),
                exit_code: result.exit_code,
                excerpt: excerpt(&result.combined(), DIAGNOSTIC_EXCERPT_CHARS),
            });
        }

        let produced = fs::metadata(&output).map(|m| m.len() > 0).unwrap_or(false);
        if !produced {
            remove_if_present(&output);
            return Err(ConvertError::MissingOutput {
                id: candidate.id.clone(),
                excerpt: excerpt(&result.combined(), DIAGNOSTIC_EXCERPT_CHARS),
            });
        }

        Ok(ConvertedPaths { ligand: output })
    }

    fn arguments(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            format!("-i{}", self.config.input_format).into(),
            input.into(),
            format!("-o{}", self.config.output_format).into(),
            output.into(),
            "--partialcharge".into(),
            self.config.partial_charge.as_str().into(),
        ];
        if self.config.add_polar_hydrogens {
            args.push("--AddPolarH".into());
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::archive::Record;
    use crate::core::process::ProcessOutput;
    use std::sync::Mutex;

    /// Stands in for the converter: optionally writes the output named by the fourth
    /// argument and records what it saw.
    struct FakeConverter {
        exit_code: Option<i32>,
        output_content: Option<&'static str>,
        stderr: &'static str,
        seen: Mutex<Vec<(Vec<OsString>, Option<String>)>>,
    }

    impl FakeConverter {
        fn new(exit_code: Option<i32>, output_content: Option<&'static str>) -> Self {
            Self {
                exit_code,
                output_content,
                stderr: "",
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl ProcessRunner for FakeConverter {
        fn invoke(&self, _program: &str, args: &[OsString]) -> io::Result<ProcessOutput> {
            let staged = fs::read_to_string(&args[1]).ok();
            self.seen.lock().unwrap().push((args.to_vec(), staged));
            if let Some(content) = self.output_content {
                fs::write(&args[3], content)?;
            }
            Ok(ProcessOutput {
                exit_code: self.exit_code,
                stdout: String::new(),
                stderr: self.stderr.to_string(),
            })
        }
    }

    fn candidate(id: &str) -> Candidate {
        Candidate::from_record(Record {
            index: 0,
            payload: format!("@<TRIPOS>MOLECULE\n{}\n 3 2\n", id).into_bytes(),
        })
        .unwrap()
    }

    #[test]
    fn successful_conversion_returns_output_and_removes_staged_input() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeConverter::new(Some(0), Some("REMARK pdbqt\n")));
        let converter = LigandConverter::new(runner.clone(), ConverterConfig::default());

        let paths = converter.convert(&candidate("ZINC01"), dir.path()).unwrap();

        assert_eq!(paths.ligand, dir.path().join("ZINC01.pdbqt"));
        assert!(paths.ligand.exists());
        assert!(!dir.path().join("ZINC01.mol2").exists());

        let seen = runner.seen.lock().unwrap();
        let (args, staged) = &seen[0];
        assert_eq!(
            staged.as_deref(),
            Some("@<TRIPOS>MOLECULE\nZINC01\n 3 2\n")
        );
        let expected: Vec<OsString> = vec![
            "-imol2".into(),
            dir.path().join("ZINC01.mol2").into(),
            "-opdbqt".into(),
            dir.path().join("ZINC01.pdbqt").into(),
            "--partialcharge".into(),
            "gasteiger".into(),
            "--AddPolarH".into(),
        ];
        assert_eq!(args, &expected);
    }

    #[test]
    fn nonzero_exit_fails_and_cleans_up_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FakeConverter {
            stderr: "1 molecule converted\nerror: bad valence",
            ..FakeConverter::new(Some(1), Some("partial"))
        };
        let converter = LigandConverter::new(Arc::new(runner), ConverterConfig::default());

        let err = converter
            .convert(&candidate("ZINC02"), dir.path())
            .unwrap_err();

        match err {
            ConvertError::Failed {
                id,
                exit_code,
                excerpt,
            } => {
                assert_eq!(id, "ZINC02");
                assert_eq!(exit_code, Some(1));
                assert!(excerpt.ends_with("error: bad valence"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!dir.path().join("ZINC02.mol2").exists());
        assert!(!dir.path().join("ZINC02.pdbqt").exists());
    }

    #[test]
    fn clean_exit_without_output_is_missing_output() {
        let dir = tempfile::tempdir().unwrap();
        let converter = LigandConverter::new(
            Arc::new(FakeConverter::new(Some(0), None)),
            ConverterConfig::default(),
        );

        let err = converter
            .convert(&candidate("ZINC03"), dir.path())
            .unwrap_err();

        assert!(matches!(err, ConvertError::MissingOutput { ref id, .. } if id == "ZINC03"));
    }

    #[test]
    fn stale_output_from_an_earlier_run_is_not_mistaken_for_success() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ZINC04.pdbqt"), "stale").unwrap();
        let converter = LigandConverter::new(
            Arc::new(FakeConverter::new(Some(0), None)),
            ConverterConfig::default(),
        );

        let result = converter.convert(&candidate("ZINC04"), dir.path());

        assert!(matches!(result, Err(ConvertError::MissingOutput { .. })));
        assert!(!dir.path().join("ZINC04.pdbqt").exists());
    }

    #[test]
    fn polar_hydrogens_flag_is_optional() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeConverter::new(Some(0), Some("x")));
        let config = ConverterConfig {
            add_polar_hydrogens: false,
            ..Default::default()
        };

        LigandConverter::new(runner.clone(), config)
            .convert(&candidate("ZINC05"), dir.path())
            .unwrap();

        let seen = runner.seen.lock().unwrap();
        assert!(!seen[0].0.iter().any(|a| a == "--AddPolarH"));
    }
}
