use crate::core::io::archive::Record;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CandidateError {
    #[error("Record #{index} has no identifier on its second line")]
    MissingIdentifier { index: usize },
}

/// Files produced on disk while a candidate moves through the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateArtifacts {
    pub ligand: Option<PathBuf>,
    pub docking_output: Option<PathBuf>,
}

impl CandidateArtifacts {
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.ligand
            .iter()
            .chain(self.docking_output.iter())
            .map(PathBuf::as_path)
    }
}

/// One molecule taken from an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    pub index: usize,
    pub payload: Vec<u8>,
    pub artifacts: CandidateArtifacts,
}

impl Candidate {
    /// Builds a candidate from a split record; the identifier is the record's second line.
    pub fn from_record(record: Record) -> Result<Self, CandidateError> {
        let id = record
            .text()
            .lines()
            .nth(1)
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .ok_or(CandidateError::MissingIdentifier {
                index: record.index,
            })?;

        Ok(Self {
            id,
            index: record.index,
            payload: record.payload,
            artifacts: CandidateArtifacts::default(),
        })
    }

    /// File-system safe stem derived from the identifier, used to name every artifact.
    pub fn file_stem(&self) -> String {
        let stem: String = self
            .id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        stem.trim_start_matches('.').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: usize, text: &str) -> Record {
        Record {
            index,
            payload: text.as_bytes().to_vec(),
        }
    }

    #[test]
    fn identifier_is_taken_from_the_second_line() {
        let candidate =
            Candidate::from_record(record(4, "@<TRIPOS>MOLECULE\n  ZINC000012345  \n 5 4\n"))
                .unwrap();

        assert_eq!(candidate.id, "ZINC000012345");
        assert_eq!(candidate.index, 4);
        assert!(candidate.artifacts.paths().next().is_none());
    }

    #[test]
    fn record_without_identifier_is_rejected() {
        assert_eq!(
            Candidate::from_record(record(2, "@<TRIPOS>MOLECULE\n")),
            Err(CandidateError::MissingIdentifier { index: 2 })
        );
        assert_eq!(
            Candidate::from_record(record(3, "@<TRIPOS>MOLECULE\n   \nSMALL\n")),
            Err(CandidateError::MissingIdentifier { index: 3 })
        );
    }

    #[test]
    fn file_stem_replaces_path_separators_and_hidden_prefixes() {
        let candidate =
            Candidate::from_record(record(0, "@<TRIPOS>MOLECULE\n../evil/name 1\n")).unwrap();

        assert_eq!(candidate.file_stem(), "_evil_name_1");
    }

    #[test]
    fn artifact_paths_lists_attached_files_in_order() {
        let artifacts = CandidateArtifacts {
            ligand: Some(PathBuf::from("/w/Z1.pdbqt")),
            docking_output: Some(PathBuf::from("/w/Z1_out.pdbqt")),
        };

        let paths: Vec<&Path> = artifacts.paths().collect();

        assert_eq!(
            paths,
            vec![Path::new("/w/Z1.pdbqt"), Path::new("/w/Z1_out.pdbqt")]
        );
    }
}
