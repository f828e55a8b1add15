use super::dock::DockReport;
use crate::core::models::result::Verdict;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TriageError {
    #[error("Failed to {action} '{path}': {source}", path = .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot promote '{file}': '{target}' is already occupied", file = .file.display(), target = .target.display())]
    TargetOccupied { file: PathBuf, target: PathBuf },

    #[error("Artifact '{path}' is neither in place nor in the binders directory", path = .path.display())]
    NotFound { path: PathBuf },
}

/// Decides which docked candidates keep their artifacts.
///
/// Candidates scoring at or above the cutoff are promoted into the binders directory;
/// everything else is deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct TriagePolicy {
    cutoff: f64,
    binders_dir: PathBuf,
}

impl TriagePolicy {
    pub fn new(cutoff: f64, binders_dir: PathBuf) -> Self {
        Self {
            cutoff,
            binders_dir,
        }
    }

    pub fn decide(&self, affinity: f64) -> Verdict {
        if affinity < self.cutoff {
            Verdict::Discarded
        } else {
            Verdict::Promoted
        }
    }

    /// Carries out `verdict` on the report's artifacts and returns where the retained
    /// files now live (empty for a discard).
    ///
    /// Safe to repeat: files already deleted or already moved are left alone.
    pub fn apply(&self, verdict: Verdict, report: &DockReport) -> Result<Vec<PathBuf>, TriageError> {
        match verdict {
            Verdict::Discarded => {
                for path in report.artifacts() {
                    discard(path)?;
                }
                Ok(Vec::new())
            }
            Verdict::Promoted => self.promote(&report.artifacts()),
        }
    }

    fn promote(&self, files: &[&Path]) -> Result<Vec<PathBuf>, TriageError> {
        fs::create_dir_all(&self.binders_dir).map_err(|source| TriageError::Io {
            action: "create",
            path: self.binders_dir.clone(),
            source,
        })?;

        // Check every file first so an occupied target never leaves a half-moved pair.
        let mut moves = Vec::with_capacity(files.len());
        let mut retained = Vec::with_capacity(files.len());
        for file in files {
            let Some(name) = file.file_name() else {
                return Err(TriageError::NotFound {
                    path: file.to_path_buf(),
                });
            };
            let target = self.binders_dir.join(name);
            match (file.exists(), target.exists()) {
                (true, true) => {
                    return Err(TriageError::TargetOccupied {
                        file: file.to_path_buf(),
                        target,
                    });
                }
                (true, false) => moves.push((*file, target.clone())),
                (false, true) => debug!("{:?} was already promoted.", target),
                (false, false) => {
                    return Err(TriageError::NotFound {
                        path: file.to_path_buf(),
                    });
                }
            }
            retained.push(target);
        }

        for (file, target) in moves {
            move_file(file, &target)?;
        }
        Ok(retained)
    }
}

fn discard(path: &Path) -> Result<(), TriageError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(TriageError::Io {
            action: "remove",
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn move_file(from: &Path, to: &Path) -> Result<(), TriageError> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    // Rename fails across file systems; fall back to copy and delete.
    fs::copy(from, to).map_err(|source| TriageError::Io {
        action: "copy",
        path: from.to_path_buf(),
        source,
    })?;
    fs::remove_file(from).map_err(|source| TriageError::Io {
        action: "remove",
        path: from.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Workspace {
        _dir: tempfile::TempDir,
        work: PathBuf,
        binders: PathBuf,
    }

    fn workspace() -> Workspace {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().to_path_buf();
        let binders = work.join("binders");
        Workspace {
            _dir: dir,
            work,
            binders,
        }
    }

    fn docked(work: &Path, stem: &str, affinity: f64) -> DockReport {
        let ligand = work.join(format!("{stem}.pdbqt"));
        let output = work.join(format!("{stem}_out.pdbqt"));
        fs::write(&ligand, "ligand").unwrap();
        fs::write(&output, "poses").unwrap();
        DockReport {
            affinity,
            ligand,
            output,
        }
    }

    #[test]
    fn cutoff_boundary_is_inclusive() {
        let policy = TriagePolicy::new(7.5, PathBuf::from("binders"));

        assert_eq!(policy.decide(7.5), Verdict::Promoted);
        assert_eq!(policy.decide(9.2), Verdict::Promoted);
        assert_eq!(policy.decide(6.5), Verdict::Discarded);
        assert_eq!(policy.decide(7.499), Verdict::Discarded);
    }

    #[test]
    fn discard_removes_both_artifacts_and_tolerates_repeats() {
        let ws = workspace();
        let report = docked(&ws.work, "A", 3.0);
        let policy = TriagePolicy::new(7.5, ws.binders.clone());

        assert!(policy.apply(Verdict::Discarded, &report).unwrap().is_empty());
        assert!(!report.ligand.exists());
        assert!(!report.output.exists());

        assert!(policy.apply(Verdict::Discarded, &report).is_ok());
        assert!(!ws.binders.exists());
    }

    #[test]
    fn promote_moves_the_pair_into_binders() {
        let ws = workspace();
        let report = docked(&ws.work, "C", 9.2);
        let policy = TriagePolicy::new(7.5, ws.binders.clone());

        let retained = policy.apply(Verdict::Promoted, &report).unwrap();

        assert_eq!(
            retained,
            vec![ws.binders.join("C.pdbqt"), ws.binders.join("C_out.pdbqt")]
        );
        assert_eq!(fs::read_to_string(&retained[0]).unwrap(), "ligand");
        assert_eq!(fs::read_to_string(&retained[1]).unwrap(), "poses");
        assert!(!report.ligand.exists());
        assert!(!report.output.exists());
    }

    #[test]
    fn promoting_an_already_moved_pair_is_a_no_op() {
        let ws = workspace();
        let report = docked(&ws.work, "B", 7.5);
        let policy = TriagePolicy::new(7.5, ws.binders.clone());
        let first = policy.apply(Verdict::Promoted, &report).unwrap();

        let second = policy.apply(Verdict::Promoted, &report).unwrap();

        assert_eq!(first, second);
        assert!(second.iter().all(|p| p.exists()));
    }

    #[test]
    fn occupied_target_leaves_every_artifact_in_place() {
        let ws = workspace();
        let report = docked(&ws.work, "D", 8.0);
        fs::create_dir_all(&ws.binders).unwrap();
        fs::write(ws.binders.join("D_out.pdbqt"), "older poses").unwrap();
        let policy = TriagePolicy::new(7.5, ws.binders.clone());

        let result = policy.apply(Verdict::Promoted, &report);

        assert!(matches!(
            result,
            Err(TriageError::TargetOccupied { ref file, .. }) if *file == report.output
        ));
        assert!(report.ligand.exists());
        assert!(report.output.exists());
        assert!(!ws.binders.join("D.pdbqt").exists());
        assert_eq!(
            fs::read_to_string(ws.binders.join("D_out.pdbqt")).unwrap(),
            "older poses"
        );
    }

    #[test]
    fn vanished_artifacts_are_reported_as_not_found() {
        let ws = workspace();
        let report = docked(&ws.work, "E", 8.0);
        fs::remove_file(&report.output).unwrap();
        let policy = TriagePolicy::new(7.5, ws.binders.clone());

        let result = policy.apply(Verdict::Promoted, &report);

        assert!(matches!(
            result,
            Err(TriageError::NotFound { ref path }) if *path == report.output
        ));
        assert!(report.ligand.exists());
    }
}
