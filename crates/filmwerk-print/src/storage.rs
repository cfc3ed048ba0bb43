// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// On-disk job storage.
//
//   <root>/<job uid>/F000001/FilmSession.json
//                           /FilmBox.json
//
// Pages are rendered from these snapshots, never from the live registry.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use filmwerk_core::error::{FilmwerkError, Result};
use filmwerk_core::film::{FilmBox, FilmSession};

const FILM_SESSION_FILE: &str = "FilmSession.json";
const FILM_BOX_FILE: &str = "FilmBox.json";

/// Root directory holding one folder per print job.
#[derive(Debug, Clone)]
pub struct JobStorage {
    root: PathBuf,
}

impl JobStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn job_dir(&self, job_uid: &str) -> PathBuf {
        self.root.join(job_uid)
    }

    /// Persist a batch of film boxes, numbering folders after the
    /// `existing` ones.  Returns the new folder names in order.
    #[instrument(skip(self, session, film_boxes), fields(films = film_boxes.len()))]
    pub fn persist(
        &self,
        job_uid: &str,
        session: &FilmSession,
        film_boxes: &[FilmBox],
        existing: usize,
    ) -> Result<Vec<String>> {
        if film_boxes.is_empty() {
            return Err(FilmwerkError::Storage("no film boxes to print".into()));
        }
        let job_dir = self.job_dir(job_uid);
        std::fs::create_dir_all(&job_dir)?;

        let session_json = serde_json::to_vec_pretty(session)?;
        let mut folders = Vec::with_capacity(film_boxes.len());
        for (index, film_box) in film_boxes.iter().enumerate() {
            let folder = format!("F{:06}", existing + index + 1);
            let dir = job_dir.join(&folder);
            std::fs::create_dir_all(&dir)?;
            std::fs::write(dir.join(FILM_SESSION_FILE), &session_json)?;
            std::fs::write(dir.join(FILM_BOX_FILE), serde_json::to_vec_pretty(film_box)?)?;
            debug!(folder = %folder, film_box = %film_box.sop_instance_uid, "film box persisted");
            folders.push(folder);
        }

        info!(dir = %job_dir.display(), films = folders.len(), "print job persisted");
        Ok(folders)
    }

    /// Read one persisted film back.
    pub fn load(&self, job_uid: &str, folder: &str) -> Result<(FilmSession, FilmBox)> {
        let dir = self.job_dir(job_uid).join(folder);
        let session: FilmSession = read_json(&dir.join(FILM_SESSION_FILE))?;
        let film_box: FilmBox = read_json(&dir.join(FILM_BOX_FILE))?;
        Ok((session, film_box))
    }

    /// Film folders of a job, in print order.
    pub fn folders(&self, job_uid: &str) -> Result<Vec<String>> {
        let mut folders: Vec<String> = std::fs::read_dir(self.job_dir(job_uid))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().join(FILM_BOX_FILE).is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.starts_with('F'))
            .collect();
        folders.sort();
        Ok(folders)
    }

    /// Remove a job folder and everything in it.
    pub fn delete_job(&self, job_uid: &str) {
        let dir = self.job_dir(job_uid);
        if dir.exists() {
            if let Err(e) = std::fs::remove_dir_all(&dir) {
                warn!(dir = %dir.display(), error = %e, "failed to remove print job folder");
            }
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| FilmwerkError::Storage(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&text)
        .map_err(|e| FilmwerkError::Storage(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use filmwerk_core::dataset::{Dataset, tags};

    fn session_with_boxes(count: usize) -> FilmSession {
        let mut session = FilmSession::new(
            None,
            Dataset::new().with(tags::FILM_SESSION_LABEL, "CHEST"),
            false,
        );
        for _ in 0..count {
            session
                .create_film_box(
                    None,
                    Dataset::new()
                        .with(tags::IMAGE_DISPLAY_FORMAT, "STANDARD\\1,1")
                        .with(tags::FILM_SIZE_ID, "14INX17IN"),
                )
                .unwrap();
        }
        session
    }

    #[test]
    fn persists_and_reloads_films() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = JobStorage::new(tmp.path());
        let session = session_with_boxes(2);

        let folders = storage.persist("1.2.3", &session, session.film_boxes(), 0).unwrap();
        assert_eq!(folders, vec!["F000001", "F000002"]);

        let (loaded_session, film_box) = storage.load("1.2.3", "F000002").unwrap();
        assert_eq!(loaded_session.label(), "CHEST");
        assert_eq!(film_box.sop_instance_uid, session.film_boxes()[1].sop_instance_uid);
        assert_eq!(film_box.layout().film_size_id.as_deref(), Some("14INX17IN"));
        assert_eq!(film_box.image_boxes().len(), 1);

        let more = storage.persist("1.2.3", &session, &session.film_boxes()[..1], 2).unwrap();
        assert_eq!(more, vec!["F000003"]);
        assert_eq!(storage.folders("1.2.3").unwrap().len(), 3);
    }

    #[test]
    fn empty_batch_is_rejected_and_delete_cleans_up() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = JobStorage::new(tmp.path());
        let session = session_with_boxes(0);

        assert!(matches!(
            storage.persist("9.9", &session, session.film_boxes(), 0),
            Err(FilmwerkError::Storage(_))
        ));

        let session = session_with_boxes(1);
        storage.persist("9.9", &session, session.film_boxes(), 0).unwrap();
        storage.delete_job("9.9");
        assert!(!storage.job_dir("9.9").exists());
        assert!(storage.load("9.9", "F000001").is_err());
    }
}
