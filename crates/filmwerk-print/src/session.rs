// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-association registry of the film session, its film boxes and the
// print jobs submitted from it.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use filmwerk_core::dataset::Dataset;
use filmwerk_core::error::FilmwerkError;
use filmwerk_core::film::{FilmBox, FilmSession};
use filmwerk_core::protocol::DimseStatus;

use crate::job::PrintJob;

/// Why a registry operation was refused.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("a film session already exists on this association")]
    SessionExists,

    #[error("no film session has been created")]
    NoSession,

    #[error("no film session {0}")]
    NoSuchFilmSession(String),

    #[error("no film box {0}")]
    NoSuchFilmBox(String),

    #[error("no image box {0}")]
    NoSuchImageBox(String),

    #[error("film box rejected: {0}")]
    Initialization(#[from] FilmwerkError),
}

impl RegistryError {
    /// DIMSE status reported for this refusal.
    pub fn status(&self) -> DimseStatus {
        match self {
            Self::Initialization(_) => DimseStatus::ProcessingFailure,
            _ => DimseStatus::NoSuchObjectInstance,
        }
    }
}

pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// At most one film session per association.
#[derive(Debug, Default)]
pub struct FilmSessionRegistry {
    session: Option<FilmSession>,
    jobs: HashMap<String, Arc<PrintJob>>,
}

impl FilmSessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&FilmSession> {
        self.session.as_ref()
    }

    pub fn create_session(
        &mut self,
        sop_instance_uid: Option<&str>,
        attributes: Dataset,
        color: bool,
    ) -> RegistryResult<&FilmSession> {
        if self.session.is_some() {
            return Err(RegistryError::SessionExists);
        }
        let session = FilmSession::new(sop_instance_uid, attributes, color);
        info!(film_session = %session.sop_instance_uid, color, "film session created");
        Ok(self.session.insert(session))
    }

    /// Merge attributes into the session named by `sop_instance_uid`.
    pub fn set_session(&mut self, sop_instance_uid: &str, attributes: &Dataset) -> RegistryResult<&FilmSession> {
        let session = self.session_by_uid(sop_instance_uid)?;
        session.update(attributes);
        Ok(session)
    }

    /// Drop the session and every film box it owns.
    pub fn delete_session(&mut self, sop_instance_uid: &str) -> RegistryResult<()> {
        self.session_by_uid(sop_instance_uid)?;
        self.session = None;
        info!(film_session = sop_instance_uid, "film session deleted");
        Ok(())
    }

    pub fn create_film_box(
        &mut self,
        sop_instance_uid: Option<&str>,
        attributes: Dataset,
    ) -> RegistryResult<&FilmBox> {
        let session = self.session.as_mut().ok_or(RegistryError::NoSession)?;
        let film_box = session.create_film_box(sop_instance_uid, attributes)?;
        debug!(film_box = %film_box.sop_instance_uid, "film box created");
        Ok(film_box)
    }

    /// Merge attributes into a film box and re-initialize it.  The film box
    /// is unchanged when the result is not printable.
    pub fn set_film_box(&mut self, sop_instance_uid: &str, attributes: &Dataset) -> RegistryResult<&FilmBox> {
        let film_box = self
            .session
            .as_mut()
            .ok_or(RegistryError::NoSession)?
            .find_film_box_mut(sop_instance_uid)
            .ok_or_else(|| RegistryError::NoSuchFilmBox(sop_instance_uid.to_string()))?;
        film_box.update(attributes)?;
        Ok(film_box)
    }

    pub fn delete_film_box(&mut self, sop_instance_uid: &str) -> RegistryResult<()> {
        let session = self.session.as_mut().ok_or(RegistryError::NoSession)?;
        if session.delete_film_box(sop_instance_uid) {
            debug!(film_box = sop_instance_uid, "film box deleted");
            Ok(())
        } else {
            Err(RegistryError::NoSuchFilmBox(sop_instance_uid.to_string()))
        }
    }

    pub fn set_image_box(&mut self, sop_instance_uid: &str, attributes: &Dataset) -> RegistryResult<()> {
        let image_box = self
            .session
            .as_mut()
            .ok_or(RegistryError::NoSession)?
            .find_image_box_mut(sop_instance_uid)
            .ok_or_else(|| RegistryError::NoSuchImageBox(sop_instance_uid.to_string()))?;
        image_box.update(attributes);
        Ok(())
    }

    pub fn add_job(&mut self, job: Arc<PrintJob>) {
        self.jobs.insert(job.uid().to_string(), job);
    }

    pub fn job(&self, sop_instance_uid: &str) -> Option<&Arc<PrintJob>> {
        self.jobs.get(sop_instance_uid)
    }

    /// Forget the session, its film boxes and job references.  Running
    /// jobs are not affected.
    pub fn clear(&mut self) {
        if self.session.take().is_some() || !self.jobs.is_empty() {
            debug!(jobs = self.jobs.len(), "film session registry cleared");
        }
        self.jobs.clear();
    }

    fn session_by_uid(&mut self, sop_instance_uid: &str) -> RegistryResult<&mut FilmSession> {
        match self.session.as_mut() {
            Some(session) if session.sop_instance_uid == sop_instance_uid => Ok(session),
            Some(_) => Err(RegistryError::NoSuchFilmSession(sop_instance_uid.to_string())),
            None => Err(RegistryError::NoSession),
        }
    }
}
