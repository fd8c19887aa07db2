//! The single persisted document holding every project.

use serde::Serialize;
use serde_json::Value;

use crate::decode::{Decode, Fields};
use crate::error::{CorruptStoreError, DecodeError};
use crate::ids::ProjectId;
use crate::model::Project;

/// Format version of the persisted collection.
pub const STORE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProjectCollection {
    pub projects: Vec<Project>,
}

#[derive(Serialize)]
struct Envelope<'a> {
    version: u32,
    projects: &'a [Project],
}

impl ProjectCollection {
    pub fn new(projects: Vec<Project>) -> Self {
        Self { projects }
    }

    pub fn position(&self, id: &ProjectId) -> Option<usize> {
        self.projects.iter().position(|project| &project.id == id)
    }

    pub fn get(&self, id: &ProjectId) -> Option<&Project> {
        self.projects.iter().find(|project| &project.id == id)
    }

    /// Parse and fully validate a stored blob. Any structural mismatch rejects
    /// the whole collection.
    pub fn parse(raw: &str) -> Result<Self, CorruptStoreError> {
        let value: Value = serde_json::from_str(raw)?;
        Ok(Self::decode(&value, "")?)
    }

    pub fn serialize(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&Envelope {
            version: STORE_VERSION,
            projects: &self.projects,
        })
    }
}

impl Decode for ProjectCollection {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        let f = Fields::of(value, path)?;
        f.required_with("version", |v, p| match v.as_u64() {
            Some(n) if n == u64::from(STORE_VERSION) => Ok(()),
            _ => Err(DecodeError::new(p, format!("version {STORE_VERSION}"))),
        })?;
        Ok(Self {
            projects: f.required("projects")?,
        })
    }
}
