// src/catalog.rs
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::models::PollMeta;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read poll catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse poll catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("poll {0} is listed more than once")]
    Duplicate(u64),
}

/// Poll metadata keyed by poll code.
#[derive(Debug, Clone, Default)]
pub struct PollCatalog {
    polls: HashMap<u64, PollMeta>,
}

impl PollCatalog {
    pub fn new(polls: impl IntoIterator<Item = PollMeta>) -> Result<Self, CatalogError> {
        let mut map = HashMap::new();
        for poll in polls {
            let code = poll.code;
            if map.insert(code, poll).is_some() {
                return Err(CatalogError::Duplicate(code));
            }
        }
        Ok(Self { polls: map })
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let polls: Vec<PollMeta> = serde_json::from_str(json)?;
        Self::new(polls)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn get_poll(&self, code: u64) -> Option<&PollMeta> {
        self.polls.get(&code)
    }

    pub fn len(&self) -> usize {
        self.polls.len()
    }
}
