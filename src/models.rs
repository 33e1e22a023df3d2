// models.rs
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize, Serializer};

use crate::render::format_timestamp;

/// Operation kind the warehouse writes once a poll has been closed on chain.
pub const FINAL_CHOICE: &str = "FINAL_CHOICE";

/// Bucket for ballots that name an option the poll does not have.
pub const NOT_VALID: &str = "Not valid";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollOption {
    pub id: String,
    pub title: String,
}

/// Poll metadata as published by the governance portal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollMeta {
    pub code: u64,
    pub title: String,
    #[serde(default)]
    pub options: Vec<PollOption>,
}

#[derive(Debug, Clone, Copy, PartialEq, sqlx::FromRow)]
pub struct PollWindow {
    pub start_timestamp: NaiveDateTime,
    pub end_timestamp: NaiveDateTime,
}

/// One row of the warehouse `votes` table.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct VoteOperation {
    pub timestamp: NaiveDateTime,
    pub tx_hash: Option<String>,
    pub voter: Option<String>,
    pub operation: Option<String>,
    pub dapproval: Option<f64>,
    pub option: Option<String>,
    pub proxy: Option<String>,
}

impl VoteOperation {
    pub fn is_final_choice(&self) -> bool {
        self.operation.as_deref() == Some(FINAL_CHOICE)
    }

    pub fn voter_address(&self) -> &str {
        self.voter.as_deref().unwrap_or_default()
    }

    pub fn amount(&self) -> f64 {
        self.dapproval.unwrap_or(0.0)
    }

    /// Option identifiers in the order the voter listed them.
    pub fn choices(&self) -> impl Iterator<Item = &str> {
        self.option.as_deref().unwrap_or_default().split(',')
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct VotingPower {
    pub voter: String,
    pub voting_power: Option<f64>,
}

/// Display row of the operations log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationRow {
    #[serde(rename = "TIME", serialize_with = "serialize_timestamp")]
    pub time: NaiveDateTime,
    #[serde(rename = "ADDRESS")]
    pub address: String,
    #[serde(rename = "PROXY")]
    pub proxy: String,
    #[serde(rename = "OPERATION")]
    pub operation: String,
    #[serde(rename = "OPTION")]
    pub option: String,
    #[serde(rename = "APPROVAL")]
    pub approval: String,
    #[serde(rename = "AMOUNT")]
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollResult {
    pub poll_start: String,
    pub poll_end: String,
    pub last_vote: String,
    pub num_voters: usize,
    pub approval: String,
    pub options: String,
    pub not_valid_num: u64,
    pub not_valid_stake: String,
    pub operations: Vec<OperationRow>,
    pub operations_num: String,
}

/// Envelope returned to JSON consumers.
#[derive(Debug, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "lowercase")]
pub enum ApiResponse {
    Success(Box<PollResult>),
    Failure(String),
}

fn serialize_timestamp<S: Serializer>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(*ts))
}
