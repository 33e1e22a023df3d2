// src/poll.rs
use std::collections::HashMap;

use crate::aggregate::{aggregate, apply_voting_power, is_closed};
use crate::catalog::PollCatalog;
use crate::db::{ensure_connected, Warehouse};
use crate::error::PollError;
use crate::models::{ApiResponse, PollMeta, PollResult};
use crate::pages::Page;
use crate::render::format_timestamp;

/// Poll codes are plain ASCII decimal numbers; anything else is unknown.
pub fn parse_poll_code(raw: &str) -> Option<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

pub struct PollService<W> {
    warehouse: W,
    catalog: PollCatalog,
    tx_explorer_url: String,
}

impl<W: Warehouse> PollService<W> {
    pub fn new(warehouse: W, catalog: PollCatalog, tx_explorer_url: impl Into<String>) -> Self {
        Self {
            warehouse,
            catalog,
            tx_explorer_url: tx_explorer_url.into(),
        }
    }

    fn lookup(&self, raw: &str) -> Result<&PollMeta, PollError> {
        parse_poll_code(raw)
            .and_then(|code| self.catalog.get_poll(code))
            .ok_or(PollError::UnknownPoll)
    }

    pub async fn compute_poll_result(&self, raw: &str) -> Result<PollResult, PollError> {
        let meta = self.lookup(raw)?;
        ensure_connected(&self.warehouse).await?;

        let window = self
            .warehouse
            .poll_window(meta.code)
            .await?
            .ok_or_else(|| PollError::Backend(format!("no voting window recorded for poll {}", meta.code)))?;

        let mut operations = self.warehouse.vote_operations(meta.code).await?;

        if !is_closed(&operations) {
            let snapshot: HashMap<String, f64> = self
                .warehouse
                .voting_power()
                .await?
                .into_iter()
                .filter_map(|row| row.voting_power.map(|power| (row.voter, power)))
                .collect();
            tracing::debug!(poll = meta.code, voters = snapshot.len(), "applying live voting power");
            apply_voting_power(&mut operations, &snapshot);
        }

        Ok(aggregate(meta, &window, &operations, &self.tx_explorer_url))
    }

    /// Data entry point: never fails, the outcome is carried in the envelope.
    pub async fn poll_data(&self, raw: &str) -> ApiResponse {
        match self.compute_poll_result(raw).await {
            Ok(result) => ApiResponse::Success(Box::new(result)),
            Err(PollError::UnknownPoll) => {
                tracing::info!(poll = raw, "unknown poll requested");
                ApiResponse::Failure(PollError::UnknownPoll.to_string())
            }
            Err(e) => {
                tracing::error!(poll = raw, "poll data failed: {}", e);
                ApiResponse::Failure(e.to_string())
            }
        }
    }

    async fn page_context(&self, raw: &str) -> Result<Page, PollError> {
        let meta = self.lookup(raw)?;
        ensure_connected(&self.warehouse).await?;

        let refresh = self
            .warehouse
            .last_load()
            .await?
            .map(format_timestamp)
            .unwrap_or_default();

        Ok(Page::Poll {
            code: meta.code,
            title: meta.title.clone(),
            refresh,
        })
    }

    /// Page entry point: resolves the poll and refresh time only, the page
    /// itself loads results from the data route.
    pub async fn poll_page(&self, raw: &str) -> Page {
        match self.page_context(raw).await {
            Ok(page) => page,
            Err(PollError::UnknownPoll) => Page::Unknown {
                object_name: "poll",
                object_value: raw.to_string(),
            },
            Err(e) => {
                tracing::error!(poll = raw, "poll page failed: {}", e);
                let message = match e {
                    PollError::Backend(message) => message,
                    other => other.to_string(),
                };
                Page::Error { message }
            }
        }
    }
}
