// src/aggregate.rs
//! Tallying of warehouse vote operations into poll results.
//!
//! Operations arrive most-recent-first. Each voter is counted once, using
//! their latest operation that happened no later than the poll end.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDateTime, SubsecRound};

use crate::models::{
    OperationRow, PollMeta, PollResult, PollWindow, VoteOperation, FINAL_CHOICE, NOT_VALID,
};
use crate::render::{format_amount, format_count, format_timestamp, html_table, link};

const LEADERBOARD_HEADER: [&str; 4] = ["Option", "Option name", "Stake (MKR)", "Votes"];

#[derive(Debug, Clone, PartialEq)]
pub struct OptionTally {
    pub id: String,
    pub title: String,
    pub votes: u64,
    pub stake: f64,
}

impl OptionTally {
    fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            votes: 0,
            stake: 0.0,
        }
    }
}

/// Poll options in metadata order, followed by the `Not valid` bucket.
#[derive(Debug, Clone)]
pub struct OptionBook {
    entries: Vec<OptionTally>,
    index: HashMap<String, usize>,
}

impl OptionBook {
    pub fn new(meta: &PollMeta) -> Self {
        let mut entries: Vec<OptionTally> = Vec::with_capacity(meta.options.len() + 1);
        let mut index: HashMap<String, usize> = HashMap::with_capacity(meta.options.len() + 1);
        for option in &meta.options {
            if index.contains_key(&option.id) || option.id == NOT_VALID {
                continue;
            }
            index.insert(option.id.clone(), entries.len());
            entries.push(OptionTally::new(&option.id, &option.title));
        }
        index.insert(NOT_VALID.to_string(), entries.len());
        entries.push(OptionTally::new(NOT_VALID, NOT_VALID));
        Self { entries, index }
    }

    fn not_valid_slot(&self) -> usize {
        self.entries.len() - 1
    }

    fn slot(&self, choice: &str) -> usize {
        self.index
            .get(choice)
            .copied()
            .unwrap_or_else(|| self.not_valid_slot())
    }

    pub fn title(&self, choice: &str) -> &str {
        &self.entries[self.slot(choice)].title
    }

    fn record(&mut self, choice: &str, amount: f64) {
        let slot = self.slot(choice);
        let entry = &mut self.entries[slot];
        entry.votes += 1;
        entry.stake += amount;
    }

    /// Splits off the `Not valid` bucket, returning `(options, not_valid)`.
    pub fn into_parts(mut self) -> (Vec<OptionTally>, OptionTally) {
        let not_valid = self.entries.pop().unwrap_or_else(|| OptionTally::new(NOT_VALID, NOT_VALID));
        (self.entries, not_valid)
    }

    #[cfg(test)]
    fn entries(&self) -> &[OptionTally] {
        &self.entries
    }
}

#[derive(Debug, Clone)]
pub struct Tally {
    pub options: OptionBook,
    pub approval: f64,
    pub voters: usize,
}

/// A poll is closed once any `FINAL_CHOICE` operation has been recorded.
pub fn is_closed(operations: &[VoteOperation]) -> bool {
    operations.iter().any(VoteOperation::is_final_choice)
}

/// Adds live voting power on top of the recorded amount of every operation
/// whose voter appears in the snapshot.
pub fn apply_voting_power(operations: &mut [VoteOperation], snapshot: &HashMap<String, f64>) {
    if snapshot.is_empty() {
        return;
    }
    for operation in operations.iter_mut() {
        if let Some(power) = operation.voter.as_ref().and_then(|voter| snapshot.get(voter)) {
            operation.dapproval = Some(operation.amount() + power);
        }
    }
}

pub fn truncate_to_second(ts: NaiveDateTime) -> NaiveDateTime {
    ts.trunc_subsecs(0)
}

/// Picks each voter's counted ballot: the first operation in the given
/// (most-recent-first) order whose timestamp is not after `end`.
pub fn last_operations(operations: &[VoteOperation], end: NaiveDateTime) -> Vec<&VoteOperation> {
    let end = truncate_to_second(end);
    let mut seen = HashSet::new();
    let mut ballots = Vec::new();
    for operation in operations {
        if truncate_to_second(operation.timestamp) <= end && seen.insert(operation.voter_address()) {
            ballots.push(operation);
        }
    }
    ballots
}

/// Only the first listed option of a ballot is scored.
pub fn tally(meta: &PollMeta, ballots: &[&VoteOperation]) -> Tally {
    let mut options = OptionBook::new(meta);
    let mut approval = 0.0;
    let mut voters = HashSet::new();

    for ballot in ballots {
        let choice = ballot.choices().next().unwrap_or_default();
        voters.insert(ballot.voter_address());
        approval += ballot.amount();
        options.record(choice, ballot.amount());
    }

    Tally {
        options,
        approval,
        voters: voters.len(),
    }
}

pub fn operation_row(operation: &VoteOperation, options: &OptionBook, tx_explorer_url: &str) -> OperationRow {
    let address = match operation.voter.as_deref() {
        Some(voter) if !voter.is_empty() => link(voter, &format!("/address/{}", voter), voter, false),
        _ => String::new(),
    };

    let label = match operation.operation.as_deref() {
        None | Some("") => String::new(),
        Some(FINAL_CHOICE) => FINAL_CHOICE.to_string(),
        Some(kind) => {
            let tx_hash = operation.tx_hash.as_deref().unwrap_or_default();
            let href = format!("{}/{}", tx_explorer_url.trim_end_matches('/'), tx_hash);
            link(kind, &href, kind, true)
        }
    };

    let chosen = operation
        .choices()
        .map(|choice| options.title(choice))
        .collect::<Vec<_>>()
        .join("<br>");

    let proxy = match operation.proxy.as_deref() {
        Some(proxy) if !proxy.is_empty() => link(proxy, &format!("/proxy/{}", proxy), proxy, false),
        _ => String::new(),
    };

    OperationRow {
        time: operation.timestamp,
        address,
        proxy,
        operation: label,
        option: chosen,
        approval: format_amount(operation.amount()),
        amount: operation.amount(),
    }
}

/// Options ranked by stake; ties keep metadata order.
pub fn leaderboard_rows(mut options: Vec<OptionTally>) -> Vec<Vec<String>> {
    options.sort_by(|a, b| b.stake.total_cmp(&a.stake));

    let mut rows: Vec<Vec<String>> = vec![LEADERBOARD_HEADER.iter().map(|h| h.to_string()).collect()];
    rows.extend(options.into_iter().map(|o| {
        vec![o.id, o.title, format_amount(o.stake), format_count(o.votes)]
    }));
    rows
}

pub fn leaderboard_table(options: Vec<OptionTally>) -> String {
    html_table(
        &leaderboard_rows(options),
        "options",
        &[Some("60px"), None, Some("90px"), Some("90px")],
        &[0],
        false,
    )
}

/// Builds the full result for one poll from already patched operations.
pub fn aggregate(
    meta: &PollMeta,
    window: &PollWindow,
    operations: &[VoteOperation],
    tx_explorer_url: &str,
) -> PollResult {
    let ballots = last_operations(operations, window.end_timestamp);
    let tally = tally(meta, &ballots);

    let rows: Vec<OperationRow> = operations
        .iter()
        .map(|op| operation_row(op, &tally.options, tx_explorer_url))
        .collect();

    let last_vote = rows
        .iter()
        .map(|row| row.time)
        .max()
        .map(format_timestamp)
        .unwrap_or_default();

    let (options, not_valid) = tally.options.into_parts();

    PollResult {
        poll_start: format_timestamp(window.start_timestamp),
        poll_end: format_timestamp(window.end_timestamp),
        last_vote,
        num_voters: tally.voters,
        approval: format_amount(tally.approval),
        options: leaderboard_table(options),
        not_valid_num: not_valid.votes,
        not_valid_stake: format_amount(not_valid.stake),
        operations_num: format_count(rows.len() as u64),
        operations: rows,
    }
}
