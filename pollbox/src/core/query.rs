//! Read-only views over polls: listing filters, sort orders and tallies.

use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::core::types::PollStatus;
use crate::model::{Poll, PollOption};

/// Which polls a listing shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollFilter {
    #[default]
    All,
    /// Switched on and not past the end date.
    Active,
    /// Switched off or past the end date.
    Ended,
}

impl FromStr for PollFilter {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "all" => Ok(PollFilter::All),
            "active" => Ok(PollFilter::Active),
            "ended" => Ok(PollFilter::Ended),
            other => Err(format!("unknown filter '{other}' (expected all, active, ended)")),
        }
    }
}

/// Listing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollSort {
    #[default]
    Newest,
    Oldest,
    MostVotes,
}

impl FromStr for PollSort {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "newest" => Ok(PollSort::Newest),
            "oldest" => Ok(PollSort::Oldest),
            "most-votes" => Ok(PollSort::MostVotes),
            other => Err(format!(
                "unknown sort '{other}' (expected newest, oldest, most-votes)"
            )),
        }
    }
}

pub fn total_votes(poll: &Poll) -> u32 {
    poll.options.iter().map(|option| option.votes).sum()
}

/// Whole-number share of `total` held by `option`, rounded to nearest.
pub fn vote_share(option: &PollOption, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (f64::from(option.votes) * 100.0 / f64::from(total)).round() as u32
}

pub fn poll_status(poll: &Poll, now: DateTime<Utc>) -> PollStatus {
    if poll.is_expired(now) {
        PollStatus::Expired
    } else if poll.is_active {
        PollStatus::Active
    } else {
        PollStatus::Inactive
    }
}

pub fn can_vote(poll: &Poll, now: DateTime<Utc>) -> bool {
    poll.is_active && !poll.is_expired(now)
}

pub fn matches_filter(poll: &Poll, filter: PollFilter, now: DateTime<Utc>) -> bool {
    match filter {
        PollFilter::All => true,
        PollFilter::Active => poll.is_active && poll.end_date.is_none_or(|end| end > now),
        PollFilter::Ended => !poll.is_active || poll.end_date.is_some_and(|end| end <= now),
    }
}

/// Filter then sort polls for the listing view. Ties keep collection order.
pub fn list_polls(
    polls: &[Poll],
    filter: PollFilter,
    sort: PollSort,
    now: DateTime<Utc>,
) -> Vec<&Poll> {
    let mut selected: Vec<&Poll> = polls
        .iter()
        .filter(|poll| matches_filter(poll, filter, now))
        .collect();
    match sort {
        PollSort::Newest => selected.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        PollSort::Oldest => selected.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        PollSort::MostVotes => selected.sort_by_key(|poll| std::cmp::Reverse(total_votes(poll))),
    }
    selected
}

/// All polls, most voted first, for the results view.
pub fn results_order(polls: &[Poll]) -> Vec<&Poll> {
    let mut ordered: Vec<&Poll> = polls.iter().collect();
    ordered.sort_by_key(|poll| std::cmp::Reverse(total_votes(poll)));
    ordered
}

/// Options holding the highest count. Empty when nobody has voted.
pub fn leading_options(poll: &Poll) -> Vec<&PollOption> {
    let Some(max) = poll.options.iter().map(|option| option.votes).max() else {
        return Vec::new();
    };
    if max == 0 {
        return Vec::new();
    }
    poll.options
        .iter()
        .filter(|option| option.votes == max)
        .collect()
}
