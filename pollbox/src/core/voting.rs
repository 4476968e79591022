//! Vote transitions over an in-memory snapshot.
//!
//! Each transition validates everything it needs before touching state, so a
//! rejected call leaves the snapshot exactly as it was. Voter sets and the
//! per-user vote maps are updated together in a single call.

use chrono::{DateTime, Utc};

use crate::core::types::{Rejection, VoteChange};
use crate::model::{Poll, Snapshot};

/// Credit `user_id`'s vote in `poll_id` to `option_id`, moving any earlier vote.
///
/// Re-selecting the option the user already holds is rejected as `NothingToDo`
/// and does not touch the counters.
pub fn cast_vote(
    snapshot: &mut Snapshot,
    user_id: &str,
    poll_id: &str,
    option_id: &str,
    now: DateTime<Utc>,
) -> Result<VoteChange, Rejection> {
    let poll_idx = poll_index(snapshot, poll_id)?;
    let poll = &snapshot.polls[poll_idx];
    if poll.option(option_id).is_none() {
        return Err(Rejection::NotFound(format!(
            "option '{option_id}' in poll '{poll_id}'"
        )));
    }
    ensure_open(poll, now)?;
    let user_idx = user_index(snapshot, user_id)?;

    let previous = snapshot.users[user_idx]
        .voted_option(poll_id)
        .map(str::to_string);
    if previous.as_deref() == Some(option_id) {
        return Err(Rejection::NothingToDo(format!(
            "already voted for '{option_id}' in poll '{poll_id}'"
        )));
    }

    let poll = &mut snapshot.polls[poll_idx];
    let mut removed_from = None;
    if let Some(prev_id) = previous.as_deref()
        && let Some(prev_option) = poll.option_mut(prev_id)
        && prev_option.remove_voter(user_id)
    {
        removed_from = Some(prev_id.to_string());
    }
    if let Some(target) = poll.option_mut(option_id) {
        target.add_voter(user_id);
    }
    snapshot.users[user_idx]
        .voted_polls
        .insert(poll_id.to_string(), option_id.to_string());

    Ok(VoteChange {
        poll_id: poll_id.to_string(),
        removed_from,
        added_to: Some(option_id.to_string()),
    })
}

/// Withdraw `user_id`'s vote in `poll_id`.
pub fn retract_vote(
    snapshot: &mut Snapshot,
    user_id: &str,
    poll_id: &str,
    now: DateTime<Utc>,
) -> Result<VoteChange, Rejection> {
    let user_idx = user_index(snapshot, user_id)?;
    let Some(option_id) = snapshot.users[user_idx]
        .voted_option(poll_id)
        .map(str::to_string)
    else {
        return Err(Rejection::NothingToDo(format!(
            "no vote recorded in poll '{poll_id}'"
        )));
    };
    let poll_idx = poll_index(snapshot, poll_id)?;
    ensure_open(&snapshot.polls[poll_idx], now)?;

    let mut removed_from = None;
    if let Some(option) = snapshot.polls[poll_idx].option_mut(&option_id)
        && option.remove_voter(user_id)
    {
        removed_from = Some(option_id);
    }
    snapshot.users[user_idx].voted_polls.remove(poll_id);

    Ok(VoteChange {
        poll_id: poll_id.to_string(),
        removed_from,
        added_to: None,
    })
}

/// Drop every user's vote-map entry for `poll_id`. Returns the affected user ids.
pub fn purge_poll_votes(snapshot: &mut Snapshot, poll_id: &str) -> Vec<String> {
    let mut affected = Vec::new();
    for user in &mut snapshot.users {
        if user.voted_polls.remove(poll_id).is_some() {
            affected.push(user.id.clone());
        }
    }
    affected
}

/// Reject votes on polls that are switched off or past their end date.
pub fn ensure_open(poll: &Poll, now: DateTime<Utc>) -> Result<(), Rejection> {
    if !poll.is_active || poll.is_expired(now) {
        return Err(Rejection::PollClosed(poll.id.clone()));
    }
    Ok(())
}

fn poll_index(snapshot: &Snapshot, poll_id: &str) -> Result<usize, Rejection> {
    snapshot
        .polls
        .iter()
        .position(|poll| poll.id == poll_id)
        .ok_or_else(|| Rejection::NotFound(format!("poll '{poll_id}'")))
}

fn user_index(snapshot: &Snapshot, user_id: &str) -> Result<usize, Rejection> {
    snapshot
        .users
        .iter()
        .position(|user| user.id == user_id)
        .ok_or_else(|| Rejection::NotFound(format!("user '{user_id}'")))
}
