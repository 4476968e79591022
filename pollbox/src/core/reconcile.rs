//! Cross-slot repair applied when a snapshot is loaded.
//!
//! Slots are written one at a time, so a failed or interrupted write (or a
//! slot that fell back to seed data) can leave polls and users disagreeing.
//! Voter sets in polls win: unknown voters are dropped, a voter credited by
//! several options of one poll keeps a single option, counters follow the
//! voter sets and every user's vote map is rebuilt from them.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::Snapshot;

/// Bring counters and vote maps back in line with the poll voter sets.
///
/// Returns one message per repair, in collection order. An empty result means
/// the snapshot was already consistent.
pub fn reconcile_votes(snapshot: &mut Snapshot) -> Vec<String> {
    let mut repairs = Vec::new();
    let known: BTreeSet<String> = snapshot.users.iter().map(|user| user.id.clone()).collect();
    let recorded: BTreeMap<String, BTreeMap<String, String>> = snapshot
        .users
        .iter()
        .map(|user| (user.id.clone(), user.voted_polls.clone()))
        .collect();
    let mut credited: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();

    for poll in &mut snapshot.polls {
        let mut holders: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for option in &mut poll.options {
            let unknown: Vec<String> = option
                .voted_by
                .iter()
                .filter(|voter| !known.contains(*voter))
                .cloned()
                .collect();
            for voter in unknown {
                option.voted_by.remove(&voter);
                repairs.push(format!(
                    "{}/{}: dropped unknown voter '{}'",
                    poll.id, option.id, voter
                ));
            }
            for voter in &option.voted_by {
                holders
                    .entry(voter.clone())
                    .or_default()
                    .push(option.id.clone());
            }
        }

        for (voter, option_ids) in holders {
            let preferred = recorded
                .get(&voter)
                .and_then(|votes| votes.get(&poll.id))
                .filter(|option_id| option_ids.contains(option_id))
                .or_else(|| option_ids.first())
                .cloned();
            let Some(keep) = preferred else {
                continue;
            };
            for option_id in option_ids.iter().filter(|option_id| **option_id != keep) {
                if let Some(option) = poll.option_mut(option_id) {
                    option.voted_by.remove(&voter);
                }
                repairs.push(format!(
                    "{}/{}: dropped second vote by '{}'",
                    poll.id, option_id, voter
                ));
            }
            credited
                .entry(voter)
                .or_default()
                .insert(poll.id.clone(), keep);
        }

        for option in &mut poll.options {
            let actual = u32::try_from(option.voted_by.len()).unwrap_or(u32::MAX);
            if option.votes != actual {
                repairs.push(format!(
                    "{}/{}: votes {} corrected to {}",
                    poll.id, option.id, option.votes, actual
                ));
                option.votes = actual;
            }
        }
    }

    for user in &mut snapshot.users {
        let rebuilt = credited.remove(&user.id).unwrap_or_default();
        if user.voted_polls == rebuilt {
            continue;
        }
        for (poll_id, option_id) in &user.voted_polls {
            match rebuilt.get(poll_id) {
                None => repairs.push(format!(
                    "user '{}': dropped vote for '{}/{}' not credited to any option",
                    user.id, poll_id, option_id
                )),
                Some(actual) if actual != option_id => repairs.push(format!(
                    "user '{}': vote in poll '{}' moved from '{}' to '{}'",
                    user.id, poll_id, option_id, actual
                )),
                Some(_) => {}
            }
        }
        for (poll_id, option_id) in &rebuilt {
            if !user.voted_polls.contains_key(poll_id) {
                repairs.push(format!(
                    "user '{}': restored vote for '{}/{}'",
                    user.id, poll_id, option_id
                ));
            }
        }
        user.voted_polls = rebuilt;
    }

    repairs
}
