//! Semantic invariants not expressible via JSON Schema.

use std::collections::HashSet;

use crate::model::Snapshot;

/// Check cross-collection invariants of a snapshot:
/// - Unique poll, user and feedback ids; unique option ids within a poll
/// - Every poll has at least two options
/// - `votes == |voted_by|` for every option
/// - Voter sets and user vote maps agree in both directions
/// - The session id, if any, names an existing user
///
/// Returns stable, human-readable messages in collection order.
pub fn validate_invariants(snapshot: &Snapshot) -> Vec<String> {
    let mut errors = Vec::new();

    let mut poll_ids = HashSet::new();
    for poll in &snapshot.polls {
        if !poll_ids.insert(poll.id.as_str()) {
            errors.push(format!("duplicate poll id '{}'", poll.id));
        }
        if poll.options.len() < 2 {
            errors.push(format!("poll '{}': needs at least 2 options", poll.id));
        }

        let mut option_ids = HashSet::new();
        let mut voters_in_poll = HashSet::new();
        for option in &poll.options {
            let path = format!("{}/{}", poll.id, option.id);
            if !option_ids.insert(option.id.as_str()) {
                errors.push(format!("poll '{}': duplicate option id '{}'", poll.id, option.id));
            }
            if option.votes as usize != option.voted_by.len() {
                errors.push(format!(
                    "{}: votes {} does not match {} voters",
                    path,
                    option.votes,
                    option.voted_by.len()
                ));
            }
            for voter in &option.voted_by {
                if !voters_in_poll.insert(voter.as_str()) {
                    errors.push(format!(
                        "poll '{}': user '{}' voted for more than one option",
                        poll.id, voter
                    ));
                }
                match snapshot.user(voter) {
                    None => errors.push(format!("{}: voter '{}' is not a known user", path, voter)),
                    Some(user) if user.voted_option(&poll.id) != Some(option.id.as_str()) => {
                        errors.push(format!(
                            "{}: voter '{}' records '{}' for this poll",
                            path,
                            voter,
                            user.voted_option(&poll.id).unwrap_or("<none>")
                        ));
                    }
                    Some(_) => {}
                }
            }
        }
    }

    let mut user_ids = HashSet::new();
    for user in &snapshot.users {
        if !user_ids.insert(user.id.as_str()) {
            errors.push(format!("duplicate user id '{}'", user.id));
        }
        for (poll_id, option_id) in &user.voted_polls {
            let credited = snapshot
                .poll(poll_id)
                .and_then(|poll| poll.option(option_id))
                .is_some_and(|option| option.voted_by.contains(&user.id));
            if !credited {
                errors.push(format!(
                    "user '{}': vote for '{}/{}' is not credited to any option",
                    user.id, poll_id, option_id
                ));
            }
        }
    }

    let mut feedback_ids = HashSet::new();
    for entry in &snapshot.feedback {
        if !feedback_ids.insert(entry.id.as_str()) {
            errors.push(format!("duplicate feedback id '{}'", entry.id));
        }
        if entry.message.trim().is_empty() {
            errors.push(format!("feedback '{}': message is empty", entry.id));
        }
    }

    if let Some(session) = snapshot.session.as_deref()
        && snapshot.user(session).is_none()
    {
        errors.push(format!("session user '{}' does not exist", session));
    }

    errors
}
