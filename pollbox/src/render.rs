//! Text views over store state, rendered with minijinja.

use anyhow::Result;
use chrono::{DateTime, Utc};
use minijinja::{Environment, context};
use serde::Serialize;

use crate::core::query::{can_vote, leading_options, poll_status, total_votes, vote_share};
use crate::core::types::PollStatus;
use crate::model::{Feedback, Poll, User};

const POLLS_TEMPLATE: &str = include_str!("templates/polls.txt");
const RESULTS_TEMPLATE: &str = include_str!("templates/results.txt");
const SESSION_TEMPLATE: &str = include_str!("templates/session.txt");
const FEEDBACK_TEMPLATE: &str = include_str!("templates/feedback.txt");

#[derive(Debug, Clone, Serialize)]
struct PollView {
    id: String,
    title: String,
    description: String,
    status: &'static str,
    total_votes: u32,
    ends: String,
    show_counts: bool,
    options: Vec<OptionView>,
    leaders: Vec<String>,
    notes: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
struct OptionView {
    id: String,
    text: String,
    votes: u32,
    share: u32,
    mine: bool,
}

#[derive(Debug, Clone, Serialize)]
struct UserView {
    id: String,
    name: String,
    email: String,
    department: String,
    is_admin: bool,
    votes: usize,
}

#[derive(Debug, Clone, Serialize)]
struct FeedbackView {
    user_id: String,
    message: String,
    created_at: String,
}

impl PollView {
    fn build(poll: &Poll, viewer: Option<&User>, now: DateTime<Utc>, results: bool) -> Self {
        let total = total_votes(poll);
        let status = poll_status(poll, now);
        let my_vote = viewer.and_then(|user| user.voted_option(&poll.id));
        let votable = viewer.is_some() && can_vote(poll, now);

        let mut notes = Vec::new();
        if !results {
            if viewer.is_none() {
                notes.push("Please log in to vote");
            } else if my_vote.is_some() && votable {
                notes.push("You have voted on this poll");
            }
            if status == PollStatus::Expired {
                notes.push("This poll has ended");
            }
        }

        Self {
            id: poll.id.clone(),
            title: poll.title.clone(),
            description: poll.description.clone(),
            status: status.as_str(),
            total_votes: total,
            ends: poll
                .end_date
                .map(|end| end.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "no end date".to_string()),
            show_counts: results || my_vote.is_some() || !votable,
            options: poll
                .options
                .iter()
                .map(|option| OptionView {
                    id: option.id.clone(),
                    text: option.text.clone(),
                    votes: option.votes,
                    share: vote_share(option, total),
                    mine: my_vote == Some(option.id.as_str()),
                })
                .collect(),
            leaders: leading_options(poll)
                .into_iter()
                .map(|option| option.text.clone())
                .collect(),
            notes,
        }
    }
}

/// Template engine wrapper around minijinja.
struct ViewEngine {
    env: Environment<'static>,
}

impl ViewEngine {
    fn new() -> Self {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.add_template("polls", POLLS_TEMPLATE)
            .expect("polls template should be valid");
        env.add_template("results", RESULTS_TEMPLATE)
            .expect("results template should be valid");
        env.add_template("session", SESSION_TEMPLATE)
            .expect("session template should be valid");
        env.add_template("feedback", FEEDBACK_TEMPLATE)
            .expect("feedback template should be valid");
        Self { env }
    }

    fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<String> {
        let template = self.env.get_template(name)?;
        Ok(template.render(ctx)?)
    }
}

/// Poll listing as seen by `viewer`. Counts stay hidden on polls the viewer can
/// still vote on and has not voted in yet.
pub fn render_poll_list(polls: &[&Poll], viewer: Option<&User>, now: DateTime<Utc>) -> Result<String> {
    let views: Vec<PollView> = polls
        .iter()
        .map(|poll| PollView::build(poll, viewer, now, false))
        .collect();
    ViewEngine::new().render("polls", context! { polls => views })
}

/// Full tallies for every poll in the given order.
pub fn render_results(polls: &[&Poll], viewer: Option<&User>, now: DateTime<Utc>) -> Result<String> {
    let views: Vec<PollView> = polls
        .iter()
        .map(|poll| PollView::build(poll, viewer, now, true))
        .collect();
    ViewEngine::new().render("results", context! { polls => views })
}

pub fn render_session(user: Option<&User>) -> Result<String> {
    let view = user.map(|user| UserView {
        id: user.id.clone(),
        name: user.name.clone(),
        email: user.email.clone(),
        department: user.department.clone(),
        is_admin: user.is_admin,
        votes: user.voted_polls.len(),
    });
    ViewEngine::new().render("session", context! { user => view })
}

pub fn render_feedback(entries: &[Feedback]) -> Result<String> {
    let views: Vec<FeedbackView> = entries
        .iter()
        .map(|entry| FeedbackView {
            user_id: entry.user_id.clone(),
            message: entry.message.clone(),
            created_at: entry.created_at.format("%Y-%m-%d %H:%M").to_string(),
        })
        .collect();
    ViewEngine::new().render("feedback", context! { entries => views })
}
