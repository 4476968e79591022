//! Seed dataset used for any storage slot that has never been written.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};

use crate::model::{ADMIN_ID, Feedback, Poll, PollOption, Snapshot, User};

/// Full seed snapshot: three polls, the admin plus five employees, two feedback
/// entries, nobody signed in. Vote counters and vote maps agree with the voter sets.
pub fn seed_snapshot() -> Snapshot {
    Snapshot {
        polls: seed_polls(),
        users: seed_users(),
        session: None,
        feedback: seed_feedback(),
    }
}

pub fn seed_polls() -> Vec<Poll> {
    vec![
        seed_poll(
            "1",
            "Office Location",
            "Where should our new office be located?",
            day(2025, 1, 15),
            day(2025, 6, 30),
            &[
                ("1-1", "Bangalore", &["1001", "1003"]),
                ("1-2", "Mumbai", &["1002"]),
                ("1-3", "Hyderabad", &["1004", "1005"]),
            ],
        ),
        seed_poll(
            "2",
            "Company Retreat",
            "Where should we go for our annual retreat?",
            day(2025, 2, 10),
            day(2025, 5, 15),
            &[
                ("2-1", "Goa Beaches", &["1001", "1002"]),
                ("2-2", "Kerala Backwaters", &["1003", "1004"]),
                ("2-3", "Himachal Mountains", &["1005"]),
            ],
        ),
        seed_poll(
            "3",
            "Anniversary Sports Event",
            "Which sport should be conducted on company anniversary?",
            day(2025, 3, 5),
            day(2025, 4, 20),
            &[
                ("3-1", "Cricket Tournament", &["1001", "1002", "1003"]),
                ("3-2", "Football Match", &["1004"]),
                ("3-3", "Badminton Championship", &["1005"]),
                ("3-4", "Carrom Competition", &[]),
            ],
        ),
    ]
}

pub fn seed_users() -> Vec<User> {
    vec![
        seed_user(ADMIN_ID, "Admin User", "admin", "Management", &[], true),
        seed_user(
            "1001",
            "Rahul Sharma",
            "rahul",
            "Engineering",
            &[("1", "1-1"), ("2", "2-1"), ("3", "3-1")],
            false,
        ),
        seed_user(
            "1002",
            "Priya Patel",
            "priya",
            "Marketing",
            &[("1", "1-2"), ("2", "2-1"), ("3", "3-1")],
            false,
        ),
        seed_user(
            "1003",
            "Amit Kumar",
            "amit",
            "Finance",
            &[("1", "1-1"), ("2", "2-2"), ("3", "3-1")],
            false,
        ),
        seed_user(
            "1004",
            "Sneha Gupta",
            "sneha",
            "HR",
            &[("1", "1-3"), ("2", "2-2"), ("3", "3-2")],
            false,
        ),
        seed_user(
            "1005",
            "Vikram Singh",
            "vikram",
            "Operations",
            &[("1", "1-3"), ("2", "2-3"), ("3", "3-3")],
            false,
        ),
    ]
}

pub fn seed_feedback() -> Vec<Feedback> {
    vec![
        Feedback {
            id: "1".to_string(),
            user_id: "1001".to_string(),
            message: "Could we have more options for sports events?".to_string(),
            created_at: day(2025, 3, 10),
        },
        Feedback {
            id: "2".to_string(),
            user_id: "1003".to_string(),
            message: "The voting system is great, but it would be nice to have notifications when new polls are created.".to_string(),
            created_at: day(2025, 3, 12),
        },
    ]
}

type SeedOption<'a> = (&'a str, &'a str, &'a [&'a str]);

fn seed_poll(
    id: &str,
    title: &str,
    description: &str,
    created_at: DateTime<Utc>,
    end_date: DateTime<Utc>,
    options: &[SeedOption<'_>],
) -> Poll {
    Poll {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        options: options
            .iter()
            .map(|(option_id, text, voters)| {
                let mut option = PollOption::new(*option_id, *text);
                for voter in *voters {
                    option.add_voter(voter);
                }
                option
            })
            .collect(),
        created_by: ADMIN_ID.to_string(),
        created_at,
        end_date: Some(end_date),
        is_active: true,
    }
}

fn seed_user(
    id: &str,
    name: &str,
    mailbox: &str,
    department: &str,
    votes: &[(&str, &str)],
    is_admin: bool,
) -> User {
    User {
        id: id.to_string(),
        name: name.to_string(),
        email: format!("{mailbox}@company.com"),
        department: department.to_string(),
        voted_polls: votes
            .iter()
            .map(|(poll, option)| (poll.to_string(), option.to_string()))
            .collect::<BTreeMap<_, _>>(),
        is_admin,
    }
}

fn day(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .unwrap_or_default()
}
