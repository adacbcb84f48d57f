// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Session metadata and chronological merging.

use crate::parser::Record;
use chrono::{DateTime, SecondsFormat, Utc};

/// Title used when a session has no summary record.
pub const DEFAULT_TITLE: &str = "Claude Code Session";

/// Working directory shown when no record carries one.
pub const UNKNOWN_CWD: &str = "Unknown";

/// The records of one session file.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Session identifier (the file stem).
    pub id: String,

    /// Records in file order.
    pub records: Vec<Record>,
}

/// Display metadata derived from a session's records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMeta {
    /// Document title.
    pub title: String,

    /// ISO-8601 timestamp shown in the document header.
    pub timestamp: String,

    /// Working directory the session ran in.
    pub cwd: String,
}

/// Marks where a session starts inside merged records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionBoundary {
    /// Index of the session's first record in [`MergedSession::records`].
    pub index: usize,

    /// Human-readable label, e.g. `Session 2: 0b9d...`.
    pub label: String,
}

/// Several sessions combined into one chronological record sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedSession {
    /// Metadata for the combined document.
    pub meta: SessionMeta,

    /// All records, session by session, oldest session first.
    pub records: Vec<Record>,

    /// Start of every session after the first.
    pub boundaries: Vec<SessionBoundary>,
}

impl Session {
    /// Creates a session from its identifier and parsed records.
    pub fn new(id: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            id: id.into(),
            records,
        }
    }

    /// Returns the earliest parseable record timestamp.
    #[must_use]
    pub fn earliest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.records
            .iter()
            .filter_map(|r| r.timestamp().and_then(parse_timestamp))
            .min()
    }

    /// Derives title, timestamp and working directory from the records.
    #[must_use]
    pub fn meta(&self) -> SessionMeta {
        let title = self
            .records
            .iter()
            .find_map(|r| match r {
                Record::Summary(summary) => Some(summary.summary.as_deref().unwrap_or_default()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_TITLE)
            .to_owned();

        let timestamp = self
            .records
            .iter()
            .find_map(Record::timestamp)
            .map_or_else(now_rfc3339, str::to_owned);

        SessionMeta {
            title,
            timestamp,
            cwd: first_cwd(&self.records),
        }
    }
}

fn first_cwd(records: &[Record]) -> String {
    records
        .iter()
        .find_map(Record::cwd)
        .unwrap_or(UNKNOWN_CWD)
        .to_owned()
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses an RFC 3339 timestamp into UTC.
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Combines sessions into one document, oldest session first.
///
/// Sessions are ordered by their earliest record timestamp; a session with
/// no timestamp at all counts as starting now. Ties keep their input order.
#[must_use]
pub fn merge(project_name: &str, sessions: Vec<Session>) -> MergedSession {
    let now = Utc::now();
    let mut keyed: Vec<(DateTime<Utc>, Session)> = sessions
        .into_iter()
        .map(|s| (s.earliest_timestamp().unwrap_or(now), s))
        .collect();
    keyed.sort_by_key(|(started, _)| *started);

    let timestamp = keyed.first().map_or(now, |(started, _)| *started);
    let cwd = keyed
        .first()
        .map_or_else(|| UNKNOWN_CWD.to_owned(), |(_, s)| first_cwd(&s.records));

    let mut records = Vec::new();
    let mut boundaries = Vec::new();
    for (i, (_, session)) in keyed.into_iter().enumerate() {
        if i > 0 {
            boundaries.push(SessionBoundary {
                index: records.len(),
                label: format!("Session {}: {}", i + 1, session.id),
            });
        }
        records.extend(session.records);
    }

    MergedSession {
        meta: SessionMeta {
            title: format!("{project_name} - All Sessions"),
            timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            cwd,
        },
        records,
        boundaries,
    }
}
