//! # Meeting Matcher
//!
//! Associates a recording with the session that produced it. Session ids
//! reported by recording servers are reused, so the session's creation time
//! has to agree with the recording's start time as well. Tiers are tried in
//! order and the first tier with a hit wins:
//!
//! 1. [`MatchTier::Exact`]: `create_time == start_time`
//! 2. [`MatchTier::MillisToSeconds`]: `create_time / 1000 == start_time`
//! 3. [`MatchTier::CoarseBucket`]: `create_time / 10 == start_time / 10`
//!
//! When several sessions satisfy the winning tier the last one in insertion
//! order is chosen.

use crate::Result;
use core_library::models::Meeting;
use core_library::repositories::meeting;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use std::fmt;
use tracing::{debug, trace};

/// Which rule matched a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Exact,
    MillisToSeconds,
    CoarseBucket,
}

impl MatchTier {
    const ORDERED: [MatchTier; 3] = [
        MatchTier::Exact,
        MatchTier::MillisToSeconds,
        MatchTier::CoarseBucket,
    ];

    fn matches(self, create_time: i64, start_time: i64) -> bool {
        match self {
            MatchTier::Exact => create_time == start_time,
            MatchTier::MillisToSeconds => create_time / 1000 == start_time,
            MatchTier::CoarseBucket => create_time / 10 == start_time / 10,
        }
    }
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchTier::Exact => "exact",
            MatchTier::MillisToSeconds => "millis_to_seconds",
            MatchTier::CoarseBucket => "coarse_bucket",
        };
        f.write_str(name)
    }
}

/// Pick the best session among candidates sharing the recording's session id
///
/// `candidates` must be in insertion order.
///
/// ```
/// use core_library::models::Meeting;
/// use core_sync::meeting_matcher::{match_meeting, MatchTier};
///
/// let session = Meeting {
///     id: "local-1".into(),
///     meeting_id: "m-1".into(),
///     create_time: 1_000_000,
///     room_id: None,
///     name: None,
/// };
///
/// let (found, tier) = match_meeting(std::slice::from_ref(&session), 1000).unwrap();
/// assert_eq!(found.id, "local-1");
/// assert_eq!(tier, MatchTier::MillisToSeconds);
/// ```
pub fn match_meeting(candidates: &[Meeting], start_time: i64) -> Option<(&Meeting, MatchTier)> {
    MatchTier::ORDERED.into_iter().find_map(|tier| {
        candidates
            .iter()
            .rev()
            .find(|meeting| tier.matches(meeting.create_time, start_time))
            .map(|meeting| (meeting, tier))
    })
}

/// Resolve the session of a recording inside the current transaction
///
/// Returns `None` when either the session id or the start time is missing,
/// or when no candidate satisfies any tier.
pub async fn find_meeting(
    conn: &mut SqliteConnection,
    meeting_id: Option<&str>,
    start_time: Option<i64>,
) -> Result<Option<(Meeting, MatchTier)>> {
    let (meeting_id, start_time) = match (meeting_id, start_time) {
        (Some(meeting_id), Some(start_time)) if !meeting_id.trim().is_empty() => {
            (meeting_id, start_time)
        }
        _ => {
            trace!("Session id or start time missing, skipping session match");
            return Ok(None);
        }
    };

    let candidates = meeting::candidates_for(conn, meeting_id).await?;

    let found = match_meeting(&candidates, start_time).map(|(meeting, tier)| (meeting.clone(), tier));

    match &found {
        Some((meeting, tier)) => debug!(
            meeting_id,
            session = %meeting.id,
            tier = %tier,
            "Matched recording to session"
        ),
        None => debug!(
            meeting_id,
            start_time,
            candidates = candidates.len(),
            "No session matches recording"
        ),
    }

    Ok(found)
}
