//! Session catalog: derives display orderings from store contents.
//!
//! Pure functions of (entries, active pointer) so the ordering is
//! deterministic and testable without a store.

use crate::session::{SessionId, SessionRecord};
use serde::Serialize;

/// Lightweight session descriptor for list displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub name: String,
    /// Creation date derived from the id, `YYYY-MM-DD`.
    pub created: String,
    pub message_count: usize,
}

/// Order entries for display: the active session first, the rest in the
/// store's insertion order.
pub fn ordered(
    entries: &[(SessionId, SessionRecord)],
    active: Option<&SessionId>,
) -> Vec<(SessionId, SessionRecord)> {
    let mut out: Vec<(SessionId, SessionRecord)> = Vec::with_capacity(entries.len());
    if let Some(active) = active
        && let Some(entry) = entries.iter().find(|(id, _)| id == active)
    {
        out.push(entry.clone());
    }
    for entry in entries {
        if Some(&entry.0) != active {
            out.push(entry.clone());
        }
    }
    out
}

/// Summaries in the given order.
pub fn summaries(entries: &[(SessionId, SessionRecord)]) -> Vec<SessionSummary> {
    entries
        .iter()
        .map(|(id, record)| SessionSummary {
            id: *id,
            name: record.name.clone(),
            created: id.created_date(),
            message_count: record.messages.len(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: i64, name: &str) -> (SessionId, SessionRecord) {
        (
            id.to_string().parse().unwrap(),
            SessionRecord::new(name),
        )
    }

    #[test]
    fn test_active_pinned_first() {
        let entries = vec![entry(1, "t1"), entry(2, "t2"), entry(3, "t3")];
        let active = entries[1].0;

        let ids: Vec<SessionId> = ordered(&entries, Some(&active))
            .iter()
            .map(|(id, _)| *id)
            .collect();
        assert_eq!(
            ids,
            vec![entries[1].0, entries[0].0, entries[2].0],
            "active pinned, rest in insertion order"
        );
    }

    #[test]
    fn test_ordering_is_deterministic() {
        let entries = vec![entry(1, "t1"), entry(2, "t2"), entry(3, "t3")];
        let active = entries[2].0;
        let first = ordered(&entries, Some(&active));
        let second = ordered(&entries, Some(&active));
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_active_falls_back_to_insertion_order() {
        let entries = vec![entry(1, "t1"), entry(2, "t2")];
        let ghost: SessionId = "99".parse().unwrap();
        let ids: Vec<SessionId> = ordered(&entries, Some(&ghost))
            .iter()
            .map(|(id, _)| *id)
            .collect();
        assert_eq!(ids, vec![entries[0].0, entries[1].0]);
    }

    #[test]
    fn test_summaries_carry_counts() {
        let mut entries = vec![entry(1, "t1")];
        entries[0].1.messages.push(crate::session::Message::user("x"));

        let summaries = summaries(&entries);
        assert_eq!(summaries[0].name, "t1");
        assert_eq!(summaries[0].message_count, 1);
    }
}
