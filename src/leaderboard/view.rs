//! Display-ready leaderboard rows.
//!
//! The client renders a ranked table (Rank, Player, Score, Date); this
//! module produces those rows, including the email privacy mask.

use serde::{Deserialize, Serialize};

use super::service::LeaderboardEntry;

/// Shown in place of a table body when there are no scores
pub const EMPTY_PLACEHOLDER: &str = "No scores yet. Be the first!";

/// One row of the rendered leaderboard table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub rank: u32,
    pub player: String,
    pub score: u32,
    pub date: String,
}

/// Convert fetched entries into display rows
pub fn display_rows(entries: &[LeaderboardEntry]) -> Vec<LeaderboardRow> {
    entries
        .iter()
        .map(|entry| LeaderboardRow {
            rank: entry.rank,
            player: display_name(entry),
            score: entry.score,
            date: entry.date.format("%Y-%m-%d %H:%M").to_string(),
        })
        .collect()
}

/// The placeholder message for an empty row set, None otherwise
pub fn empty_placeholder(rows: &[LeaderboardRow]) -> Option<String> {
    rows.is_empty().then(|| EMPTY_PLACEHOLDER.to_string())
}

/// Player column: the chosen name if present, otherwise the masked email
fn display_name(entry: &LeaderboardEntry) -> String {
    match &entry.player_name {
        Some(name) => name.clone(),
        None => mask_email(&entry.email),
    }
}

/// Mask an email address for public display.
///
/// Short usernames (3 chars or fewer) keep only their first character;
/// longer ones keep the first three and the last. Anything that is not a
/// plain `user@domain` address masks to "Anonymous".
pub fn mask_email(email: &str) -> String {
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return "Anonymous".to_string();
    }

    let (username, domain) = (parts[0], parts[1]);
    let chars: Vec<char> = username.chars().collect();

    if chars.len() <= 3 {
        let first: String = chars.iter().take(1).collect();
        format!("{first}***@{domain}")
    } else {
        let head: String = chars[..3].iter().collect();
        let last = chars[chars.len() - 1];
        format!("{head}***{last}@{domain}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(email: &str, player_name: Option<&str>, score: u32, rank: u32) -> LeaderboardEntry {
        LeaderboardEntry {
            id: rank as i64,
            email: email.to_string(),
            player_name: player_name.map(str::to_string),
            score,
            date: Utc.with_ymd_and_hms(2025, 3, 27, 18, 5, 0).unwrap(),
            rank,
        }
    }

    #[test]
    fn masks_short_username() {
        assert_eq!(mask_email("ab@x.com"), "a***@x.com");
        assert_eq!(mask_email("abc@x.com"), "a***@x.com");
    }

    #[test]
    fn masks_long_username() {
        assert_eq!(mask_email("abcdef@x.com"), "abc***f@x.com");
        assert_eq!(mask_email("abcd@x.com"), "abc***d@x.com");
    }

    #[test]
    fn invalid_emails_mask_to_anonymous() {
        assert_eq!(mask_email(""), "Anonymous");
        assert_eq!(mask_email("no-at-sign"), "Anonymous");
        assert_eq!(mask_email("two@at@signs"), "Anonymous");
    }

    #[test]
    fn rows_prefer_player_name_over_masked_email() {
        let entries = vec![
            entry("hidden@x.com", Some("Al"), 20, 1),
            entry("abcdef@x.com", None, 10, 2),
        ];

        let rows = display_rows(&entries);
        assert_eq!(rows[0].player, "Al");
        assert_eq!(rows[1].player, "abc***f@x.com");
        assert_eq!(rows[1].date, "2025-03-27 18:05");
    }

    #[test]
    fn placeholder_only_for_empty_rows() {
        assert_eq!(
            empty_placeholder(&[]),
            Some(EMPTY_PLACEHOLDER.to_string())
        );

        let rows = display_rows(&[entry("ab@x.com", None, 5, 1)]);
        assert_eq!(empty_placeholder(&rows), None);
    }
}
