//! Human confirmation capability for ambiguous matches.
//!
//! The resolver never talks to the console directly; it asks an injected
//! [`ConfirmPrompt`], so headless runs and tests can plug in their own
//! answer.

use std::io::{self, BufRead, Write};

/// Mismatch details shown to the human before accepting a title-only match.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchReview {
    pub requested_title: String,
    pub requested_artist: String,
    pub requested_album: String,
    pub candidate_title: String,
    pub candidate_artist: String,
    pub candidate_album: String,
}

/// Yes/no decision hook for candidate acceptance.
pub trait ConfirmPrompt: Send + Sync {
    fn confirm(&self, review: &MatchReview) -> bool;
}

/// Interactive prompt on stdin/stdout. Accepts only an explicit `y`.
pub struct ConsolePrompt;

impl ConfirmPrompt for ConsolePrompt {
    fn confirm(&self, review: &MatchReview) -> bool {
        print!(
            "Artist name mismatch: {} vs {}.\nTitle: {} / {}\nAlbum: {} / {}\nDo you want to add it? (Y/n): ",
            review.requested_artist,
            review.candidate_artist,
            review.requested_title,
            review.candidate_title,
            review.requested_album,
            review.candidate_album,
        );
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        answer.trim().eq_ignore_ascii_case("y")
    }
}
