//! Cascading fuzzy search against the catalog.
//!
//! A noisy (title, artist, album) triple is turned into progressively
//! simplified query strings, tried in strict order until one of them yields
//! an acceptable candidate. The last, title-only strategy is gated on artist
//! confirmation because bare titles collide across artists.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

use super::{CatalogSearch, CatalogSong};
use crate::client::ClientError;
use crate::confirm::{ConfirmPrompt, MatchReview};
use crate::reconcile::MatchType;

lazy_static! {
    /// A single trailing parenthetical or bracketed qualifier.
    static ref TRAILING_QUALIFIER_RE: Regex = Regex::new(
        r"\s*(?:\((?P<paren>[^()]*)\)|（(?P<fullwidth>[^（）]*)）|\[(?P<bracket>[^\[\]]*)\])\s*$"
    )
    .unwrap();
    /// A bare "feat..." tail outside any parenthesis.
    static ref FEAT_RE: Regex = Regex::new(r"(?i)\s+feat.*$").unwrap();
    static ref SYMBOL_RE: Regex = Regex::new(r"[^\w\s]").unwrap();
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
    static ref INSTRUMENTAL_RE: Regex = Regex::new(r"(?i)\binstrumental\b").unwrap();
}

/// Remove trailing qualifiers ("(feat. X)", "[Live]", "(Remastered 2009)")
/// and "feat..." suffixes from a title.
///
/// A qualifier containing the word "instrumental" is a meaningful
/// distinguishing tag and is kept.
pub fn strip_title_qualifiers(title: &str) -> String {
    let mut stripped = title.trim().to_string();
    loop {
        let qualifier_start = match TRAILING_QUALIFIER_RE.captures(&stripped) {
            Some(captures) => {
                let qualifier = captures
                    .name("paren")
                    .or_else(|| captures.name("fullwidth"))
                    .or_else(|| captures.name("bracket"))
                    .map(|m| m.as_str())
                    .unwrap_or("");
                if INSTRUMENTAL_RE.is_match(qualifier) {
                    None
                } else {
                    Some(captures.get(0).unwrap().start())
                }
            }
            None => None,
        };
        match qualifier_start {
            Some(start) => stripped.truncate(start),
            None => break,
        }
    }
    FEAT_RE.replace(&stripped, "").trim().to_string()
}

/// Replace all punctuation with spaces and collapse runs of whitespace.
pub fn strip_symbols(title: &str) -> String {
    let without_symbols = SYMBOL_RE.replace_all(title, " ");
    WHITESPACE_RE
        .replace_all(&without_symbols, " ")
        .trim()
        .to_string()
}

/// Maps a noisy track description to a catalog candidate via the strategy
/// cascade.
pub struct Resolver<'a> {
    catalog: &'a dyn CatalogSearch,
    confirm: &'a dyn ConfirmPrompt,
    require_confirmation: bool,
}

impl<'a> Resolver<'a> {
    pub fn new(
        catalog: &'a dyn CatalogSearch,
        confirm: &'a dyn ConfirmPrompt,
        require_confirmation: bool,
    ) -> Self {
        Self {
            catalog,
            confirm,
            require_confirmation,
        }
    }

    /// Run the cascade. Returns the first accepted candidate tagged with the
    /// strategy that produced it, or `None` when every strategy exhausts.
    ///
    /// Only authentication failures propagate; any other search error counts
    /// as "no hit for this strategy" and the cascade continues.
    pub async fn resolve(
        &self,
        title: &str,
        artist: &str,
        album: &str,
    ) -> Result<Option<(CatalogSong, MatchType)>, ClientError> {
        let stripped = strip_title_qualifiers(title);
        let plain = strip_symbols(&stripped);

        let strategies = [
            (
                format!("{} {} {}", title, artist, album),
                MatchType::TitleArtistAlbum,
            ),
            (format!("{} {}", title, artist), MatchType::TitleArtist),
            (
                format!("{} {}", stripped, artist),
                MatchType::StrippedTitleArtist,
            ),
            (format!("{} {}", plain, artist), MatchType::PlainTitleArtist),
            (plain.clone(), MatchType::Title),
        ];

        for (query, match_type) in strategies {
            let candidates = match self.catalog.search_songs(&query).await {
                Ok(candidates) => candidates,
                Err(err) if err.is_authentication() => return Err(err),
                Err(err) => {
                    warn!(
                        "Error searching for {} by {} (query {:?}): {}",
                        title, artist, query, err
                    );
                    continue;
                }
            };
            for candidate in candidates {
                if match_type == MatchType::Title
                    && !self.artist_confirmed(title, artist, album, &candidate)
                {
                    continue;
                }
                return Ok(Some((candidate, match_type)));
            }
        }
        Ok(None)
    }

    /// Acceptance gate for the title-only strategy.
    ///
    /// Without `require_confirmation` the gate always rejects; the strategy
    /// then only serves to report "no result" more informatively. With it, a
    /// candidate whose artist contains the requested artist passes, and a
    /// mismatch is put to the confirmation hook.
    fn artist_confirmed(
        &self,
        title: &str,
        artist: &str,
        album: &str,
        candidate: &CatalogSong,
    ) -> bool {
        if !self.require_confirmation {
            return false;
        }
        if candidate
            .attributes
            .artist_name
            .to_lowercase()
            .contains(&artist.to_lowercase())
        {
            return true;
        }
        self.confirm.confirm(&MatchReview {
            requested_title: title.to_string(),
            requested_artist: artist.to_string(),
            requested_album: album.to_string(),
            candidate_title: candidate.attributes.name.clone(),
            candidate_artist: candidate.attributes.artist_name.clone(),
            candidate_album: candidate.attributes.album_name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SongAttributes;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn song(id: &str, name: &str, artist: &str) -> CatalogSong {
        CatalogSong {
            id: id.to_string(),
            attributes: SongAttributes {
                name: name.to_string(),
                artist_name: artist.to_string(),
                album_name: "Album".to_string(),
                isrc: None,
                url: None,
            },
        }
    }

    /// Catalog fake answering scripted queries and recording every term.
    struct ScriptedCatalog {
        hits: HashMap<String, Vec<CatalogSong>>,
        queries: Mutex<Vec<String>>,
    }

    impl ScriptedCatalog {
        fn new(hits: Vec<(&str, Vec<CatalogSong>)>) -> Self {
            Self {
                hits: hits
                    .into_iter()
                    .map(|(q, songs)| (q.to_string(), songs))
                    .collect(),
                queries: Mutex::new(Vec::new()),
            }
        }

        fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CatalogSearch for ScriptedCatalog {
        async fn search_songs(&self, term: &str) -> Result<Vec<CatalogSong>, ClientError> {
            self.queries.lock().unwrap().push(term.to_string());
            Ok(self.hits.get(term).cloned().unwrap_or_default())
        }

        async fn lookup_isrc(&self, _isrc: &str) -> Result<Option<CatalogSong>, ClientError> {
            Ok(None)
        }
    }

    struct StaticConfirm(bool);

    impl ConfirmPrompt for StaticConfirm {
        fn confirm(&self, _review: &MatchReview) -> bool {
            self.0
        }
    }

    #[test]
    fn test_strip_removes_feat_parenthetical() {
        assert_eq!(strip_title_qualifiers("Song (feat. X)"), "Song");
    }

    #[test]
    fn test_strip_removes_bare_feat_suffix() {
        assert_eq!(strip_title_qualifiers("Song feat. Someone"), "Song");
    }

    #[test]
    fn test_strip_removes_stacked_qualifiers() {
        assert_eq!(
            strip_title_qualifiers("Song [Live] (Remastered 2009)"),
            "Song"
        );
    }

    #[test]
    fn test_strip_keeps_instrumental_qualifier() {
        assert_eq!(
            strip_title_qualifiers("Song (Instrumental)"),
            "Song (Instrumental)"
        );
    }

    #[test]
    fn test_strip_handles_fullwidth_parens() {
        assert_eq!(strip_title_qualifiers("曲名（カバー）"), "曲名");
    }

    #[test]
    fn test_strip_symbols_flattens_punctuation() {
        assert_eq!(strip_symbols("Don't Stop - Me Now!"), "Don t Stop Me Now");
    }

    #[tokio::test]
    async fn test_cascade_short_circuits_on_first_strategy() {
        let catalog = ScriptedCatalog::new(vec![(
            "Song Band Album",
            vec![song("1", "Song", "Band")],
        )]);
        let confirm = StaticConfirm(false);
        let resolver = Resolver::new(&catalog, &confirm, false);

        let result = resolver.resolve("Song", "Band", "Album").await.unwrap();
        let (candidate, match_type) = result.unwrap();
        assert_eq!(candidate.id, "1");
        assert_eq!(match_type, MatchType::TitleArtistAlbum);
        assert_eq!(catalog.queries(), vec!["Song Band Album".to_string()]);
    }

    #[tokio::test]
    async fn test_cascade_tries_strategies_in_order() {
        let catalog = ScriptedCatalog::new(vec![(
            "Song Band",
            vec![song("2", "Song", "Band")],
        )]);
        let confirm = StaticConfirm(false);
        let resolver = Resolver::new(&catalog, &confirm, false);

        let (candidate, match_type) = resolver
            .resolve("Song (feat. X)", "Band", "Album")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(candidate.id, "2");
        assert_eq!(match_type, MatchType::StrippedTitleArtist);
        assert_eq!(
            catalog.queries(),
            vec![
                "Song (feat. X) Band Album".to_string(),
                "Song (feat. X) Band".to_string(),
                "Song Band".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_title_only_never_accepts_without_confirmation() {
        let catalog = ScriptedCatalog::new(vec![(
            "Song",
            vec![song("3", "Song", "Cover Orchestra")],
        )]);
        let confirm = StaticConfirm(true);
        let resolver = Resolver::new(&catalog, &confirm, false);

        let result = resolver.resolve("Song", "Band", "Album").await.unwrap();
        assert!(result.is_none());
        // All five strategies ran.
        assert_eq!(catalog.queries().len(), 5);
    }

    #[tokio::test]
    async fn test_title_only_accepts_on_artist_substring() {
        let catalog = ScriptedCatalog::new(vec![(
            "Song",
            vec![song("4", "Song", "The Band Ensemble")],
        )]);
        let confirm = StaticConfirm(false);
        let resolver = Resolver::new(&catalog, &confirm, true);

        let (candidate, match_type) =
            resolver.resolve("Song", "band", "Album").await.unwrap().unwrap();
        assert_eq!(candidate.id, "4");
        assert_eq!(match_type, MatchType::Title);
    }

    #[tokio::test]
    async fn test_title_only_prompts_on_mismatch() {
        let catalog = ScriptedCatalog::new(vec![(
            "Song",
            vec![song("5", "Song", "Somebody Else")],
        )]);

        let rejecting = StaticConfirm(false);
        let resolver = Resolver::new(&catalog, &rejecting, true);
        assert!(resolver
            .resolve("Song", "Band", "Album")
            .await
            .unwrap()
            .is_none());

        let accepting = StaticConfirm(true);
        let resolver = Resolver::new(&catalog, &accepting, true);
        let (candidate, _) = resolver
            .resolve("Song", "Band", "Album")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(candidate.id, "5");
    }

    /// Catalog that fails every query with a given error constructor.
    struct FailingCatalog {
        authentication: bool,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl CatalogSearch for FailingCatalog {
        async fn search_songs(&self, _term: &str) -> Result<Vec<CatalogSong>, ClientError> {
            *self.calls.lock().unwrap() += 1;
            if self.authentication {
                Err(ClientError::Authentication {
                    status: 401,
                    body: String::new(),
                })
            } else {
                Err(ClientError::Status { status: 500 })
            }
        }

        async fn lookup_isrc(&self, _isrc: &str) -> Result<Option<CatalogSong>, ClientError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_authentication_error_aborts_cascade() {
        let catalog = FailingCatalog {
            authentication: true,
            calls: Mutex::new(0),
        };
        let confirm = StaticConfirm(false);
        let resolver = Resolver::new(&catalog, &confirm, false);

        let err = resolver.resolve("Song", "Band", "Album").await.unwrap_err();
        assert!(err.is_authentication());
        assert_eq!(*catalog.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_other_errors_continue_cascade() {
        let catalog = FailingCatalog {
            authentication: false,
            calls: Mutex::new(0),
        };
        let confirm = StaticConfirm(false);
        let resolver = Resolver::new(&catalog, &confirm, false);

        let result = resolver.resolve("Song", "Band", "Album").await.unwrap();
        assert!(result.is_none());
        assert_eq!(*catalog.calls.lock().unwrap(), 5);
    }
}
