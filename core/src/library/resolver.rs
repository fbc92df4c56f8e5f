//! Game lookup from a user query
//!
//! Matches against game keys and display names:
//! - Exact key match
//! - Case-insensitive key or name match (if unique)
//! - Case-insensitive name prefix (if unique)
//! - Otherwise an error with typo suggestions

use std::fmt;

use super::Game;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionError {
    pub message: String,
    pub suggestion: Option<Vec<String>>,
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(suggestions) = &self.suggestion {
            write!(f, " (did you mean: {})", suggestions.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ResolutionError {}

/// Resolve a game from a key, name or name prefix.
pub fn resolve_game<'a>(query: &str, games: &'a [Game]) -> Result<&'a Game, ResolutionError> {
    if query.is_empty() {
        return Err(ResolutionError {
            message: "Empty game query".to_string(),
            suggestion: None,
        });
    }

    if let Some(game) = games.iter().find(|g| g.key == query) {
        return Ok(game);
    }

    let lower = query.to_lowercase();

    let exact: Vec<&Game> = games
        .iter()
        .filter(|g| g.key.to_lowercase() == lower || g.name.to_lowercase() == lower)
        .collect();
    if let [game] = exact.as_slice() {
        return Ok(*game);
    }

    let prefixed: Vec<&Game> = games
        .iter()
        .filter(|g| g.name.to_lowercase().starts_with(&lower))
        .collect();

    match prefixed.as_slice() {
        [game] => Ok(*game),
        [] if exact.is_empty() => {
            let suggestions = similar_names(query, games);
            Err(ResolutionError {
                message: format!("Game '{}' not found", query),
                suggestion: (!suggestions.is_empty()).then_some(suggestions),
            })
        }
        _ => {
            let candidates = if exact.len() > 1 { &exact } else { &prefixed };
            Err(ResolutionError {
                message: format!("Ambiguous game '{}' matches multiple entries", query),
                suggestion: Some(candidates.iter().map(|g| g.key.clone()).collect()),
            })
        }
    }
}

/// Up to three game keys whose name is within edit distance 3 of the query.
fn similar_names(query: &str, games: &[Game]) -> Vec<String> {
    const DISTANCE_THRESHOLD: usize = 3;

    let lower = query.to_lowercase();
    let mut scored: Vec<(usize, &Game)> = games
        .iter()
        .map(|g| (levenshtein_distance(&lower, &g.name.to_lowercase()), g))
        .filter(|(dist, _)| *dist <= DISTANCE_THRESHOLD)
        .collect();

    scored.sort_by_key(|(dist, _)| *dist);
    scored.into_iter().take(3).map(|(_, g)| g.key.clone()).collect()
}

/// Edit distance between two strings, counted in chars.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != *cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
