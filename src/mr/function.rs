//! The map/reduce callback contract.
//!
//! An application is just two callable values: `map(filename, contents) ->
//! Vec<(key, value)>` and `reduce(key, values) -> value`. Plain function
//! pointers selected by name at worker startup, held in a small static
//! registry so more than one application can be built in.

use crate::mr::error::{Error, Result};

pub type MapFn = fn(&str, &str) -> Vec<(String, String)>;
pub type ReduceFn = fn(&str, &[&str]) -> String;

#[derive(Clone, Copy)]
pub struct Application {
    pub name: &'static str,
    pub map: MapFn,
    pub reduce: ReduceFn,
}

/// Look up a registered application by name (the CLI's `--app` argument).
pub fn lookup(name: &str) -> Result<Application> {
    REGISTRY
        .iter()
        .find(|app| app.name == name)
        .copied()
        .ok_or_else(|| Error::Callback(format!("no such application: {name}")))
}

static REGISTRY: &[Application] = &[Application {
    name: "wc",
    map: wc::map,
    reduce: wc::reduce,
}];

/// Word Count application. Splits on runs of non-ASCII-letter characters
/// rather than raw whitespace, so punctuation and digits are all treated as
/// separators too — "don't" becomes two words.
pub mod wc {
    use regex::Regex;
    use std::sync::OnceLock;

    fn word_splitter() -> &'static Regex {
        static SPLITTER: OnceLock<Regex> = OnceLock::new();
        SPLITTER.get_or_init(|| Regex::new(r"[^A-Za-z]+").unwrap())
    }

    pub fn map(_filename: &str, contents: &str) -> Vec<(String, String)> {
        word_splitter()
            .split(contents)
            .filter(|w| !w.is_empty())
            .map(|w| (w.to_string(), "1".to_string()))
            .collect()
    }

    pub fn reduce(_key: &str, values: &[&str]) -> String {
        values.len().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wc_map_splits_on_non_letters() {
        let pairs = wc::map("a.txt", "the cat sat");
        assert_eq!(
            pairs,
            vec![
                ("the".to_string(), "1".to_string()),
                ("cat".to_string(), "1".to_string()),
                ("sat".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn wc_map_splits_contractions_and_punctuation() {
        let pairs = wc::map("a.txt", "don't stop, won't quit.");
        let words: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(words, vec!["don", "t", "stop", "won", "t", "quit"]);
    }

    #[test]
    fn wc_reduce_counts_occurrences() {
        assert_eq!(wc::reduce("the", &["1", "1", "1"]), "3");
    }

    #[test]
    fn lookup_finds_registered_application() {
        assert!(lookup("wc").is_ok());
        assert!(lookup("does-not-exist").is_err());
    }
}
