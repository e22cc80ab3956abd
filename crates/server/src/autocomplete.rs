//! Autocomplete suggestions.
//!
//! Prefix-matches partial input against the command vocabulary and, for
//! commands taking path arguments, against directory entries of the
//! session's current directory. Exact-vocabulary matches sort before
//! path matches; each group is alphabetical.

use std::fs;
use std::path::Path;

use crate::registry::CommandRegistry;

pub fn suggest(registry: &CommandRegistry, partial: &str, cwd: &Path) -> Vec<String> {
    if partial.trim().is_empty() {
        return registry.vocabulary();
    }

    let ends_with_space = partial.ends_with(char::is_whitespace);
    let tokens: Vec<&str> = partial.split_whitespace().collect();

    if tokens.len() == 1 && !ends_with_space {
        // Completing the command word: vocabulary first, then paths
        let prefix = tokens[0];
        let mut suggestions = registry.matching(prefix);
        suggestions.extend(path_matches(cwd, prefix));
        return suggestions;
    }

    // Completing an argument: paths only, and only for commands that
    // take them
    let takes_paths = registry
        .get(tokens[0])
        .map(|spec| spec.takes_paths)
        .unwrap_or(false);
    if !takes_paths {
        return Vec::new();
    }

    let stem = if ends_with_space {
        ""
    } else {
        tokens.last().copied().unwrap_or("")
    };
    path_matches(cwd, stem)
}

/// Entries under `cwd` (or a `dir/` prefix of `stem`) whose name starts
/// with the stem's final component. Directories get a trailing slash.
fn path_matches(cwd: &Path, stem: &str) -> Vec<String> {
    let (dir_part, base) = match stem.rfind('/') {
        Some(idx) => (&stem[..idx + 1], &stem[idx + 1..]),
        None => ("", stem),
    };

    let base_dir = if dir_part.is_empty() {
        cwd.to_path_buf()
    } else if Path::new(dir_part).is_absolute() {
        Path::new(dir_part).to_path_buf()
    } else {
        cwd.join(dir_part)
    };

    let Ok(read) = fs::read_dir(&base_dir) else {
        return Vec::new();
    };

    let mut matches: Vec<String> = read
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(base) {
                return None;
            }
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            let suffix = if is_dir { "/" } else { "" };
            Some(format!("{dir_part}{name}{suffix}"))
        })
        .collect();
    matches.sort();
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn registry() -> CommandRegistry {
        CommandRegistry::new()
    }

    #[test]
    fn empty_input_offers_the_whole_vocabulary() {
        let tmp = TempDir::new().unwrap();
        let suggestions = suggest(&registry(), "", tmp.path());
        assert_eq!(suggestions, registry().vocabulary());
    }

    #[test]
    fn command_word_prefix_matches_alphabetically() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(suggest(&registry(), "h", tmp.path()), vec!["help", "history"]);
        assert_eq!(suggest(&registry(), "mk", tmp.path()), vec!["mkdir"]);
    }

    #[test]
    fn vocabulary_matches_come_before_path_matches() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("help.txt"), "x").unwrap();
        assert_eq!(
            suggest(&registry(), "hel", tmp.path()),
            vec!["help", "help.txt"]
        );
    }

    #[test]
    fn argument_position_completes_directory_entries() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("hello.txt"), "x").unwrap();
        std::fs::create_dir(tmp.path().join("hello-dir")).unwrap();
        assert_eq!(
            suggest(&registry(), "cat he", tmp.path()),
            vec!["hello-dir/", "hello.txt"]
        );
    }

    #[test]
    fn argument_position_respects_takes_paths() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("hello.txt"), "x").unwrap();
        assert!(suggest(&registry(), "echo he", tmp.path()).is_empty());
    }

    #[test]
    fn trailing_space_offers_all_entries() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.txt"), "x").unwrap();
        std::fs::write(tmp.path().join("b.txt"), "x").unwrap();
        assert_eq!(
            suggest(&registry(), "cat ", tmp.path()),
            vec!["a.txt", "b.txt"]
        );
    }

    #[test]
    fn subdirectory_prefix_is_preserved() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("sub")).unwrap();
        std::fs::write(tmp.path().join("sub/main.rs"), "x").unwrap();
        assert_eq!(
            suggest(&registry(), "cat sub/ma", tmp.path()),
            vec!["sub/main.rs"]
        );
    }
}
