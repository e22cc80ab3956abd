//! Raw input resolution.
//!
//! Turns a raw input line into a structured command: plain input is
//! tokenized (quotes group words), and input starting with `!` is treated
//! as natural-language shorthand matched against an ordered rule list.
//! Rules are evaluated first-match-wins; the rule order in
//! `default_rules()` is load-bearing and unit-tested.
//!
//! Unknown bare command names are NOT an error here: the resolver only
//! tokenizes and interprets shorthand. Unknown-command detection belongs
//! to the dispatcher, which owns the registry.

use regex::Regex;
use thiserror::Error;

/// Prefix marking natural-language shorthand input
pub const INTENT_PREFIX: char = '!';

/// A structured command produced by resolution; consumed once by the
/// dispatcher, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    pub name: String,
    pub args: Vec<String>,
    pub natural_language: bool,
}

/// Result of resolving one raw input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Blank input; the dispatcher emits nothing
    Empty,
    Command(ResolvedCommand),
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Could not interpret '{input}'")]
    UnrecognizedIntent {
        input: String,
        suggestions: Vec<String>,
    },
}

/// One shorthand rule: any of `patterns` expands into `template`.
/// Named capture groups fill `{name}` placeholders in the template.
struct IntentRule {
    patterns: Vec<Regex>,
    template: &'static str,
}

pub struct Resolver {
    rules: Vec<IntentRule>,
    vocabulary: Vec<String>,
}

impl Resolver {
    /// Build a resolver over the command vocabulary (used for
    /// "did you mean" suggestions on unrecognized shorthand).
    pub fn new(vocabulary: Vec<String>) -> Self {
        Self {
            rules: default_rules(),
            vocabulary,
        }
    }

    pub fn resolve(&self, raw: &str) -> Result<Resolution, ResolveError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Resolution::Empty);
        }

        if let Some(rest) = trimmed.strip_prefix(INTENT_PREFIX) {
            return self.interpret_intent(rest.trim());
        }

        let tokens = tokenize(trimmed);
        let Some((name, args)) = tokens.split_first() else {
            return Ok(Resolution::Empty);
        };
        Ok(Resolution::Command(ResolvedCommand {
            name: name.to_lowercase(),
            args: args.to_vec(),
            natural_language: false,
        }))
    }

    fn interpret_intent(&self, text: &str) -> Result<Resolution, ResolveError> {
        if text.is_empty() {
            return Ok(Resolution::Empty);
        }
        let phrase = text.to_lowercase();

        // "run <cmd>" / "execute <cmd>" pass the rest through verbatim
        for prefix in ["run ", "execute "] {
            if let Some(direct) = phrase.strip_prefix(prefix) {
                return Ok(as_natural_command(direct));
            }
        }

        for rule in &self.rules {
            for pattern in &rule.patterns {
                if let Some(caps) = pattern.captures(&phrase) {
                    let expanded = expand_template(rule.template, pattern, &caps);
                    return Ok(as_natural_command(&expanded));
                }
            }
        }

        Err(ResolveError::UnrecognizedIntent {
            input: text.to_string(),
            suggestions: self.suggest(&phrase),
        })
    }

    /// Edit-distance suggestions for an unrecognized phrase, ranked best
    /// first, ties broken alphabetically.
    fn suggest(&self, phrase: &str) -> Vec<String> {
        let probe = phrase.split_whitespace().next().unwrap_or(phrase);
        let mut scored: Vec<(f64, &String)> = self
            .vocabulary
            .iter()
            .map(|name| (strsim::jaro_winkler(probe, name), name))
            .filter(|(score, _)| *score >= 0.7)
            .collect();
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.cmp(b.1))
        });
        scored.into_iter().take(3).map(|(_, n)| n.clone()).collect()
    }
}

fn as_natural_command(expanded: &str) -> Resolution {
    let tokens = tokenize(expanded);
    match tokens.split_first() {
        Some((name, args)) => Resolution::Command(ResolvedCommand {
            name: name.to_lowercase(),
            args: args.to_vec(),
            natural_language: true,
        }),
        None => Resolution::Empty,
    }
}

/// Substitute named capture groups into the template. A `{key}` whose
/// group did not participate is removed together with its leading space;
/// captured values containing whitespace are quoted so tokenization keeps
/// them as one argument.
fn expand_template(template: &str, pattern: &Regex, caps: &regex::Captures<'_>) -> String {
    let mut out = template.to_string();
    for name in pattern.capture_names().flatten() {
        let placeholder = format!("{{{name}}}");
        match caps.name(name).map(|m| m.as_str().trim()).filter(|v| !v.is_empty()) {
            Some(value) => {
                let value = if value.contains(char::is_whitespace) {
                    format!("\"{value}\"")
                } else {
                    value.to_string()
                };
                out = out.replace(&placeholder, &value);
            }
            None => {
                out = out.replace(&format!(" {placeholder}"), "");
                out = out.replace(&placeholder, "");
            }
        }
    }
    out
}

/// Split on whitespace, treating single- or double-quoted substrings as
/// one token (quotes themselves are dropped).
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in input.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None if ch.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            None => current.push(ch),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn rule(patterns: &[&str], template: &'static str) -> IntentRule {
    IntentRule {
        patterns: patterns
            .iter()
            .map(|p| {
                Regex::new(&format!("^{p}$")).unwrap_or_else(|e| panic!("bad intent pattern {p:?}: {e}"))
            })
            .collect(),
        template,
    }
}

/// The shorthand rule set, most specific first. Directory deletion must
/// precede the generic delete rule or "delete folder x" would resolve to
/// a plain `rm`.
fn default_rules() -> Vec<IntentRule> {
    vec![
        rule(
            &[
                r"(?:create|make) (?:a )?(?:new )?(?:empty )?file (?:called |named )?(?P<filename>\S+)",
            ],
            "touch {filename}",
        ),
        rule(
            &[
                r"(?:create|make) (?:a )?(?:new )?(?:directory|folder) (?:called |named )?(?P<dirname>\S+)",
            ],
            "mkdir {dirname}",
        ),
        rule(
            &[
                r"(?:show|display|list) (?:the )?(?:files|contents)(?: (?:in|of)(?: the)? (?:directory |folder )?(?P<dirname>\S+))?",
                r"what(?:'s| is) in (?:the )?(?:directory|folder)(?: (?P<dirname>\S+))?",
            ],
            "ls {dirname}",
        ),
        rule(
            &[
                r"(?:show|display|print|read) (?:the )?(?:contents of (?:the )?)?file (?P<filename>\S+)",
                r"what(?:'s| is) in (?:the )?file (?P<filename>\S+)",
            ],
            "cat {filename}",
        ),
        rule(
            &[r"(?:remove|delete) (?:the )?(?:directory|folder) (?P<dirname>\S+)"],
            "rm -r {dirname}",
        ),
        rule(
            &[
                r"(?:remove|delete) (?:the )?file (?P<filename>\S+)",
                r"(?:remove|delete) (?P<filename>\S+)",
            ],
            "rm {filename}",
        ),
        rule(
            &[r"copy (?:the )?(?:file )?(?P<source>\S+) to (?P<destination>\S+)"],
            "cp {source} {destination}",
        ),
        rule(
            &[
                r"move (?:the )?(?:file )?(?P<source>\S+) (?:in)?to (?P<destination>\S+)",
                r"rename (?:the )?(?:file )?(?P<source>\S+) to (?P<destination>\S+)",
            ],
            "mv {source} {destination}",
        ),
        rule(
            &[
                r"(?:change|switch|go) to (?:the )?(?:directory|folder) (?P<dirname>.+)",
                r"cd (?:to )?(?P<dirname>.+)",
            ],
            "cd {dirname}",
        ),
        rule(
            &[
                r"go (?:back|up)(?: one level)?",
                r"go to (?:the )?parent (?:directory|folder)",
            ],
            "cd ..",
        ),
        rule(
            &[r"go (?:to )?home", r"go to (?:the )?home (?:directory|folder)"],
            "cd ~",
        ),
        rule(
            &[
                r"(?:show|display|print) (?:the )?current (?:directory|folder|path)",
                r"where am i",
            ],
            "pwd",
        ),
        rule(
            &[
                r"(?:show|display) (?:the )?(?:system )?(?:cpu|processor) (?:information|info|usage|stats|load)",
                r"what(?:'s| is) (?:the )?(?:cpu|processor) (?:usage|load)",
            ],
            "cpu",
        ),
        rule(
            &[
                r"(?:show|display) (?:the )?(?:system )?memory (?:information|info|usage|stats)",
                r"what(?:'s| is) (?:the )?memory usage",
            ],
            "memory",
        ),
        rule(
            &[
                r"(?:show|display|list) (?:the )?(?:running )?processes",
                r"what processes are running",
            ],
            "processes",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> Resolver {
        Resolver::new(vec![
            "ls".into(),
            "cd".into(),
            "mkdir".into(),
            "rm".into(),
            "cpu".into(),
            "memory".into(),
            "processes".into(),
        ])
    }

    fn expect_command(res: Resolution) -> ResolvedCommand {
        match res {
            Resolution::Command(cmd) => cmd,
            Resolution::Empty => panic!("expected a command, got the empty sentinel"),
        }
    }

    #[test]
    fn empty_input_is_the_noop_sentinel() {
        assert_eq!(resolver().resolve("").unwrap(), Resolution::Empty);
        assert_eq!(resolver().resolve("   ").unwrap(), Resolution::Empty);
    }

    #[test]
    fn plain_input_tokenizes_name_and_args() {
        let cmd = expect_command(resolver().resolve("ls -la").unwrap());
        assert_eq!(cmd.name, "ls");
        assert_eq!(cmd.args, vec!["-la"]);
        assert!(!cmd.natural_language);
    }

    #[test]
    fn quotes_group_tokens_containing_spaces() {
        let cmd = expect_command(resolver().resolve(r#"mkdir "my docs" other"#).unwrap());
        assert_eq!(cmd.args, vec!["my docs", "other"]);

        let cmd = expect_command(resolver().resolve("cat 'a b.txt'").unwrap());
        assert_eq!(cmd.args, vec!["a b.txt"]);
    }

    #[test]
    fn command_name_is_lowercased() {
        let cmd = expect_command(resolver().resolve("LS src").unwrap());
        assert_eq!(cmd.name, "ls");
        assert_eq!(cmd.args, vec!["src"]);
    }

    #[test]
    fn create_folder_shorthand_maps_to_mkdir() {
        let cmd = expect_command(resolver().resolve("!create folder logs").unwrap());
        assert_eq!(cmd.name, "mkdir");
        assert_eq!(cmd.args, vec!["logs"]);
        assert!(cmd.natural_language);
    }

    #[test]
    fn delete_folder_precedes_generic_delete() {
        let cmd = expect_command(resolver().resolve("!delete folder logs").unwrap());
        assert_eq!(cmd.name, "rm");
        assert_eq!(cmd.args, vec!["-r", "logs"]);

        let cmd = expect_command(resolver().resolve("!delete notes.txt").unwrap());
        assert_eq!(cmd.name, "rm");
        assert_eq!(cmd.args, vec!["notes.txt"]);
    }

    #[test]
    fn list_files_shorthand_with_and_without_target() {
        let cmd = expect_command(resolver().resolve("!list files").unwrap());
        assert_eq!(cmd.name, "ls");
        assert!(cmd.args.is_empty());

        let cmd = expect_command(resolver().resolve("!show files in src").unwrap());
        assert_eq!(cmd.name, "ls");
        assert_eq!(cmd.args, vec!["src"]);
    }

    #[test]
    fn navigation_shorthands() {
        let cmd = expect_command(resolver().resolve("!go back").unwrap());
        assert_eq!(cmd.name, "cd");
        assert_eq!(cmd.args, vec![".."]);

        let cmd = expect_command(resolver().resolve("!go home").unwrap());
        assert_eq!(cmd.name, "cd");
        assert_eq!(cmd.args, vec!["~"]);

        let cmd = expect_command(resolver().resolve("!where am i").unwrap());
        assert_eq!(cmd.name, "pwd");
    }

    #[test]
    fn move_shorthand_captures_source_and_destination() {
        let cmd = expect_command(resolver().resolve("!move notes.txt to archive").unwrap());
        assert_eq!(cmd.name, "mv");
        assert_eq!(cmd.args, vec!["notes.txt", "archive"]);

        let cmd = expect_command(resolver().resolve("!rename a.txt to b.txt").unwrap());
        assert_eq!(cmd.name, "mv");
        assert_eq!(cmd.args, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn metrics_shorthands() {
        let cmd = expect_command(resolver().resolve("!show cpu usage").unwrap());
        assert_eq!(cmd.name, "cpu");
        let cmd = expect_command(resolver().resolve("!list processes").unwrap());
        assert_eq!(cmd.name, "processes");
    }

    #[test]
    fn run_prefix_passes_through() {
        let cmd = expect_command(resolver().resolve("!run git status").unwrap());
        assert_eq!(cmd.name, "git");
        assert_eq!(cmd.args, vec!["status"]);
        assert!(cmd.natural_language);
    }

    #[test]
    fn unrecognized_intent_carries_input_and_suggestions() {
        let err = resolver().resolve("!dosomethingunknown").unwrap_err();
        match err {
            ResolveError::UnrecognizedIntent { input, .. } => {
                assert_eq!(input, "dosomethingunknown");
            }
        }

        // A near-miss of a vocabulary word surfaces it as a suggestion
        let err = resolver().resolve("!mkdri").unwrap_err();
        match err {
            ResolveError::UnrecognizedIntent { suggestions, .. } => {
                assert!(suggestions.contains(&"mkdir".to_string()), "{suggestions:?}");
            }
        }
    }

    #[test]
    fn quoted_expansion_for_spaced_directory_names() {
        let cmd = expect_command(resolver().resolve("!cd to my project dir").unwrap());
        assert_eq!(cmd.name, "cd");
        assert_eq!(cmd.args, vec!["my project dir"]);
    }
}
