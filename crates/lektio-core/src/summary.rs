use crate::NoteBundle;
use crate::client::CompletionClient;
use crate::error::GenerateError;

const SYSTEM_PROMPT: &str =
    "You are an academic assistant. Produce summaries in English, structured in Markdown.";

const MAX_ATTEMPTS: usize = 3;

const EXPANSION_HINT: &str =
    "\n\n[NOTE: expand coverage of examples, practical applications, and edge cases.]";

/// Word-count targets; only the lower bound is enforced by retry.
#[derive(Debug, Clone, Copy)]
pub struct SummaryTargets {
    pub min_words: usize,
    pub max_words: usize,
}

impl Default for SummaryTargets {
    fn default() -> Self {
        Self {
            min_words: 1700,
            max_words: 2200,
        }
    }
}

/// Produce a long-form Markdown summary whose word count meets the minimum,
/// within a bounded retry loop.
///
/// Each attempt asks the model to append a `<!-- WORDS: <n> -->` marker
/// reporting its own count; an absent marker falls back to counting word
/// tokens directly. Attempts that reach the minimum return immediately.
/// When every attempt falls short, the last non-empty attempt is returned
/// as a degraded result rather than an error. The marker itself is an
/// internal self-report and is stripped before the summary is returned.
pub fn generate_summary(
    client: &dyn CompletionClient,
    notes: &NoteBundle,
    targets: SummaryTargets,
) -> Result<String, GenerateError> {
    let mut notes_text = notes.0.clone();
    let mut best = String::new();

    for _attempt in 0..MAX_ATTEMPTS {
        let user = format!(
            "Using the COMPLETE NOTES below, write a **substantial** Markdown summary \
             between {}-{} words, with headings (#, ##, ###), examples, and textual \
             formulas. Write in English.\n\
             Do not invent facts; if information is not in the notes, omit it.\n\n\
             At the end, add one HTML comment line with exact syntax:\n\
             <!-- WORDS: <number> -->\n\n\
             COMPLETE NOTES:\n{notes_text}",
            targets.min_words, targets.max_words
        );
        let markdown = client.complete(SYSTEM_PROMPT, &user)?;
        if !markdown.is_empty() {
            best = markdown.clone();
        }

        let words = parse_words_marker(&markdown).unwrap_or_else(|| count_words(&markdown));
        if words >= targets.min_words {
            return Ok(strip_words_marker(&markdown));
        }

        notes_text.push_str(EXPANSION_HINT);
    }

    Ok(strip_words_marker(&best))
}

/// Extract the self-reported count from a `<!-- WORDS: <n> -->` line.
pub fn parse_words_marker(text: &str) -> Option<usize> {
    text.lines().rev().find_map(|line| {
        let inner = line
            .trim()
            .strip_prefix("<!--")?
            .strip_suffix("-->")?
            .trim();
        let count = strip_prefix_ignore_case(inner, "WORDS:")?.trim();
        count.parse().ok()
    })
}

/// Remove marker lines so the self-report never reaches the rendering.
pub fn strip_words_marker(text: &str) -> String {
    text.lines()
        .filter(|line| {
            let trimmed = line.trim();
            !(trimmed.starts_with("<!--") && parse_words_marker(trimmed).is_some())
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim_end()
        .to_string()
}

/// Word-boundary token count used when the marker is absent.
pub fn count_words(text: &str) -> usize {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| !token.is_empty())
        .count()
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    // `get` so a multibyte char straddling the boundary is a mismatch,
    // not a panic.
    let head = text.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&text[prefix.len()..])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TranscribeError;
    use crate::client::TranscribeRequest;
    use std::sync::Mutex;

    struct ScriptedClient {
        responses: Mutex<Vec<String>>,
        calls: Mutex<usize>,
    }

    impl ScriptedClient {
        fn new(responses: Vec<&str>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().map(String::from).collect()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    impl CompletionClient for ScriptedClient {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn transcribe(&self, _req: &TranscribeRequest<'_>) -> Result<String, TranscribeError> {
            unreachable!()
        }

        fn complete(&self, _system: &str, _user: &str) -> Result<String, GenerateError> {
            *self.calls.lock().unwrap() += 1;
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                Ok(String::new())
            } else {
                Ok(responses.remove(0))
            }
        }
    }

    fn notes() -> NoteBundle {
        NoteBundle("outline and key points".into())
    }

    #[test]
    fn marker_parsing() {
        assert_eq!(parse_words_marker("body\n<!-- WORDS: 1800 -->"), Some(1800));
        assert_eq!(parse_words_marker("<!--   words: 42   -->"), Some(42));
        assert_eq!(parse_words_marker("no marker here"), None);
        assert_eq!(parse_words_marker("<!-- WORDS: many -->"), None);
    }

    #[test]
    fn marker_is_stripped_from_output() {
        let stripped = strip_words_marker("# Title\n\nbody text\n<!-- WORDS: 1800 -->");
        assert_eq!(stripped, "# Title\n\nbody text");
    }

    #[test]
    fn multibyte_comment_is_not_a_marker() {
        assert_eq!(parse_words_marker("<!-- perché -->"), None);
        assert_eq!(parse_words_marker("<!-- è -->"), None);
        let text = "riassunto\n<!-- perché no? -->\n<!-- WORDS: 1800 -->";
        assert_eq!(parse_words_marker(text), Some(1800));
        assert_eq!(strip_words_marker(text), "riassunto\n<!-- perché no? -->");
    }

    #[test]
    fn other_html_comments_survive_stripping() {
        let text = "<!-- keep me -->\nbody\n<!-- WORDS: 12 -->";
        assert_eq!(strip_words_marker(text), "<!-- keep me -->\nbody");
    }

    #[test]
    fn count_words_matches_token_boundaries() {
        assert_eq!(count_words("three plain words"), 3);
        assert_eq!(count_words("# heading, with-punct!"), 3);
        assert_eq!(count_words(""), 0);
    }

    #[test]
    fn sufficient_marker_returns_on_first_attempt() {
        let client = ScriptedClient::new(vec!["summary body\n<!-- WORDS: 1800 -->"]);
        let summary = generate_summary(&client, &notes(), SummaryTargets::default()).unwrap();
        assert_eq!(client.calls(), 1);
        assert_eq!(summary, "summary body");
    }

    #[test]
    fn short_marker_triggers_second_attempt() {
        let client = ScriptedClient::new(vec![
            "short\n<!-- WORDS: 1500 -->",
            "long enough\n<!-- WORDS: 1800 -->",
        ]);
        let summary = generate_summary(&client, &notes(), SummaryTargets::default()).unwrap();
        assert_eq!(client.calls(), 2);
        assert_eq!(summary, "long enough");
    }

    #[test]
    fn missing_marker_falls_back_to_direct_count() {
        let body = "word ".repeat(1750);
        let client = ScriptedClient::new(vec![body.as_str()]);
        generate_summary(&client, &notes(), SummaryTargets::default()).unwrap();
        assert_eq!(client.calls(), 1);
    }

    #[test]
    fn exhausted_attempts_return_last_non_empty() {
        let client = ScriptedClient::new(vec![
            "attempt one\n<!-- WORDS: 100 -->",
            "attempt two\n<!-- WORDS: 200 -->",
            "",
        ]);
        let summary = generate_summary(&client, &notes(), SummaryTargets::default()).unwrap();
        assert_eq!(client.calls(), 3);
        assert_eq!(summary, "attempt two");
    }

    #[test]
    fn low_minimum_accepts_first_attempt() {
        let client = ScriptedClient::new(vec!["tiny but fine"]);
        let targets = SummaryTargets {
            min_words: 2,
            max_words: 10,
        };
        let summary = generate_summary(&client, &notes(), targets).unwrap();
        assert_eq!(client.calls(), 1);
        assert_eq!(summary, "tiny but fine");
    }
}
