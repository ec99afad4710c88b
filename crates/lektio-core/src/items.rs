use std::collections::BTreeMap;
use std::collections::HashSet;

use crate::client::CompletionClient;
use crate::error::GenerateError;
use crate::recover::{coerce_string_maps, recover_json};
use crate::{ItemKind, NoteBundle, StructuredItem};

const SYSTEM_PROMPT: &str =
    "You are an academic assistant. Strictly follow the required JSON schema.";

/// Hard cap on model calls per list, regardless of model compliance.
pub const MAX_ROUNDS: usize = 4;

fn schema_example(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::Questions => {
            "Return **ONLY** JSON (array) in this form:\n\
             [{\"q\":\"...\", \"a\":\"...\", \"difficulty\":\"easy|medium|hard\"}, ...]\n"
        }
        ItemKind::Flashcards => {
            "Return **ONLY** JSON (array) in this form:\n\
             [{\"front\":\"...\", \"back\":\"...\"}, ...]\n"
        }
        ItemKind::Glossary => {
            "Return **ONLY** JSON (array) in this form:\n\
             [{\"term\":\"...\", \"definition\":\"...\"}, ...]\n"
        }
    }
}

fn field(map: &BTreeMap<String, String>, key: &str) -> String {
    map.get(key).cloned().unwrap_or_default()
}

/// Build one item of the given shape from a coerced string map. Missing
/// fields become empty strings; usability is decided by the dedup key.
pub fn item_from_map(kind: ItemKind, map: &BTreeMap<String, String>) -> StructuredItem {
    match kind {
        ItemKind::Questions => StructuredItem::Question {
            q: field(map, "q"),
            a: field(map, "a"),
            difficulty: field(map, "difficulty"),
        },
        ItemKind::Flashcards => StructuredItem::Flashcard {
            front: field(map, "front"),
            back: field(map, "back"),
        },
        ItemKind::Glossary => StructuredItem::GlossaryEntry {
            term: field(map, "term"),
            definition: field(map, "definition"),
        },
    }
}

/// Normalized identity projection used to detect duplicates across rounds.
///
/// Questions key on `(q, a)`, flashcards on `(front, back)`, glossary
/// entries on the term alone -- two definitions of the same term collide
/// and the later one is dropped. `None` marks an unusable (all-empty) key.
pub fn dedup_key(item: &StructuredItem) -> Option<String> {
    let parts: Vec<String> = match item {
        StructuredItem::Question { q, a, .. } => vec![normalize(q), normalize(a)],
        StructuredItem::Flashcard { front, back } => vec![normalize(front), normalize(back)],
        StructuredItem::GlossaryEntry { term, .. } => vec![normalize(term)],
    };
    if parts.iter().all(String::is_empty) {
        return None;
    }
    Some(parts.join("\u{1f}"))
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Request exactly `target` unique items of one shape, deduplicating across
/// bounded retry rounds.
///
/// Each round asks for the remaining count with the schema embedded
/// literally in the prompt. The round counter increments even when a round
/// yields nothing, so total model calls never exceed [`MAX_ROUNDS`]; the
/// result may be shorter than requested when the model under-delivers or
/// repeats itself. Parse failures degrade to zero items for that round.
pub fn generate_items(
    client: &dyn CompletionClient,
    notes: &NoteBundle,
    kind: ItemKind,
    target: usize,
) -> Result<Vec<StructuredItem>, GenerateError> {
    let mut collected: Vec<StructuredItem> = Vec::with_capacity(target);
    let mut seen: HashSet<String> = HashSet::new();
    let mut rounds = 0;

    while collected.len() < target && rounds < MAX_ROUNDS {
        let remaining = target - collected.len();
        let user = format!(
            "From the COMPLETE NOTES below, generate **exactly {remaining}** {} items. \
             Do not repeat concepts already used. Do not invent beyond the notes.\n\n\
             {}\n\
             COMPLETE NOTES:\n{}",
            kind.label(),
            schema_example(kind),
            notes.0
        );
        let output = client.complete(SYSTEM_PROMPT, &user)?;

        let maps = recover_json(&output)
            .map(|value| coerce_string_maps(&value))
            .unwrap_or_default();
        for map in maps {
            let item = item_from_map(kind, &map);
            let Some(key) = dedup_key(&item) else {
                continue;
            };
            if !seen.insert(key) {
                continue;
            }
            collected.push(item);
        }

        rounds += 1;
    }

    // A round may return more than asked; trim to the first `target`.
    collected.truncate(target);
    Ok(collected)
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
        fn repeating(response: &str) -> Self {
            Self {
                responses: Mutex::new(vec![response.to_string()]),
                calls: Mutex::new(0),
            }
        }

        fn sequence(responses: &[&str]) -> Self {
            Self {
                responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
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
            let responses = self.responses.lock().unwrap();
            if responses.len() == 1 {
                Ok(responses[0].clone())
            } else {
                let index = *self.calls.lock().unwrap() - 1;
                Ok(responses
                    .get(index)
                    .cloned()
                    .unwrap_or_else(|| "[]".to_string()))
            }
        }
    }

    fn notes() -> NoteBundle {
        NoteBundle("theory of everything".into())
    }

    fn glossary_batch(range: std::ops::Range<usize>) -> String {
        let items: Vec<String> = range
            .map(|i| format!("{{\"term\":\"t{i}\",\"definition\":\"d{i}\"}}"))
            .collect();
        format!("[{}]", items.join(","))
    }

    #[test]
    fn dedup_key_is_case_and_whitespace_insensitive() {
        let a = StructuredItem::Flashcard {
            front: " Ohm's Law ".into(),
            back: "V = IR".into(),
        };
        let b = StructuredItem::Flashcard {
            front: "ohm's law".into(),
            back: "v = ir".into(),
        };
        assert_eq!(dedup_key(&a), dedup_key(&b));
    }

    #[test]
    fn dedup_key_uses_term_only_for_glossary() {
        let a = StructuredItem::GlossaryEntry {
            term: "entropy".into(),
            definition: "disorder".into(),
        };
        let b = StructuredItem::GlossaryEntry {
            term: "Entropy".into(),
            definition: "a different definition".into(),
        };
        assert_eq!(dedup_key(&a), dedup_key(&b));
    }

    #[test]
    fn all_empty_fields_make_key_unusable() {
        let item = StructuredItem::Question {
            q: "  ".into(),
            a: "".into(),
            difficulty: "hard".into(),
        };
        assert!(dedup_key(&item).is_none());
    }

    #[test]
    fn repeated_single_item_collapses_to_one_after_round_cap() {
        let client =
            ScriptedClient::repeating(r#"[{"q":"same","a":"answer","difficulty":"easy"}]"#);
        let items = generate_items(&client, &notes(), ItemKind::Questions, 16).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(client.calls(), MAX_ROUNDS);
    }

    #[test]
    fn unique_keys_and_never_more_than_target() {
        // 5 unique + 3 duplicates per round.
        let round = |offset: usize| {
            let mut items: Vec<String> = (offset..offset + 5)
                .map(|i| format!("{{\"term\":\"t{i}\",\"definition\":\"d\"}}"))
                .collect();
            for _ in 0..3 {
                items.push("{\"term\":\"t0\",\"definition\":\"d\"}".to_string());
            }
            format!("[{}]", items.join(","))
        };
        let rounds = [round(0), round(5), round(10), round(15)];
        let client = ScriptedClient::sequence(&[
            rounds[0].as_str(),
            rounds[1].as_str(),
            rounds[2].as_str(),
            rounds[3].as_str(),
        ]);

        let items = generate_items(&client, &notes(), ItemKind::Glossary, 16).unwrap();

        assert_eq!(items.len(), 16);
        assert_eq!(client.calls(), MAX_ROUNDS);
        let keys: HashSet<_> = items.iter().map(|i| dedup_key(i).unwrap()).collect();
        assert_eq!(keys.len(), items.len());
    }

    #[test]
    fn early_exit_when_target_reached() {
        let batch = glossary_batch(0..20);
        let client = ScriptedClient::repeating(&batch);
        let items = generate_items(&client, &notes(), ItemKind::Glossary, 20).unwrap();
        assert_eq!(items.len(), 20);
        assert_eq!(client.calls(), 1);
    }

    #[test]
    fn overdelivery_is_truncated_to_target() {
        let batch = glossary_batch(0..30);
        let client = ScriptedClient::repeating(&batch);
        let items = generate_items(&client, &notes(), ItemKind::Glossary, 20).unwrap();
        assert_eq!(items.len(), 20);
    }

    #[test]
    fn unparseable_rounds_count_against_the_cap() {
        let client = ScriptedClient::repeating("I cannot produce JSON today.");
        let items = generate_items(&client, &notes(), ItemKind::Flashcards, 30).unwrap();
        assert!(items.is_empty());
        assert_eq!(client.calls(), MAX_ROUNDS);
    }

    #[test]
    fn fenced_output_is_recovered() {
        let client = ScriptedClient::repeating(
            "Sure!\n```json\n[{\"front\":\"f\",\"back\":\"b\"}]\n```",
        );
        let items = generate_items(&client, &notes(), ItemKind::Flashcards, 1).unwrap();
        assert_eq!(
            items[0],
            StructuredItem::Flashcard {
                front: "f".into(),
                back: "b".into()
            }
        );
        assert_eq!(client.calls(), 1);
    }

    #[test]
    fn provider_error_aborts_generation() {
        struct FailingClient;
        impl CompletionClient for FailingClient {
            fn name(&self) -> &'static str {
                "failing"
            }
            fn transcribe(&self, _req: &TranscribeRequest<'_>) -> Result<String, TranscribeError> {
                unreachable!()
            }
            fn complete(&self, _system: &str, _user: &str) -> Result<String, GenerateError> {
                Err(GenerateError::Network("quota exceeded".into()))
            }
        }
        assert!(generate_items(&FailingClient, &notes(), ItemKind::Questions, 4).is_err());
    }

    #[test]
    fn zero_target_issues_no_calls() {
        let client = ScriptedClient::repeating("[]");
        let items = generate_items(&client, &notes(), ItemKind::Questions, 0).unwrap();
        assert!(items.is_empty());
        assert_eq!(client.calls(), 0);
    }
}
