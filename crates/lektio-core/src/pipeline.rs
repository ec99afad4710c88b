use std::sync::mpsc::Sender;

use crate::client::CompletionClient;
use crate::error::GenerateError;
use crate::items::generate_items;
use crate::notes::{ACADEMIC_SYSTEM_PROMPT, DEFAULT_CHUNK_CHARS, synthesize_notes};
use crate::outline::parse_outline;
use crate::recover::recover_json;
use crate::summary::{SummaryTargets, generate_summary};
use crate::{ItemKind, PipelineEvent, StudyPack};

/// Generation targets for one post-processing run.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub chunk_chars: usize,
    pub summary: SummaryTargets,
    pub questions: usize,
    pub flashcards: usize,
    pub glossary: usize,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            chunk_chars: DEFAULT_CHUNK_CHARS,
            summary: SummaryTargets::default(),
            questions: 16,
            flashcards: 30,
            glossary: 20,
        }
    }
}

/// Run the whole post-processing pipeline over a finished transcript.
///
/// Stages run strictly in order; any provider error aborts the remaining
/// stages and surfaces as an `Error` event. Parse problems never abort --
/// they degrade within their stage. `EnableGenerate` and `Done` are emitted
/// on both the success and failure paths so the caller can re-enable its
/// controls.
pub fn run_generation(
    client: &dyn CompletionClient,
    transcript: &str,
    options: &GenerateOptions,
    tx: &Sender<PipelineEvent>,
) {
    match generate_pack(client, transcript, options, tx) {
        Ok(pack) => {
            let _ = tx.send(PipelineEvent::Results(pack));
        }
        Err(e) => {
            let _ = tx.send(PipelineEvent::Error(format!("generation failed: {e}")));
        }
    }
    let _ = tx.send(PipelineEvent::Status("ready".into()));
    let _ = tx.send(PipelineEvent::EnableGenerate);
    let _ = tx.send(PipelineEvent::Done);
}

fn generate_pack(
    client: &dyn CompletionClient,
    transcript: &str,
    options: &GenerateOptions,
    tx: &Sender<PipelineEvent>,
) -> Result<StudyPack, GenerateError> {
    let status = |message: &str| {
        let _ = tx.send(PipelineEvent::Status(message.to_string()));
    };

    status("synthesizing notes and outline");
    let notes = synthesize_notes(client, transcript, options.chunk_chars)?;

    status("generating abstract");
    let abstract_user = format!(
        "Write an abstract of 6-8 sentences, faithful to the COMPLETE NOTES below. \
         No bullet lists, prose only. COMPLETE NOTES:\n{}",
        notes.0
    );
    let abstract_text = client.complete(ACADEMIC_SYSTEM_PROMPT, &abstract_user)?;

    status("generating long summary");
    let summary_markdown = generate_summary(client, &notes, options.summary)?;

    status("building outline");
    let outline_user = format!(
        "From the COMPLETE NOTES, create a hierarchical outline (max 3 levels) in JSON \
         with this shape [{{\"title\":\"...\", \"children\":[...]}}]. ONLY JSON.\n\n\
         COMPLETE NOTES:\n{}",
        notes.0
    );
    let outline_text = client.complete(ACADEMIC_SYSTEM_PROMPT, &outline_user)?;
    let outline = recover_json(&outline_text)
        .map(|value| parse_outline(&value))
        .unwrap_or_default();

    status("extracting key points");
    let key_points_user = format!(
        "Extract 10-16 concise key points (single-line bullets) from the COMPLETE NOTES:\n{}",
        notes.0
    );
    let key_points_text = client.complete(ACADEMIC_SYSTEM_PROMPT, &key_points_user)?;
    let key_points: Vec<String> = key_points_text
        .lines()
        .map(|line| line.trim_matches(['-', '•', ' ', '\t']).trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();

    status("generating questions");
    let questions = generate_items(client, &notes, ItemKind::Questions, options.questions)?;

    status("generating flashcards");
    let flashcards = generate_items(client, &notes, ItemKind::Flashcards, options.flashcards)?;

    status("generating glossary");
    let glossary = generate_items(client, &notes, ItemKind::Glossary, options.glossary)?;

    Ok(StudyPack {
        abstract_text,
        summary_markdown,
        outline,
        key_points,
        questions,
        flashcards,
        glossary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TranscribeError;
    use crate::client::TranscribeRequest;
    use std::sync::Mutex;
    use std::sync::mpsc;

    /// Routes on distinctive prompt fragments so one client can serve the
    /// whole pipeline.
    struct StageClient {
        calls: Mutex<Vec<String>>,
        fail_on_summary: bool,
    }

    impl StageClient {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_on_summary: false,
            }
        }
    }

    impl CompletionClient for StageClient {
        fn name(&self) -> &'static str {
            "stage"
        }

        fn transcribe(&self, _req: &TranscribeRequest<'_>) -> Result<String, TranscribeError> {
            unreachable!()
        }

        fn complete(&self, _system: &str, user: &str) -> Result<String, GenerateError> {
            self.calls.lock().unwrap().push(user.to_string());
            if user.contains("transcript chunk") {
                return Ok("partial notes".into());
            }
            if user.contains("PARTIAL NOTES:") {
                return Ok("merged notes".into());
            }
            if user.contains("Write an abstract") {
                return Ok("A faithful abstract.".into());
            }
            if user.contains("Markdown summary") {
                if self.fail_on_summary {
                    return Err(GenerateError::Network("quota".into()));
                }
                return Ok("# Summary\nbody\n<!-- WORDS: 1800 -->".into());
            }
            if user.contains("hierarchical outline") {
                return Ok("```json\n[{\"title\":\"Topic\",\"children\":[]}]\n```".into());
            }
            if user.contains("key points") {
                return Ok("- point one\n• point two\n\n- point three".into());
            }
            if user.contains("questions items") {
                return Ok(r#"[{"q":"q1","a":"a1","difficulty":"easy"}]"#.into());
            }
            if user.contains("flashcards items") {
                return Ok(r#"[{"front":"f1","back":"b1"}]"#.into());
            }
            if user.contains("glossary items") {
                return Ok(r#"[{"term":"t1","definition":"d1"}]"#.into());
            }
            Ok(String::new())
        }
    }

    fn small_options() -> GenerateOptions {
        GenerateOptions {
            questions: 1,
            flashcards: 1,
            glossary: 1,
            ..GenerateOptions::default()
        }
    }

    #[test]
    fn full_pipeline_assembles_all_seven_artifacts() {
        let client = StageClient::new();
        let (tx, rx) = mpsc::channel();

        run_generation(&client, "the transcript text", &small_options(), &tx);

        let events: Vec<PipelineEvent> = rx.try_iter().collect();
        let pack = events
            .iter()
            .find_map(|e| match e {
                PipelineEvent::Results(pack) => Some(pack.clone()),
                _ => None,
            })
            .expect("results event");

        assert_eq!(pack.abstract_text, "A faithful abstract.");
        assert_eq!(pack.summary_markdown, "# Summary\nbody");
        assert_eq!(pack.outline.len(), 1);
        assert_eq!(pack.outline[0].title, "Topic");
        assert_eq!(
            pack.key_points,
            vec!["point one", "point two", "point three"]
        );
        assert_eq!(pack.questions.len(), 1);
        assert_eq!(pack.flashcards.len(), 1);
        assert_eq!(pack.glossary.len(), 1);
        assert!(matches!(events.last(), Some(PipelineEvent::Done)));
        assert!(
            events
                .iter()
                .any(|e| matches!(e, PipelineEvent::EnableGenerate))
        );
    }

    #[test]
    fn stage_statuses_emitted_in_order() {
        let client = StageClient::new();
        let (tx, rx) = mpsc::channel();

        run_generation(&client, "text", &small_options(), &tx);

        let statuses: Vec<String> = rx
            .try_iter()
            .filter_map(|e| match e {
                PipelineEvent::Status(s) => Some(s),
                _ => None,
            })
            .collect();
        let expected = [
            "synthesizing notes and outline",
            "generating abstract",
            "generating long summary",
            "building outline",
            "extracting key points",
            "generating questions",
            "generating flashcards",
            "generating glossary",
            "ready",
        ];
        assert_eq!(statuses, expected);
    }

    #[test]
    fn provider_error_aborts_remaining_stages_but_still_reenables() {
        let client = StageClient {
            fail_on_summary: true,
            ..StageClient::new()
        };
        let (tx, rx) = mpsc::channel();

        run_generation(&client, "text", &small_options(), &tx);

        let events: Vec<PipelineEvent> = rx.try_iter().collect();
        assert!(
            events
                .iter()
                .any(|e| matches!(e, PipelineEvent::Error(msg) if msg.contains("quota")))
        );
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, PipelineEvent::Results(_)))
        );
        // No stage after the summary ran.
        let calls = client.calls.lock().unwrap();
        assert!(!calls.iter().any(|c| c.contains("questions items")));
        assert!(
            events
                .iter()
                .any(|e| matches!(e, PipelineEvent::EnableGenerate))
        );
        assert!(matches!(events.last(), Some(PipelineEvent::Done)));
    }

    #[test]
    fn unparseable_outline_degrades_to_empty() {
        struct ProseOutlineClient;
        impl CompletionClient for ProseOutlineClient {
            fn name(&self) -> &'static str {
                "prose"
            }
            fn transcribe(&self, _req: &TranscribeRequest<'_>) -> Result<String, TranscribeError> {
                unreachable!()
            }
            fn complete(&self, _system: &str, user: &str) -> Result<String, GenerateError> {
                if user.contains("Markdown summary") {
                    return Ok("s\n<!-- WORDS: 2000 -->".into());
                }
                Ok("no structure to speak of".into())
            }
        }
        let (tx, rx) = mpsc::channel();
        run_generation(&ProseOutlineClient, "text", &small_options(), &tx);
        let pack = rx
            .try_iter()
            .find_map(|e| match e {
                PipelineEvent::Results(pack) => Some(pack),
                _ => None,
            })
            .unwrap();
        assert!(pack.outline.is_empty());
    }
}
