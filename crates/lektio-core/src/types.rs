use serde::{Deserialize, Serialize};

/// One fixed-length time window over the source recording.
///
/// Windows are half-open `[start_ms, end_ms)`, contiguous, non-overlapping,
/// and their union exactly covers the recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkWindow {
    pub index: usize,
    pub start_ms: u64,
    pub end_ms: u64,
}

/// Transcription output for one window. Immutable once emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub window: ChunkWindow,
    pub text: String,
}

/// Unified notes distilled from the transcript; the single source feeding
/// every downstream generation stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoteBundle(pub String);

impl NoteBundle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A generated item with one of three shapes sharing the same lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StructuredItem {
    Question {
        q: String,
        a: String,
        difficulty: String,
    },
    Flashcard {
        front: String,
        back: String,
    },
    GlossaryEntry {
        term: String,
        definition: String,
    },
}

/// Which item shape a generation round should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Questions,
    Flashcards,
    Glossary,
}

impl ItemKind {
    pub fn label(self) -> &'static str {
        match self {
            ItemKind::Questions => "questions",
            ItemKind::Flashcards => "flashcards",
            ItemKind::Glossary => "glossary",
        }
    }
}

/// A node of the hierarchical topic outline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineNode {
    pub title: String,
    #[serde(default)]
    pub children: Vec<OutlineNode>,
}

/// The seven artifacts of one completed generation run. Write-once;
/// assembled only after every stage has finished.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudyPack {
    pub abstract_text: String,
    pub summary_markdown: String,
    pub outline: Vec<OutlineNode>,
    pub key_points: Vec<String>,
    pub questions: Vec<StructuredItem>,
    pub flashcards: Vec<StructuredItem>,
    pub glossary: Vec<StructuredItem>,
}

/// Events crossing from a worker context to the presentation layer.
///
/// The channel preserves emission order; the presentation layer is the only
/// consumer and the sole mutator of display state.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// Transcript text to append to the live view.
    Append(String),
    /// Overall progress in percent.
    Progress(f64),
    /// One-line operator-facing status.
    Status(String),
    /// Terminal failure of the current stage.
    Error(String),
    /// All generation stages finished.
    Results(StudyPack),
    /// Re-enable the generate control.
    EnableGenerate,
    /// The worker context has exited.
    Done,
}
