use crate::NoteBundle;
use crate::client::CompletionClient;
use crate::error::GenerateError;

pub(crate) const ACADEMIC_SYSTEM_PROMPT: &str =
    "You are an academic assistant. Be faithful to the source and do not invent facts.";

/// Character budget of one map chunk; roughly 4-5k raw tokens.
pub const DEFAULT_CHUNK_CHARS: usize = 6000;

const PARTIAL_DIVIDER: &str = "\n\n---\n\n";

/// Collapse whitespace runs to single spaces, trim, then split into fixed
/// character windows so chunk boundaries are budget-accurate rather than
/// skewed by formatting. No overlap; the last window may be shorter.
pub fn split_for_prompt(text: &str, chunk_chars: usize) -> Vec<String> {
    let normalized = normalize_whitespace(text);
    if normalized.is_empty() {
        return Vec::new();
    }
    let chars: Vec<char> = normalized.chars().collect();
    chars
        .chunks(chunk_chars.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Map-reduce the transcript into one unified note bundle.
///
/// Map: one completion per chunk, strictly sequential, scoped to that chunk
/// only. Reduce: one completion merging every partial. This stage is
/// best-effort synthesis; no validation or deduplication happens here.
pub fn synthesize_notes(
    client: &dyn CompletionClient,
    transcript: &str,
    chunk_chars: usize,
) -> Result<NoteBundle, GenerateError> {
    let chunks = split_for_prompt(transcript, chunk_chars);
    let total = chunks.len();

    let mut partials = Vec::with_capacity(total);
    for (idx, chunk) in chunks.iter().enumerate() {
        let user = format!(
            "This is transcript chunk {}/{total}.\n\
             1) Extract numbered key concepts.\n\
             2) List technical terms with short definitions.\n\
             3) Propose a mini-outline (max 2 levels).\n\n\
             CHUNK:\n{chunk}",
            idx + 1
        );
        let partial = client.complete(ACADEMIC_SYSTEM_PROMPT, &user)?;
        partials.push(partial);
    }

    let reduce_user = format!(
        "Merge the notes below into:\n\
         A) A global OUTLINE (max 3 levels)\n\
         B) KEY POINTS (concise bullets)\n\
         C) GLOSSARY CANDIDATES (term: short definition)\n\n\
         PARTIAL NOTES:\n{}",
        partials.join(PARTIAL_DIVIDER)
    );
    let merged = client.complete(ACADEMIC_SYSTEM_PROMPT, &reduce_user)?;

    Ok(NoteBundle(merged))
}
