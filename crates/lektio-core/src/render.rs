use crate::windows::format_range_label;
use crate::{StructuredItem, TranscriptSegment};

/// Plain-text transcript: a time-range label line before each segment body.
pub fn render_transcript(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|segment| format!("{}\n{}\n", format_range_label(&segment.window), segment.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Numbered question blocks with answer and difficulty lines.
pub fn render_questions(items: &[StructuredItem]) -> String {
    let mut lines = Vec::new();
    for (i, item) in items.iter().enumerate() {
        if let StructuredItem::Question { q, a, difficulty } = item {
            lines.push(format!(
                "{:02}) {}\n   Answer: {}\n   Difficulty: {}\n",
                i + 1,
                q.trim(),
                a.trim(),
                difficulty.trim()
            ));
        }
    }
    lines.join("\n")
}

/// Numbered FRONT/BACK blocks; the CSV exporter parses this shape back.
pub fn render_flashcards(items: &[StructuredItem]) -> String {
    let mut lines = Vec::new();
    for (i, item) in items.iter().enumerate() {
        if let StructuredItem::Flashcard { front, back } = item {
            lines.push(format!(
                "{:02}) FRONT: {}\n    BACK: {}\n",
                i + 1,
                front.trim(),
                back.trim()
            ));
        }
    }
    lines.join("\n")
}

/// `- term: definition` lines.
pub fn render_glossary(items: &[StructuredItem]) -> String {
    items
        .iter()
        .filter_map(|item| match item {
            StructuredItem::GlossaryEntry { term, definition } => {
                Some(format!("- {}: {}", term.trim(), definition.trim()))
            }
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One key point per line.
pub fn render_key_points(points: &[String]) -> String {
    points.join("\n")
}

/// Recover front/back pairs from rendered flashcard text via line-prefix
/// matching. A card is emitted when its BACK line arrives and the pending
/// front is non-empty.
pub fn parse_flashcard_text(text: &str) -> Vec<(String, String)> {
    let mut cards = Vec::new();
    let mut front = String::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if let Some((_, value)) = trimmed.split_once("FRONT:") {
            front = value.trim().to_string();
        } else if let Some((_, value)) = trimmed.split_once("BACK:") {
            if !front.is_empty() {
                cards.push((std::mem::take(&mut front), value.trim().to_string()));
            }
        }
    }
    cards
}

/// Two-column CSV with a `Front,Back` header, one row per card (Anki
/// import shape). Fields are quoted only when they need to be.
pub fn flashcards_csv(cards: &[(String, String)]) -> String {
    let mut out = String::from("Front,Back\r\n");
    for (front, back) in cards {
        out.push_str(&csv_field(front));
        out.push(',');
        out.push_str(&csv_field(back));
        out.push_str("\r\n");
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
