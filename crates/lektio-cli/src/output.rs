use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use lektio_core::render::{
    flashcards_csv, parse_flashcard_text, render_flashcards, render_glossary, render_key_points,
    render_questions,
};
use lektio_core::{StudyPack, outline::flatten_outline};
use thiserror::Error;
use time::OffsetDateTime;
use time::macros::format_description;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("output io error: {0}")]
    Io(#[from] io::Error),
    #[error("timestamp format error: {0}")]
    Timestamp(#[from] time::error::Format),
    #[error("outline serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A freshly created per-run artifact directory, `lektio-YYYYMMDD-HHMMSS`
/// under the configured base.
#[derive(Debug)]
pub struct RunDir {
    pub path: PathBuf,
}

impl RunDir {
    pub fn create(base: &Path) -> Result<Self, OutputError> {
        let stamp_format = format_description!("[year][month][day]-[hour][minute][second]");
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        let stamp = now.format(&stamp_format)?;
        let path = base.join(format!("lektio-{stamp}"));
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    pub fn write_transcript(&self, transcript: &str) -> Result<PathBuf, OutputError> {
        self.write_file("transcript.txt", transcript)
    }

    pub fn write_pack(&self, pack: &StudyPack) -> Result<Vec<PathBuf>, OutputError> {
        let mut written = Vec::new();
        written.push(self.write_file("abstract.txt", &pack.abstract_text)?);
        written.push(self.write_file("summary.md", &pack.summary_markdown)?);
        written.push(self.write_file("outline.txt", &flatten_outline(&pack.outline))?);
        written.push(self.write_file(
            "outline.json",
            &serde_json::to_string_pretty(&pack.outline)?,
        )?);
        written.push(self.write_file("key_points.txt", &render_key_points(&pack.key_points))?);
        written.push(self.write_file("questions.txt", &render_questions(&pack.questions))?);
        let flashcard_text = render_flashcards(&pack.flashcards);
        let cards = parse_flashcard_text(&flashcard_text);
        written.push(self.write_file("flashcards.txt", &flashcard_text)?);
        written.push(self.write_file("flashcards.csv", &flashcards_csv(&cards))?);
        written.push(self.write_file("glossary.txt", &render_glossary(&pack.glossary))?);
        Ok(written)
    }

    fn write_file(&self, name: &str, contents: &str) -> Result<PathBuf, OutputError> {
        let path = self.path.join(name);
        let mut body = contents.to_string();
        if !body.is_empty() && !body.ends_with('\n') {
            body.push('\n');
        }
        fs::write(&path, body)?;
        Ok(path)
    }
}
