//! Reads every file of the document folder into `Document`s.
//!
//! PDF and DOCX files go through their text extractors; everything else is
//! read as UTF-8, lossily when it has to be.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use walkdir::{DirEntry, WalkDir};

use crate::config::DataSettings;
use crate::error::LoadError;
use crate::types::{Document, DocumentMetadata};

const PDF_MIME: &str = "application/pdf";
const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Clone)]
pub struct LoaderOptions {
    pub recursive: bool,
    /// Lowercase extensions without the dot. Empty accepts every file.
    pub extensions: Vec<String>,
    pub exclude_hidden: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self { recursive: false, extensions: Vec::new(), exclude_hidden: true }
    }
}

impl From<&DataSettings> for LoaderOptions {
    fn from(data: &DataSettings) -> Self {
        Self {
            recursive: data.recursive,
            extensions: data
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
            exclude_hidden: true,
        }
    }
}

pub struct DocumentLoader {
    root: PathBuf,
    options: LoaderOptions,
}

impl DocumentLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), options: LoaderOptions::default() }
    }

    pub fn with_options(root: impl Into<PathBuf>, options: LoaderOptions) -> Self {
        Self { root: root.into(), options }
    }

    /// Files that `load` would read, sorted by path.
    pub fn list_files(&self) -> Result<Vec<PathBuf>, LoadError> {
        if !self.root.exists() {
            return Err(LoadError::MissingDir(self.root.clone()));
        }
        if !self.root.is_dir() {
            return Err(LoadError::NotADirectory(self.root.clone()));
        }

        let max_depth = if self.options.recursive { usize::MAX } else { 1 };
        let exclude_hidden = self.options.exclude_hidden;
        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(max_depth)
            .into_iter()
            .filter_entry(|e| !(exclude_hidden && e.depth() > 0 && is_hidden(e)));

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| LoadError::Unreadable {
                path: e.path().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone()),
                source: e.into(),
            })?;
            if entry.file_type().is_file() && self.accepts(entry.path()) {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn load(&self) -> Result<Vec<Document>, LoadError> {
        let files = self.list_files()?;
        if files.is_empty() {
            return Err(LoadError::NoFiles(self.root.clone()));
        }
        tracing::info!(dir = %self.root.display(), files = files.len(), "loading documents");

        let mut documents = Vec::with_capacity(files.len());
        for (file_index, path) in files.iter().enumerate() {
            tracing::debug!("reading file {}/{}: {}", file_index + 1, files.len(), path.display());
            documents.push(self.read_document(path)?);
        }
        Ok(documents)
    }

    fn accepts(&self, path: &Path) -> bool {
        if self.options.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|s| s.to_str())
            .map(|ext| self.options.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }

    fn read_document(&self, path: &Path) -> Result<Document, LoadError> {
        let unreadable = |source| LoadError::Unreadable { path: path.to_path_buf(), source };
        let bytes = fs::read(path).map_err(unreadable)?;
        let meta = fs::metadata(path).map_err(unreadable)?;
        let file_type = mime_guess::from_path(path).first().map(|m| m.essence_str().to_string());
        let text = extract_text(path, bytes, file_type.as_deref())?;

        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let metadata = DocumentMetadata {
            file_path: path.to_string_lossy().into_owned(),
            file_name,
            file_type,
            file_size: meta.len(),
            creation_date: meta.created().ok().map(format_date),
            last_modified_date: meta.modified().ok().map(format_date),
        };
        Ok(Document { id: relative.to_string_lossy().into_owned(), text, metadata })
    }
}

fn extract_text(path: &Path, bytes: Vec<u8>, mime: Option<&str>) -> Result<String, LoadError> {
    let parse_error = |message: String| LoadError::Parse { path: path.to_path_buf(), message };
    match mime {
        Some(PDF_MIME) => pdf_extract::extract_text_from_mem(&bytes).map_err(|e| parse_error(e.to_string())),
        Some(DOCX_MIME) => docx_text(&bytes).map_err(parse_error),
        _ => Ok(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(path = %path.display(), "file is not valid UTF-8, decoding lossily");
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        }),
    }
}

/// Paragraph text of a DOCX body, one blank line between paragraphs. Tables are skipped.
fn docx_text(bytes: &[u8]) -> Result<String, String> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| e.to_string())?;
    let mut paragraphs = Vec::new();
    for child in docx.document.children {
        if let docx_rs::DocumentChild::Paragraph(paragraph) = child {
            let mut line = String::new();
            for child in paragraph.children {
                if let docx_rs::ParagraphChild::Run(run) = child {
                    for child in run.children {
                        if let docx_rs::RunChild::Text(t) = child {
                            line.push_str(&t.text);
                        }
                    }
                }
            }
            paragraphs.push(line);
        }
    }
    Ok(paragraphs.join("\n\n"))
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_str().is_some_and(|s| s.starts_with('.'))
}

fn format_date(t: SystemTime) -> String {
    DateTime::<Local>::from(t).format("%Y-%m-%d").to_string()
}
