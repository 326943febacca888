use std::fs;
use std::io::Write;
use tempfile::TempDir;

use docqa_core::config::{Config, DataSettings, EmbeddingBackend, LlmProvider};
use docqa_core::loader::{DocumentLoader, LoaderOptions};
use docqa_core::LoadError;

#[test]
fn load_single_small_file_with_metadata() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let mut f = fs::File::create(dir.join("a.txt")).unwrap();
    writeln!(f, "Short text").unwrap();

    let docs = DocumentLoader::new(dir).load().expect("load");

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id, "a.txt");
    assert_eq!(docs[0].text.trim(), "Short text");
    let meta = &docs[0].metadata;
    assert_eq!(meta.file_name, "a.txt");
    assert_eq!(meta.file_type.as_deref(), Some("text/plain"));
    assert_eq!(meta.file_size, 11);
    assert!(meta.file_path.ends_with("a.txt"));
    assert_eq!(meta.last_modified_date.as_ref().map(String::len), Some(10));
}

#[test]
fn documents_are_ordered_and_hidden_files_skipped() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("b.md"), "bravo").unwrap();
    fs::write(dir.join("a.txt"), "alpha").unwrap();
    fs::write(dir.join(".secret"), "hidden").unwrap();
    fs::create_dir(dir.join("nested")).unwrap();
    fs::write(dir.join("nested/c.txt"), "charlie").unwrap();

    let docs = DocumentLoader::new(dir).load().expect("load");
    let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["a.txt", "b.md"], "non-recursive, no hidden files");

    let options = LoaderOptions { recursive: true, ..LoaderOptions::default() };
    let docs = DocumentLoader::with_options(dir, options).load().expect("load recursive");
    let ids: Vec<String> = docs.iter().map(|d| d.id.replace('\\', "/")).collect();
    assert_eq!(ids, vec!["a.txt", "b.md", "nested/c.txt"]);
}

#[test]
fn extension_filter_applies() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("keep.TXT"), "yes").unwrap();
    fs::write(dir.join("skip.csv"), "no").unwrap();

    let data = DataSettings { dir: String::new(), recursive: false, extensions: vec![".txt".to_string()] };
    let docs = DocumentLoader::with_options(dir, LoaderOptions::from(&data)).load().expect("load");
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].text, "yes");
}

#[test]
fn invalid_utf8_is_decoded_lossily() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("latin1.txt"), [b'c', b'a', b'f', 0xE9]).unwrap();
    let docs = DocumentLoader::new(tmp.path()).load().expect("load");
    assert!(docs[0].text.starts_with("caf"));
    assert!(docs[0].text.contains('\u{FFFD}'));
}

/// Single-page PDF showing `text` in Helvetica, with a correct xref table.
fn one_page_pdf(text: &str) -> Vec<u8> {
    let content = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", text);
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Resources << /Font << /F1 5 0 R >> >> /Contents 4 0 R >>".to_string(),
        format!("<< /Length {} >>\nstream\n{}\nendstream", content.len(), content),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_string(),
    ];
    let mut pdf = String::from("%PDF-1.4\n");
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.push_str(&format!("{} 0 obj\n{}\nendobj\n", i + 1, body));
    }
    let xref = pdf.len();
    pdf.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1));
    for offset in offsets {
        pdf.push_str(&format!("{:010} 00000 n \n", offset));
    }
    pdf.push_str(&format!("trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n", objects.len() + 1, xref));
    pdf.into_bytes()
}

#[test]
fn pdf_text_is_extracted() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("catalogue.pdf"), one_page_pdf("Collect rainwater in clean barrels")).unwrap();

    let docs = DocumentLoader::new(tmp.path()).load().expect("load");
    assert_eq!(docs[0].metadata.file_type.as_deref(), Some("application/pdf"));
    assert!(docs[0].text.contains("rainwater"), "got {:?}", docs[0].text);
    assert!(!docs[0].text.contains("%PDF"));
    assert!(!docs[0].text.contains("endobj"));
}

#[test]
fn docx_paragraphs_are_extracted() {
    use docx_rs::{Docx, Paragraph, Run};

    let tmp = TempDir::new().unwrap();
    let file = fs::File::create(tmp.path().join("notes.docx")).unwrap();
    Docx::new()
        .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Plant potatoes in spring.")))
        .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Rotate crops every year.")))
        .build()
        .pack(file)
        .unwrap();

    let docs = DocumentLoader::new(tmp.path()).load().expect("load");
    assert_eq!(docs[0].text, "Plant potatoes in spring.\n\nRotate crops every year.");
}

#[test]
fn corrupt_pdf_is_a_load_error() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("broken.pdf"), "this is not a pdf").unwrap();
    let err = DocumentLoader::new(tmp.path()).load().unwrap_err();
    assert!(matches!(err, LoadError::Parse { ref path, .. } if path.ends_with("broken.pdf")));
}

#[test]
fn missing_folder_is_a_load_error() {
    let tmp = TempDir::new().unwrap();
    let err = DocumentLoader::new(tmp.path().join("nope")).load().unwrap_err();
    assert!(matches!(err, LoadError::MissingDir(_)));
}

#[test]
fn empty_folder_is_a_load_error() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".hidden"), "x").unwrap();
    let err = DocumentLoader::new(tmp.path()).load().unwrap_err();
    assert!(matches!(err, LoadError::NoFiles(_)));
}

#[test]
fn file_instead_of_folder_is_a_load_error() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("a.txt");
    fs::write(&file, "x").unwrap();
    let err = DocumentLoader::new(&file).load().unwrap_err();
    assert!(matches!(err, LoadError::NotADirectory(_)));
}

#[test]
fn config_defaults_and_file_overrides() {
    let tmp = TempDir::new().unwrap();
    let settings = Config::load_in(tmp.path()).expect("load").settings().expect("settings");
    assert_eq!(settings.data.dir, "data");
    assert_eq!(settings.storage_dir(), tmp.path().join("storage"));
    assert_eq!(settings.llm.model, "gpt-4o-mini");
    assert_eq!(settings.llm.max_tokens, 2000);
    assert!((settings.llm.temperature - 0.1).abs() < 1e-6);
    assert_eq!(settings.embedding.backend, EmbeddingBackend::OpenAi);
    assert_eq!(settings.embedding.model, "text-embedding-ada-002");

    fs::write(
        tmp.path().join("config.toml"),
        "[data]\ndir = \"docs\"\n[embedding]\nbackend = \"hash\"\ndim = 64\n[llm]\nprovider = \"ollama\"\nmodel = \"llama3\"\n",
    )
    .unwrap();
    let config = Config::load_in(tmp.path()).expect("load");
    let settings = config.settings().expect("settings");
    assert_eq!(settings.data_dir(), tmp.path().join("docs"));
    assert_eq!(settings.embedding.backend, EmbeddingBackend::Hash);
    assert_eq!(settings.embedding.dim, 64);
    assert_eq!(settings.llm.provider, LlmProvider::Ollama);
    assert_eq!(config.get::<String>("llm.model").unwrap(), "llama3");
}

#[test]
fn invalid_overlap_is_rejected() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("config.toml"), "[chunking]\noverlap_percent = 1.5\n").unwrap();
    let err = Config::load_in(tmp.path()).expect("load").settings().unwrap_err();
    assert!(err.to_string().contains("overlap_percent"));
}
