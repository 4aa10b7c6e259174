//! End-to-end document translation tests

mod common;

use common::{Dictionary, docx, read_part, write_docx};
use docxlate::docx::Document;
use docxlate::error::{BackendError, DocumentError};
use docxlate::translate::backend::TranslationBackend;
use docxlate::translate::extractor::TextExtractor;
use docxlate::translate::glossary::{Glossary, GlossaryEntry};
use docxlate::translate::pipeline::{
    BatchJob, DocumentPipeline, PipelineOptions, PipelineState, translate_documents,
};
use docxlate::translate::{find_documents, output_path_for};
use std::fs;
use tempfile::TempDir;

fn options() -> PipelineOptions {
    let mut options = PipelineOptions::new("tr");
    options.translate.retry.max_attempts = 2;
    options.translate.retry.base_delay = std::time::Duration::ZERO;
    options
}

fn texts(bytes: &[u8]) -> Vec<String> {
    let doc = Document::from_bytes(bytes).unwrap();
    TextExtractor::new()
        .extract(&doc)
        .unwrap()
        .into_iter()
        .map(|s| s.text)
        .collect()
}

#[test]
fn test_hello_acme_team() {
    let input = docx(
        r#"<w:p><w:r><w:rPr><w:b/><w:color w:val="C00000"/></w:rPr><w:t>Hello Acme team</w:t></w:r></w:p>"#,
    );
    let backend = Dictionary::new();
    let glossary = Glossary::from_entries([GlossaryEntry::protected("Acme")]);

    let (output, report) = DocumentPipeline::new(&backend, &glossary, options())
        .translate_bytes(&input)
        .unwrap();

    assert_eq!(texts(&output), ["Merhaba Acme ekip"]);
    assert_eq!(report.translated, 1);
    assert_eq!(report.failed, 0);

    let doc = Document::from_bytes(&output).unwrap();
    let segment = &TextExtractor::new().extract(&doc).unwrap()[0];
    assert_eq!(segment.style.bold, Some(true));
    assert_eq!(segment.style.color.as_deref(), Some("C00000"));

    let calls = backend.calls.lock().unwrap();
    assert!(calls.iter().all(|c| !c.contains("Acme")));
}

#[test]
fn test_styles_survive_length_change() {
    let input = docx(concat!(
        r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Quarterly report</w:t></w:r></w:p>"#,
        r#"<w:p><w:r><w:rPr><w:rFonts w:ascii="Calibri" w:hAnsi="Calibri"/><w:i/><w:sz w:val="28"/>"#,
        r#"<w:highlight w:val="yellow"/><w:u w:val="double"/><w:shd w:val="clear" w:fill="E2EFDA"/></w:rPr>"#,
        r#"<w:t xml:space="preserve">Hello </w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>team</w:t></w:r></w:p>"#,
    ));
    let before_doc = Document::from_bytes(&input).unwrap();
    let before = TextExtractor::new().extract(&before_doc).unwrap();

    let backend = Dictionary::new();
    let glossary = Glossary::new();
    let (output, _) = DocumentPipeline::new(&backend, &glossary, options())
        .translate_bytes(&input)
        .unwrap();

    let after_doc = Document::from_bytes(&output).unwrap();
    let after = TextExtractor::new().extract(&after_doc).unwrap();

    assert_eq!(before.len(), after.len());
    for (b, a) in before.iter().zip(&after) {
        assert_eq!(b.style, a.style, "style of segment {} changed", b.id);
        assert_eq!(b.context, a.context);
    }
    assert_eq!(after[0].text, "Üç aylık rapor");
    assert_eq!(after[0].context.inherited_color.as_deref(), Some("2F5496"));
    assert_eq!(after[1].text, "Merhaba ");
    assert_eq!(after[1].style.shading.as_deref(), Some("E2EFDA"));
}

#[test]
fn test_hyperlink_target_unchanged() {
    let input = docx(
        r#"<w:p><w:hyperlink r:id="rId5" w:history="1"><w:r><w:rPr><w:rStyle w:val="Hyperlink"/></w:rPr><w:t>Read the docs</w:t></w:r></w:hyperlink></w:p>"#,
    );
    let backend = Dictionary::new();
    let glossary = Glossary::new();
    let (output, _) = DocumentPipeline::new(&backend, &glossary, options())
        .translate_bytes(&input)
        .unwrap();

    let before = TextExtractor::new()
        .extract(&Document::from_bytes(&input).unwrap())
        .unwrap();
    let after = TextExtractor::new()
        .extract(&Document::from_bytes(&output).unwrap())
        .unwrap();

    assert_eq!(after[0].text, "Okuyun şu belgeleri");
    assert_eq!(before[0].context.hyperlink, after[0].context.hyperlink);
    let link = after[0].context.hyperlink.as_ref().unwrap();
    assert_eq!(link.rel_id.as_deref(), Some("rId5"));
    assert_eq!(link.target.as_deref(), Some("https://acme.example/docs"));
    assert_eq!(
        read_part(&input, "word/_rels/document.xml.rels"),
        read_part(&output, "word/_rels/document.xml.rels")
    );
}

/// Returns a response far longer than its input.
struct Verbose;

impl TranslationBackend for Verbose {
    fn name(&self) -> &str {
        "verbose"
    }

    fn translate(&self, text: &str, _target_lang: &str) -> Result<String, BackendError> {
        Ok(text.repeat(20))
    }
}

#[test]
fn test_failed_segments_keep_original_text() {
    let body = concat!(
        r#"<w:p><w:r><w:t>Status report</w:t></w:r></w:p>"#,
        r#"<w:p><w:r><w:t>Hello team</w:t></w:r></w:p>"#,
    );
    let backend = Dictionary::new()
        .failing("Status", BackendError::RateLimited("429".into()))
        .failing("nothing", BackendError::Timeout("30s".into()));
    let glossary = Glossary::new();
    let (output, report) = DocumentPipeline::new(&backend, &glossary, options())
        .translate_bytes(&docx(body))
        .unwrap();

    assert_eq!(texts(&output), ["Status report", "Merhaba ekip"]);
    assert_eq!(report.failed, 1);
    assert_eq!(report.translated, 1);
    // one retry for the rate-limited segment
    assert_eq!(backend.call_count(), 3);

    let (output, report) = DocumentPipeline::new(&Verbose, &glossary, options())
        .translate_bytes(&docx(body))
        .unwrap();
    assert_eq!(texts(&output), ["Status report", "Hello team"]);
    assert_eq!(report.failed, 2);
}

#[test]
fn test_protected_and_forced_terms() {
    let input = docx(r#"<w:p><w:r><w:t>Risk level for Acme</w:t></w:r></w:p>"#);
    let backend = Dictionary::new();
    let glossary = Glossary::from_entries([
        GlossaryEntry::protected("Acme"),
        GlossaryEntry::forced("level", "düzeyi"),
    ]);
    let (output, _) = DocumentPipeline::new(&backend, &glossary, options())
        .translate_bytes(&input)
        .unwrap();

    assert_eq!(texts(&output), ["Risk düzeyi for Acme"]);
}

#[test]
fn test_each_segment_translated_once() {
    let input = docx(concat!(
        r#"<w:p><w:r><w:t>team</w:t></w:r><w:r><w:t xml:space="preserve"> </w:t></w:r><w:r><w:t>team</w:t></w:r></w:p>"#,
        r#"<w:p><w:r><w:t>2024</w:t></w:r></w:p>"#,
    ));
    let backend = Dictionary::new();
    let glossary = Glossary::new();
    let mut pipeline = DocumentPipeline::new(&backend, &glossary, options());
    let (output, report) = pipeline.translate_bytes(&input).unwrap();

    assert_eq!(pipeline.state(), PipelineState::Done);
    assert_eq!(backend.call_count(), 2);
    assert_eq!(report.segments, 3);
    assert_eq!(report.unchanged, 1);
    assert_eq!(texts(&output), ["ekip", "ekip", "2024"]);
    assert!(read_part(&output, "word/document.xml").contains(r#"<w:t xml:space="preserve"> </w:t>"#));
}

#[test]
fn test_fatal_errors_leave_input_untouched() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.docx");
    write_docx(&input, r#"<w:p><w:r><w:t>Hello</w:t></w:r></w:p>"#);
    let original = fs::read(&input).unwrap();

    let blocker = dir.path().join("blocker");
    fs::write(&blocker, b"").unwrap();
    let output = blocker.join("out.docx");

    let backend = Dictionary::new();
    let glossary = Glossary::new();
    let mut pipeline = DocumentPipeline::new(&backend, &glossary, options());
    let result = pipeline.translate_file(&input, &output);

    assert!(matches!(result, Err(DocumentError::Write { .. })));
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert!(!output.exists());
    assert_eq!(fs::read(&input).unwrap(), original);

    let corrupt = dir.path().join("corrupt.docx");
    let mut bytes = docx("");
    bytes.truncate(bytes.len() / 2);
    fs::write(&corrupt, &bytes).unwrap();
    let out = dir.path().join("corrupt_translated.docx");
    assert!(pipeline.translate_file(&corrupt, &out).is_err());
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert!(!out.exists());
}

#[test]
fn test_tables_shading_and_symbol_cells() {
    let input = docx(concat!(
        r#"<w:tbl><w:tr>"#,
        r#"<w:tc><w:tcPr><w:shd w:val="clear" w:color="auto" w:fill="FFF2CC"/></w:tcPr>"#,
        r#"<w:p><w:r><w:t>Hello</w:t></w:r><w:r><w:t xml:space="preserve"> team</w:t></w:r></w:p></w:tc>"#,
        r#"<w:tc><w:p><w:r><w:rPr><w:rFonts w:ascii="Wingdings" w:hAnsi="Wingdings"/></w:rPr><w:t>þ</w:t></w:r></w:p></w:tc>"#,
        r#"<w:tc><w:tbl><w:tr><w:tc><w:p><w:r><w:t>Status</w:t></w:r></w:p></w:tc></w:tr></w:tbl><w:p/></w:tc>"#,
        r#"</w:tr></w:tbl>"#,
    ));
    let backend = Dictionary::new();
    let glossary = Glossary::new();
    let (output, report) = DocumentPipeline::new(&backend, &glossary, options())
        .translate_bytes(&input)
        .unwrap();

    assert_eq!(report.segments, 3);
    assert_eq!(texts(&output), ["Merhaba", " ekip", "Durum"]);

    let xml = read_part(&output, "word/document.xml");
    assert_eq!(xml.matches(r#"w:fill="FFF2CC""#).count(), 1);
    assert!(xml.contains("<w:t>þ</w:t>"));
}

#[test]
fn test_tab_separated_run() {
    let input = docx(r#"<w:p><w:r><w:t>Name</w:t><w:tab/><w:t>Surname</w:t></w:r></w:p>"#);
    let backend = Dictionary::new();
    let glossary = Glossary::new();
    let (output, _) = DocumentPipeline::new(&backend, &glossary, options())
        .translate_bytes(&input)
        .unwrap();

    assert_eq!(texts(&output), ["Ad\tSoyad"]);
    assert!(read_part(&output, "word/document.xml").contains("<w:t>Ad</w:t><w:tab/><w:t>Soyad</w:t>"));
}

#[test]
fn test_other_parts_copied() {
    let input = docx(r#"<w:p><w:r><w:t>Hello</w:t></w:r></w:p>"#);
    let backend = Dictionary::new();
    let glossary = Glossary::new();
    let (output, _) = DocumentPipeline::new(&backend, &glossary, options())
        .translate_bytes(&input)
        .unwrap();

    for part in ["[Content_Types].xml", "word/styles.xml"] {
        assert_eq!(read_part(&input, part), read_part(&output, part));
    }
}

#[test]
fn test_batch_directory() {
    let dir = TempDir::new().unwrap();
    let sub = dir.path().join("sub");
    fs::create_dir(&sub).unwrap();
    write_docx(&dir.path().join("a.docx"), r#"<w:p><w:r><w:t>Hello</w:t></w:r></w:p>"#);
    write_docx(&sub.join("b.docx"), r#"<w:p><w:r><w:t>Status</w:t></w:r></w:p>"#);
    fs::write(dir.path().join("broken.docx"), b"PK\x03\x04 truncated").unwrap();

    let out = dir.path().join("out");
    let jobs: Vec<BatchJob> = find_documents(dir.path(), true)
        .into_iter()
        .map(|input| BatchJob {
            output: output_path_for(&input, dir.path(), Some(&out)),
            input,
        })
        .collect();
    assert_eq!(jobs.len(), 3);

    let backend = Dictionary::new().failing("Status", BackendError::NetworkFailure("reset".into()));
    let glossary = Glossary::new();
    let report = translate_documents(&jobs, &backend, &glossary, None, &options(), 2, |_| {});

    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed_documents(), 1);
    assert_eq!(report.failed_segments(), 1);
    assert_eq!(report.translated_segments(), 1);

    assert_eq!(texts(&fs::read(out.join("a.docx")).unwrap()), ["Merhaba"]);
    assert_eq!(texts(&fs::read(out.join("sub/b.docx")).unwrap()), ["Status"]);
    assert!(!out.join("broken.docx").exists());
}

#[test]
fn test_output_in_input_directory_keeps_input() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("a.docx");
    write_docx(&input, r#"<w:p><w:r><w:t>Hello</w:t></w:r></w:p>"#);
    let original = fs::read(&input).unwrap();

    let backend = Dictionary::new();
    let glossary = Glossary::new();
    let mut pipeline = DocumentPipeline::new(&backend, &glossary, options());
    let same = dir.path().join(".").join("a.docx");
    assert!(matches!(
        pipeline.translate_file(&input, &same),
        Err(DocumentError::OutputIsInput(_))
    ));
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert_eq!(fs::read(&input).unwrap(), original);

    let clash = [BatchJob {
        input: input.clone(),
        output: input.clone(),
    }];
    let report = translate_documents(&clash, &backend, &glossary, None, &options(), 1, |_| {});
    assert_eq!(report.failed_documents(), 1);
    assert_eq!(fs::read(&input).unwrap(), original);

    let jobs: Vec<BatchJob> = find_documents(dir.path(), false)
        .into_iter()
        .map(|input| BatchJob {
            output: output_path_for(&input, dir.path(), Some(dir.path())),
            input,
        })
        .collect();
    let report = translate_documents(&jobs, &backend, &glossary, None, &options(), 1, |_| {});
    assert_eq!(report.succeeded(), 1);
    assert_eq!(fs::read(&input).unwrap(), original);
    let output = dir.path().join("a_translated.docx");
    assert_eq!(texts(&fs::read(output).unwrap()), ["Merhaba"]);
}
