//! Shared fixtures: DOCX files built with `zip` and a dictionary backend

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use std::sync::Mutex;

use docxlate::error::BackendError;
use docxlate::translate::backend::TranslationBackend;

pub const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:rPr><w:b/><w:color w:val="2F5496"/><w:sz w:val="32"/></w:rPr></w:style><w:style w:type="character" w:styleId="Hyperlink"><w:name w:val="Hyperlink"/><w:rPr><w:color w:val="0563C1"/><w:u w:val="single"/></w:rPr></w:style></w:styles>"#;

pub const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/><Relationship Id="rId5" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://acme.example/docs" TargetMode="External"/></Relationships>"#;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

/// A complete package whose body is `body`.
pub fn docx(body: &str) -> Vec<u8> {
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><w:body>{}<w:sectPr/></w:body></w:document>"#,
        body
    );

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let opts = zip::write::SimpleFileOptions::default();
    for (name, data) in [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("word/document.xml", document.as_str()),
        ("word/styles.xml", STYLES),
        ("word/_rels/document.xml.rels", RELS),
    ] {
        zip.start_file(name, opts).unwrap();
        zip.write_all(data.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub fn write_docx(path: &Path, body: &str) {
    std::fs::write(path, docx(body)).unwrap();
}

pub fn read_part(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut content = String::new();
    archive
        .by_name(name)
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    content
}

/// Word-for-word English to Turkish. Unknown words and placeholders pass through.
pub struct Dictionary {
    words: HashMap<&'static str, &'static str>,
    pub fail_on: Vec<(&'static str, BackendError)>,
    pub calls: Mutex<Vec<String>>,
}

impl Dictionary {
    pub fn new() -> Self {
        let words = [
            ("Hello", "Merhaba"),
            ("team", "ekip"),
            ("Quarterly", "Üç aylık"),
            ("report", "rapor"),
            ("Read", "Okuyun"),
            ("the", "şu"),
            ("docs", "belgeleri"),
            ("Status", "Durum"),
            ("Name", "Ad"),
            ("Surname", "Soyad"),
            ("Risk", "Risk"),
            ("level", "seviyesi"),
        ]
        .into_iter()
        .collect();
        Self {
            words,
            fail_on: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(mut self, text: &'static str, error: BackendError) -> Self {
        self.fail_on.push((text, error));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl TranslationBackend for Dictionary {
    fn name(&self) -> &str {
        "dictionary"
    }

    fn translate(&self, text: &str, _target_lang: &str) -> Result<String, BackendError> {
        self.calls.lock().unwrap().push(text.to_string());
        if let Some((_, e)) = self.fail_on.iter().find(|(t, _)| text.contains(t)) {
            return Err(e.clone());
        }
        let mut out = String::new();
        let mut word = String::new();
        for c in text.chars().chain(std::iter::once('\0')) {
            if c.is_whitespace() || c == '\0' {
                match self.words.get(word.as_str()) {
                    Some(t) => out.push_str(t),
                    None => out.push_str(&word),
                }
                word.clear();
                if c != '\0' {
                    out.push(c);
                }
            } else {
                word.push(c);
            }
        }
        Ok(out)
    }
}
