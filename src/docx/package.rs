//! DOCX zip container I/O

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use crate::error::DocumentError;

use super::xml::XmlDocument;

pub const DOCUMENT_PART: &str = "word/document.xml";
pub const STYLES_PART: &str = "word/styles.xml";
pub const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";

/// All zip entries of a DOCX file, in their original order.
#[derive(Debug, Clone, Default)]
pub struct DocxPackage {
    entries: Vec<(String, Vec<u8>)>,
}

impl DocxPackage {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DocumentError> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocumentError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();
            let mut data = Vec::new();
            entry.read_to_end(&mut data)?;
            entries.push((name, data));
        }
        Ok(Self { entries })
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d.as_slice())
    }

    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, d)) => *d = data,
            None => self.entries.push((name.to_string(), data)),
        }
    }

    pub fn xml_part(&self, name: &str) -> Result<XmlDocument, DocumentError> {
        let data = self
            .part(name)
            .ok_or_else(|| DocumentError::MissingPart(name.to_string()))?;
        let text = std::str::from_utf8(data).map_err(|e| DocumentError::Parse {
            part: name.to_string(),
            message: e.to_string(),
        })?;
        XmlDocument::parse(text).map_err(|e| DocumentError::Parse {
            part: name.to_string(),
            message: e.to_string(),
        })
    }

    pub fn set_xml_part(&mut self, name: &str, doc: &XmlDocument) {
        self.set_part(name, doc.to_xml().into_bytes());
    }

    pub fn relationships(&self) -> Result<Relationships, DocumentError> {
        if self.part(DOCUMENT_RELS_PART).is_none() {
            return Ok(Relationships::default());
        }
        let doc = self.xml_part(DOCUMENT_RELS_PART)?;
        Ok(Relationships::from_xml(&doc))
    }

    /// Media is stored uncompressed, everything else deflated, the layout Word writes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DocumentError> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let deflated = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        let stored = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);

        for (name, data) in &self.entries {
            if name.ends_with('/') {
                zip.add_directory(name.as_str(), stored)?;
                continue;
            }
            let opts = if name.starts_with("word/media/") {
                stored
            } else {
                deflated
            };
            zip.start_file(name.as_str(), opts)?;
            zip.write_all(data)?;
        }
        Ok(zip.finish()?.into_inner())
    }

    /// Writes to a temporary file next to `path` and renames it into place,
    /// so a failed save never leaves a partial file behind.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), DocumentError> {
        let path = path.as_ref();
        let write_err = |source: std::io::Error| DocumentError::Write {
            path: path.display().to_string(),
            source,
        };

        let bytes = self.to_bytes()?;
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(write_err)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(&bytes).map_err(write_err)?;
        tmp.flush().map_err(write_err)?;
        tmp.persist(path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}

/// Relationship id to target, from `word/_rels/document.xml.rels`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Relationships {
    targets: HashMap<String, String>,
}

impl Relationships {
    pub fn from_xml(doc: &XmlDocument) -> Self {
        let targets = doc
            .root
            .elements()
            .filter(|e| e.name == "Relationship")
            .filter_map(|e| Some((e.attr("Id")?.to_string(), e.attr("Target")?.to_string())))
            .collect();
        Self { targets }
    }

    pub fn target(&self, id: &str) -> Option<&str> {
        self.targets.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
