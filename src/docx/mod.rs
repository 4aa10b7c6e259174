//! WordprocessingML document model

pub mod package;
pub mod style;
pub mod xml;

use std::path::Path;

use crate::error::DocumentError;
use package::{DOCUMENT_PART, DocxPackage, Relationships, STYLES_PART};
use style::StyleSheet;
use xml::{Element, XmlDocument};

/// An opened document: the container plus its parsed main part, styles and relationships.
#[derive(Debug, Clone)]
pub struct Document {
    package: DocxPackage,
    pub xml: XmlDocument,
    pub styles: StyleSheet,
    pub relationships: Relationships,
}

impl Document {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DocumentError> {
        Self::from_package(DocxPackage::open(path)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocumentError> {
        Self::from_package(DocxPackage::from_bytes(bytes)?)
    }

    pub fn from_package(package: DocxPackage) -> Result<Self, DocumentError> {
        let xml = package.xml_part(DOCUMENT_PART)?;
        if xml.root.child("w:body").is_none() {
            return Err(DocumentError::Structure(
                "main document part has no w:body".to_string(),
            ));
        }

        let styles = match package.part(STYLES_PART) {
            None => StyleSheet::new(),
            Some(_) => match package.xml_part(STYLES_PART) {
                Ok(doc) => StyleSheet::from_xml(&doc),
                Err(e) => {
                    tracing::warn!("Ignoring unreadable styles part: {}", e);
                    StyleSheet::new()
                }
            },
        };
        let relationships = package.relationships()?;

        Ok(Self {
            package,
            xml,
            styles,
            relationships,
        })
    }

    /// Index of `w:body` among the root's children, the first step of every node path.
    pub fn body_index(&self) -> Result<usize, DocumentError> {
        self.xml
            .root
            .children
            .iter()
            .position(|n| matches!(n, xml::Node::Element(e) if e.name == "w:body"))
            .ok_or_else(|| DocumentError::Structure("w:body disappeared".to_string()))
    }

    pub fn element(&self, path: &[usize]) -> Option<&Element> {
        self.xml.root.at_path(path)
    }

    pub fn element_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        self.xml.root.at_path_mut(path)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DocumentError> {
        let mut package = self.package.clone();
        package.set_xml_part(DOCUMENT_PART, &self.xml);
        package.to_bytes()
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), DocumentError> {
        let mut package = self.package.clone();
        package.set_xml_part(DOCUMENT_PART, &self.xml);
        package.save(path)
    }
}
