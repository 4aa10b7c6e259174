//! Text segment extraction from the document's paragraph/run tree

use crate::docx::Document;
use crate::docx::package::Relationships;
use crate::docx::style::{StyleSheet, StyleSnapshot};
use crate::docx::xml::{Element, Node};
use crate::error::DocumentError;
use crate::utils::{is_symbol_font, is_symbol_glyph};

/// Handle to one `w:r` element: child indices from the document root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunRef(Vec<usize>);

impl RunRef {
    pub fn path(&self) -> &[usize] {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Paragraph,
    TableCell,
}

/// A paragraph or table cell carrying a background fill.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerRef {
    pub kind: ContainerKind,
    path: Vec<usize>,
}

impl ContainerRef {
    pub fn path(&self) -> &[usize] {
        &self.path
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HyperlinkRef {
    pub rel_id: Option<String>,
    /// Internal bookmark target
    pub anchor: Option<String>,
    /// Resolved external target URI
    pub target: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SegmentContext {
    pub hyperlink: Option<HyperlinkRef>,
    /// Container background, never the text colour
    pub shading_color: Option<String>,
    pub shading_container: Option<ContainerRef>,
    pub inherited_color: Option<String>,
}

impl SegmentContext {
    pub fn is_hyperlink_target(&self) -> bool {
        self.hyperlink.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct TextSegment {
    pub id: usize,
    pub text: String,
    pub style_ref: RunRef,
    pub context: SegmentContext,
    pub style: StyleSnapshot,
}

impl TextSegment {
    #[cfg(test)]
    pub(crate) fn detached(id: usize, text: &str) -> Self {
        Self {
            id,
            text: text.to_string(),
            style_ref: RunRef(Vec::new()),
            context: SegmentContext::default(),
            style: StyleSnapshot::default(),
        }
    }
}

/// Visible text of a run. `w:tab` and `w:br`/`w:cr` between text pieces are
/// carried as `\t` and `\n`.
pub fn run_text(run: &Element) -> String {
    let mut text = String::new();
    for el in run.elements() {
        match el.name.as_str() {
            "w:t" => text.push_str(&el.text()),
            "w:tab" => text.push('\t'),
            "w:br" | "w:cr" => text.push('\n'),
            _ => {}
        }
    }
    text
}

#[derive(Debug, Clone, Copy)]
pub struct ExtractorOptions {
    pub skip_symbol_cells: bool,
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self {
            skip_symbol_cells: true,
        }
    }
}

pub struct TextExtractor {
    options: ExtractorOptions,
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
struct Shading {
    color: String,
    container: ContainerRef,
}

impl TextExtractor {
    pub fn new() -> Self {
        Self::with_options(ExtractorOptions::default())
    }

    pub fn with_options(options: ExtractorOptions) -> Self {
        Self { options }
    }

    /// Segments in reading order. Restartable: the document is only read.
    pub fn extract(&self, doc: &Document) -> Result<Vec<TextSegment>, DocumentError> {
        let body_idx = doc.body_index()?;
        let body = doc
            .element(&[body_idx])
            .ok_or_else(|| DocumentError::Structure("w:body is not an element".to_string()))?;

        let mut walk = Walk {
            options: self.options,
            styles: &doc.styles,
            relationships: &doc.relationships,
            path: vec![body_idx],
            segments: Vec::new(),
        };
        walk.blocks(body, None);
        Ok(walk.segments)
    }
}

struct Walk<'a> {
    options: ExtractorOptions,
    styles: &'a StyleSheet,
    relationships: &'a Relationships,
    path: Vec<usize>,
    segments: Vec<TextSegment>,
}

impl Walk<'_> {
    fn blocks(&mut self, container: &Element, cell: Option<&Shading>) {
        for (i, node) in container.children.iter().enumerate() {
            let Node::Element(el) = node else {
                continue;
            };
            self.path.push(i);
            match el.name.as_str() {
                "w:p" => self.paragraph(el, cell),
                "w:tbl" => self.table(el),
                "w:sdt" | "w:sdtContent" | "w:customXml" => self.blocks(el, cell),
                _ => {}
            }
            self.path.pop();
        }
    }

    fn table(&mut self, table: &Element) {
        for (i, node) in table.children.iter().enumerate() {
            let Node::Element(row) = node else {
                continue;
            };
            if row.name != "w:tr" {
                continue;
            }
            self.path.push(i);
            for (j, node) in row.children.iter().enumerate() {
                let Node::Element(cell) = node else {
                    continue;
                };
                if cell.name != "w:tc" {
                    continue;
                }
                self.path.push(j);
                self.cell(cell);
                self.path.pop();
            }
            self.path.pop();
        }
    }

    fn cell(&mut self, cell: &Element) {
        if self.options.skip_symbol_cells && has_symbols(cell) {
            tracing::debug!("Skipping symbol cell at {:?}", self.path);
            return;
        }
        let shading = fill_of(cell.child("w:tcPr")).map(|color| Shading {
            color,
            container: ContainerRef {
                kind: ContainerKind::TableCell,
                path: self.path.clone(),
            },
        });
        self.blocks(cell, shading.as_ref());
    }

    fn paragraph(&mut self, para: &Element, cell: Option<&Shading>) {
        let ppr = para.child("w:pPr");
        let para_style = ppr
            .and_then(|p| p.child("w:pStyle"))
            .and_then(|s| s.attr("w:val"));
        let own = fill_of(ppr).map(|color| Shading {
            color,
            container: ContainerRef {
                kind: ContainerKind::Paragraph,
                path: self.path.clone(),
            },
        });
        let shading = own.or_else(|| cell.cloned());
        self.inline(para, para_style, shading.as_ref(), None);
    }

    fn inline(
        &mut self,
        parent: &Element,
        para_style: Option<&str>,
        shading: Option<&Shading>,
        link: Option<&HyperlinkRef>,
    ) {
        for (i, node) in parent.children.iter().enumerate() {
            let Node::Element(el) = node else {
                continue;
            };
            self.path.push(i);
            match el.name.as_str() {
                "w:r" => self.run(el, para_style, shading, link),
                "w:hyperlink" => {
                    let rel_id = el.attr("r:id").map(String::from);
                    let href = HyperlinkRef {
                        target: rel_id
                            .as_deref()
                            .and_then(|id| self.relationships.target(id))
                            .map(String::from),
                        anchor: el.attr("w:anchor").map(String::from),
                        rel_id,
                    };
                    self.inline(el, para_style, shading, Some(&href));
                }
                "w:ins" | "w:smartTag" | "w:fldSimple" | "w:customXml" | "w:sdt"
                | "w:sdtContent" => self.inline(el, para_style, shading, link),
                _ => {}
            }
            self.path.pop();
        }
    }

    fn run(
        &mut self,
        run: &Element,
        para_style: Option<&str>,
        shading: Option<&Shading>,
        link: Option<&HyperlinkRef>,
    ) {
        let text = run_text(run);
        if text.trim().is_empty() {
            return;
        }

        let rpr = run.child("w:rPr");
        if let Some(font) = rpr
            .and_then(|r| r.child("w:rFonts"))
            .and_then(|f| f.attr("w:ascii"))
        {
            if is_symbol_font(font) {
                return;
            }
        }

        let run_style = rpr
            .and_then(|r| r.child("w:rStyle"))
            .and_then(|s| s.attr("w:val"));
        let inherited = self.styles.inherited_color(run_style, para_style);
        let style = StyleSnapshot::capture(
            run,
            inherited,
            link.and_then(|l| l.rel_id.as_deref()),
        );

        let context = SegmentContext {
            hyperlink: link.cloned(),
            shading_color: shading.map(|s| s.color.clone()),
            shading_container: shading.map(|s| s.container.clone()),
            inherited_color: style.inherited_color.clone(),
        };

        self.segments.push(TextSegment {
            id: self.segments.len(),
            text,
            style_ref: RunRef(self.path.clone()),
            context,
            style,
        });
    }
}

fn fill_of(props: Option<&Element>) -> Option<String> {
    props
        .and_then(|p| p.child("w:shd"))
        .and_then(|s| s.attr("w:fill"))
        .filter(|f| !f.eq_ignore_ascii_case("auto"))
        .map(String::from)
}

/// Cells holding check marks or symbol-font glyphs are left alone.
fn has_symbols(cell: &Element) -> bool {
    let mut stack = vec![cell];
    while let Some(el) = stack.pop() {
        if el.name == "w:r" {
            let symbol_font = el
                .child("w:rPr")
                .and_then(|r| r.child("w:rFonts"))
                .and_then(|f| f.attr("w:ascii"))
                .is_some_and(is_symbol_font);
            if symbol_font || is_symbol_glyph(&run_text(el)) {
                return true;
            }
            continue;
        }
        stack.extend(el.elements());
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::package::{DOCUMENT_PART, DOCUMENT_RELS_PART, DocxPackage, STYLES_PART};

    fn document(body: &str) -> Document {
        let mut pkg = DocxPackage::default();
        pkg.set_part(
            DOCUMENT_PART,
            format!(r#"<w:document xmlns:w="w" xmlns:r="r"><w:body>{}</w:body></w:document>"#, body)
                .into_bytes(),
        );
        pkg.set_part(
            STYLES_PART,
            br#"<w:styles><w:style w:type="paragraph" w:styleId="Heading1"><w:rPr><w:color w:val="2F5496"/></w:rPr></w:style></w:styles>"#.to_vec(),
        );
        pkg.set_part(
            DOCUMENT_RELS_PART,
            br#"<Relationships><Relationship Id="rId9" Target="https://example.com" TargetMode="External"/></Relationships>"#.to_vec(),
        );
        Document::from_package(pkg).unwrap()
    }

    #[test]
    fn test_reading_order_with_nested_tables() {
        let doc = document(concat!(
            r#"<w:p><w:r><w:t>one</w:t></w:r><w:r><w:t xml:space="preserve"> </w:t></w:r><w:r><w:t>two</w:t></w:r></w:p>"#,
            r#"<w:tbl><w:tr><w:tc><w:p><w:r><w:t>cell a</w:t></w:r></w:p>"#,
            r#"<w:tbl><w:tr><w:tc><w:p><w:r><w:t>nested</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
            r#"</w:tc><w:tc><w:p><w:r><w:t>cell b</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
            r#"<w:p><w:r><w:t>after</w:t></w:r></w:p>"#,
        ));
        let segments = TextExtractor::new().extract(&doc).unwrap();
        let texts: Vec<_> = segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, ["one", "two", "cell a", "nested", "cell b", "after"]);
        assert!(segments.iter().enumerate().all(|(i, s)| s.id == i));
    }

    #[test]
    fn test_hyperlink_context() {
        let doc = document(
            r#"<w:p><w:hyperlink r:id="rId9"><w:r><w:rPr><w:rStyle w:val="Hyperlink"/></w:rPr><w:t>site</w:t></w:r></w:hyperlink></w:p>"#,
        );
        let segments = TextExtractor::new().extract(&doc).unwrap();
        assert_eq!(segments.len(), 1);
        let link = segments[0].context.hyperlink.as_ref().unwrap();
        assert!(segments[0].context.is_hyperlink_target());
        assert_eq!(link.rel_id.as_deref(), Some("rId9"));
        assert_eq!(link.target.as_deref(), Some("https://example.com"));
        assert_eq!(segments[0].style.hyperlink.as_deref(), Some("rId9"));
    }

    #[test]
    fn test_color_and_shading_are_separate() {
        let doc = document(concat!(
            r#"<w:tbl><w:tr><w:tc><w:tcPr><w:shd w:val="clear" w:fill="D9E2F3"/></w:tcPr>"#,
            r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Title</w:t></w:r>"#,
            r#"<w:r><w:rPr><w:color w:val="FF0000"/></w:rPr><w:t>red</w:t></w:r></w:p>"#,
            r#"</w:tc></w:tr></w:tbl>"#,
        ));
        let segments = TextExtractor::new().extract(&doc).unwrap();
        assert_eq!(segments.len(), 2);

        let title = &segments[0];
        assert_eq!(title.context.inherited_color.as_deref(), Some("2F5496"));
        assert_eq!(title.style.color, None);
        assert_eq!(title.context.shading_color.as_deref(), Some("D9E2F3"));
        let container = title.context.shading_container.as_ref().unwrap();
        assert_eq!(container.kind, ContainerKind::TableCell);

        let red = &segments[1];
        assert_eq!(red.style.color.as_deref(), Some("FF0000"));
        assert_eq!(red.context.inherited_color, None);
        assert_eq!(red.context.shading_container.as_ref(), Some(container));
    }

    #[test]
    fn test_skips_symbol_cells_deleted_text_and_fields() {
        let doc = document(concat!(
            r#"<w:tbl><w:tr><w:tc><w:p><w:r><w:t>✔</w:t></w:r><w:r><w:t>Evet</w:t></w:r></w:p></w:tc>"#,
            r#"<w:tc><w:p><w:r><w:t>Hayır</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
            r#"<w:p><w:del><w:r><w:delText>gone</w:delText></w:r></w:del>"#,
            r#"<w:r><w:instrText>PAGE</w:instrText></w:r><w:ins><w:r><w:t>added</w:t></w:r></w:ins></w:p>"#,
        ));
        let segments = TextExtractor::new().extract(&doc).unwrap();
        let texts: Vec<_> = segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, ["Hayır", "added"]);

        let all = TextExtractor::with_options(ExtractorOptions {
            skip_symbol_cells: false,
        })
        .extract(&doc)
        .unwrap();
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_run_text_with_tabs_and_breaks() {
        let run = crate::docx::xml::XmlDocument::parse(
            r#"<w:r><w:t>a</w:t><w:tab/><w:t>b</w:t><w:br/><w:t>c</w:t></w:r>"#,
        )
        .unwrap()
        .root;
        assert_eq!(run_text(&run), "a\tb\nc");
    }

    #[test]
    fn test_style_refs_resolve_to_runs() {
        let doc = document(r#"<w:p><w:r><w:t>x</w:t></w:r><w:hyperlink><w:r><w:t>y</w:t></w:r></w:hyperlink></w:p>"#);
        for segment in TextExtractor::new().extract(&doc).unwrap() {
            let run = doc.element(segment.style_ref.path()).unwrap();
            assert_eq!(run.name, "w:r");
            assert_eq!(run_text(run), segment.text);
        }
    }
}
