//! Named styles and per-run style snapshots

use std::collections::HashMap;

use super::xml::{Element, Node, XmlDocument};

const MAX_STYLE_DEPTH: usize = 16;

/// `w:rPr` children that must follow `w:color` in schema order.
const AFTER_COLOR: &[&str] = &[
    "w:spacing",
    "w:w",
    "w:kern",
    "w:position",
    "w:sz",
    "w:szCs",
    "w:highlight",
    "w:u",
    "w:effect",
    "w:bdr",
    "w:shd",
    "w:fitText",
    "w:vertAlign",
    "w:rtl",
    "w:cs",
    "w:em",
    "w:lang",
    "w:eastAsianLayout",
    "w:specVanish",
    "w:oMath",
];

#[derive(Debug, Clone, Default)]
struct NamedStyle {
    based_on: Option<String>,
    color: Option<String>,
}

/// Style definitions from `word/styles.xml`, used to resolve inherited text colour.
#[derive(Debug, Clone, Default)]
pub struct StyleSheet {
    styles: HashMap<String, NamedStyle>,
    default_paragraph: Option<String>,
}

impl StyleSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_xml(doc: &XmlDocument) -> Self {
        let mut sheet = Self::new();

        for style in doc.root.elements().filter(|e| e.name == "w:style") {
            let Some(id) = style.attr("w:styleId") else {
                continue;
            };
            if style.attr("w:type") == Some("paragraph") && is_on(style.attr("w:default")) {
                sheet.default_paragraph = Some(id.to_string());
            }
            let named = NamedStyle {
                based_on: style
                    .child("w:basedOn")
                    .and_then(|b| b.attr("w:val"))
                    .map(String::from),
                color: style
                    .child("w:rPr")
                    .and_then(|r| r.child("w:color"))
                    .and_then(|c| c.attr("w:val"))
                    .map(String::from),
            };
            sheet.styles.insert(id.to_string(), named);
        }

        sheet
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    /// Colour of a named style, following `w:basedOn` links.
    pub fn resolve_color(&self, style_id: &str) -> Option<String> {
        let mut current = Some(style_id);
        for _ in 0..MAX_STYLE_DEPTH {
            let style = self.styles.get(current?)?;
            if let Some(color) = &style.color {
                return Some(color.clone());
            }
            current = style.based_on.as_deref();
        }
        None
    }

    /// Colour a run inherits when it carries no explicit `w:color`:
    /// character style first, then paragraph style (or the default paragraph style).
    pub fn inherited_color(
        &self,
        run_style: Option<&str>,
        paragraph_style: Option<&str>,
    ) -> Option<String> {
        run_style
            .and_then(|s| self.resolve_color(s))
            .or_else(|| {
                paragraph_style
                    .or(self.default_paragraph.as_deref())
                    .and_then(|s| self.resolve_color(s))
            })
    }
}

/// Formatting of one run, captured before translation and reapplied verbatim afterwards.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StyleSnapshot {
    pub font_family: Option<String>,
    /// Half-points, as stored in `w:sz`
    pub size: Option<String>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<String>,
    pub color: Option<String>,
    pub inherited_color: Option<String>,
    /// Run-level background (`w:rPr/w:shd`)
    pub shading: Option<String>,
    pub highlight: Option<String>,
    pub char_style: Option<String>,
    /// Relationship id of the enclosing hyperlink
    pub hyperlink: Option<String>,
    run_properties: Option<Element>,
}

impl StyleSnapshot {
    pub fn capture(run: &Element, inherited_color: Option<String>, hyperlink: Option<&str>) -> Self {
        let rpr = run.child("w:rPr");
        let val = |name: &str| {
            rpr.and_then(|r| r.child(name))
                .and_then(|e| e.attr("w:val"))
                .map(String::from)
        };
        let toggle = |name: &str| {
            rpr.and_then(|r| r.child(name))
                .map(|e| is_on(e.attr("w:val")))
        };

        let color = val("w:color");
        Self {
            font_family: rpr.and_then(|r| r.child("w:rFonts")).and_then(|f| {
                f.attr("w:ascii")
                    .or_else(|| f.attr("w:hAnsi"))
                    .or_else(|| f.attr("w:cs"))
                    .map(String::from)
            }),
            size: val("w:sz"),
            bold: toggle("w:b"),
            italic: toggle("w:i"),
            underline: val("w:u"),
            inherited_color: if color.is_none() { inherited_color } else { None },
            color,
            shading: rpr
                .and_then(|r| r.child("w:shd"))
                .and_then(|s| s.attr("w:fill"))
                .filter(|f| *f != "auto")
                .map(String::from),
            highlight: val("w:highlight"),
            char_style: val("w:rStyle"),
            hyperlink: hyperlink.map(String::from),
            run_properties: rpr.cloned(),
        }
    }

    /// Writes the captured `w:rPr` back onto `run`, replacing whatever is there.
    pub fn apply_to(&self, run: &mut Element) {
        run.remove_children("w:rPr");
        if let Some(rpr) = &self.run_properties {
            run.children.insert(0, Node::Element(rpr.clone()));
        }
    }

    /// Pins the inherited colour as an explicit run colour.
    pub fn pin_inherited_color(&self, run: &mut Element) {
        let Some(color) = &self.inherited_color else {
            return;
        };
        let rpr = run.child_or_insert("w:rPr", 0);
        if rpr.child("w:color").is_none() {
            let at = rpr
                .children
                .iter()
                .position(|n| matches!(n, Node::Element(e) if AFTER_COLOR.contains(&e.name.as_str())))
                .unwrap_or(rpr.children.len());
            rpr.children.insert(
                at,
                Node::Element(Element::new("w:color").with_attr("w:val", color)),
            );
        }
    }
}

/// OOXML on/off value: absent attribute means on.
fn is_on(val: Option<&str>) -> bool {
    !matches!(val, Some("0") | Some("false") | Some("off"))
}
