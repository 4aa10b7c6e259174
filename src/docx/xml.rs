//! Lightweight XML tree for WordprocessingML parts
//!
//! Only what the translator needs: elements, attributes and text, with anything else
//! (declarations, comments, CDATA) carried through verbatim so untouched markup
//! serializes back unchanged in meaning.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("XML error at byte {offset}: {message}")]
pub struct XmlError {
    pub offset: usize,
    pub message: String,
}

impl XmlError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    /// Unescaped character data
    Text(String),
    /// Comments, CDATA, processing instructions; written back as-is
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    pub prolog: Vec<Node>,
    pub root: Element,
    pub epilog: Vec<Node>,
}

impl Element {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: &str) {
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attrs.push((name.to_string(), value.to_string())),
        }
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    /// Returns the first child named `name`, inserting an empty one at `index`
    /// (clamped to the child count) when absent.
    pub fn child_or_insert(&mut self, name: &str, index: usize) -> &mut Element {
        let pos = self
            .children
            .iter()
            .position(|n| matches!(n, Node::Element(e) if e.name == name));
        let pos = match pos {
            Some(p) => p,
            None => {
                let at = index.min(self.children.len());
                self.children.insert(at, Node::Element(Element::new(name)));
                at
            }
        };
        match &mut self.children[pos] {
            Node::Element(e) => e,
            _ => unreachable!("position was matched as an element"),
        }
    }

    pub fn remove_children(&mut self, name: &str) {
        self.children
            .retain(|n| !matches!(n, Node::Element(e) if e.name == name));
    }

    /// Concatenated character data of this element's direct text children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn set_text(&mut self, text: &str) {
        self.children.retain(|n| !matches!(n, Node::Text(_)));
        self.children.insert(0, Node::Text(text.to_string()));
    }

    /// Follows child node indices from this element.
    pub fn at_path(&self, path: &[usize]) -> Option<&Element> {
        let mut current = self;
        for &i in path {
            current = match current.children.get(i)? {
                Node::Element(e) => e,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn at_path_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let mut current = self;
        for &i in path {
            current = match current.children.get_mut(i)? {
                Node::Element(e) => e,
                _ => return None,
            };
        }
        Some(current)
    }

    fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (k, v) in &self.attrs {
            out.push(' ');
            out.push_str(k);
            out.push_str("=\"");
            out.push_str(&escape_attr(v));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            write_node(child, out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Element(e) => e.write_to(out),
        Node::Text(t) => out.push_str(&escape_text(t)),
        Node::Raw(r) => out.push_str(r),
    }
}

impl XmlDocument {
    pub fn parse(input: &str) -> Result<Self, XmlError> {
        Parser::new(input).parse()
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        for node in &self.prolog {
            write_node(node, &mut out);
        }
        self.root.write_to(&mut out);
        for node in &self.epilog {
            write_node(node, &mut out);
        }
        out
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    stack: Vec<Element>,
    prolog: Vec<Node>,
    root: Option<Element>,
    epilog: Vec<Node>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);
        Self {
            input,
            pos: 0,
            stack: Vec::new(),
            prolog: Vec::new(),
            root: None,
            epilog: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<XmlDocument, XmlError> {
        while self.pos < self.input.len() {
            let rest = &self.input[self.pos..];
            if !rest.starts_with('<') {
                let end = rest.find('<').unwrap_or(rest.len());
                let text = unescape(&rest[..end]);
                self.pos += end;
                self.attach(Node::Text(text))?;
                continue;
            }

            if rest.starts_with("<!--") {
                self.raw_until("-->")?;
            } else if rest.starts_with("<![CDATA[") {
                self.raw_until("]]>")?;
            } else if rest.starts_with("<?") {
                self.raw_until("?>")?;
            } else if rest.starts_with("<!") {
                self.raw_until(">")?;
            } else if rest.starts_with("</") {
                self.close_tag()?;
            } else {
                self.open_tag()?;
            }
        }

        if let Some(open) = self.stack.last() {
            return Err(XmlError::new(
                self.pos,
                format!("unclosed element <{}>", open.name),
            ));
        }
        let root = self
            .root
            .ok_or_else(|| XmlError::new(self.pos, "no root element"))?;

        Ok(XmlDocument {
            prolog: self.prolog,
            root,
            epilog: self.epilog,
        })
    }

    fn raw_until(&mut self, terminator: &str) -> Result<(), XmlError> {
        let rest = &self.input[self.pos..];
        let end = rest
            .find(terminator)
            .ok_or_else(|| XmlError::new(self.pos, format!("missing '{}'", terminator)))?
            + terminator.len();
        let raw = rest[..end].to_string();
        self.pos += end;
        self.attach(Node::Raw(raw))
    }

    fn close_tag(&mut self) -> Result<(), XmlError> {
        let start = self.pos;
        let rest = &self.input[self.pos..];
        let end = rest
            .find('>')
            .ok_or_else(|| XmlError::new(start, "unterminated end tag"))?;
        let name = rest[2..end].trim();
        self.pos += end + 1;

        let element = self
            .stack
            .pop()
            .ok_or_else(|| XmlError::new(start, format!("unexpected </{}>", name)))?;
        if element.name != name {
            return Err(XmlError::new(
                start,
                format!("expected </{}>, found </{}>", element.name, name),
            ));
        }
        self.attach(Node::Element(element))
    }

    fn open_tag(&mut self) -> Result<(), XmlError> {
        let start = self.pos;
        let bytes = self.input.as_bytes();
        let mut i = self.pos + 1;
        let mut quote: Option<u8> = None;
        while i < bytes.len() {
            match (quote, bytes[i]) {
                (None, b'"') | (None, b'\'') => quote = Some(bytes[i]),
                (Some(q), c) if c == q => quote = None,
                (None, b'>') => break,
                _ => {}
            }
            i += 1;
        }
        if i >= bytes.len() {
            return Err(XmlError::new(start, "unterminated start tag"));
        }

        let mut content = &self.input[start + 1..i];
        self.pos = i + 1;
        let self_closing = content.ends_with('/');
        if self_closing {
            content = &content[..content.len() - 1];
        }

        let element = parse_tag(content).map_err(|m| XmlError::new(start, m))?;
        if self_closing {
            self.attach(Node::Element(element))
        } else {
            self.stack.push(element);
            Ok(())
        }
    }

    fn attach(&mut self, node: Node) -> Result<(), XmlError> {
        if let Some(parent) = self.stack.last_mut() {
            parent.children.push(node);
            return Ok(());
        }
        match node {
            Node::Element(e) => {
                if self.root.is_some() {
                    return Err(XmlError::new(self.pos, "multiple root elements"));
                }
                self.root = Some(e);
            }
            other if self.root.is_none() => self.prolog.push(other),
            other => self.epilog.push(other),
        }
        Ok(())
    }
}

fn parse_tag(content: &str) -> Result<Element, String> {
    let content = content.trim();
    let name_end = content
        .find(|c: char| c.is_whitespace())
        .unwrap_or(content.len());
    let name = &content[..name_end];
    if name.is_empty() {
        return Err("empty tag name".to_string());
    }

    let mut element = Element::new(name);
    let mut rest = content[name_end..].trim_start();
    while !rest.is_empty() {
        let eq = rest
            .find('=')
            .ok_or_else(|| format!("attribute without value in <{}>", name))?;
        let key = rest[..eq].trim();
        rest = rest[eq + 1..].trim_start();

        let quote = rest
            .chars()
            .next()
            .filter(|c| *c == '"' || *c == '\'')
            .ok_or_else(|| format!("unquoted attribute '{}' in <{}>", key, name))?;
        let close = rest[1..]
            .find(quote)
            .ok_or_else(|| format!("unterminated attribute '{}' in <{}>", key, name))?;
        let value = unescape(&rest[1..1 + close]);
        element.attrs.push((key.to_string(), value));
        rest = rest[close + 2..].trim_start();
    }
    Ok(element)
}

pub fn unescape(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let Some(semi) = rest.find(';') else {
            break;
        };
        let entity = &rest[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}
