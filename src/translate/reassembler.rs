//! Writes translated text back into the runs it was extracted from

use std::collections::HashSet;

use super::extractor::{ContainerKind, ContainerRef, TextSegment};
use super::translator::{SegmentStatus, TranslationResult};
use crate::docx::Document;
use crate::docx::xml::{Element, Node};
use crate::error::DocumentError;

const SEPARATORS: [char; 2] = ['\t', '\n'];

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReassemblyReport {
    pub written: usize,
    pub kept: usize,
    pub colors_pinned: usize,
    pub containers: usize,
}

/// Applies `results` to `doc`. Results must pair one-to-one, in order, with the
/// segments extracted from this document; anything else is rejected before the
/// tree is touched.
pub fn apply(
    doc: &mut Document,
    segments: &[TextSegment],
    results: &[TranslationResult],
) -> Result<ReassemblyReport, DocumentError> {
    if segments.len() != results.len() {
        return Err(DocumentError::Structure(format!(
            "{} results for {} segments",
            results.len(),
            segments.len()
        )));
    }

    let mut seen = HashSet::new();
    let mut drifted = Vec::with_capacity(segments.len());
    for (segment, result) in segments.iter().zip(results) {
        if segment.id != result.segment_id || !seen.insert(segment.id) {
            return Err(DocumentError::Structure(format!(
                "result {} does not match segment {}",
                result.segment_id, segment.id
            )));
        }
        let run = doc
            .element(segment.style_ref.path())
            .filter(|e| e.name == "w:r")
            .ok_or_else(|| {
                DocumentError::Structure(format!("segment {} no longer points at a run", segment.id))
            })?;
        drifted.push(inherited_color_drifted(doc, segment, run));
    }

    let mut report = ReassemblyReport::default();
    for ((segment, result), drifted) in segments.iter().zip(results).zip(drifted) {
        if let SegmentStatus::Failed(_) = result.status {
            report.kept += 1;
            continue;
        }
        let Some(run) = doc.element_mut(segment.style_ref.path()) else {
            continue;
        };

        write_run_text(run, &result.translated_text);
        segment.style.apply_to(run);
        if drifted {
            segment.style.pin_inherited_color(run);
            report.colors_pinned += 1;
        }
        report.written += 1;
    }

    let mut done: HashSet<&ContainerRef> = HashSet::new();
    for segment in segments {
        let (Some(container), Some(color)) = (
            segment.context.shading_container.as_ref(),
            segment.context.shading_color.as_deref(),
        ) else {
            continue;
        };
        if !done.insert(container) {
            continue;
        }
        if let Some(el) = doc.element_mut(container.path()) {
            apply_shading(el, container.kind, color);
            report.containers += 1;
        }
    }

    tracing::debug!(
        "Reassembled {} runs, kept {}, {} containers",
        report.written,
        report.kept,
        report.containers
    );
    Ok(report)
}

/// True when the colour the run would now inherit differs from the one captured.
fn inherited_color_drifted(doc: &Document, segment: &TextSegment, run: &Element) -> bool {
    let Some(captured) = segment.style.inherited_color.as_deref() else {
        return false;
    };
    let run_style = run
        .child("w:rPr")
        .and_then(|r| r.child("w:rStyle"))
        .and_then(|s| s.attr("w:val"));
    let path = segment.style_ref.path();
    let para_style = (1..path.len())
        .rev()
        .filter_map(|n| doc.element(&path[..n]))
        .find(|e| e.name == "w:p")
        .and_then(|p| p.child("w:pPr"))
        .and_then(|p| p.child("w:pStyle"))
        .and_then(|s| s.attr("w:val"));
    doc.styles.inherited_color(run_style, para_style).as_deref() != Some(captured)
}

fn apply_shading(container: &mut Element, kind: ContainerKind, color: &str) {
    let props = match kind {
        ContainerKind::Paragraph => "w:pPr",
        ContainerKind::TableCell => "w:tcPr",
    };
    let props = container.child_or_insert(props, 0);
    let at = props.children.len();
    let shd = props.child_or_insert("w:shd", at);
    if shd.attr("w:val").is_none() {
        shd.set_attr("w:val", "clear");
    }
    shd.set_attr("w:fill", color);
}

/// Replaces the visible text of `run`. Tab and break separators are kept as
/// elements: when the translation has the same separator sequence, each piece
/// lands in its own `w:t`; otherwise all text goes into the first `w:t`.
pub fn write_run_text(run: &mut Element, text: &str) {
    let original: Vec<char> = run
        .elements()
        .filter_map(|e| separator(&e.name))
        .collect();
    let incoming: Vec<char> = text.chars().filter(|c| SEPARATORS.contains(c)).collect();

    if original == incoming && distribute(run, text) {
        return;
    }
    if !original.is_empty() {
        tracing::debug!(
            "Separator layout {:?} not matched by {:?}; writing text into the first piece",
            original,
            incoming
        );
    }

    let flat: String = text
        .chars()
        .map(|c| if SEPARATORS.contains(&c) { ' ' } else { c })
        .collect();
    let mut first = true;
    for node in run.children.iter_mut() {
        if let Node::Element(t) = node {
            if t.name == "w:t" {
                set_piece(t, if first { &flat } else { "" });
                first = false;
            }
        }
    }
}

fn separator(name: &str) -> Option<char> {
    match name {
        "w:tab" => Some('\t'),
        "w:br" | "w:cr" => Some('\n'),
        _ => None,
    }
}

/// Puts piece `i` of `text` into the first `w:t` after separator `i`.
/// Returns false, leaving `run` untouched, when a non-empty piece has no `w:t` to go to.
fn distribute(run: &mut Element, text: &str) -> bool {
    let pieces: Vec<&str> = text.split(SEPARATORS).collect();

    let mut slots: Vec<Option<usize>> = vec![None; pieces.len()];
    let mut piece = 0;
    for (i, node) in run.children.iter().enumerate() {
        let Node::Element(el) = node else {
            continue;
        };
        if separator(&el.name).is_some() {
            piece += 1;
        } else if el.name == "w:t" && piece < slots.len() && slots[piece].is_none() {
            slots[piece] = Some(i);
        }
    }
    if pieces
        .iter()
        .zip(&slots)
        .any(|(p, slot)| !p.is_empty() && slot.is_none())
    {
        return false;
    }

    let targets: Vec<Option<&str>> = {
        let mut t = vec![None; run.children.len()];
        for (p, slot) in pieces.iter().zip(&slots) {
            if let Some(i) = slot {
                t[*i] = Some(*p);
            }
        }
        t
    };
    for (node, target) in run.children.iter_mut().zip(targets) {
        if let Node::Element(t) = node {
            if t.name == "w:t" {
                set_piece(t, target.unwrap_or(""));
            }
        }
    }
    true
}

fn set_piece(t: &mut Element, text: &str) {
    t.set_text(text);
    if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
        t.set_attr("xml:space", "preserve");
    }
}
