//! # Text Layout
//!
//! Line breaking and measurement for the letter body and the zone texts.
//!
//! There is no DOM in the core, so it carries its own deterministic text
//! model: Helvetica/Arial advance widths ([`metrics`]), UAX#14 break
//! opportunities, and German syllable hyphenation for words wider than the
//! line. The live preview estimate and the export lines both come from here,
//! which keeps them in agreement.

pub mod markup;
pub mod metrics;

use serde::Serialize;
use unicode_linebreak::{linebreaks, BreakOpportunity};

use crate::pagination::ContentMeasurer;
use crate::units::MM_PER_PT;
use markup::{BlockKind, Paragraph};

const SOFT_HYPHEN: char = '\u{00AD}';

/// A character with the styling that affects its width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyledChar {
    pub ch: char,
    pub bold: bool,
    pub italic: bool,
}

impl StyledChar {
    pub fn plain(ch: char) -> Self {
        Self {
            ch,
            bold: false,
            italic: false,
        }
    }
}

/// A same-styled stretch of a broken line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRun {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
}

/// A line of text after line-breaking. Widths are in millimeters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokenLine {
    pub text: String,
    pub runs: Vec<TextRun>,
    /// Width without trailing spaces.
    pub width: f64,
}

/// Compute UAX#14 break opportunities indexed by char position.
///
/// Entry `i` is the opportunity *before* `chars[i]`. Index 0 is always
/// `None`.
fn compute_break_opportunities(text: &str) -> Vec<Option<BreakOpportunity>> {
    let char_count = text.chars().count();
    let mut result = vec![None; char_count];

    let mut byte_to_char = vec![0usize; text.len() + 1];
    for (char_idx, (byte_idx, _)) in text.char_indices().enumerate() {
        byte_to_char[byte_idx] = char_idx;
    }
    byte_to_char[text.len()] = char_count;

    for (byte_offset, opp) in linebreaks(text) {
        let char_idx = byte_to_char[byte_offset];
        // A break at the very end carries no information.
        if char_idx < char_count {
            result[char_idx] = Some(opp);
        }
    }
    result
}

fn is_newline(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn visible_width(chars: &[StyledChar], widths: &[f64]) -> f64 {
    chars
        .iter()
        .zip(widths)
        .filter(|(c, _)| c.ch != SOFT_HYPHEN && !is_newline(c.ch))
        .map(|(_, w)| w)
        .sum()
}

#[derive(Debug, Clone, Copy)]
pub struct TextLayout {
    hyphenate: bool,
}

impl Default for TextLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayout {
    /// German hyphenation enabled.
    pub fn new() -> Self {
        Self { hyphenate: true }
    }

    pub fn without_hyphenation() -> Self {
        Self { hyphenate: false }
    }

    /// Width of `text` set on one line.
    pub fn measure_width(&self, text: &str, font_size_pt: f64, bold: bool) -> f64 {
        metrics::text_width_mm(text, font_size_pt, bold)
    }

    /// Break plain text into lines no wider than `max_width_mm`.
    pub fn break_into_lines(&self, text: &str, max_width_mm: f64, font_size_pt: f64, bold: bool) -> Vec<BrokenLine> {
        let chars: Vec<StyledChar> = text
            .chars()
            .map(|ch| StyledChar {
                ch,
                bold,
                italic: false,
            })
            .collect();
        self.break_runs_into_lines(&chars, max_width_mm, font_size_pt)
    }

    /// Greedy line breaking over styled characters.
    ///
    /// Breaks at the last UAX#14 opportunity (or soft hyphen) that fits.
    /// A word with no such opportunity is hyphenated at a German syllable
    /// boundary, and failing that, broken at the overflowing character.
    pub fn break_runs_into_lines(&self, chars: &[StyledChar], max_width_mm: f64, font_size_pt: f64) -> Vec<BrokenLine> {
        if chars.is_empty() {
            return vec![BrokenLine::default()];
        }

        let text: String = chars.iter().map(|c| c.ch).collect();
        let widths: Vec<f64> = chars
            .iter()
            .map(|c| metrics::char_width_mm(c.ch, font_size_pt, c.bold))
            .collect();
        let break_opps = compute_break_opportunities(&text);

        let mut lines = Vec::new();
        let mut line_start = 0;
        let mut line_width = 0.0;
        let mut last_break_point: Option<usize> = None;

        for (i, styled) in chars.iter().enumerate() {
            let ch = styled.ch;
            if i > 0 {
                match break_opps[i] {
                    Some(BreakOpportunity::Mandatory) => {
                        let end = if is_newline(chars[i - 1].ch) { i - 1 } else { i };
                        lines.push(self.make_line(&chars[line_start..end], &widths[line_start..end], None, font_size_pt));
                        line_start = i;
                        line_width = 0.0;
                        last_break_point = None;
                    }
                    Some(BreakOpportunity::Allowed) => last_break_point = Some(i - 1),
                    None => {}
                }
            }

            if ch == SOFT_HYPHEN {
                last_break_point = Some(i);
                continue;
            }
            if is_newline(ch) {
                continue;
            }

            let char_width = widths[i];
            if line_width + char_width > max_width_mm && line_start < i {
                if let Some(bp) = last_break_point.filter(|bp| *bp >= line_start) {
                    if chars[bp].ch == SOFT_HYPHEN {
                        lines.push(self.make_line(
                            &chars[line_start..bp],
                            &widths[line_start..bp],
                            Some(chars[bp]),
                            font_size_pt,
                        ));
                    } else {
                        lines.push(self.make_line(
                            &chars[line_start..=bp],
                            &widths[line_start..=bp],
                            None,
                            font_size_pt,
                        ));
                    }
                    line_start = bp + 1;
                    line_width = visible_width(&chars[line_start..=i], &widths[line_start..=i]);
                    last_break_point = None;
                    continue;
                }

                if self.hyphenate {
                    if let Some(break_at) =
                        self.try_hyphenate_word(chars, &widths, line_start, i, max_width_mm, font_size_pt)
                    {
                        lines.push(self.make_line(
                            &chars[line_start..break_at],
                            &widths[line_start..break_at],
                            Some(chars[break_at - 1]),
                            font_size_pt,
                        ));
                        line_start = break_at;
                        line_width = visible_width(&chars[line_start..=i], &widths[line_start..=i]);
                        last_break_point = None;
                        continue;
                    }
                }

                // No break point at all: cut at the overflowing character.
                lines.push(self.make_line(&chars[line_start..i], &widths[line_start..i], None, font_size_pt));
                line_start = i;
                line_width = char_width;
                last_break_point = None;
                continue;
            }

            line_width += char_width;
        }

        if line_start < chars.len() {
            lines.push(self.make_line(&chars[line_start..], &widths[line_start..], None, font_size_pt));
        }

        lines
    }

    /// Assemble a line, dropping soft hyphens and newlines. `hyphen` appends
    /// a visible hyphen styled like the given char.
    fn make_line(
        &self,
        chars: &[StyledChar],
        widths: &[f64],
        hyphen: Option<StyledChar>,
        font_size_pt: f64,
    ) -> BrokenLine {
        let mut kept: Vec<(StyledChar, f64)> = chars
            .iter()
            .copied()
            .zip(widths.iter().copied())
            .filter(|(c, _)| c.ch != SOFT_HYPHEN && !is_newline(c.ch))
            .collect();
        if let Some(h) = hyphen {
            let styled = StyledChar { ch: '-', ..h };
            kept.push((styled, metrics::char_width_mm('-', font_size_pt, h.bold)));
        }
        while kept.last().is_some_and(|(c, _)| c.ch == ' ') {
            kept.pop();
        }

        let mut runs: Vec<TextRun> = Vec::new();
        for (c, _) in &kept {
            match runs.last_mut() {
                Some(run) if run.bold == c.bold && run.italic == c.italic => run.text.push(c.ch),
                _ => runs.push(TextRun {
                    text: c.ch.to_string(),
                    bold: c.bold,
                    italic: c.italic,
                }),
            }
        }

        BrokenLine {
            text: kept.iter().map(|(c, _)| c.ch).collect(),
            runs,
            width: kept.iter().map(|(_, w)| w).sum(),
        }
    }

    /// Find the rightmost German syllable boundary in the overflowing word
    /// that still fits with a trailing hyphen. Returns the char index to
    /// break before.
    fn try_hyphenate_word(
        &self,
        chars: &[StyledChar],
        widths: &[f64],
        line_start: usize,
        overflow_at: usize,
        max_width_mm: f64,
        font_size_pt: f64,
    ) -> Option<usize> {
        let mut word_start = overflow_at;
        while word_start > line_start && !chars[word_start - 1].ch.is_whitespace() {
            word_start -= 1;
        }
        let word_end = chars[overflow_at..]
            .iter()
            .position(|c| c.ch.is_whitespace())
            .map_or(chars.len(), |p| overflow_at + p);
        if word_end <= word_start {
            return None;
        }

        let word: String = chars[word_start..word_end].iter().map(|c| c.ch).collect();
        let syllables: Vec<&str> = hypher::hyphenate(&word, hypher::Lang::German).collect();
        if syllables.len() < 2 {
            return None;
        }

        let prefix_width = visible_width(&chars[line_start..word_start], &widths[line_start..word_start]);
        let hyphen_width = metrics::char_width_mm('-', font_size_pt, chars[word_start].bold);

        let mut best_break = None;
        let mut offset = word_start;
        for syllable in &syllables[..syllables.len() - 1] {
            offset += syllable.chars().count();
            if offset > overflow_at {
                break;
            }
            let part = visible_width(&chars[word_start..offset], &widths[word_start..offset]);
            if prefix_width + part + hyphen_width <= max_width_mm {
                best_break = Some(offset);
            }
        }
        best_break.filter(|b| *b > line_start)
    }
}

// ── Body flow ───────────────────────────────────────────────────

/// Typography of the body flow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowStyle {
    pub width_mm: f64,
    pub font_size_pt: f64,
    /// Line height multiplier.
    pub line_height: f64,
    /// Blank space between paragraphs, in lines. Consecutive list items are
    /// not separated.
    pub paragraph_gap_lines: f64,
    /// Indent of list item text.
    pub list_indent_mm: f64,
}

impl FlowStyle {
    pub fn new(width_mm: f64, font_size_pt: f64, line_height: f64) -> Self {
        Self {
            width_mm,
            font_size_pt,
            line_height,
            paragraph_gap_lines: 1.0,
            list_indent_mm: 6.0,
        }
    }

    fn line_height_mm(&self, font_size_pt: f64) -> f64 {
        font_size_pt * MM_PER_PT * self.line_height
    }
}

/// One line of the flowed body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyLine {
    pub paragraph: usize,
    /// Offset from the left edge of the body.
    pub x: f64,
    /// Blank space above this line.
    pub space_before: f64,
    pub height: f64,
    pub font_size: f64,
    /// List marker drawn left of the first line of an item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    pub line: BrokenLine,
}

impl BodyLine {
    /// Vertical room this line consumes, gap included.
    pub fn advance(&self) -> f64 {
        self.space_before + self.height
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyFlow {
    pub lines: Vec<BodyLine>,
    pub height_mm: f64,
}

fn heading_scale(level: u8) -> f64 {
    match level {
        1 => 1.4,
        2 => 1.2,
        3 => 1.1,
        _ => 1.0,
    }
}

fn is_list_item(kind: BlockKind) -> bool {
    matches!(kind, BlockKind::BulletItem | BlockKind::OrderedItem { .. })
}

/// Flow paragraphs into positioned lines.
pub fn flow_paragraphs(paragraphs: &[Paragraph], style: &FlowStyle) -> BodyFlow {
    let layout = TextLayout::new();
    let mut lines = Vec::new();
    let mut height = 0.0;
    let mut previous: Option<BlockKind> = None;

    for (index, paragraph) in paragraphs.iter().enumerate() {
        let font_size = match paragraph.kind {
            BlockKind::Heading { level } => style.font_size_pt * heading_scale(level),
            _ => style.font_size_pt,
        };
        let line_height = style.line_height_mm(font_size);
        let (indent, marker) = match paragraph.kind {
            BlockKind::BulletItem => (style.list_indent_mm, Some("•".to_string())),
            BlockKind::OrderedItem { number } => (style.list_indent_mm, Some(format!("{number}."))),
            _ => (0.0, None),
        };

        let gap = match previous {
            Some(prev) if is_list_item(prev) && is_list_item(paragraph.kind) => 0.0,
            Some(_) => style.paragraph_gap_lines * style.line_height_mm(style.font_size_pt),
            None => 0.0,
        };

        let broken = layout.break_runs_into_lines(
            &paragraph.styled_chars(),
            (style.width_mm - indent).max(0.0),
            font_size,
        );
        for (n, line) in broken.into_iter().enumerate() {
            let space_before = if n == 0 { gap } else { 0.0 };
            height += space_before + line_height;
            lines.push(BodyLine {
                paragraph: index,
                x: indent,
                space_before,
                height: line_height,
                font_size,
                marker: if n == 0 { marker.clone() } else { None },
                line,
            });
        }
        previous = Some(paragraph.kind);
    }

    BodyFlow {
        lines,
        height_mm: height,
    }
}

/// A [`ContentMeasurer`] backed by the text model instead of a live surface.
#[derive(Debug, Clone)]
pub struct EstimatingMeasurer {
    flow: BodyFlow,
}

impl EstimatingMeasurer {
    pub fn new(paragraphs: &[Paragraph], style: &FlowStyle) -> Self {
        Self {
            flow: flow_paragraphs(paragraphs, style),
        }
    }

    pub fn flow(&self) -> &BodyFlow {
        &self.flow
    }

    pub fn into_flow(self) -> BodyFlow {
        self.flow
    }
}

impl ContentMeasurer for EstimatingMeasurer {
    fn measure_mm(&self) -> f64 {
        self.flow.height_mm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line() {
        let lines = TextLayout::new().break_into_lines("Hallo", 100.0, 11.0, false);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "Hallo");
    }

    #[test]
    fn breaks_at_spaces() {
        let lines = TextLayout::new().break_into_lines("Antrag auf Akteneinsicht", 20.0, 11.0, false);
        assert!(lines.len() >= 2);
        assert_eq!(lines[0].text, "Antrag auf");
        assert!(lines.iter().all(|l| l.width <= 20.0));
    }

    #[test]
    fn explicit_newline() {
        let lines = TextLayout::new().break_into_lines("Zeile\nZweite", 100.0, 11.0, false);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "Zeile");
        assert_eq!(lines[1].text, "Zweite");
    }

    #[test]
    fn empty_string_is_one_empty_line() {
        let lines = TextLayout::new().break_into_lines("", 100.0, 11.0, false);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].width, 0.0);
    }

    #[test]
    fn long_german_word_is_hyphenated() {
        let lines = TextLayout::new().break_into_lines("Donaudampfschifffahrtsgesellschaft", 25.0, 11.0, false);
        assert!(lines.len() >= 2);
        assert!(lines[0].text.ends_with('-'), "got {:?}", lines[0].text);
    }

    #[test]
    fn without_hyphenation_words_are_cut() {
        let lines = TextLayout::without_hyphenation().break_into_lines(
            "Donaudampfschifffahrtsgesellschaft",
            25.0,
            11.0,
            false,
        );
        assert!(lines.len() >= 2);
        assert!(!lines[0].text.ends_with('-'));
    }

    #[test]
    fn runs_keep_styling() {
        let chars: Vec<StyledChar> = "ab"
            .chars()
            .map(StyledChar::plain)
            .chain("cd".chars().map(|ch| StyledChar {
                ch,
                bold: true,
                italic: false,
            }))
            .collect();
        let lines = TextLayout::new().break_runs_into_lines(&chars, 100.0, 11.0);
        assert_eq!(lines[0].runs.len(), 2);
        assert!(lines[0].runs[1].bold);
        assert_eq!(lines[0].runs[1].text, "cd");
    }

    #[test]
    fn flow_height_counts_lines_and_gaps() {
        let paragraphs = vec![Paragraph::plain("Eins"), Paragraph::plain("Zwei")];
        let style = FlowStyle::new(165.0, 11.0, 1.2);
        let flow = flow_paragraphs(&paragraphs, &style);
        let line = 11.0 * MM_PER_PT * 1.2;
        assert_eq!(flow.lines.len(), 2);
        assert!((flow.height_mm - 3.0 * line).abs() < 1e-9);
        assert_eq!(flow.lines[1].space_before, line);
    }

    #[test]
    fn list_items_are_indented_and_not_spaced() {
        let mut a = Paragraph::plain("a");
        a.kind = BlockKind::BulletItem;
        let mut b = Paragraph::plain("b");
        b.kind = BlockKind::OrderedItem { number: 2 };
        let flow = flow_paragraphs(&[a, b], &FlowStyle::new(100.0, 11.0, 1.2));
        assert_eq!(flow.lines[0].marker.as_deref(), Some("•"));
        assert_eq!(flow.lines[1].marker.as_deref(), Some("2."));
        assert_eq!(flow.lines[1].space_before, 0.0);
        assert_eq!(flow.lines[0].x, 6.0);
    }

    #[test]
    fn estimating_measurer_reports_flow_height() {
        let paragraphs = vec![Paragraph::plain("Text")];
        let style = FlowStyle::new(165.0, 11.0, 1.2);
        let m = EstimatingMeasurer::new(&paragraphs, &style);
        assert!((m.measure_mm() - 11.0 * MM_PER_PT * 1.2).abs() < 1e-9);
    }
}
