//! Advance widths of Helvetica and Helvetica-Bold (Adobe AFM, 1/1000 em).
//!
//! Arial shares these metrics, so they stand in for the sans-serif faces
//! templates use. Accented Latin letters take the width of their base
//! letter.

use crate::units::MM_PER_PT;

/// Printable ASCII (0x20..=0x7E), regular.
#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Printable ASCII (0x20..=0x7E), bold.
#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

const DEFAULT_WIDTH: u16 = 556;

/// Width of `ch` in 1/1000 em.
pub fn char_width_units(ch: char, bold: bool) -> u16 {
    let table = if bold { &HELVETICA_BOLD } else { &HELVETICA };
    if let Some(w) = ascii_width(ch, table) {
        return w;
    }
    match ch {
        '\u{00AD}' | '\u{200B}' => 0,
        '\u{00A0}' => 278,
        'ß' => 611,
        '€' | '§' | '–' => 556,
        '—' => 1000,
        '·' => 278,
        '•' => 350,
        '„' | '“' | '”' if bold => 500,
        '„' | '“' | '”' => 333,
        '‚' | '‘' | '’' if bold => 278,
        '‚' | '‘' | '’' => 222,
        '°' => 400,
        _ => base_letter(ch)
            .and_then(|base| ascii_width(base, table))
            .unwrap_or(DEFAULT_WIDTH),
    }
}

fn ascii_width(ch: char, table: &[u16; 95]) -> Option<u16> {
    let code = ch as u32;
    if (0x20..=0x7E).contains(&code) {
        Some(table[(code - 0x20) as usize])
    } else {
        None
    }
}

fn base_letter(ch: char) -> Option<char> {
    Some(match ch {
        'à'..='å' => 'a',
        'À'..='Å' => 'A',
        'ç' => 'c',
        'Ç' => 'C',
        'è'..='ë' => 'e',
        'È'..='Ë' => 'E',
        'ì'..='ï' => 'i',
        'Ì'..='Ï' => 'I',
        'ñ' => 'n',
        'Ñ' => 'N',
        'ò'..='ö' | 'ø' => 'o',
        'Ò'..='Ö' | 'Ø' => 'O',
        'ù'..='ü' => 'u',
        'Ù'..='Ü' => 'U',
        'ý' | 'ÿ' => 'y',
        'Ý' => 'Y',
        _ => return None,
    })
}

/// Width of `ch` at `font_size_pt`, in millimeters.
pub fn char_width_mm(ch: char, font_size_pt: f64, bold: bool) -> f64 {
    f64::from(char_width_units(ch, bold)) / 1000.0 * font_size_pt * MM_PER_PT
}

/// Width of `text` on one line, in millimeters.
pub fn text_width_mm(text: &str, font_size_pt: f64, bold: bool) -> f64 {
    text.chars()
        .filter(|c| *c != '\n' && *c != '\r')
        .map(|c| char_width_mm(c, font_size_pt, bold))
        .sum()
}
