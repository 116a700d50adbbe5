//! # Editable Canvas Shell
//!
//! The live editor shows one continuous rich-text body sliced across page
//! containers. This module computes everything such a surface needs that is
//! not the editing itself:
//!
//! - each page rendered by the shared [`LetterLayout`] with the body
//!   suppressed;
//! - a viewport per page, where the single editor is clipped to that page's
//!   slice of the flow (only page one is interactive, the rest show a
//!   read-only clone scrolled by `offset`);
//! - the edit overlays, at exactly the coordinates the renderer uses for
//!   the same zones.
//!
//! Pagination follows the live body height through a [`PaginationTracker`].

pub mod session;

use serde::Serialize;

use crate::compose::{has_zone, PreparedLetter};
use crate::content::{StorageResolver, ZoneKey};
use crate::layout::body::place_subject_block;
use crate::layout::{BodySlot, LayoutPage, LetterLayout, PageRequest, RenderInput, Zone};
use crate::pagination::{ContentMeasurer, Pagination, PaginationTracker};
use crate::settings::LetterLayoutSettings;
use crate::units::{line_height_mm, Rect};

/// Top of the live body on page one.
///
/// Subject and salutation each take one line at their font size. After the
/// subject come two more lines of blank, after the salutation one. Absent
/// parts take no room. At 11pt this tracks the renderer's 9mm and 4.5mm
/// blanks.
pub fn editor_top_mm(settings: &LetterLayoutSettings, has_subject: bool, has_salutation: bool) -> f64 {
    let mut top = settings.subject.top;
    if has_subject {
        top += 3.0 * line_height_mm(settings.subject.font_size);
    }
    if has_salutation {
        top += 2.0 * line_height_mm(settings.salutation.font_size);
    }
    top
}

/// The editable parts of page one (and the closing on the last page).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OverlayKind {
    ReturnAddress,
    AddressField,
    InfoBlock,
    Subject,
    Salutation,
    Closing,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditOverlay {
    pub kind: OverlayKind,
    pub rect: Rect,
}

/// Where the live editor shows through on a page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorViewport {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// How far into the body flow this viewport starts.
    pub offset: f64,
    pub interactive: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellPage {
    pub page: LayoutPage,
    pub viewport: EditorViewport,
    pub overlays: Vec<EditOverlay>,
}

/// Page state of one open editor.
#[derive(Debug, Clone)]
pub struct CanvasShell {
    layout: LetterLayout,
    tracker: PaginationTracker,
}

impl CanvasShell {
    pub fn new(prepared: &PreparedLetter) -> Self {
        Self::with_layout(LetterLayout::default(), prepared)
    }

    pub fn with_layout(layout: LetterLayout, prepared: &PreparedLetter) -> Self {
        let tracker = PaginationTracker::with_constants(
            layout.constants,
            Self::editor_top_for(prepared),
            prepared.settings.footer.top,
        );
        Self { layout, tracker }
    }

    fn editor_top_for(prepared: &PreparedLetter) -> f64 {
        let has_subject = !prepared.fields.subject.trim().is_empty() || has_zone(prepared, ZoneKey::SubjectLine);
        let has_salutation = !prepared.fields.salutation.trim().is_empty();
        editor_top_mm(&prepared.settings, has_subject, has_salutation)
    }

    /// Re-read subject, salutation and footer position after an edit.
    pub fn refresh(&mut self, prepared: &PreparedLetter) {
        self.tracker.set_editor_top(Self::editor_top_for(prepared));
        self.tracker.set_footer_top(prepared.settings.footer.top);
    }

    /// Feed a height observation from the live surface. Stale ones are
    /// ignored; returns whether this one was taken.
    pub fn observe_height(&mut self, sequence: u64, height_mm: f64) -> bool {
        self.tracker.observe_height(sequence, height_mm)
    }

    pub fn poll(&mut self, measurer: &dyn ContentMeasurer) -> &Pagination {
        self.tracker.poll(measurer)
    }

    pub fn pagination(&self) -> &Pagination {
        self.tracker.current()
    }

    /// Every page with its viewport and overlays, for the current pagination.
    pub fn pages(&self, prepared: &PreparedLetter, resolver: &dyn StorageResolver) -> Vec<ShellPage> {
        let input = RenderInput::new(prepared, resolver);
        let pagination = self.tracker.current();
        let settings = &prepared.settings;

        pagination
            .pages
            .iter()
            .map(|info| {
                let first = info.page_number <= 1;
                let last = pagination.is_last(info.page_number);
                let page = self.layout.render_page(
                    &input,
                    &PageRequest {
                        info: *info,
                        total_pages: pagination.total_pages,
                        body: BodySlot::Suppressed,
                        closing: last,
                    },
                );

                let viewport = EditorViewport {
                    x: settings.margins.left,
                    y: if first {
                        Self::editor_top_for(prepared)
                    } else {
                        self.layout.constants.follow_page_content_top_mm
                    },
                    width: settings.content_width(),
                    height: info.content_height_mm,
                    offset: info.content_offset_mm,
                    interactive: first,
                };

                let mut overlays = if first { self.page_one_overlays(prepared) } else { Vec::new() };
                if last {
                    overlays.extend(page.zone(Zone::Closing).next().map(|closing| EditOverlay {
                        kind: OverlayKind::Closing,
                        rect: closing.rect(),
                    }));
                }

                ShellPage {
                    page,
                    viewport,
                    overlays,
                }
            })
            .collect()
    }

    fn page_one_overlays(&self, prepared: &PreparedLetter) -> Vec<EditOverlay> {
        let settings = &prepared.settings;
        let placement = place_subject_block(settings, &prepared.content, &prepared.fields, &self.layout.gaps);
        let mut overlays = vec![
            EditOverlay {
                kind: OverlayKind::ReturnAddress,
                rect: settings.address_field.return_address_rect(),
            },
            EditOverlay {
                kind: OverlayKind::AddressField,
                rect: settings.address_field.address_zone_rect(),
            },
            EditOverlay {
                kind: OverlayKind::InfoBlock,
                rect: settings.info_block.rect(),
            },
        ];
        overlays.extend(placement.subject.map(|rect| EditOverlay {
            kind: OverlayKind::Subject,
            rect,
        }));
        overlays.extend(placement.salutation.map(|rect| EditOverlay {
            kind: OverlayKind::Salutation,
            rect,
        }));
        overlays
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::prepare;
    use crate::content::NoStorage;
    use crate::model::{Letter, LetterDocument, Recipient};

    fn prepared() -> PreparedLetter {
        prepare(&LetterDocument {
            letter: Letter {
                subject: Some("Antrag auf Akteneinsicht".into()),
                closing_name: Some("Dr. Schmidt".into()),
                ..Default::default()
            },
            recipient: Some(Recipient {
                name: Some("Herbert Klein".into()),
                gender: Some("male".into()),
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    #[test]
    fn editor_top_matches_line_arithmetic() {
        let settings = LetterLayoutSettings::default();
        let line = 11.0 * 0.3528 * 1.2;
        assert!((editor_top_mm(&settings, true, true) - (98.46 + 5.0 * line)).abs() < 1e-9);
        assert!((editor_top_mm(&settings, true, false) - (98.46 + 3.0 * line)).abs() < 1e-9);
        assert_eq!(editor_top_mm(&settings, false, false), 98.46);
    }

    #[test]
    fn overlays_match_rendered_zones() {
        let p = prepared();
        let shell = CanvasShell::new(&p);
        let pages = shell.pages(&p, &NoStorage);
        assert_eq!(pages.len(), 1);

        let page = &pages[0];
        let subject = page.page.zone(Zone::Subject).next().unwrap();
        let overlay = page
            .overlays
            .iter()
            .find(|o| o.kind == OverlayKind::Subject)
            .unwrap();
        assert_eq!(overlay.rect, subject.rect());

        let closing = page.page.zone(Zone::Closing).next().unwrap();
        assert!(page
            .overlays
            .iter()
            .any(|o| o.kind == OverlayKind::Closing && o.rect == closing.rect()));
        assert!(page.page.zone(Zone::Body).next().is_none());
    }

    #[test]
    fn only_page_one_is_interactive_and_closing_is_last() {
        let p = prepared();
        let mut shell = CanvasShell::new(&p);
        assert!(shell.observe_height(1, 600.0));
        assert!(!shell.observe_height(0, 10.0));
        let pages = shell.pages(&p, &NoStorage);
        assert_eq!(pages.len(), 3);

        assert!(pages[0].viewport.interactive);
        assert!(pages[1..].iter().all(|pg| !pg.viewport.interactive));
        assert_eq!(pages[1].viewport.y, 20.0);
        assert_eq!(pages[1].viewport.offset, pages[0].viewport.height);

        assert!(pages[0].page.zone(Zone::Closing).next().is_none());
        assert!(pages[2].page.zone(Zone::Closing).next().is_some());
        assert!(pages[1].overlays.is_empty());
        assert!(pages[1].page.zone(Zone::AddressField).next().is_none());
    }

    #[test]
    fn estimate_drives_pagination() {
        let p = prepared();
        let mut shell = CanvasShell::new(&p);
        let measured = || 170.0;
        assert_eq!(shell.poll(&measured).total_pages, 2);
    }
}
