//! # Pagination
//!
//! Splits the measured height of the letter body into page-sized slices.
//! Page one starts below the subject/salutation (`editor_top`); every
//! continuation page starts [`FOLLOW_PAGE_CONTENT_TOP_MM`] from the sheet
//! edge because it carries only a reduced header. Both end a fixed reserve
//! above the footer.
//!
//! [`compute_pagination`] is a pure function of its three inputs. Live
//! measurement belongs to the caller, through [`ContentMeasurer`] and
//! [`PaginationTracker`].

pub mod slice;

use serde::{Deserialize, Serialize};

use crate::settings::{DIN_CONTENT_TOP_MM, DIN_FOOTER_TOP_MM};
use crate::units::finite_or;

/// Room kept free above the footer for the closing block and page mark.
pub const PAGE1_RESERVE_MM: f64 = 10.0;

/// Body top on continuation pages: 5mm header plus 5mm gap, from a 10mm margin.
pub const FOLLOW_PAGE_CONTENT_TOP_MM: f64 = 20.0;

/// Upper bound on produced pages. Pathological geometry with a near-zero
/// follow-page height would otherwise allocate without limit.
pub const MAX_PAGES: usize = 999;

const EPSILON: f64 = 1e-6;

/// The tuned offsets that drive page splitting. They match an 11pt
/// Arial/Calibri body at 1.2 line height; other fonts may need new values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaginationConstants {
    /// Reserve above the footer on every page.
    pub bottom_reserve_mm: f64,
    /// Body top on pages two and later.
    pub follow_page_content_top_mm: f64,
}

impl Default for PaginationConstants {
    fn default() -> Self {
        Self {
            bottom_reserve_mm: PAGE1_RESERVE_MM,
            follow_page_content_top_mm: FOLLOW_PAGE_CONTENT_TOP_MM,
        }
    }
}

impl PaginationConstants {
    pub fn page1_available(&self, editor_top_mm: f64, footer_top_mm: f64) -> f64 {
        (footer_top_mm - editor_top_mm - self.bottom_reserve_mm).max(0.0)
    }

    pub fn follow_available(&self, footer_top_mm: f64) -> f64 {
        (footer_top_mm - self.follow_page_content_top_mm - self.bottom_reserve_mm).max(0.0)
    }
}

/// One slice of the body flow.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// 1-based.
    pub page_number: usize,
    /// Where this page's slice starts, measured from the top of the body.
    pub content_offset_mm: f64,
    pub content_height_mm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total_pages: usize,
    pub pages: Vec<PageInfo>,
}

impl Pagination {
    fn single(page1_available: f64) -> Self {
        Pagination {
            total_pages: 1,
            pages: vec![PageInfo {
                page_number: 1,
                content_offset_mm: 0.0,
                content_height_mm: page1_available,
            }],
        }
    }

    pub fn first(&self) -> Option<&PageInfo> {
        self.pages.first()
    }

    pub fn last(&self) -> Option<&PageInfo> {
        self.pages.last()
    }

    pub fn is_last(&self, page_number: usize) -> bool {
        page_number == self.total_pages
    }
}

/// Paginate with the default tuned constants.
pub fn compute_pagination(editor_top_mm: f64, footer_top_mm: f64, content_height_mm: f64) -> Pagination {
    compute_pagination_with(
        &PaginationConstants::default(),
        editor_top_mm,
        footer_top_mm,
        content_height_mm,
    )
}

/// Paginate with explicit constants.
///
/// Always yields at least one page. Page one gets `page1_available`, every
/// follow-up page `follow_available`, and the last page the exact remainder,
/// so the heights of a multi-page result sum to the measured height.
pub fn compute_pagination_with(
    constants: &PaginationConstants,
    editor_top_mm: f64,
    footer_top_mm: f64,
    content_height_mm: f64,
) -> Pagination {
    let editor_top = finite_or(editor_top_mm, DIN_CONTENT_TOP_MM);
    let footer_top = finite_or(footer_top_mm, DIN_FOOTER_TOP_MM);
    let height = finite_or(content_height_mm, 0.0);

    let page1_available = constants.page1_available(editor_top, footer_top);
    let follow_available = constants.follow_available(footer_top);

    if height <= page1_available + EPSILON {
        tracing::trace!(height, page1_available, "body fits on page one");
        return Pagination::single(page1_available);
    }

    let remaining = height - page1_available;
    let extra_pages = if follow_available <= EPSILON {
        // Degenerate geometry: nothing fits on a follow page, so the whole
        // remainder goes onto one.
        1
    } else {
        let needed = ((remaining - EPSILON) / follow_available).ceil().max(1.0);
        if needed >= MAX_PAGES as f64 {
            tracing::warn!(needed, max = MAX_PAGES, "capping page count");
            MAX_PAGES - 1
        } else {
            needed as usize
        }
    };

    let mut pages = Vec::with_capacity(extra_pages + 1);
    pages.push(PageInfo {
        page_number: 1,
        content_offset_mm: 0.0,
        content_height_mm: page1_available,
    });
    for i in 1..=extra_pages {
        let before = (i - 1) as f64 * follow_available;
        let content_height_mm = if i == extra_pages {
            remaining - before
        } else {
            follow_available
        };
        pages.push(PageInfo {
            page_number: i + 1,
            content_offset_mm: page1_available + before,
            content_height_mm,
        });
    }

    tracing::trace!(
        height,
        page1_available,
        follow_available,
        total_pages = pages.len(),
        "paginated body"
    );

    Pagination {
        total_pages: pages.len(),
        pages,
    }
}

// ── Live measurement ────────────────────────────────────────────

/// Anything that can report the current rendered height of the body, in mm.
pub trait ContentMeasurer {
    fn measure_mm(&self) -> f64;
}

impl<F> ContentMeasurer for F
where
    F: Fn() -> f64,
{
    fn measure_mm(&self) -> f64 {
        self()
    }
}

/// Holds the latest pagination inputs and recomputes on every change.
///
/// Height observations carry a sequence number from the observer. An
/// observation older than the newest one seen is discarded, so a late
/// callback can never overwrite a fresher measurement.
#[derive(Debug, Clone)]
pub struct PaginationTracker {
    constants: PaginationConstants,
    editor_top_mm: f64,
    footer_top_mm: f64,
    content_height_mm: f64,
    last_sequence: Option<u64>,
    current: Pagination,
}

impl PaginationTracker {
    pub fn new(editor_top_mm: f64, footer_top_mm: f64) -> Self {
        Self::with_constants(PaginationConstants::default(), editor_top_mm, footer_top_mm)
    }

    pub fn with_constants(constants: PaginationConstants, editor_top_mm: f64, footer_top_mm: f64) -> Self {
        let current = compute_pagination_with(&constants, editor_top_mm, footer_top_mm, 0.0);
        Self {
            constants,
            editor_top_mm,
            footer_top_mm,
            content_height_mm: 0.0,
            last_sequence: None,
            current,
        }
    }

    pub fn current(&self) -> &Pagination {
        &self.current
    }

    pub fn content_height_mm(&self) -> f64 {
        self.content_height_mm
    }

    /// Record a height observation. Returns `false` (and changes nothing)
    /// when `sequence` is not newer than the last accepted observation.
    pub fn observe_height(&mut self, sequence: u64, height_mm: f64) -> bool {
        if self.last_sequence.is_some_and(|last| sequence <= last) {
            tracing::trace!(sequence, last = ?self.last_sequence, "discarding stale height");
            return false;
        }
        self.last_sequence = Some(sequence);
        self.content_height_mm = height_mm;
        self.recompute();
        true
    }

    /// Take a fresh reading from `measurer` as the newest observation.
    pub fn poll(&mut self, measurer: &dyn ContentMeasurer) -> &Pagination {
        let next = self.last_sequence.map_or(0, |s| s + 1);
        self.observe_height(next, measurer.measure_mm());
        &self.current
    }

    pub fn set_editor_top(&mut self, editor_top_mm: f64) {
        self.editor_top_mm = editor_top_mm;
        self.recompute();
    }

    pub fn set_footer_top(&mut self, footer_top_mm: f64) {
        self.footer_top_mm = footer_top_mm;
        self.recompute();
    }

    fn recompute(&mut self) {
        self.current = compute_pagination_with(
            &self.constants,
            self.editor_top_mm,
            self.footer_top_mm,
            self.content_height_mm,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn short_body_is_one_page() {
        let p = compute_pagination(98.46, 272.0, 40.0);
        assert_eq!(p.total_pages, 1);
        assert!(approx(p.pages[0].content_height_mm, 163.54));
        assert_eq!(p.pages[0].content_offset_mm, 0.0);
    }

    #[test]
    fn single_page_boundary() {
        assert_eq!(compute_pagination(98.46, 272.0, 163.54).total_pages, 1);
        assert_eq!(compute_pagination(98.46, 272.0, 163.55).total_pages, 2);
    }

    #[test]
    fn last_follow_page_gets_the_remainder() {
        let p = compute_pagination(98.46, 272.0, 163.54 + 242.0 + 50.0);
        assert_eq!(p.total_pages, 3);
        assert!(approx(p.pages[1].content_offset_mm, 163.54));
        assert!(approx(p.pages[1].content_height_mm, 242.0));
        assert!(approx(p.pages[2].content_offset_mm, 163.54 + 242.0));
        assert!(approx(p.pages[2].content_height_mm, 50.0));
    }

    #[test]
    fn exact_multiple_does_not_add_an_empty_page() {
        let p = compute_pagination(98.46, 272.0, 163.54 + 242.0);
        assert_eq!(p.total_pages, 2);
        assert!(approx(p.pages[1].content_height_mm, 242.0));
    }

    #[test]
    fn non_positive_height_is_one_full_page() {
        for h in [0.0, -12.0, f64::NAN] {
            let p = compute_pagination(98.46, 272.0, h);
            assert_eq!(p.total_pages, 1);
            assert!(approx(p.pages[0].content_height_mm, 163.54));
        }
    }

    #[test]
    fn degenerate_geometry_still_paginates() {
        // Editor top below the footer: nothing fits on page one.
        let p = compute_pagination(280.0, 272.0, 10.0);
        assert_eq!(p.total_pages, 2);
        assert_eq!(p.pages[0].content_height_mm, 0.0);

        // Footer so high that follow pages have no room either.
        let p = compute_pagination(5.0, 25.0, 100.0);
        assert_eq!(p.total_pages, 2);
        assert!(approx(p.pages[1].content_height_mm, 90.0));
    }

    #[test]
    fn custom_constants_are_honoured() {
        let c = PaginationConstants {
            bottom_reserve_mm: 0.0,
            follow_page_content_top_mm: 72.0,
        };
        let p = compute_pagination_with(&c, 72.0, 272.0, 450.0);
        assert_eq!(p.total_pages, 3);
        assert!(approx(p.pages[2].content_height_mm, 50.0));
    }

    #[test]
    fn tracker_discards_stale_observations() {
        let mut t = PaginationTracker::new(98.46, 272.0);
        assert!(t.observe_height(2, 400.0));
        assert_eq!(t.current().total_pages, 2);
        assert!(!t.observe_height(1, 10.0));
        assert_eq!(t.current().total_pages, 2);
        assert!(t.observe_height(3, 10.0));
        assert_eq!(t.current().total_pages, 1);
    }

    #[test]
    fn tracker_recomputes_on_geometry_change() {
        let mut t = PaginationTracker::new(98.46, 272.0);
        t.observe_height(0, 160.0);
        assert_eq!(t.current().total_pages, 1);
        t.set_editor_top(120.0);
        assert_eq!(t.current().total_pages, 2);
    }

    #[test]
    fn tracker_polls_measurer() {
        let mut t = PaginationTracker::new(98.46, 272.0);
        let measure = || 500.0;
        assert_eq!(t.poll(&measure).total_pages, 3);
        let measure = || 20.0;
        assert_eq!(t.poll(&measure).total_pages, 1);
        assert_eq!(t.content_height_mm(), 20.0);
    }
}
