//! Property tests for pagination and DIN 5008 metric enforcement.

use proptest::prelude::*;

use letterform::pagination::slice::{slice_lines, SliceRoom};
use letterform::pagination::{compute_pagination, PaginationConstants};
use letterform::settings::LetterLayoutSettings;
use letterform::{paginate, PaginationRequest};

fn geometry() -> impl Strategy<Value = (f64, f64)> {
    (60.0f64..140.0, 200.0f64..290.0)
}

proptest! {
    #[test]
    fn page_count_never_drops_as_the_body_grows(
        (editor_top, footer_top) in geometry(),
        a in 0.0f64..5000.0,
        b in 0.0f64..5000.0,
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let short = compute_pagination(editor_top, footer_top, low);
        let long = compute_pagination(editor_top, footer_top, high);
        prop_assert!(short.total_pages <= long.total_pages);
    }

    #[test]
    fn slices_cover_the_body_exactly(
        (editor_top, footer_top) in geometry(),
        height in 0.0f64..5000.0,
    ) {
        let p = compute_pagination(editor_top, footer_top, height);
        prop_assert_eq!(p.pages.len(), p.total_pages);
        prop_assert!(p.total_pages >= 1);

        if p.total_pages == 1 {
            let available = PaginationConstants::default().page1_available(editor_top, footer_top);
            prop_assert!(height <= available + 1e-9);
        } else {
            let sum: f64 = p.pages.iter().map(|page| page.content_height_mm).sum();
            prop_assert!((sum - height).abs() <= 1e-6 * height.max(1.0));
        }

        let mut offset = 0.0;
        for (i, page) in p.pages.iter().enumerate() {
            prop_assert_eq!(page.page_number, i + 1);
            prop_assert!((page.content_offset_mm - offset).abs() <= 1e-6 * height.max(1.0));
            offset += page.content_height_mm;
        }
    }

    #[test]
    fn whole_lines_fit_their_slices(
        heights in proptest::collection::vec(0.5f64..12.0, 0..400),
        first_body in 60.0f64..160.0,
        closing in 0.0f64..40.0,
    ) {
        let first = SliceRoom::new(first_body, first_body - closing);
        let follow = SliceRoom::new(242.0, 242.0 - closing);
        let s = slice_lines(&heights, first, follow);

        prop_assert_eq!(s.lines.len(), s.pagination.total_pages);
        let placed: Vec<usize> = s.lines.iter().flatten().map(|l| l.index).collect();
        prop_assert_eq!(placed, (0..heights.len()).collect::<Vec<_>>());

        let last = s.lines.len() - 1;
        let mut offset = 0.0;
        for (i, (info, page)) in s.pagination.pages.iter().zip(&s.lines).enumerate() {
            let room = if i == 0 { first } else { follow };
            let limit = if i == last { room.with_closing_mm } else { room.body_mm };
            let used: f64 = page.iter().map(|l| heights[l.index]).sum();
            prop_assert!(used <= limit + 1e-6 || page.len() == 1);
            if s.pagination.total_pages > 1 {
                prop_assert!((info.content_offset_mm - offset).abs() < 1e-6);
                prop_assert!((info.content_height_mm - used).abs() < 1e-6);
            }
            offset += used;
        }
    }

    #[test]
    fn bare_request_matches_direct_call(
        (editor_top, footer_top) in geometry(),
        height in 0.0f64..2000.0,
    ) {
        let request = PaginationRequest {
            editor_top_mm: editor_top,
            footer_top_mm: footer_top,
            content_height_mm: height,
        };
        prop_assert_eq!(paginate(&request), compute_pagination(editor_top, footer_top, height));
    }

    #[test]
    fn enforcement_pins_metrics_and_is_idempotent(
        footer_top in proptest::num::f64::ANY,
        max_height in proptest::num::f64::ANY,
        content_top in proptest::num::f64::ANY,
        margin_left in proptest::num::f64::ANY,
        info_width in proptest::num::f64::ANY,
        font_size in proptest::num::f64::ANY,
    ) {
        let mut s = LetterLayoutSettings::default();
        s.footer.top = footer_top;
        s.content.max_height = max_height;
        s.content.top = content_top;
        s.margins.left = margin_left;
        s.info_block.width = info_width;
        s.content.font_size = font_size;

        let once = s.enforce_din5008_metrics();
        prop_assert_eq!(once.footer.top, 272.0);
        prop_assert_eq!(once.content.max_height, 165.0);
        prop_assert_eq!(once.content.top, 98.46);
        prop_assert_eq!(once.subject.top, 98.46);
        prop_assert!(once.margins.left.is_finite());
        prop_assert!(once.info_block.width > 0.0);
        prop_assert!(once.content.font_size > 0.0);

        let twice = once.enforce_din5008_metrics();
        prop_assert_eq!(once, twice);
    }
}
