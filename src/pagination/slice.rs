//! # Line Placement
//!
//! Cuts laid-out body lines into page slices for backends that draw text
//! themselves. A line that would cross the end of its slice moves whole to
//! the next page; it is never cut in half.

use super::{PageInfo, Pagination, EPSILON, MAX_PAGES};

/// What to do with the next line at the current cursor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BreakDecision {
    /// The line fits on the current page.
    Place,
    /// The line moves to the next page.
    MoveToNextPage,
}

/// Decide whether a line of `line_height` fits `remaining` mm of a slice.
///
/// A line that can't fit even an empty page is placed anyway, and so is
/// anything left over on the last page.
pub fn decide_break(remaining: f64, line_height: f64, page_is_empty: bool, is_last_page: bool) -> BreakDecision {
    if line_height <= remaining + 1e-6 || page_is_empty || is_last_page {
        BreakDecision::Place
    } else {
        BreakDecision::MoveToNextPage
    }
}

/// A line on a page: index into the input, and its offset from the slice top.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedLine {
    pub index: usize,
    pub y: f64,
}

/// Room for body lines on one kind of page, in mm from the body top.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceRoom {
    /// Room for body lines alone.
    pub body_mm: f64,
    /// Room for body lines on the page that also carries the closing block.
    pub with_closing_mm: f64,
}

impl SliceRoom {
    pub fn new(body_mm: f64, with_closing_mm: f64) -> Self {
        Self {
            body_mm: body_mm.max(0.0),
            with_closing_mm: with_closing_mm.clamp(0.0, body_mm.max(0.0)),
        }
    }
}

/// Whole lines cut into page slices, and the pagination that describes them.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSlices {
    pub pagination: Pagination,
    pub lines: Vec<Vec<PlacedLine>>,
}

/// Cut lines of the given heights into page slices.
///
/// Pages are added until every line fits its slice. Slice offsets and
/// heights follow the lines, so each slice starts where the previous one
/// ended and a multi-page result sums to the total height. When the last
/// slice leaves no room for the closing block, its last line moves with the
/// closing onto a new page (or the closing moves alone when that line is the
/// only one on its page).
pub fn slice_lines(line_heights: &[f64], first: SliceRoom, follow: SliceRoom) -> LineSlices {
    let room = |page: usize| if page == 0 { first } else { follow };
    let mut lines: Vec<Vec<PlacedLine>> = vec![Vec::new()];
    let mut used: Vec<f64> = vec![0.0];

    for (index, &height) in line_heights.iter().enumerate() {
        loop {
            let page = lines.len() - 1;
            let remaining = room(page).body_mm - used[page];
            let capped = lines.len() >= MAX_PAGES;
            match decide_break(remaining, height, lines[page].is_empty(), capped) {
                BreakDecision::Place => {
                    lines[page].push(PlacedLine { index, y: used[page] });
                    used[page] += height;
                    break;
                }
                BreakDecision::MoveToNextPage => {
                    lines.push(Vec::new());
                    used.push(0.0);
                }
            }
        }
    }

    let last = lines.len() - 1;
    if used[last] > room(last).with_closing_mm + EPSILON && lines.len() < MAX_PAGES {
        let carried = if lines[last].len() > 1 { lines[last].pop() } else { None };
        let mut next = Vec::new();
        let mut next_used = 0.0;
        if let Some(line) = carried {
            let height = line_heights[line.index];
            used[last] -= height;
            next.push(PlacedLine { index: line.index, y: 0.0 });
            next_used = height;
        }
        tracing::trace!(page = last + 1, "closing block moves to a new page");
        lines.push(next);
        used.push(next_used);
    }

    let total_pages = lines.len();
    let mut offset = 0.0;
    let pages = used
        .iter()
        .enumerate()
        .map(|(i, &height)| {
            let info = PageInfo {
                page_number: i + 1,
                content_offset_mm: offset,
                content_height_mm: if total_pages == 1 { first.body_mm.max(height) } else { height },
            };
            offset += height;
            info
        })
        .collect();

    LineSlices {
        pagination: Pagination { total_pages, pages },
        lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(body: f64) -> SliceRoom {
        SliceRoom::new(body, body)
    }

    fn indices(page: &[PlacedLine]) -> Vec<usize> {
        page.iter().map(|l| l.index).collect()
    }

    #[test]
    fn everything_fits() {
        let s = slice_lines(&[20.0, 30.0, 40.0], room(100.0), room(100.0));
        assert_eq!(s.pagination.total_pages, 1);
        assert_eq!(s.lines[0].len(), 3);
        assert_eq!(s.lines[0][2].y, 50.0);
        assert_eq!(s.pagination.pages[0].content_height_mm, 100.0);
    }

    #[test]
    fn crossing_line_moves_whole() {
        let s = slice_lines(&[20.0, 30.0, 10.0, 5.0], room(55.0), room(50.0));
        assert_eq!(indices(&s.lines[0]), vec![0, 1]);
        assert_eq!(s.lines[1][0], PlacedLine { index: 2, y: 0.0 });
        assert_eq!(s.lines[1][1].y, 10.0);
    }

    #[test]
    fn slices_follow_the_lines() {
        let heights = [6.0; 25];
        let s = slice_lines(&heights, room(40.0), room(50.0));
        // 6 lines (36mm) on page one, 8 (48mm) on each follow page.
        assert_eq!(s.pagination.total_pages, 4);
        let p = &s.pagination.pages;
        assert_eq!(p[0].content_height_mm, 36.0);
        assert_eq!(p[1].content_offset_mm, 36.0);
        assert_eq!(p[1].content_height_mm, 48.0);
        assert_eq!(p[3].content_offset_mm, 132.0);
        assert_eq!(p[3].content_height_mm, 18.0);
        let sum: f64 = p.iter().map(|i| i.content_height_mm).sum();
        assert_eq!(sum, 150.0);
    }

    #[test]
    fn pages_are_added_until_everything_fits() {
        let heights = [4.0; 500];
        let s = slice_lines(&heights, room(30.0), room(30.0));
        for (page, info) in s.lines.iter().zip(&s.pagination.pages) {
            let end = page.last().map_or(0.0, |l| l.y + 4.0);
            assert!(end <= 30.0 + 1e-9);
            assert!(end <= info.content_height_mm + 1e-9);
        }
        assert_eq!(s.lines.iter().map(Vec::len).sum::<usize>(), 500);
    }

    #[test]
    fn oversized_line_is_placed_on_empty_page() {
        let s = slice_lines(&[25.0, 5.0], room(10.0), room(10.0));
        assert_eq!(s.lines[0].len(), 1);
        assert_eq!(s.lines[1].len(), 1);
    }

    #[test]
    fn closing_takes_the_last_line_along() {
        let s = slice_lines(&[10.0, 10.0, 10.0], SliceRoom::new(40.0, 15.0), SliceRoom::new(40.0, 15.0));
        assert_eq!(s.pagination.total_pages, 2);
        assert_eq!(indices(&s.lines[0]), vec![0, 1]);
        assert_eq!(indices(&s.lines[1]), vec![2]);
        assert_eq!(s.pagination.pages[1].content_offset_mm, 20.0);
    }

    #[test]
    fn closing_moves_alone_after_a_single_line() {
        let s = slice_lines(&[30.0], SliceRoom::new(40.0, 15.0), SliceRoom::new(40.0, 15.0));
        assert_eq!(s.pagination.total_pages, 2);
        assert!(s.lines[1].is_empty());
        assert_eq!(s.pagination.pages[1].content_height_mm, 0.0);
    }

    #[test]
    fn empty_body_is_one_page() {
        let s = slice_lines(&[], room(140.0), room(200.0));
        assert_eq!(s.pagination.total_pages, 1);
        assert_eq!(s.pagination.pages[0].content_height_mm, 140.0);
    }

    #[test]
    fn decisions() {
        assert_eq!(decide_break(10.0, 5.0, false, false), BreakDecision::Place);
        assert_eq!(decide_break(4.0, 5.0, false, false), BreakDecision::MoveToNextPage);
        assert_eq!(decide_break(4.0, 5.0, true, false), BreakDecision::Place);
        assert_eq!(decide_break(4.0, 5.0, false, true), BreakDecision::Place);
    }
}
