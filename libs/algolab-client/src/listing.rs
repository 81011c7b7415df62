/// Problem list filtering and pagination
///
/// Pure functions over an already-fetched list: filter first, then cut
/// the requested page. Page numbers are 1-based and clamped into range,
/// so an out-of-range page shows the last page instead of nothing.

use algolab_common::types::{Difficulty, ProblemSummary};

pub const DEFAULT_PER_PAGE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub per_page: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based, after clamping
    pub page: usize,
    pub per_page: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// 1-based index of the first item on this page, 0 when empty
    pub fn first_item(&self) -> usize {
        if self.items.is_empty() {
            0
        } else {
            (self.page - 1) * self.per_page + 1
        }
    }
}

/// Number of pages needed for `total_items`; never less than one
pub fn total_pages(total_items: usize, per_page: usize) -> usize {
    let per_page = per_page.max(1);
    total_items.div_ceil(per_page).max(1)
}

pub fn paginate<T: Clone>(items: &[T], request: PageRequest) -> Page<T> {
    let per_page = request.per_page.max(1);
    let total_items = items.len();
    let total_pages = total_pages(total_items, per_page);
    let page = request.page.clamp(1, total_pages);

    let start = (page - 1) * per_page;
    let end = (start + per_page).min(total_items);
    let items = if start < end {
        items[start..end].to_vec()
    } else {
        Vec::new()
    };

    Page {
        items,
        page,
        per_page,
        total_items,
        total_pages,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProblemFilter {
    /// Case-insensitive substring of the title or slug
    pub search: Option<String>,
    pub difficulty: Option<Difficulty>,
    /// Case-insensitive exact tag
    pub tag: Option<String>,
}

impl ProblemFilter {
    pub fn matches(&self, problem: &ProblemSummary) -> bool {
        if let Some(difficulty) = self.difficulty {
            if problem.difficulty != difficulty {
                return false;
            }
        }

        if let Some(tag) = &self.tag {
            if !problem.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
                return false;
            }
        }

        match &self.search {
            Some(search) if !search.trim().is_empty() => {
                let needle = search.trim().to_lowercase();
                problem.title.to_lowercase().contains(&needle)
                    || problem.slug.to_lowercase().contains(&needle)
            }
            _ => true,
        }
    }

    pub fn apply(&self, problems: &[ProblemSummary]) -> Vec<ProblemSummary> {
        problems.iter().filter(|p| self.matches(p)).cloned().collect()
    }
}
