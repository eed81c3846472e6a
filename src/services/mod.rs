// Accounts and principals
pub mod account;
pub mod customers;

// Catalog and booking lifecycle
pub mod bookings;
pub mod catalog;
pub mod meetings;
pub mod payments;

// Generated artefacts
pub mod documents;
pub mod reports;

pub(crate) const DEFAULT_PAGE_SIZE: u64 = 20;
pub(crate) const MAX_PAGE_SIZE: u64 = 100;

/// Normalises 1-based paging input into `(page, limit)`.
pub(crate) fn page_bounds(page: Option<u64>, limit: Option<u64>) -> (u64, u64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    (page, limit)
}

/// Trims optional free text and drops it when blank.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paging_defaults_and_clamps() {
        assert_eq!(page_bounds(None, None), (1, DEFAULT_PAGE_SIZE));
        assert_eq!(page_bounds(Some(0), Some(0)), (1, 1));
        assert_eq!(page_bounds(Some(3), Some(500)), (3, MAX_PAGE_SIZE));
    }

    #[test]
    fn blank_text_is_dropped() {
        assert_eq!(non_blank(Some("  ".into())), None);
        assert_eq!(non_blank(Some(" catatan ".into())), Some("catatan".into()));
        assert_eq!(non_blank(None), None);
    }
}
