//! Shared pagination keyboard helper: fixed page size of 5 with
//! `(<, X/Y, >)` controls, page indices clamped to `[1, page_count]`.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

pub const PAGE_SIZE: i64 = 5;

pub fn page_count(total: i64) -> i64 {
    if total == 0 {
        1
    } else {
        (total + PAGE_SIZE - 1) / PAGE_SIZE
    }
}

pub fn clamp_page(page: i64, page_count: i64) -> i64 {
    page.clamp(1, page_count.max(1))
}

/// Builds the `(<, X/Y, >)` footer row for a callback prefix, e.g.
/// `trq:page:3`. The prev/next buttons are omitted at the respective
/// boundary rather than disabled, matching how Telegram inline keyboards
/// are conventionally built (a disabled-but-visible button isn't a thing
/// the Bot API supports).
pub fn pagination_row(prefix: &str, page: i64, total_pages: i64) -> Vec<InlineKeyboardButton> {
    let mut row = Vec::new();
    if page > 1 {
        row.push(InlineKeyboardButton::callback("<", format!("{prefix}:page:{}", page - 1)));
    }
    row.push(InlineKeyboardButton::callback(
        format!("{page}/{total_pages}"),
        format!("{prefix}:noop"),
    ));
    if page < total_pages {
        row.push(InlineKeyboardButton::callback(">", format!("{prefix}:page:{}", page + 1)));
    }
    row
}

pub fn keyboard_with_pagination(
    rows: Vec<Vec<InlineKeyboardButton>>,
    prefix: &str,
    page: i64,
    total_pages: i64,
) -> InlineKeyboardMarkup {
    let mut keyboard = rows;
    keyboard.push(pagination_row(prefix, page, total_pages));
    InlineKeyboardMarkup::new(keyboard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_rounds_up_to_full_pages_of_five() {
        assert_eq!(page_count(0), 1);
        assert_eq!(page_count(5), 1);
        assert_eq!(page_count(6), 2);
        assert_eq!(page_count(12), 3);
    }

    #[test]
    fn clamp_page_stays_within_bounds() {
        assert_eq!(clamp_page(0, 3), 1);
        assert_eq!(clamp_page(5, 3), 3);
        assert_eq!(clamp_page(2, 3), 2);
    }

    #[test]
    fn pagination_row_omits_prev_on_first_page() {
        let row = pagination_row("trq", 1, 3);
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn pagination_row_omits_next_on_last_page() {
        let row = pagination_row("trq", 3, 3);
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn pagination_row_shows_both_controls_in_the_middle() {
        let row = pagination_row("trq", 2, 3);
        assert_eq!(row.len(), 3);
    }
}
