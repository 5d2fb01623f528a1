use unicode_normalization::UnicodeNormalization;

use crate::document::Row;

const COMBINING_MARKS: std::ops::RangeInclusive<char> = '\u{0300}'..='\u{036f}';

/// Normalizes text for substring search.
///
/// Lowercases, decomposes (NFD), drops combining diacritical marks and trims,
/// so "  Beyoncé " and "BEYONCE" both become "beyonce".
pub fn normalize_search(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|c| !COMBINING_MARKS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Folds text to lowercase ascii: compatibility decomposition (NFKD), then
/// everything that is not ascii is dropped.
pub fn fold_to_ascii(text: &str) -> String {
    text.nfkd()
        .filter(char::is_ascii)
        .collect::<String>()
        .to_lowercase()
}

/// Shows or hides every row that carries a search key. Rows without a key are
/// left untouched. Returns the number of rows that were evaluated.
pub fn filter_rows(rows: &mut [Row], query: &str) -> usize {
    let term = normalize_search(query);
    let mut evaluated = 0;
    for row in rows.iter_mut() {
        if let Some(key) = row.search_key.as_deref() {
            row.hidden = !normalize_search(key).contains(&term);
            evaluated += 1;
        }
    }
    evaluated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: Option<&str>) -> Row {
        let mut row = Row::new(vec![("Song", "x")]);
        row.search_key = key.map(str::to_string);
        row
    }

    fn visible(rows: &[Row]) -> Vec<bool> {
        rows.iter().map(|r| !r.hidden).collect()
    }

    #[test]
    fn normalize_strips_case_accents_and_whitespace() {
        assert_eq!(normalize_search("  Beyoncé "), "beyonce");
        assert_eq!(normalize_search("MOTÖRHEAD"), "motorhead");
        assert_eq!(normalize_search("Sigur Rós"), "sigur ros");
        assert_eq!(normalize_search(""), "");
    }

    #[test]
    fn fold_drops_non_ascii() {
        assert_eq!(fold_to_ascii("Café del Mar"), "cafe del mar");
        assert_eq!(fold_to_ascii("Ｆｕｌｌ"), "full");
        assert_eq!(fold_to_ascii("東京 Tokyo"), " tokyo");
    }

    #[test]
    fn filter_matches_substrings_accent_insensitive() {
        let mut rows = vec![
            row(Some("beyonce halo")),
            row(Some("adele hello")),
            row(Some("cafe tacvba eres")),
        ];
        filter_rows(&mut rows, "Hé");
        assert_eq!(visible(&rows), vec![false, true, false]);

        filter_rows(&mut rows, "  CAFÉ ");
        assert_eq!(visible(&rows), vec![false, false, true]);
    }

    #[test]
    fn empty_query_shows_everything() {
        let mut rows = vec![row(Some("a")), row(Some("b"))];
        filter_rows(&mut rows, "zzz");
        assert_eq!(visible(&rows), vec![false, false]);
        filter_rows(&mut rows, "");
        assert_eq!(visible(&rows), vec![true, true]);
    }

    #[test]
    fn rows_without_key_keep_their_state() {
        let mut rows = vec![row(None), row(None), row(Some("abba"))];
        rows[1].hidden = true;
        let evaluated = filter_rows(&mut rows, "queen");
        assert_eq!(evaluated, 1);
        assert_eq!(visible(&rows), vec![true, false, false]);
    }

    #[test]
    fn filtering_is_idempotent() {
        let mut rows = vec![row(Some("queen")), row(Some("abba")), row(Some("quiet riot"))];
        filter_rows(&mut rows, "qu");
        let first = visible(&rows);
        filter_rows(&mut rows, "qu");
        assert_eq!(first, visible(&rows));
        assert_eq!(first, vec![true, false, true]);
    }
}
