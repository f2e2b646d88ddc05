//! Header-keyword table classification.
//!
//! Labels a table as holdings, investment transactions, or cash
//! transactions from the words in its header row. Rules are checked in
//! order and the first match wins; matching is a case-insensitive substring
//! search over all headers joined with spaces.

use statement_tables_table_models::TableLabel;

/// Holdings tables are expected to have fewer rows than this.
///
/// Holdings and investment-transaction headers share keywords (`shares`,
/// `price`); the row count is the only thing that separates them. The value
/// is carried over unchanged from the statements this was tuned against.
pub const HOLDINGS_MAX_ROWS: usize = 20;

const HOLDINGS_KEYWORDS: &[&str] = &[
    "units",
    "shares",
    "position",
    "security",
    "market value",
    "book value",
    "price",
];

const INVESTMENT_KEYWORDS: &[&str] = &[
    "shares",
    "units/shares",
    "price",
    "gross amt",
    "dividend",
    "interest",
    "security purchase",
];

const CASH_KEYWORDS: &[&str] = &["debit", "credit", "balance", "fee", "transfer"];

/// Assigns a [`TableLabel`] from a table's headers and data row count.
///
/// Always returns a label; [`TableLabel::Unknown`] when nothing matches.
#[must_use]
pub fn classify_table<S: AsRef<str>>(headers: &[S], row_count: usize) -> TableLabel {
    let haystack = headers
        .iter()
        .map(|h| h.as_ref().to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    if contains_any(&haystack, HOLDINGS_KEYWORDS) && row_count < HOLDINGS_MAX_ROWS {
        return TableLabel::Holdings;
    }
    if contains_any(&haystack, INVESTMENT_KEYWORDS) {
        return TableLabel::InvestmentTransactions;
    }
    if contains_any(&haystack, CASH_KEYWORDS) {
        return TableLabel::CashTransactions;
    }

    TableLabel::Unknown
}

/// Returns `true` if `haystack` contains any of the given `needles`.
fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn cash_headers() {
        assert_eq!(
            classify_table(&["Debit", "Credit", "Balance"], 10),
            TableLabel::CashTransactions
        );
    }

    #[test]
    fn holdings_need_few_rows() {
        let headers = ["Security", "Market Value"];
        assert_eq!(classify_table(&headers, 5), TableLabel::Holdings);
        assert_eq!(classify_table(&headers, 19), TableLabel::Holdings);
        assert_eq!(classify_table(&headers, 20), TableLabel::Unknown);
    }

    #[test]
    fn long_holdings_fall_through_to_investment_keywords() {
        let headers = ["Market Value", "Dividend"];
        assert_eq!(classify_table(&headers, 5), TableLabel::Holdings);
        assert_eq!(
            classify_table(&headers, 25),
            TableLabel::InvestmentTransactions
        );
    }

    #[test]
    fn long_holdings_fall_through_to_cash_keywords() {
        assert_eq!(
            classify_table(&["Position", "Balance"], 40),
            TableLabel::CashTransactions
        );
    }

    #[test]
    fn investment_keywords_without_holdings_keywords() {
        assert_eq!(
            classify_table(&["Date", "Gross Amt", "Net"], 3),
            TableLabel::InvestmentTransactions
        );
        assert_eq!(
            classify_table(&["Date", "INTEREST"], 50),
            TableLabel::InvestmentTransactions
        );
    }

    #[test]
    fn keywords_match_across_header_boundaries() {
        // Joined headers read "market value" even though no single header does.
        assert_eq!(
            classify_table(&["Market", "Value"], 2),
            TableLabel::Holdings
        );
    }

    #[test]
    fn substrings_match() {
        // "fees" contains "fee"; "prices" contains "price".
        assert_eq!(classify_table(&["Fees"], 1), TableLabel::CashTransactions);
        assert_eq!(classify_table(&["Prices"], 30), TableLabel::InvestmentTransactions);
    }

    #[test]
    fn no_keywords_is_unknown() {
        assert_eq!(classify_table(&["Date", "Description"], 4), TableLabel::Unknown);
        assert_eq!(classify_table::<&str>(&[], 0), TableLabel::Unknown);
    }

    proptest! {
        #[test]
        fn total_and_deterministic(
            headers in prop::collection::vec("[A-Za-z /]{0,16}", 0..6),
            rows in 0usize..60,
        ) {
            let first = classify_table(&headers, rows);
            prop_assert!(TableLabel::all().contains(&first));
            prop_assert_eq!(first, classify_table(&headers, rows));
        }

        #[test]
        fn case_insensitive(
            headers in prop::collection::vec("[A-Za-z /]{0,16}", 0..6),
            rows in 0usize..60,
        ) {
            let upper: Vec<String> = headers.iter().map(|h| h.to_uppercase()).collect();
            prop_assert_eq!(classify_table(&headers, rows), classify_table(&upper, rows));
        }
    }
}
