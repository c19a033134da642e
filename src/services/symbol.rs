//! Currency ticker normalization.
//!
//! Transactions carry tickers the way the marketplace contract reports them
//! ("usdc.e", "WETH", "matic"). Price lookups need one canonical spelling.

/// Tickers whose canonical form is not the part before the first period.
/// Every target must itself be a fixed point of [`normalize_symbol`].
const SYMBOL_ALIASES: &[(&str, &str)] = &[
    ("WETH", "ETH"),
    ("WMATIC", "MATIC"),
    ("WBTC", "BTC"),
];

/// Map a raw ticker to its canonical form.
///
/// Uppercases, truncates at the first `.` (bridged variants such as
/// `USDC.E`), then applies [`SYMBOL_ALIASES`]. Idempotent.
pub fn normalize_symbol(symbol: &str) -> String {
    let upper = symbol.to_uppercase();
    let base = match upper.find('.') {
        Some(idx) => &upper[..idx],
        None => upper.as_str(),
    };

    SYMBOL_ALIASES
        .iter()
        .find(|(alias, _)| *alias == base)
        .map(|(_, canonical)| (*canonical).to_string())
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uppercases() {
        assert_eq!(normalize_symbol("matic"), "MATIC");
        assert_eq!(normalize_symbol("Sfl"), "SFL");
    }

    #[test]
    fn test_truncates_bridged_suffix() {
        assert_eq!(normalize_symbol("USDC.E"), "USDC");
        assert_eq!(normalize_symbol("usdc.e"), "USDC");
        assert_eq!(normalize_symbol("DAI.b.c"), "DAI");
    }

    #[test]
    fn test_applies_aliases() {
        assert_eq!(normalize_symbol("WETH"), "ETH");
        assert_eq!(normalize_symbol("weth.e"), "ETH");
        assert_eq!(normalize_symbol("WMATIC"), "MATIC");
    }

    #[test]
    fn test_edge_inputs() {
        assert_eq!(normalize_symbol(""), "");
        assert_eq!(normalize_symbol("."), "");
        assert_eq!(normalize_symbol(".E"), "");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "", ".", "usdc.e", "USDC", "weth", "WETH.E", "wmatic", "ß", "straße.x", "ǆ", "ﬁ",
            "  sfl ", "eth..", "İ",
        ];

        for input in inputs {
            let once = normalize_symbol(input);
            assert_eq!(normalize_symbol(&once), once, "not idempotent for {:?}", input);
        }
    }

    #[test]
    fn test_alias_targets_are_fixed_points() {
        for (_, canonical) in SYMBOL_ALIASES {
            assert_eq!(normalize_symbol(canonical), *canonical);
        }
    }
}
