use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

///
/// Identifies the chain a raw block belongs to.
///
/// Whether a block may carry an AuxPOW envelope is decided once
/// here, by `supports_merged_mining`, not by comparing symbols.
///
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    symbol: Cow<'static, str>,
    supports_merged_mining: bool,
}

impl Chain {
    pub fn new<S: Into<Cow<'static, str>>>(symbol: S, supports_merged_mining: bool) -> Chain {
        Chain {
            symbol: symbol.into(),
            supports_merged_mining,
        }
    }

    pub fn bitcoin() -> Chain {
        Chain::new("btc", false)
    }

    pub fn bitcoin_testnet() -> Chain {
        Chain::new("tbtc", false)
    }

    pub fn litecoin() -> Chain {
        Chain::new("ltc", false)
    }

    /// merge-mined with litecoin since block 371337
    pub fn dogecoin() -> Chain {
        Chain::new("doge", true)
    }

    #[inline]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[inline]
    pub fn supports_merged_mining(&self) -> bool {
        self.supports_merged_mining
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert!(Chain::dogecoin().supports_merged_mining());
        assert!(!Chain::bitcoin().supports_merged_mining());
        assert_eq!(Chain::litecoin().symbol(), "ltc");
        let custom = Chain::new(String::from("nmc"), true);
        assert_eq!(custom.to_string(), "nmc");
        assert!(custom.supports_merged_mining());
    }
}
