use serde::{Deserialize, Serialize};

/// Latest price and 52-week statistics for a ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub price: f64,
    pub low_52k: f64,
    pub high_52k: f64,
    pub avg_52k: f64,
}

impl Quote {
    /// Position of the current price inside the 52-week range (0.0 - 1.0).
    pub fn range_position(&self) -> Option<f64> {
        let span = self.high_52k - self.low_52k;
        if span <= 0.0 || !span.is_finite() {
            return None;
        }
        Some(((self.price - self.low_52k) / span).clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_deserialize() {
        let json = r#"{"price":38.5,"low_52k":30.0,"high_52k":40.0,"avg_52k":35.2}"#;
        let quote: Quote = serde_json::from_str(json).unwrap();
        assert_eq!(quote.price, 38.5);
        assert_eq!(quote.range_position(), Some(0.85));
    }

    #[test]
    fn test_range_position_degenerate() {
        let quote = Quote {
            price: 10.0,
            low_52k: 10.0,
            high_52k: 10.0,
            avg_52k: 10.0,
        };
        assert_eq!(quote.range_position(), None);
    }
}
