//! Immutable per-symbol tables and the shared handle that swaps them.

pub mod csv_table;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::model::Series;

pub use csv_table::{load_symbol_table, parse_symbol_table, parse_timestamp_ms};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Table {
    /// Cleaned OHLCV rows used for charting.
    Prices,
    /// Rows carrying the precomputed feature columns used for metrics.
    Features,
}

pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

/// All series of one logical table, keyed by normalized symbol.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    by_symbol: HashMap<String, Series>,
}

impl SymbolTable {
    pub fn from_series(series: impl IntoIterator<Item = Series>) -> Self {
        let by_symbol = series
            .into_iter()
            .map(|s| (normalize_symbol(s.symbol()), s))
            .collect();
        Self { by_symbol }
    }

    pub fn get(&self, symbol: &str) -> Option<&Series> {
        self.by_symbol.get(&normalize_symbol(symbol))
    }

    pub fn symbols(&self) -> Vec<String> {
        let mut out: Vec<String> = self.by_symbol.keys().cloned().collect();
        out.sort();
        out
    }

    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.by_symbol.values().map(Series::len).sum()
    }
}

/// Snapshot of every loaded table. Never mutated after construction; a
/// refresh builds a new store and swaps it in through [`SharedStore`].
#[derive(Debug, Clone, Default)]
pub struct SeriesStore {
    prices: SymbolTable,
    features: Option<SymbolTable>,
    loaded_at_ms: i64,
}

impl SeriesStore {
    pub fn new(prices: SymbolTable, features: Option<SymbolTable>, loaded_at_ms: i64) -> Self {
        Self {
            prices,
            features,
            loaded_at_ms,
        }
    }

    pub fn table(&self, table: Table) -> Option<&SymbolTable> {
        match table {
            Table::Prices => Some(&self.prices),
            Table::Features => self.features.as_ref(),
        }
    }

    pub fn series(&self, table: Table, symbol: &str) -> Option<&Series> {
        self.table(table).and_then(|t| t.get(symbol))
    }

    pub fn price_series(&self, symbol: &str) -> Option<&Series> {
        self.prices.get(symbol)
    }

    /// Series used for metrics: the features table when one is loaded,
    /// otherwise the price table.
    pub fn metrics_series(&self, symbol: &str) -> Option<&Series> {
        match &self.features {
            Some(features) => features.get(symbol),
            None => self.prices.get(symbol),
        }
    }

    pub fn has_features_table(&self) -> bool {
        self.features.is_some()
    }

    /// Sorted symbols of the price table.
    pub fn available_symbols(&self) -> Vec<String> {
        self.prices.symbols()
    }

    /// Categorical id handed to the prediction model: the symbol's index in
    /// the sorted symbol list.
    pub fn symbol_id(&self, symbol: &str) -> Option<usize> {
        let wanted = normalize_symbol(symbol);
        self.available_symbols().iter().position(|s| *s == wanted)
    }

    pub fn loaded_at_ms(&self) -> i64 {
        self.loaded_at_ms
    }
}

/// Process-wide handle to the current store.
#[derive(Debug, Default)]
pub struct SharedStore {
    current: RwLock<Arc<SeriesStore>>,
}

impl SharedStore {
    pub fn new(store: SeriesStore) -> Self {
        Self {
            current: RwLock::new(Arc::new(store)),
        }
    }

    /// Readers keep the returned snapshot for the whole request.
    pub fn snapshot(&self) -> Arc<SeriesStore> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Swaps in a fully built store and returns the previous one.
    pub fn replace(&self, store: SeriesStore) -> Arc<SeriesStore> {
        let next = Arc::new(store);
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *guard, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TimePoint;

    fn series(symbol: &str, closes: &[f64]) -> Series {
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, c)| TimePoint::from_close(i as i64, *c))
            .collect();
        Series::new(symbol, points).unwrap()
    }

    #[test]
    fn symbol_ids_follow_sorted_order() {
        let prices = SymbolTable::from_series(vec![
            series("TSLA", &[1.0]),
            series("AAPL", &[1.0]),
            series("BTC-USD", &[1.0]),
        ]);
        let store = SeriesStore::new(prices, None, 0);
        assert_eq!(store.available_symbols(), vec!["AAPL", "BTC-USD", "TSLA"]);
        assert_eq!(store.symbol_id("tsla"), Some(2));
        assert_eq!(store.symbol_id("ZZZZ"), None);
    }

    #[test]
    fn metrics_series_prefers_features_table() {
        let prices = SymbolTable::from_series(vec![series("AAPL", &[1.0, 2.0])]);
        let features = SymbolTable::from_series(vec![series("AAPL", &[3.0])]);
        let store = SeriesStore::new(prices.clone(), Some(features), 0);
        assert_eq!(store.metrics_series("AAPL").map(Series::len), Some(1));

        let no_features = SeriesStore::new(prices, None, 0);
        assert_eq!(no_features.metrics_series("AAPL").map(Series::len), Some(2));
    }

    #[test]
    fn replace_leaves_old_snapshot_intact() {
        let shared = SharedStore::new(SeriesStore::new(
            SymbolTable::from_series(vec![series("AAPL", &[1.0])]),
            None,
            1,
        ));
        let before = shared.snapshot();
        shared.replace(SeriesStore::new(SymbolTable::default(), None, 2));
        assert_eq!(before.available_symbols(), vec!["AAPL"]);
        assert_eq!(shared.snapshot().loaded_at_ms(), 2);
        assert!(shared.snapshot().available_symbols().is_empty());
    }
}
