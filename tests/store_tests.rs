use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tradelux::config::DataConfig;
use tradelux::refresh::{load_store, reload};
use tradelux::store::{load_symbol_table, SharedStore, Table};

fn temp_csv(test_name: &str, body: &str) -> PathBuf {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be monotonic")
        .as_nanos();
    let path = std::env::temp_dir().join(format!("tl-{}-{}.csv", test_name, ts));
    std::fs::write(&path, body).expect("temp csv should be writable");
    path
}

const PRICES: &str = "\
date,Open,High,Low,Close,Volume,symbol
2024-01-02,187.1,188.4,183.9,185.6,82488700,AAPL
2024-01-03,184.2,185.9,183.4,184.3,58414500,AAPL
2024-01-02,42280.2,45899.7,42214.9,44943.3,35000000000,BTC-USD
";

const FEATURES: &str = "\
date,Open,High,Low,Close,Volume,symbol,volatility_10,daily_return,overnight_gap
2024-01-03,184.2,185.9,183.4,184.3,58414500,AAPL,0.0121,-0.0070,-0.0075
";

#[test]
fn load_store_reads_both_tables() {
    let cfg = DataConfig {
        prices_csv: temp_csv("store-prices", PRICES),
        features_csv: Some(temp_csv("store-features", FEATURES)),
        refresh_interval: "5m".to_string(),
    };
    let store = load_store(&cfg).expect("store should load");
    assert_eq!(store.available_symbols(), vec!["AAPL", "BTC-USD"]);
    assert_eq!(store.series(Table::Prices, "AAPL").map(|s| s.len()), Some(2));
    let features = store
        .series(Table::Features, "AAPL")
        .expect("features series should exist");
    assert_eq!(features.points()[0].feature("overnight_gap"), Some(-0.0075));
    assert!(store.series(Table::Features, "BTC-USD").is_none());
}

#[test]
fn load_symbol_table_reports_missing_file() {
    let missing = std::env::temp_dir().join("tl-missing-table.csv");
    assert!(load_symbol_table("prices", &missing, None).is_err());
}

#[test]
fn load_symbol_table_uses_default_symbol_without_symbol_column() {
    let path = temp_csv(
        "store-single",
        "Date,Open,High,Low,Close\n2024-01-02,1,2,0.5,1.5\n",
    );
    let table = load_symbol_table("prices", &path, Some("nvda")).expect("table should load");
    assert_eq!(table.symbols(), vec!["NVDA"]);
}

#[test]
/// Readers holding a snapshot keep seeing it after a reload swaps in a new store.
fn reload_swaps_whole_store_atomically() {
    let first = temp_csv("store-reload-a", PRICES);
    let mut cfg = DataConfig {
        prices_csv: first,
        features_csv: None,
        refresh_interval: "1m".to_string(),
    };
    let shared = Arc::new(SharedStore::new(load_store(&cfg).unwrap()));
    let held = shared.snapshot();

    cfg.prices_csv = temp_csv(
        "store-reload-b",
        "date,Open,High,Low,Close,symbol\n2024-02-01,1,1,1,1,TSLA\n",
    );
    reload(&shared, &cfg).expect("reload should succeed");

    assert_eq!(held.available_symbols(), vec!["AAPL", "BTC-USD"]);
    assert_eq!(shared.snapshot().available_symbols(), vec!["TSLA"]);
}
