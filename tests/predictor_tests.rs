use tradelux::error::AppError;
use tradelux::model::Signal;
use tradelux::predictor::{
    backtest_predictions, derive_signal, recommend, EwmaReturnPredictor, PredictorModel,
    SignalConfig, PREDICTOR_R2_MIN_SAMPLES,
};

#[test]
fn sign_decides_signal_and_magnitude_scales_confidence() {
    let cfg = SignalConfig::default();
    let (signal, conf) = derive_signal(0.0123, &cfg);
    assert_eq!(signal, Signal::Buy);
    assert!((conf - 12.3).abs() < 1e-9);

    let (signal, conf) = derive_signal(-0.004, &cfg);
    assert_eq!(signal, Signal::Sell);
    assert!((conf - 4.0).abs() < 1e-9);
}

#[test]
fn threshold_and_scale_are_configurable() {
    let cfg = SignalConfig {
        buy_threshold: 0.01,
        confidence_scale: 100.0,
        ..SignalConfig::default()
    };
    let (signal, conf) = derive_signal(0.005, &cfg);
    assert_eq!(signal, Signal::Sell);
    assert!((conf - 0.5).abs() < 1e-9);
}

#[test]
fn non_finite_prediction_is_treated_as_zero() {
    let (signal, conf) = derive_signal(f64::NAN, &SignalConfig::default());
    assert_eq!(signal, Signal::Sell);
    assert_eq!(conf, 0.0);
}

#[tokio::test]
async fn recommend_uses_trailing_window() {
    let model = PredictorModel::Ewma(EwmaReturnPredictor::new(0.3));
    let cfg = SignalConfig {
        window_len: 5,
        ..SignalConfig::default()
    };
    // Falling history, rising trailing window.
    let closes = [200.0, 150.0, 100.0, 101.0, 102.0, 103.0, 104.0];
    let rec = recommend(&model, &cfg, "AAPL", 0, &closes, Some(7))
        .await
        .expect("enough history");
    assert_eq!(rec.signal, Signal::Buy);
    assert!(rec.confidence_pct > 0.0);
    assert_eq!(rec.model, "ewma-return-v1");
    assert_eq!(rec.as_of_ms, Some(7));
}

#[tokio::test]
async fn recommend_reports_insufficient_history() {
    let model = PredictorModel::Ewma(EwmaReturnPredictor::default());
    let err = recommend(&model, &SignalConfig::default(), "AAPL", 0, &[1.0, 2.0], None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::InsufficientHistory { have: 2, need: 60, .. }
    ));
}

#[test]
fn backtest_on_steady_trend_hits_every_step() {
    let closes: Vec<f64> = (0..200).map(|i| 100.0 * 1.001_f64.powi(i)).collect();
    let metrics = backtest_predictions(&closes, &EwmaReturnPredictor::default(), 20, 1_000);
    assert_eq!(metrics.sample_count(), 180);
    assert_eq!(metrics.hit_rate(), Some(1.0));
    assert!(metrics.mae().unwrap() < 1e-9);
    assert!(metrics.sample_count() as usize >= PREDICTOR_R2_MIN_SAMPLES);
    assert!(metrics.r2().is_some());
}

#[test]
fn performance_is_only_replayed_for_local_models() {
    let model = PredictorModel::Ewma(EwmaReturnPredictor::default());
    let closes: Vec<f64> = (0..10).map(|i| 10.0 + i as f64).collect();
    let perf = model.performance(&closes, 5).expect("local model replays");
    assert_eq!(perf.samples, 5);
    assert!(perf.r2.is_none());
}
