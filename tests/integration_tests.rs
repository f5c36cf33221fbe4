use approx::assert_abs_diff_eq;
use incline::{
    naive_trend, sgolay_trend, spline_trend, trending, Aggregation, DerivativeMethod, Estimator,
    SgolayConfig, SplineConfig, TimeSeriesTable, TrendError, TrendTable,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn dated(values: &[f64]) -> TimeSeriesTable {
    let index = (0..values.len()).map(|i| format!("2024-01-{:02}", i + 1)).collect();
    TimeSeriesTable::new(index)
        .with_column("value", values.to_vec())
        .unwrap()
}

fn noisy_wave(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let x = i as f64 * 0.2;
            x.sin() + 0.05 * (i as f64 * 2.3).sin()
        })
        .collect()
}

#[test]
fn test_estimators_preserve_rows_and_index() {
    init_logging();
    let table = dated(&noisy_wave(40));

    let trends: Vec<TrendTable> = vec![
        naive_trend(&table, "value").unwrap(),
        spline_trend(&table, "value", 3, 1, 3.0).unwrap(),
        sgolay_trend(&table, "value", 3, 1, 15).unwrap(),
    ];

    for trend in &trends {
        assert_eq!(trend.len(), table.len());
        assert_eq!(trend.index(), table.index());
        assert_eq!(trend.source(), &table);
        if let Some(smoothed) = trend.smoothed_value() {
            assert_eq!(smoothed.len(), table.len());
        }
    }
}

#[test]
fn test_tags_follow_arguments() {
    let table = dated(&noisy_wave(30));

    let spline = spline_trend(&table, "value", 4, 2, 1.0).unwrap();
    assert_eq!(spline.derivative_method(), DerivativeMethod::Spline);
    assert_eq!(spline.function_order(), Some(4));
    assert_eq!(spline.derivative_order(), 2);

    let sgolay = sgolay_trend(&table, "value", 2, 0, 9).unwrap();
    assert_eq!(sgolay.derivative_method(), DerivativeMethod::Sgolay);
    assert_eq!(sgolay.function_order(), Some(2));
    assert_eq!(sgolay.derivative_order(), 0);
    // Derivative order 0 is the smoothed signal itself
    assert_eq!(sgolay.derivative_value(), sgolay.smoothed_value().unwrap());
}

#[test]
fn test_spline_is_deterministic() {
    let table = dated(&noisy_wave(50));
    let first = spline_trend(&table, "value", 3, 1, 0.05).unwrap();
    let second = spline_trend(&table, "value", 3, 1, 0.05).unwrap();
    assert_eq!(first.smoothed_value(), second.smoothed_value());
    assert_eq!(first.derivative_value(), second.derivative_value());
}

#[test]
fn test_smoothed_derivatives_track_the_signal() {
    let values = noisy_wave(60);
    let table = dated(&values);

    let spline = spline_trend(&table, "value", 3, 1, 0.1).unwrap();
    let sgolay = sgolay_trend(&table, "value", 3, 1, 11).unwrap();

    // d/di sin(0.2 i) = 0.2 cos(0.2 i); compare away from the edges
    for i in 10..50 {
        let expected = 0.2 * (i as f64 * 0.2).cos();
        assert_abs_diff_eq!(spline.derivative_value()[i], expected, epsilon = 0.05);
        assert_abs_diff_eq!(sgolay.derivative_value()[i], expected, epsilon = 0.05);
    }
}

#[test]
fn test_ranking_rising_and_falling_series() {
    init_logging();
    let a = TimeSeriesTable::from_values(vec![1.0, 2.0, 3.0, 4.0, 5.0]).with_id("A");
    let b = TimeSeriesTable::from_values(vec![5.0, 4.0, 3.0, 2.0, 1.0]).with_id("B");
    let trends = vec![
        naive_trend(&a, "value").unwrap(),
        naive_trend(&b, "value").unwrap(),
    ];

    let ranking = trending(&trends, 1, Aggregation::Max, 2).unwrap();
    assert_eq!(ranking.len(), 2);
    assert_eq!(ranking[0].id, "A");
    assert_abs_diff_eq!(ranking[0].max_or_avg, 1.0);
    assert_eq!(ranking[1].id, "B");
    assert_abs_diff_eq!(ranking[1].max_or_avg, -1.0);
}

#[test]
fn test_ranking_one_row_per_id() {
    let series = [
        ("steady", vec![1.0; 20]),
        ("climb", (0..20).map(|i| (i * i) as f64).collect()),
        ("fall", (0..20).map(|i| -2.0 * i as f64).collect()),
    ];
    let estimator = Estimator::Sgolay(SgolayConfig::default().with_window_length(7));
    let mut trends = Vec::new();
    for (id, values) in &series {
        let table = TimeSeriesTable::from_values(values.clone()).with_id(*id);
        trends.push(estimator.estimate(&table, "value").unwrap());
    }
    // A second window of the same series pools with the first
    let extra = TimeSeriesTable::from_values(vec![0.0; 10]).with_id("steady");
    trends.push(estimator.estimate(&extra, "value").unwrap());

    let ranking = trending(&trends, 1, Aggregation::Avg, 5).unwrap();
    let ids: Vec<&str> = ranking.iter().map(|score| score.id.as_str()).collect();
    assert_eq!(ids, vec!["climb", "steady", "fall"]);
    assert_abs_diff_eq!(ranking[0].max_or_avg, 34.0, epsilon = 1e-6);
    assert_abs_diff_eq!(ranking[1].max_or_avg, 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(ranking[2].max_or_avg, -2.0, epsilon = 1e-9);
}

#[test]
fn test_ranking_across_methods_uses_derivative_order() {
    let values = noisy_wave(30);
    let table = TimeSeriesTable::from_values(values).with_id("wave");
    let trends = vec![
        Estimator::Spline(SplineConfig::default().with_derivative_order(2))
            .estimate(&table, "value")
            .unwrap(),
        naive_trend(&table, "value").unwrap(),
    ];

    let first = trending(&trends, 1, Aggregation::Max, 3).unwrap();
    let naive_tail = &trends[1].derivative_value()[27..];
    let expected = naive_tail.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    assert_eq!(first.len(), 1);
    assert_abs_diff_eq!(first[0].max_or_avg, expected);

    assert!(trending(&trends, 3, Aggregation::Max, 3).unwrap().is_empty());
}

#[test]
fn test_sgolay_fails_when_window_exceeds_series() {
    let table = dated(&[1.0, 2.0, 3.0, 4.0, 5.0]);
    assert_eq!(
        sgolay_trend(&table, "value", 3, 1, 15).unwrap_err(),
        TrendError::InsufficientData { found: 5, required: 15 }
    );
}

#[test]
fn test_spline_errors_propagate() {
    let table = dated(&[1.0, 2.0, 3.0]);
    assert!(matches!(
        spline_trend(&table, "value", 3, 1, 3.0),
        Err(TrendError::InsufficientData { .. })
    ));
    let table = dated(&noisy_wave(10));
    assert!(matches!(
        spline_trend(&table, "value", 2, 3, 3.0),
        Err(TrendError::InvalidDerivativeOrder { .. })
    ));
    assert!(matches!(
        spline_trend(&table, "missing", 3, 1, 3.0),
        Err(TrendError::ColumnNotFound(_))
    ));
}

#[test]
fn test_trend_table_serializes() {
    let table = TimeSeriesTable::from_values(vec![1.0, 3.0, 5.0]).with_id("A");
    let trend = naive_trend(&table, "value").unwrap();
    let json = serde_json::to_value(&trend).unwrap();
    assert_eq!(json["derivative_method"], "naive");
    assert_eq!(json["derivative_order"], 1);
    assert!(json["function_order"].is_null());

    let back: TrendTable = serde_json::from_value(json).unwrap();
    assert_eq!(back, trend);
}

#[test]
fn test_single_row_trend_serializes_nan_as_null() {
    let table = TimeSeriesTable::from_values(vec![4.0]).with_id("lonely");
    let trend = naive_trend(&table, "value").unwrap();
    assert!(trend.derivative_value()[0].is_nan());

    let json = serde_json::to_string(&trend).unwrap();
    let back: TrendTable = serde_json::from_str(&json).unwrap();
    assert_eq!(back.len(), 1);
    assert!(back.derivative_value()[0].is_nan());
    assert_eq!(back.source(), trend.source());

    let ranking = trending(&[back], 1, Aggregation::Max, 5).unwrap();
    assert_eq!(ranking[0].id, "lonely");
    assert!(ranking[0].max_or_avg.is_nan());
}
