//! Scores a handful of synthetic series with each trend method.
//!
//! Run with `RUST_LOG=debug` to see the estimator logs.

use incline::{trending, Aggregation, Estimator, SgolayConfig, SplineConfig, TimeSeriesTable};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let series: Vec<(&str, Vec<f64>)> = vec![
        ("accelerating", (0..30).map(|i| 0.02 * (i as f64).powi(2)).collect()),
        ("flat", (0..30).map(|i| 5.0 + 0.1 * (i as f64 * 1.3).sin()).collect()),
        ("peaked", (0..30).map(|i| (i as f64 * 0.15).sin() * 10.0).collect()),
    ];

    let estimators = [
        Estimator::Naive,
        Estimator::Spline(SplineConfig::default()),
        Estimator::Sgolay(SgolayConfig::default().with_window_length(9)),
    ];

    for estimator in &estimators {
        let mut trends = Vec::with_capacity(series.len());
        for (id, values) in &series {
            let table = TimeSeriesTable::from_values(values.clone()).with_id(*id);
            trends.push(estimator.estimate(&table, "value")?);
        }

        println!("=== {} ===", estimator.method());
        for aggregation in [Aggregation::Max, Aggregation::Avg] {
            println!("  {aggregation} of last 5 first derivatives:");
            for score in trending(&trends, 1, aggregation, 5)? {
                println!("    {:<14}{:8.3}", score.id, score.max_or_avg);
            }
        }
    }

    Ok(())
}
