use tsanalytics::*;

use std::sync::Arc;
use std::thread;

fn group(i: usize) -> GroupedSeries {
    let values: Vec<f64> = (0..20).map(|j| (i * j) as f64 - 50.0).collect();
    GroupedSeries::new(format!("series-{}", i), TimeSeries::from_values(&values))
}

#[test]
fn test_functions_write_disjoint_keys_from_many_threads() {
    let registry = FunctionRegistry::metric();
    let ctx = Arc::new(FunctionContext::with_shards(4));
    let groups: Arc<Vec<GroupedSeries>> = Arc::new((0..64).map(group).collect());

    let mut handles = Vec::new();
    for name in ["max", "range", "count", "last"] {
        let function = registry.resolve(name, &[]).unwrap().unwrap();
        // Two threads per function over disjoint halves of the batch
        for half in 0..2 {
            let function: Arc<dyn Function> = Arc::from(function.kind().build(&[]).unwrap());
            let ctx = Arc::clone(&ctx);
            let groups = Arc::clone(&groups);
            handles.push(thread::spawn(move || {
                let (lo, hi) = if half == 0 { (0, 32) } else { (32, 64) };
                function.execute(&groups[lo..hi], &ctx);
            }));
        }
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(ctx.len(), 4 * 64);

    let max = registry.resolve("max", &[]).unwrap().unwrap().id();
    let range = registry.resolve("range", &[]).unwrap().unwrap().id();
    let key = JoinKey::from("series-3");
    // series-3 values: -50, -47, ..., 7
    assert_eq!(ctx.aggregation(&max, &key), Some(7.0));
    assert_eq!(ctx.aggregation(&range, &key), Some(57.0));

    // series-0 is constant at -50: the true maximum, not the 0 fallback
    assert_eq!(ctx.aggregation(&max, &JoinKey::from("series-0")), Some(-50.0));
}
