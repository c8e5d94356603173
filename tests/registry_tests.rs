use tsanalytics::*;

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

fn hash_of(id: &FunctionId) -> u64 {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    hasher.finish()
}

fn resolve(name: &str) -> Box<dyn Function> {
    FunctionRegistry::metric()
        .resolve(name, &[])
        .expect("valid arguments")
        .expect("known function")
}

#[test]
fn test_resolve_returns_matching_query_name() {
    assert_eq!(resolve("max").query_name(), "max");
    assert_eq!(resolve("range").query_name(), "range");
}

#[test]
fn test_resolve_unknown_is_none() {
    let registry = FunctionRegistry::metric();
    assert!(registry.resolve("doesnotexist", &[]).unwrap().is_none());
    assert!(registry.resolve("doesnotexist", &["1", "2"]).unwrap().is_none());
    assert!(registry.lookup("topmetrics").is_none());
}

#[test]
fn test_equal_kinds_hash_identically() {
    let a = resolve("max");
    let b = resolve("max");
    assert_eq!(a.id(), b.id());
    assert_eq!(hash_of(&a.id()), hash_of(&b.id()));

    let ids: HashSet<FunctionId> = ["max", "max", "range", "range", "avg"]
        .iter()
        .map(|name| resolve(name).id())
        .collect();
    assert_eq!(ids.len(), 3);
}

#[test]
fn test_different_kinds_are_never_equal() {
    let registry = FunctionRegistry::metric();
    let no_arg: Vec<Box<dyn Function>> = FunctionKind::ALL
        .iter()
        .filter_map(|kind| registry.resolve(kind.query_name(), &[]).ok().flatten())
        .collect();
    assert!(no_arg.len() >= 15);

    for (i, a) in no_arg.iter().enumerate() {
        for (j, b) in no_arg.iter().enumerate() {
            assert_eq!(i == j, a.id() == b.id(), "{} vs {}", a.query_name(), b.query_name());
        }
    }
}

#[test]
fn test_categories() {
    assert_eq!(resolve("range").category(), FunctionCategory::Aggregation);
    assert_eq!(resolve("derivative").category(), FunctionCategory::Transformation);
    assert_eq!(resolve("outlier").category(), FunctionCategory::Analysis);

    for kind in FunctionKind::ALL {
        assert_eq!(FunctionRegistry::metric().lookup(kind.query_name()), Some(kind));
    }
}

#[test]
fn test_argument_tokens_are_trimmed() {
    let registry = FunctionRegistry::metric();
    let movavg = registry.resolve("movavg", &[" 5", "minutes "]).unwrap().unwrap();
    assert_eq!(movavg.id().to_string(), "movavg:5,MINUTES");
    assert_eq!(
        movavg.arguments(),
        vec![Argument::Integer(5), Argument::Unit(TimeUnit::Minutes)]
    );
}
