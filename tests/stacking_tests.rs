use plotweave::core::{
    StackDatum, StackOrder, StackSeries, compute_stack_extent, compute_stack_offsets, domain_keys,
};
use serde_json::json;

fn series(values: &[(&str, f64)]) -> StackSeries {
    values
        .iter()
        .map(|(key, value)| StackDatum::new(*key, *value))
        .collect()
}

#[test]
fn offsets_accumulate_per_key_across_datasets() {
    let input = vec![
        series(&[("a", 1.0), ("b", 5.0)]),
        series(&[("a", 2.0), ("b", 1.0)]),
        series(&[("a", 3.0), ("b", 0.5)]),
    ];
    let offsets = compute_stack_offsets(&input, StackOrder::BottomUp);
    let at = |dataset: usize, key: &str| offsets[dataset].get(key).copied();

    assert_eq!(at(0, "a"), Some(0.0));
    assert_eq!(at(1, "a"), Some(1.0));
    assert_eq!(at(2, "a"), Some(3.0));
    assert_eq!(at(2, "b"), Some(6.0));
    assert_eq!(compute_stack_extent(&input, &offsets, None), (0.0, 6.5));
}

#[test]
fn negative_values_stack_downward_independently() {
    let input = vec![
        series(&[("a", 2.0)]),
        series(&[("a", -3.0)]),
        series(&[("a", 4.0)]),
        series(&[("a", -1.0)]),
    ];
    let offsets = compute_stack_offsets(&input, StackOrder::BottomUp);
    let stacked: Vec<f64> = offsets.iter().map(|o| o["a"]).collect();
    assert_eq!(stacked, vec![0.0, 0.0, 2.0, -3.0]);
    assert_eq!(compute_stack_extent(&input, &offsets, None), (-4.0, 6.0));
}

#[test]
fn top_down_order_puts_last_dataset_on_baseline() {
    let input = vec![series(&[("k", 1.0)]), series(&[("k", 2.0)])];
    let offsets = compute_stack_offsets(&input, StackOrder::TopDown);
    assert_eq!(offsets[1]["k"], 0.0);
    assert_eq!(offsets[0]["k"], 2.0);
}

#[test]
fn numeric_and_string_keys_share_a_stack() {
    let input = vec![
        vec![StackDatum::from_values(&json!(2020), &json!(4))],
        vec![StackDatum::from_values(&json!("2020"), &json!("1.5"))],
    ];
    assert_eq!(domain_keys(&input), vec!["2020".to_owned()]);
    let offsets = compute_stack_offsets(&input, StackOrder::BottomUp);
    assert_eq!(offsets[1]["2020"], 4.0);
}

#[test]
fn missing_keys_count_as_zero() {
    let input = vec![
        series(&[("a", 1.0), ("b", 2.0)]),
        series(&[("b", 3.0)]),
        series(&[("a", 4.0), ("b", 1.0)]),
    ];
    let offsets = compute_stack_offsets(&input, StackOrder::BottomUp);
    assert_eq!(offsets[2]["a"], 1.0);
    assert_eq!(offsets[2]["b"], 5.0);
    assert!(!offsets[1].contains_key("a"));
}

#[test]
fn extent_filter_skips_rejected_data() {
    let input = vec![series(&[("a", 1.0), ("b", 10.0)]), series(&[("a", 2.0), ("b", 10.0)])];
    let offsets = compute_stack_offsets(&input, StackOrder::BottomUp);
    let only_a: &dyn Fn(&StackDatum, usize) -> bool = &|datum, _index| datum.key == "a";
    assert_eq!(compute_stack_extent(&input, &offsets, Some(only_a)), (0.0, 3.0));
}

#[test]
fn zero_value_does_not_advance_the_running_total() {
    let input: Vec<StackSeries> = [1.0, 1.0, 3.0, 0.0, 2.0]
        .iter()
        .map(|value| series(&[("Fred", *value)]))
        .collect();
    let offsets = compute_stack_offsets(&input, StackOrder::BottomUp);
    let fred: Vec<f64> = offsets.iter().map(|o| o["Fred"]).collect();
    assert_eq!(fred, vec![0.0, 1.0, 2.0, 5.0, 5.0]);
}

#[test]
fn mixed_sign_extent_sums_each_pool() {
    let input: Vec<StackSeries> = [100.0, -5.0, 0.0, 20.0, -5.0]
        .iter()
        .map(|value| series(&[("k", *value)]))
        .collect();
    let offsets = compute_stack_offsets(&input, StackOrder::BottomUp);
    assert_eq!(compute_stack_extent(&input, &offsets, None), (-10.0, 120.0));
}
