use approx::assert_relative_eq;
use chrono::{DateTime, Duration, TimeZone, Utc};
use plotweave::core::{Domainer, DomainerTuning, ScaleTransform};

fn unpadded() -> Domainer<f64> {
    Domainer::new().with_pad_proportion(0.0).expect("valid pad")
}

#[test]
fn extents_combine_to_overall_min_and_max() {
    let domainer = unpadded();
    let domain = domainer.compute_domain(&[(0.0, 10.0), (20.0, 30.0), (-5.0, 3.0)], ScaleTransform::Linear);
    assert_eq!(domain, (-5.0, 30.0));
}

#[test]
fn default_padding_grows_each_side_by_half_proportion() {
    let domainer: Domainer<f64> = Domainer::new();
    let (lo, hi) = domainer.compute_domain(&[(0.0, 100.0)], ScaleTransform::Linear);
    assert_relative_eq!(lo, -2.5);
    assert_relative_eq!(hi, 102.5);
}

#[test]
fn padding_exception_pins_its_edge() {
    let mut domainer: Domainer<f64> = Domainer::new().with_pad_proportion(0.1).expect("valid pad");
    domainer.add_padding_exception("bar-baseline", 0.0);
    let (lo, hi) = domainer.compute_domain(&[(0.0, 10.0)], ScaleTransform::Linear);
    assert_eq!(lo, 0.0);
    assert_relative_eq!(hi, 10.5);

    domainer.remove_padding_exception("bar-baseline");
    let (lo, _) = domainer.compute_domain(&[(0.0, 10.0)], ScaleTransform::Linear);
    assert_relative_eq!(lo, -0.5);
}

#[test]
fn included_value_is_applied_after_padding() {
    let mut domainer: Domainer<f64> = Domainer::new().with_pad_proportion(0.1).expect("valid pad");
    domainer.add_unkeyed_included_value(0.0);
    let (lo, hi) = domainer.compute_domain(&[(10.0, 20.0)], ScaleTransform::Linear);
    assert_eq!(lo, 0.0);
    assert_relative_eq!(hi, 20.5);
}

#[test]
fn degenerate_extent_expands_even_without_padding() {
    let domainer = unpadded();
    assert_eq!(domainer.compute_domain(&[(5.0, 5.0)], ScaleTransform::Linear), (4.0, 6.0));
}

#[test]
fn degenerate_time_extent_expands_by_a_day() {
    let domainer: Domainer<DateTime<Utc>> = Domainer::new();
    let at = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).single().expect("valid instant");
    let (lo, hi) = domainer.compute_domain(&[(at, at)], ScaleTransform::Time);
    assert_eq!(lo, at - Duration::days(1));
    assert_eq!(hi, at + Duration::days(1));
}

#[test]
fn empty_extent_list_uses_default_domain() {
    let linear: Domainer<f64> = Domainer::new();
    assert_eq!(linear.compute_domain(&[], ScaleTransform::Linear), (0.0, 1.0));

    let time: Domainer<DateTime<Utc>> = Domainer::new();
    let (lo, hi) = time.compute_domain(&[], ScaleTransform::Time);
    assert_eq!(lo, DateTime::UNIX_EPOCH);
    assert_eq!(hi - lo, Duration::days(1));
}

#[test]
fn nice_rounding_widens_to_round_numbers() {
    let domainer = unpadded().with_nice(10);
    assert_eq!(
        domainer.compute_domain(&[(0.13, 9.87)], ScaleTransform::Linear),
        (0.0, 10.0)
    );
}

#[test]
fn log_padding_keeps_domain_positive() {
    let domainer: Domainer<f64> = Domainer::new().with_pad_proportion(0.5).expect("valid pad");
    let transform = ScaleTransform::log(10.0).expect("valid base");
    let (lo, hi) = domainer.compute_domain(&[(1.0, 100.0)], transform);
    assert!(lo > 0.0);
    assert_relative_eq!(lo.log10(), -0.5, epsilon = 1e-9);
    assert_relative_eq!(hi.log10(), 2.5, epsilon = 1e-9);
}

#[test]
fn tuning_validation_rejects_bad_values() {
    let negative = DomainerTuning {
        pad_proportion: -0.1,
        nice_ticks: None,
    };
    assert!(Domainer::<f64>::from_tuning(negative).is_err());

    let zero_ticks = DomainerTuning {
        pad_proportion: 0.05,
        nice_ticks: Some(0),
    };
    assert!(Domainer::<f64>::from_tuning(zero_ticks).is_err());
}

#[test]
fn documented_padding_examples_hold() {
    let padded: Domainer<f64> = Domainer::new().with_pad_proportion(0.2).expect("valid pad");
    let (lo, hi) = padded.compute_domain(&[(100.0, 200.0)], ScaleTransform::Linear);
    assert_relative_eq!(lo, 90.0);
    assert_relative_eq!(hi, 210.0);

    let mut pinned: Domainer<f64> = Domainer::new().with_pad_proportion(0.1).expect("valid pad");
    pinned.add_unkeyed_padding_exception(0.0);
    let (lo, hi) = pinned.compute_domain(&[(0.0, 100.0)], ScaleTransform::Linear);
    assert_eq!(lo, 0.0);
    assert_relative_eq!(hi, 105.0);

    let default: Domainer<f64> = Domainer::new();
    assert_eq!(default.compute_domain(&[(5.0, 5.0)], ScaleTransform::Linear), (4.0, 6.0));
}
