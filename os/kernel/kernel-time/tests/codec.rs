use kernel_time::TimePeriod;

/// A spread of durations covering every exponent plus the boundaries
/// on either side of each power of two.
fn sample_durations() -> Vec<u64> {
    let mut v = vec![1, 2, 3, 511, 512, 1000, 1022, 1023, 1024, 1025];
    for e in 10..41 {
        let p = 1u64 << e;
        v.extend([p - 1, p, p + 1, p + p / 3, (p << 1) - 1]);
    }
    v.sort_unstable();
    v.dedup();
    v
}

#[test]
fn encode_is_monotonic_over_finite_range() {
    let durations = sample_durations();
    for w in durations.windows(2) {
        let (a, b) = (TimePeriod::from_micros(w[0]), TimePeriod::from_micros(w[1]));
        assert!(
            a.into_raw() <= b.into_raw(),
            "{} -> {a:?} but {} -> {b:?}",
            w[0],
            w[1]
        );
    }
}

#[test]
fn relative_round_trip_only_rounds_down() {
    for d in sample_durations() {
        let expanded = TimePeriod::from_micros(d).expand_relative(0);
        assert!(expanded <= d, "{d} expanded to {expanded}");

        let log2 = 63 - d.leading_zeros();
        let granularity = if log2 < 10 { 1 } else { 1u64 << (log2 - 9) };
        assert!(d - expanded < granularity, "{d} lost {}", d - expanded);
    }
}

#[test]
fn round_trip_is_relative_to_base() {
    let base = 0x1234_5678_9ABC;
    for d in [7, 4096, 5_000_000] {
        let p = TimePeriod::from_micros(d);
        assert_eq!(p.expand_relative(base) - base, p.expand_relative(0));
    }
}

#[test]
fn everything_from_two_pow_41_is_infinite() {
    for e in 41..64 {
        assert_eq!(TimePeriod::from_micros(1 << e), TimePeriod::INFINITE);
        assert_eq!(TimePeriod::from_micros((1 << e) | 1), TimePeriod::INFINITE);
    }
}

#[test]
fn encoded_periods_are_relative() {
    for d in sample_durations() {
        assert!(!TimePeriod::from_micros(d).is_absolute());
    }
}
