use pi_lottery::models::FundingSource;
use pi_lottery::prize::{
    compute_prize_distribution, per_entry_contribution, PrizeBracket, PrizeInputs,
};
use pi_lottery::AppError;
use rust_decimal::Decimal;

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

#[test]
fn test_tier_sums_match_pool_across_brackets() {
    for participants in [0u64, 1, 50, 51, 200, 201, 10_000] {
        for per_entry in [dec("0.9"), dec("0.001"), dec("4.5")] {
            let dist = compute_prize_distribution(participants, per_entry);
            let sum: Decimal = dist.tiers.iter().map(|t| t.amount).sum();
            assert_eq!(sum, dist.total_pool, "participants={} per_entry={}", participants, per_entry);
        }
    }
}

#[test]
fn test_bracket_weights_at_edges() {
    let at_50 = compute_prize_distribution(50, Decimal::ONE);
    assert_eq!(
        at_50.tiers.iter().map(|t| t.share).collect::<Vec<_>>(),
        vec![dec("0.6"), dec("0.25"), dec("0.15")]
    );

    let at_51 = compute_prize_distribution(51, Decimal::ONE);
    assert_eq!(
        at_51.tiers.iter().map(|t| t.share).collect::<Vec<_>>(),
        vec![dec("0.5"), dec("0.25"), dec("0.15"), dec("0.06"), dec("0.04")]
    );

    assert_eq!(compute_prize_distribution(200, Decimal::ONE).tiers.len(), 5);

    let at_201 = compute_prize_distribution(201, Decimal::ONE);
    assert_eq!(at_201.bracket, PrizeBracket::Large);
    assert_eq!(
        at_201.tiers.iter().map(|t| t.share).collect::<Vec<_>>(),
        vec![dec("0.4"), dec("0.2"), dec("0.15"), dec("0.08"), dec("0.08"), dec("0.08")]
    );
}

#[test]
fn test_hundred_paid_entries() {
    let inputs = PrizeInputs {
        participants: 100,
        funding: FundingSource::Paid,
        entry_fee: dec("1.0"),
        platform_fee: dec("0.1"),
        ad_value: Decimal::ZERO,
    };
    let dist = inputs.compute().unwrap();
    assert_eq!(dist.per_entry, dec("0.9"));
    assert_eq!(dist.total_pool, dec("90.0"));
    assert_eq!(
        dist.amounts(),
        vec![dec("45.0"), dec("22.5"), dec("13.5"), dec("5.4"), dec("3.6")]
    );
}

#[test]
fn test_three_hundred_ad_entries() {
    let per_entry = per_entry_contribution(FundingSource::AdFunded, Decimal::ZERO, Decimal::ZERO, dec("0.001")).unwrap();
    let dist = compute_prize_distribution(300, per_entry);
    assert_eq!(dist.total_pool, dec("0.3"));
    assert_eq!(dist.tiers.len(), 6);
    assert_eq!(dist.distributed(), dec("0.3"));
}

#[test]
fn test_pool_is_monotonic_in_participants() {
    let per_entry = dec("0.9");
    let mut previous = Decimal::ZERO;
    for participants in 0..=500u64 {
        let pool = compute_prize_distribution(participants, per_entry).total_pool;
        assert!(pool >= previous, "pool shrank at {}", participants);
        previous = pool;
    }
}

#[test]
fn test_invalid_float_inputs() {
    assert!(matches!(
        PrizeInputs::from_f64(-5, true, 0.0, 0.0, 0.001),
        Err(AppError::InvalidArgument(_))
    ));
    assert!(matches!(
        PrizeInputs::from_f64(5, false, f64::NEG_INFINITY, 0.1, 0.0),
        Err(AppError::InvalidArgument(_))
    ));
    assert!(matches!(
        PrizeInputs::from_f64(5, false, 0.1, 1.0, 0.0).and_then(|i| i.compute()),
        Err(AppError::InvalidArgument(_))
    ));
}
