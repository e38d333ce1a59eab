use super::*;

#[test]
fn can_return_weights() {
    let random = DefaultRandom::new_with_seed(42);
    let weights = &[100, 50, 20];
    let experiments = 10_000_usize;
    let total_sum = weights.iter().sum::<usize>();
    let mut counter = [0_usize; 3];

    (0..experiments).for_each(|_| {
        let idx = random.weighted(weights);
        *counter.get_mut(idx).unwrap() += 1;
    });

    weights.iter().enumerate().for_each(|(idx, weight)| {
        let actual_ratio = counter[idx] as Float / experiments as Float;
        let expected_ratio = *weight as Float / total_sum as Float;

        assert!((actual_ratio - expected_ratio).abs() < 0.05);
    });
}

#[test]
fn can_repeat_sequence_from_same_seed() {
    let a = DefaultRandom::new_with_seed(7);
    let b = DefaultRandom::new_with_seed(7);

    let seq_a: Vec<_> = (0..20).map(|_| a.uniform_int(0, 1000)).collect();
    let seq_b: Vec<_> = (0..20).map(|_| b.uniform_int(0, 1000)).collect();

    assert_eq!(seq_a, seq_b);
}

#[test]
fn can_clamp_uniform_real_to_range() {
    let random = DefaultRandom::new_with_seed(1);

    for _ in 0..100 {
        let value = random.uniform_real(0.2, 0.6);
        assert!((0.2..0.6).contains(&value));
    }
}

#[test]
fn can_handle_degenerate_range() {
    let random = DefaultRandom::new_with_seed(1);

    assert_eq!(random.uniform_int(5, 5), 5);
    assert_eq!(random.uniform_real(0.5, 0.5), 0.5);
}
