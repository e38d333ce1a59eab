use super::*;
use crate::utils::DefaultRandom;

mod selection_sampling {
    use super::*;

    #[test]
    fn can_sample_from_large_range() {
        let random = Arc::new(DefaultRandom::new_with_seed(13));
        let amount = 5;

        let numbers = SelectionSamplingIterator::new(0..100, amount, random).collect::<Vec<_>>();

        assert_eq!(numbers.len(), amount);
        numbers.windows(2).for_each(|item| match item {
            &[prev, next] => assert!(prev < next),
            _ => unreachable!(),
        });
    }

    #[test]
    fn can_sample_from_same_range() {
        let amount = 5;
        let random = Arc::new(DefaultRandom::new_with_seed(13));

        let numbers = SelectionSamplingIterator::new(0..amount, amount, random).collect::<Vec<_>>();

        assert_eq!(numbers, vec![0, 1, 2, 3, 4])
    }

    #[test]
    fn can_sample_from_smaller_range() {
        let sample_size = 5;
        let random = DefaultRandom::new_with_seed(13);

        let numbers = create_range_sampling_iter(0..3, sample_size, &random).collect::<Vec<_>>();

        assert_eq!(numbers, vec![0, 1, 2])
    }

    #[test]
    fn can_sample_empty_range() {
        let random = DefaultRandom::new_with_seed(13);

        let numbers = create_range_sampling_iter(0..0, 5, &random).collect::<Vec<_>>();

        assert!(numbers.is_empty());
    }
}

mod collect_group_by {
    use super::*;

    #[test]
    fn can_group_by_key() {
        let groups = vec![("a", 1), ("b", 2), ("a", 3)].into_iter().collect_group_by_key(|(k, _)| *k);

        assert_eq!(groups.get("a").unwrap(), &vec![("a", 1), ("a", 3)]);
        assert_eq!(groups.get("b").unwrap(), &vec![("b", 2)]);
    }
}
