mod rpc_errors {
    use crate::multi::RpcErrors;
    use crate::rpc_client::RpcError;

    #[test]
    fn should_render_empty_list_as_unknown_error() {
        assert_eq!(RpcErrors::default().to_string(), "unknown error");
    }

    #[test]
    fn should_render_single_error_as_bare_message() {
        let errors = RpcErrors::from(RpcError::Transport("connection refused".to_string()));
        assert_eq!(errors.to_string(), "connection refused");
    }

    #[test]
    fn should_render_multiple_errors_as_bracketed_list() {
        let mut errors = RpcErrors::from(RpcError::Transport("connection refused".to_string()));
        errors.push(RpcError::Panic("boom".to_string()));

        assert_eq!(
            errors.to_string(),
            "the following errors occurred: [connection refused, panic: boom]"
        );
    }

    #[test]
    fn should_deduplicate_by_message() {
        let mut errors = RpcErrors::from(RpcError::Transport("connection refused".to_string()));
        errors.push(RpcError::Transport("connection refused".to_string()));
        errors.push(RpcError::Transport("timeout".to_string()));
        errors.push_front(RpcError::Transport("timeout".to_string()));

        assert_eq!(
            errors.as_slice(),
            &[
                RpcError::Transport("connection refused".to_string()),
                RpcError::Transport("timeout".to_string()),
            ]
        );
    }

    #[test]
    fn should_prepend_summary_before_upstream_errors() {
        let mut errors = RpcErrors::from(RpcError::Transport("connection refused".to_string()));
        errors.push_front(RpcError::NotEnoughMatchingResponses);

        assert_eq!(
            errors.to_string(),
            "the following errors occurred: \
             [not enough occurrences of the same response from RPC servers, connection refused]"
        );
    }
}

mod reduce_with_most_common {
    use crate::multi::{MultiResults, RpcErrors};
    use crate::rpc_client::RpcError;
    use crate::json::Quantity;

    fn offline() -> RpcError {
        RpcError::Transport("connection refused".to_string())
    }

    #[test]
    fn should_return_most_common_response() {
        // chain id 0x1 reported by 3 out of 4 endpoints
        let results = MultiResults::from_non_empty_iter(vec![
            (0_usize, Ok(Quantity::from(1_u64))),
            (1, Ok(Quantity::from(1_u64))),
            (2, Ok(Quantity::from(1_u64))),
            (3, Ok(Quantity::from(3_u64))),
        ]);

        assert_eq!(
            results.reduce_with_most_common(3),
            Ok(Quantity::from(1_u64))
        );
    }

    #[test]
    fn should_group_by_canonical_value() {
        let results: MultiResults<_, Quantity> = MultiResults::from_non_empty_iter(vec![
            (0_usize, Ok("0x1".parse().unwrap())),
            (1, Ok("0x01".parse().unwrap())),
            (2, Ok("0x001".parse().unwrap())),
        ]);

        assert_eq!(
            results.reduce_with_most_common(3),
            Ok(Quantity::from(1_u64))
        );
    }

    #[test]
    fn should_fail_when_not_enough_occurrences() {
        // two classes of size 2 each, quorum of 3
        let results = MultiResults::from_non_empty_iter(vec![
            (0_usize, Ok(Quantity::from(1_u64))),
            (1, Ok(Quantity::from(1_u64))),
            (2, Ok(Quantity::from(3_u64))),
            (3, Ok(Quantity::from(3_u64))),
        ]);

        assert_eq!(
            results.reduce_with_most_common(3),
            Err(RpcErrors::from(RpcError::NotEnoughMatchingResponses))
        );
    }

    #[test]
    fn should_fail_when_two_classes_tie_at_the_maximum() {
        // two classes of size 2 each, quorum of 2: ambiguous, not a silent pick
        let results = MultiResults::from_non_empty_iter(vec![
            (0_usize, Ok(Quantity::from(1_u64))),
            (1, Ok(Quantity::from(1_u64))),
            (2, Ok(Quantity::from(3_u64))),
            (3, Ok(Quantity::from(3_u64))),
        ]);

        assert_eq!(
            results.reduce_with_most_common(2),
            Err(RpcErrors::from(RpcError::InconsistentResponses))
        );
    }

    #[test]
    fn should_stay_ambiguous_with_quorum_of_one() {
        let results = MultiResults::from_non_empty_iter(vec![
            (0_usize, Ok(Quantity::from(1_u64))),
            (1, Ok(Quantity::from(2_u64))),
        ]);

        assert_eq!(
            results.reduce_with_most_common(1),
            Err(RpcErrors::from(RpcError::InconsistentResponses))
        );
    }

    #[test]
    fn should_reach_quorum_despite_errors() {
        let results = MultiResults::from_non_empty_iter(vec![
            (0_usize, Ok(Quantity::from(1_u64))),
            (1, Ok(Quantity::from(1_u64))),
            (2, Err(offline())),
        ]);

        assert_eq!(
            results.reduce_with_most_common(2),
            Ok(Quantity::from(1_u64))
        );
    }

    #[test]
    fn should_annotate_failure_with_deduplicated_upstream_errors() {
        let results: MultiResults<_, Quantity> = MultiResults::from_non_empty_iter(vec![
            (0_usize, Err(offline())),
            (1, Err(offline())),
            (2, Err(RpcError::Panic("boom".to_string()))),
        ]);

        let errors = results.reduce_with_most_common(1).unwrap_err();
        assert_eq!(
            errors.as_slice(),
            &[
                RpcError::NotEnoughMatchingResponses,
                offline(),
                RpcError::Panic("boom".to_string()),
            ]
        );
        assert_eq!(
            errors.to_string(),
            "the following errors occurred: \
             [not enough occurrences of the same response from RPC servers, \
             connection refused, panic: boom]"
        );
    }
}

mod reduce_with_median {
    use crate::json::Quantity;
    use crate::multi::{MultiResults, RpcErrors};
    use crate::rpc_client::RpcError;
    use proptest::collection::vec;
    use proptest::prelude::any;
    use proptest::proptest;

    fn from_numbers(numbers: &[u64]) -> MultiResults<usize, Quantity> {
        MultiResults::from_non_empty_iter(
            numbers
                .iter()
                .enumerate()
                .map(|(key, n)| (key, Ok(Quantity::from(*n)))),
        )
    }

    #[test]
    fn should_return_middle_element_for_odd_count() {
        assert_eq!(
            from_numbers(&[102, 100, 104, 101, 103]).reduce_with_median(4),
            Ok(Quantity::from(102_u64))
        );
    }

    #[test]
    fn should_return_integer_mean_of_middles_for_even_count() {
        assert_eq!(
            from_numbers(&[100, 101, 102, 103]).reduce_with_median(4),
            Ok(Quantity::from(101_u64))
        );
    }

    #[test]
    fn should_compute_midpoint_from_numeric_count_when_slots_hold_errors() {
        // 4 numbers and 2 errors: the midpoint must come from the 4 numeric
        // values (median 2), not from the 6 collected slots.
        let results = MultiResults::from_non_empty_iter(vec![
            (0_usize, Ok(Quantity::from(1_u64))),
            (1, Ok(Quantity::from(2_u64))),
            (2, Ok(Quantity::from(3_u64))),
            (3, Ok(Quantity::from(4_u64))),
            (4, Err(RpcError::Transport("connection refused".to_string()))),
            (5, Err(RpcError::Transport("timeout".to_string()))),
        ]);

        assert_eq!(results.reduce_with_median(4), Ok(Quantity::from(2_u64)));
    }

    #[test]
    fn should_fail_when_not_enough_numbers() {
        let results = MultiResults::from_non_empty_iter(vec![
            (0_usize, Ok(Quantity::from(100_u64))),
            (1, Err(RpcError::Transport("connection refused".to_string()))),
            (2, Err(RpcError::Transport("timeout".to_string()))),
        ]);

        let errors = results.reduce_with_median(2).unwrap_err();
        assert_eq!(
            errors.as_slice(),
            &[
                RpcError::NotEnoughResponses,
                RpcError::Transport("connection refused".to_string()),
                RpcError::Transport("timeout".to_string()),
            ]
        );
    }

    #[test]
    fn should_fail_on_all_errors() {
        let results: MultiResults<_, Quantity> = MultiResults::from_non_empty_iter(vec![(
            0_usize,
            Err(RpcError::Transport("connection refused".to_string())),
        )]);

        assert_eq!(
            results.reduce_with_median(1),
            Err(RpcErrors::from_iter([
                RpcError::NotEnoughResponses,
                RpcError::Transport("connection refused".to_string()),
            ]))
        );
    }

    proptest! {
        #[test]
        fn should_be_insensitive_to_arrival_order(mut numbers in vec(any::<u64>(), 1..10)) {
            let ascending = {
                let mut sorted = numbers.clone();
                sorted.sort_unstable();
                from_numbers(&sorted).reduce_with_median(numbers.len())
            };
            numbers.reverse();
            let descending = from_numbers(&numbers).reduce_with_median(numbers.len());

            assert_eq!(ascending, descending);
        }
    }
}

mod reduce_with_median_floor {
    use crate::json::Quantity;
    use crate::multi::MultiResults;
    use crate::rpc_client::RpcError;
    use proptest::collection::vec;
    use proptest::prelude::any;
    use proptest::proptest;

    fn from_numbers(numbers: &[u64]) -> MultiResults<usize, Quantity> {
        MultiResults::from_non_empty_iter(
            numbers
                .iter()
                .enumerate()
                .map(|(key, n)| (key, Ok(Quantity::from(*n)))),
        )
    }

    #[test]
    fn should_return_largest_value_within_distance_below_median() {
        // median 102, candidates within [99, 102) are {100, 101}
        assert_eq!(
            from_numbers(&[100, 101, 102, 103, 104]).reduce_with_median_floor(4, 3),
            Ok(Quantity::from(101_u64))
        );
    }

    #[test]
    fn should_return_median_when_no_value_is_below_it() {
        // median 100, [97, 100) holds no reported value
        assert_eq!(
            from_numbers(&[100, 100, 100, 200]).reduce_with_median_floor(3, 3),
            Ok(Quantity::from(100_u64))
        );
    }

    #[test]
    fn should_saturate_distance_at_zero() {
        assert_eq!(
            from_numbers(&[1, 1, 1]).reduce_with_median_floor(3, 3),
            Ok(Quantity::from(1_u64))
        );
    }

    #[test]
    fn should_propagate_median_failure() {
        let results = MultiResults::from_non_empty_iter(vec![
            (0_usize, Ok(Quantity::from(100_u64))),
            (1, Err(RpcError::Transport("connection refused".to_string()))),
        ]);

        let errors = results.reduce_with_median_floor(2, 3).unwrap_err();
        assert_eq!(errors.as_slice()[0], RpcError::NotEnoughResponses);
    }

    proptest! {
        #[test]
        fn should_stay_within_distance_of_the_median(
            numbers in vec(any::<u64>(), 1..10),
            distance in 0_u64..5,
        ) {
            let median = from_numbers(&numbers)
                .reduce_with_median(numbers.len())
                .unwrap();
            let floored = from_numbers(&numbers)
                .reduce_with_median_floor(numbers.len(), distance)
                .unwrap();

            assert!(floored <= median);
            assert!(floored >= median.saturating_sub(distance));
        }
    }
}
