use single_decree_paxos::utils::{has_quorum, quorum_size};

#[test]
fn test_majority_quorum_sizes() {
    // 1 acceptor: needs 1
    assert_eq!(quorum_size(1), 1);
    // 2 acceptors: need both
    assert_eq!(quorum_size(2), 2);
    // 3 acceptors: floor(3/2) + 1 = 2
    assert_eq!(quorum_size(3), 2);
    // 4 acceptors: floor(4/2) + 1 = 3
    assert_eq!(quorum_size(4), 3);
    // 5 acceptors: floor(5/2) + 1 = 3
    assert_eq!(quorum_size(5), 3);
    // 100 acceptors: 51
    assert_eq!(quorum_size(100), 51);
}

#[test]
fn test_has_quorum_boundaries() {
    assert!(has_quorum(1, 1));

    assert!(!has_quorum(1, 2));
    assert!(has_quorum(2, 2));

    assert!(!has_quorum(1, 3));
    assert!(has_quorum(2, 3));
    assert!(has_quorum(3, 3));

    assert!(!has_quorum(2, 4));
    assert!(has_quorum(3, 4));

    // no acceptors: nothing is ever a quorum
    assert!(!has_quorum(0, 0));
    assert!(!has_quorum(5, 0));
}

#[test]
fn test_any_two_quorums_intersect() {
    for acceptors in 1..=9usize {
        let quorum = quorum_size(acceptors);
        assert!(
            2 * quorum > acceptors,
            "two quorums of {quorum} out of {acceptors} could be disjoint"
        );
    }
}
