use crate::models::StubMapping;

/// Order a transaction's stubs by descending variant weight and number them 0, 1, 2, ...
///
/// The sort is stable, so variants with equal weights keep document order. Each stub
/// travels with a caller-supplied key (the variant index) so later stages can still
/// name it.
pub fn assign_priorities<K>(mut stubs: Vec<(K, StubMapping)>) -> Vec<(K, StubMapping)> {
    stubs.sort_by(|(_, a), (_, b)| {
        b.metadata
            .devtest_variant_weight
            .total_cmp(&a.metadata.devtest_variant_weight)
    });

    for (priority, (_, stub)) in stubs.iter_mut().enumerate() {
        stub.priority = priority as u32;
    }

    stubs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RequestPattern, ResponseDefinition, StubMetadata};
    use indexmap::IndexMap;

    fn stub(weight: f64) -> StubMapping {
        StubMapping {
            priority: 0,
            request: RequestPattern::default(),
            response: ResponseDefinition {
                status: 200,
                headers: IndexMap::new(),
                body: None,
                delay: None,
                transformers: Vec::new(),
            },
            metadata: StubMetadata {
                devtest_transaction_id: "t".to_string(),
                devtest_variant_weight: weight,
                devtest_variant_id: None,
                devtest_selection_logic: None,
                devtest_notes: None,
                devtest_scenario: None,
                devtest_required_state: None,
                devtest_new_state: None,
                manual_review: false,
            },
        }
    }

    #[test]
    fn test_weight_descending_with_stable_ties() {
        let ordered = assign_priorities(vec![
            (0, stub(0.2)),
            (1, stub(0.8)),
            (2, stub(0.5)),
            (3, stub(0.8)),
        ]);

        let keys: Vec<usize> = ordered.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![1, 3, 2, 0]);
        let priorities: Vec<u32> = ordered.iter().map(|(_, s)| s.priority).collect();
        assert_eq!(priorities, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_priority_monotonic_in_weight() {
        let ordered = assign_priorities((0..6).map(|i| (i, stub((i % 3) as f64))).collect());
        for pair in ordered.windows(2) {
            let (a, b) = (&pair[0].1, &pair[1].1);
            assert!(a.metadata.devtest_variant_weight >= b.metadata.devtest_variant_weight);
            assert!(a.priority < b.priority);
        }
    }
}
