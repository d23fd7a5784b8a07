//! Pure planning for Replace-Set: which related ids to unlink and which to
//! link so that an anchor ends up mapped to exactly the desired set.

use std::collections::HashSet;

use uuid::Uuid;

use crate::database::models::mapping::ReplaceStrategy;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplacePlan {
    pub to_delete: Vec<Uuid>,
    pub to_insert: Vec<Uuid>,
}

impl ReplacePlan {
    pub fn is_noop(&self) -> bool {
        self.to_delete.is_empty() && self.to_insert.is_empty()
    }
}

/// Drop repeated ids, keeping first-seen order
pub fn dedup(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Differential plan: unlink what is no longer wanted, link what is new
pub fn plan_reconciliation(existing: &[Uuid], desired: &[Uuid]) -> ReplacePlan {
    let desired = dedup(desired);
    let existing_set: HashSet<Uuid> = existing.iter().copied().collect();
    let desired_set: HashSet<Uuid> = desired.iter().copied().collect();

    ReplacePlan {
        to_delete: dedup(existing).into_iter().filter(|id| !desired_set.contains(id)).collect(),
        to_insert: desired.into_iter().filter(|id| !existing_set.contains(id)).collect(),
    }
}

/// Full plan: unlink everything, link the whole desired set
pub fn plan_full(existing: &[Uuid], desired: &[Uuid]) -> ReplacePlan {
    ReplacePlan {
        to_delete: dedup(existing),
        to_insert: dedup(desired),
    }
}

pub fn plan(strategy: ReplaceStrategy, existing: &[Uuid], desired: &[Uuid]) -> ReplacePlan {
    match strategy {
        ReplaceStrategy::FullReplace => plan_full(existing, desired),
        ReplaceStrategy::Differential => plan_reconciliation(existing, desired),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn differential_touches_only_the_difference() {
        let v = ids(4);
        let existing = vec![v[0], v[1], v[2]];
        let desired = vec![v[1], v[2], v[3]];

        let plan = plan_reconciliation(&existing, &desired);
        assert_eq!(plan.to_delete, vec![v[0]]);
        assert_eq!(plan.to_insert, vec![v[3]]);
    }

    #[test]
    fn same_set_is_a_noop() {
        let v = ids(3);
        let reordered = vec![v[2], v[0], v[1], v[0]];
        assert!(plan_reconciliation(&v, &reordered).is_noop());
    }

    #[test]
    fn empty_desired_clears_the_anchor() {
        let v = ids(2);
        let plan = plan_reconciliation(&v, &[]);
        assert_eq!(plan.to_delete, v);
        assert!(plan.to_insert.is_empty());
    }

    #[test]
    fn full_replace_rewrites_everything_once() {
        let v = ids(3);
        let plan = plan(ReplaceStrategy::FullReplace, &[v[0], v[1]], &[v[1], v[2], v[2]]);
        assert_eq!(plan.to_delete, vec![v[0], v[1]]);
        assert_eq!(plan.to_insert, vec![v[1], v[2]]);
    }

    #[test]
    fn applying_the_plan_yields_the_desired_set() {
        let v = ids(6);
        let existing = vec![v[0], v[1], v[2], v[3]];
        let desired = vec![v[3], v[4], v[1], v[5]];

        for strategy in [ReplaceStrategy::FullReplace, ReplaceStrategy::Differential] {
            let plan = plan(strategy, &existing, &desired);
            let mut after: HashSet<Uuid> = existing.iter().copied().collect();
            for id in &plan.to_delete {
                after.remove(id);
            }
            for id in &plan.to_insert {
                assert!(after.insert(*id), "inserted an id that was still linked");
            }
            let expected: HashSet<Uuid> = desired.iter().copied().collect();
            assert_eq!(after, expected);
        }
    }
}
