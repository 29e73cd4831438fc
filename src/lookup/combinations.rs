//! Combination validator.
//!
//! The combination corpus lists every parameter vector known to be
//! grammatically valid. A query vector is valid when at least one row holds the
//! query's value in every slot the query specifies:
//!
//! ```text
//! query   [1, 0, 3]            rows  [1, 2, 3]  ✓
//!          ^     ^                   [1, 5, 3]  ✓
//!          only these slots          [1, 2, 0]  ✗ (slot 2 must be 3)
//!          are compared
//! ```
//!
//! Filtering is progressive: the candidate set starts from the row index of the
//! first specified slot and shrinks slot by slot, stopping as soon as it is
//! empty.

use super::memo::Memo;
use super::provider::Provider;
use crate::error::{Result, ensure_active};
use crate::parameters::{Collective, PARAMETER_COUNT, Parameters};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub struct CombinationValidator {
    rows: Vec<Parameters>,
    /// `(slot, value) -> row indices` holding that value.
    by_slot: HashMap<(usize, u8), Vec<usize>>,
    checks: Memo<Parameters, bool>,
    collectives: Memo<Parameters, (bool, Parameters)>,
}

impl CombinationValidator {
    pub fn new(provider: &dyn Provider<Parameters>) -> Result<Self> {
        Ok(Self::from_rows(provider.values()?))
    }

    pub fn from_rows(rows: Vec<Parameters>) -> Self {
        let mut by_slot: HashMap<(usize, u8), Vec<usize>> = HashMap::new();
        for (idx, row) in rows.iter().enumerate() {
            for slot in 0..PARAMETER_COUNT {
                let value = row.slots()[slot];
                if value != 0 {
                    by_slot.entry((slot, value)).or_default().push(idx);
                }
            }
        }
        CombinationValidator {
            rows,
            by_slot,
            checks: Memo::new("combinations.check"),
            collectives: Memo::new("combinations.collective"),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn filter(&self, parameters: &Parameters, cancel: &CancellationToken) -> Result<Vec<&Parameters>> {
        ensure_active(cancel)?;
        let mut slots = parameters.mask().indices();
        let Some(first) = slots.next() else {
            return Ok(self.rows.iter().collect());
        };

        let seed = self.by_slot.get(&(first, parameters.slots()[first]));
        let mut candidates: Vec<&Parameters> =
            seed.map(|ids| ids.iter().map(|&i| &self.rows[i]).collect()).unwrap_or_default();

        for slot in slots {
            if candidates.is_empty() {
                break;
            }
            ensure_active(cancel)?;
            let value = parameters.slots()[slot];
            candidates.retain(|row| row.slots()[slot] == value);
        }
        Ok(candidates)
    }

    /// Whether any known combination matches `parameters`.
    pub fn check(&self, parameters: &Parameters, cancel: &CancellationToken) -> Result<bool> {
        Ok(!self.filter(parameters, cancel)?.is_empty())
    }

    pub fn check_and_cache(&self, parameters: &Parameters, cancel: &CancellationToken) -> Result<bool> {
        self.checks.get_or_try_insert_with(*parameters, || self.check(parameters, cancel))
    }

    /// Like [`check_and_cache`](Self::check_and_cache), also returning the
    /// generalization of every matching row (all-unknown on failure).
    pub fn check_and_cache_collective(
        &self,
        parameters: &Parameters,
        cancel: &CancellationToken,
    ) -> Result<(bool, Parameters)> {
        self.collectives.get_or_try_insert_with(*parameters, || {
            let rows = self.filter(parameters, cancel)?;
            let Some((first, rest)) = rows.split_first() else {
                return Ok((false, Parameters::EMPTY));
            };
            let mut acc = Collective::start(first);
            for row in rest {
                ensure_active(cancel)?;
                acc.absorb(row);
            }
            Ok((true, acc.finish()))
        })
    }

    /// Every combination row matching `parameters`.
    pub fn valid_parameters(&self, parameters: &Parameters, cancel: &CancellationToken) -> Result<Vec<Parameters>> {
        Ok(self.filter(parameters, cancel)?.into_iter().copied().collect())
    }

    pub fn cached(&self) -> usize {
        self.checks.len() + self.collectives.len()
    }

    pub fn clear(&self) {
        self.checks.clear();
        self.collectives.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MorphError;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn p(prefix: &[u8]) -> Parameters {
        Parameters::from_prefix(prefix)
    }

    fn validator() -> CombinationValidator {
        CombinationValidator::from_rows(vec![p(&[1, 2, 3]), p(&[1, 5, 3]), p(&[1, 2, 0]), p(&[2, 2, 4])])
    }

    #[test]
    fn unspecified_query_slots_are_wildcards() {
        let v = validator();
        let cancel = CancellationToken::new();
        assert!(v.check(&p(&[1, 0, 3]), &cancel).unwrap());
        assert_eq!(v.valid_parameters(&p(&[1, 0, 3]), &cancel).unwrap(), vec![p(&[1, 2, 3]), p(&[1, 5, 3])]);
        assert_eq!(v.valid_parameters(&Parameters::EMPTY, &cancel).unwrap().len(), 4);
    }

    #[test]
    fn absence_is_a_plain_false() {
        let v = validator();
        let cancel = CancellationToken::new();
        assert!(!v.check(&p(&[3]), &cancel).unwrap());
        assert!(!v.check(&p(&[2, 5]), &cancel).unwrap());
        assert_eq!(v.check_and_cache_collective(&p(&[3]), &cancel).unwrap(), (false, Parameters::EMPTY));
    }

    #[test]
    fn collective_of_matching_rows() {
        let v = validator();
        let cancel = CancellationToken::new();
        // rows [1,2,3] [1,5,3] [1,2,0]: slot 1 conflicts, slot 2 conflicts with the 0.
        let (ok, coll) = v.check_and_cache_collective(&p(&[1]), &cancel).unwrap();
        assert!(ok);
        assert_eq!(coll, p(&[1]));

        let (ok, coll) = v.check_and_cache_collective(&p(&[1, 0, 3]), &cancel).unwrap();
        assert!(ok);
        assert_eq!(coll, p(&[1, 0, 3]));
    }

    #[test]
    fn collective_of_single_row_is_that_row() {
        let v = validator();
        let (ok, coll) = v.check_and_cache_collective(&p(&[2]), &CancellationToken::new()).unwrap();
        assert!(ok);
        assert_eq!(coll, p(&[2, 2, 4]));
    }

    #[test]
    fn two_rows_with_disjoint_details() {
        let v = CombinationValidator::from_rows(vec![p(&[1, 2, 0]), p(&[1, 0, 3])]);
        let (_, coll) = v.check_and_cache_collective(&p(&[1]), &CancellationToken::new()).unwrap();
        assert_eq!(coll, p(&[1, 0, 3]));
    }

    #[test]
    fn cache_is_filled_and_cleared() {
        let v = validator();
        let cancel = CancellationToken::new();
        assert!(v.check_and_cache(&p(&[1, 2]), &cancel).unwrap());
        assert!(v.check_and_cache(&p(&[1, 2]), &cancel).unwrap());
        assert_eq!(v.cached(), 1);
        v.clear();
        assert_eq!(v.cached(), 0);
    }

    #[test]
    fn cancelled_lookup_writes_nothing() {
        let v = validator();
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(matches!(v.check_and_cache(&p(&[1, 2, 3]), &cancel), Err(MorphError::Cancelled)));
        assert_eq!(v.cached(), 0);
    }

    fn arb_params() -> impl Strategy<Value = Parameters> {
        prop::collection::vec(0u8..4, 4).prop_map(|v| Parameters::from_prefix(&v))
    }

    proptest! {
        #[test]
        fn check_agrees_with_valid_parameters(
            rows in prop::collection::vec(arb_params(), 0..12),
            query in arb_params(),
        ) {
            let v = CombinationValidator::from_rows(rows);
            let cancel = CancellationToken::new();
            let check = v.check(&query, &cancel).unwrap();
            let valid = v.valid_parameters(&query, &cancel).unwrap();
            prop_assert_eq!(check, !valid.is_empty());
        }

        #[test]
        fn check_and_cache_is_idempotent(
            rows in prop::collection::vec(arb_params(), 0..12),
            query in arb_params(),
        ) {
            let v = CombinationValidator::from_rows(rows);
            let cancel = CancellationToken::new();
            let first = v.check_and_cache_collective(&query, &cancel).unwrap();
            let second = v.check_and_cache_collective(&query, &cancel).unwrap();
            prop_assert_eq!(first, second);
            prop_assert_eq!(v.check_and_cache(&query, &cancel).unwrap(), first.0);
        }
    }
}
