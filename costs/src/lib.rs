#![deny(missing_docs)]
//! Accounting of the cryptographic work done while publishing and verifying
//! batch-signed content.
//!
//! Every batch operation returns its value wrapped in a [`CostContext`] so
//! callers can observe how many digests, node merges, signatures and
//! signature checks it took.

use std::ops::{Add, AddAssign};

/// Cryptographic work performed by one operation.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct OperationCost {
    /// How many times a digest was computed over leaf content (including the
    /// inner digest of pre-digested leaves and publisher key digests).
    pub digest_calls: u32,
    /// How many internal tree nodes were hashed from two children.
    pub node_hash_calls: u32,
    /// How many asymmetric signing operations were performed.
    pub sign_calls: u32,
    /// How many asymmetric signature checks were performed.
    pub signature_checks: u32,
}

impl OperationCost {
    /// Helper function to build default `OperationCost` with different
    /// `digest_calls`.
    pub fn with_digest_calls(digest_calls: u32) -> Self {
        OperationCost {
            digest_calls,
            ..Default::default()
        }
    }

    /// Helper function to build default `OperationCost` with different
    /// `node_hash_calls`.
    pub fn with_node_hash_calls(node_hash_calls: u32) -> Self {
        OperationCost {
            node_hash_calls,
            ..Default::default()
        }
    }

    /// Helper function to build default `OperationCost` with different
    /// `sign_calls`.
    pub fn with_sign_calls(sign_calls: u32) -> Self {
        OperationCost {
            sign_calls,
            ..Default::default()
        }
    }

    /// Helper function to build default `OperationCost` with different
    /// `signature_checks`.
    pub fn with_signature_checks(signature_checks: u32) -> Self {
        OperationCost {
            signature_checks,
            ..Default::default()
        }
    }

    /// Total number of hash function invocations (leaf digests and node
    /// merges).
    pub fn total_hash_calls(&self) -> u64 {
        self.digest_calls as u64 + self.node_hash_calls as u64
    }

    /// `true` if no work at all was recorded.
    pub fn is_nothing(&self) -> bool {
        *self == OperationCost::default()
    }
}

impl Add for OperationCost {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        OperationCost {
            digest_calls: self.digest_calls + rhs.digest_calls,
            node_hash_calls: self.node_hash_calls + rhs.node_hash_calls,
            sign_calls: self.sign_calls + rhs.sign_calls,
            signature_checks: self.signature_checks + rhs.signature_checks,
        }
    }
}

impl AddAssign for OperationCost {
    fn add_assign(&mut self, rhs: Self) {
        self.digest_calls += rhs.digest_calls;
        self.node_hash_calls += rhs.node_hash_calls;
        self.sign_calls += rhs.sign_calls;
        self.signature_checks += rhs.signature_checks;
    }
}

/// Wrapped operation result with associated cost.
#[derive(Debug, Eq, PartialEq)]
pub struct CostContext<T> {
    /// Wrapped operation's return value.
    pub value: T,
    /// Cost of the operation.
    pub cost: OperationCost,
}

impl<T> CostContext<T> {
    /// Take wrapped value out adding its cost to provided accumulator.
    pub fn unwrap_add_cost(self, acc_cost: &mut OperationCost) -> T {
        *acc_cost += self.cost;
        self.value
    }

    /// Take wrapped value out dropping cost data.
    pub fn unwrap(self) -> T {
        self.value
    }

    /// Borrow costs data.
    pub fn cost(&self) -> &OperationCost {
        &self.cost
    }

    /// Borrow wrapped data.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Applies function to wrapped value keeping cost the same as before.
    pub fn map<B>(self, f: impl FnOnce(T) -> B) -> CostContext<B> {
        CostContext {
            value: f(self.value),
            cost: self.cost,
        }
    }

    /// Adds previously accumulated cost.
    pub fn add_cost(mut self, cost: OperationCost) -> Self {
        self.cost += cost;
        self
    }
}

/// Type alias for `Result` wrapped into `CostContext`.
pub type CostResult<T, E> = CostContext<Result<T, E>>;

impl<T, E> CostResult<T, E> {
    /// Applies function to wrapped value in case of `Ok` keeping cost the same
    /// as before.
    pub fn map_ok<B>(self, f: impl FnOnce(T) -> B) -> CostResult<B, E> {
        self.map(|result| result.map(f))
    }

    /// Applies function to wrapped value in case of `Err` keeping cost the same
    /// as before.
    pub fn map_err<B>(self, f: impl FnOnce(E) -> B) -> CostResult<T, B> {
        self.map(|result| result.map_err(f))
    }

    /// `true` if the wrapped result is `Ok`.
    pub fn is_ok(&self) -> bool {
        self.value.is_ok()
    }

    /// `true` if the wrapped result is `Err`.
    pub fn is_err(&self) -> bool {
        self.value.is_err()
    }
}

/// Extension trait to add costs context to values.
pub trait CostsExt {
    /// Wraps any value into a `CostContext` object with provided costs.
    fn wrap_with_cost(self, cost: OperationCost) -> CostContext<Self>
    where
        Self: Sized,
    {
        CostContext { value: self, cost }
    }
}

impl<T> CostsExt for T {}

/// Like `?`, but for `CostResult`: the inner cost is added to the external
/// accumulator and an error returns early carrying everything accumulated so
/// far.
#[macro_export]
macro_rules! cost_return_on_error {
    ( &mut $cost:ident, $($body:tt)+ ) => {
        {
            use $crate::CostsExt;
            let result_with_cost = { $($body)+ };
            let result = result_with_cost.unwrap_add_cost(&mut $cost);
            match result {
                Ok(x) => x,
                Err(e) => return Err(e).wrap_with_cost($cost),
            }
        }
    };
}

/// Like [`cost_return_on_error!`] but for a plain `Result`: no cost is added,
/// an early return carries only what was accumulated before.
#[macro_export]
macro_rules! cost_return_on_error_no_add {
    ( &$cost:ident, $($body:tt)+ ) => {
        {
            use $crate::CostsExt;
            let result = { $($body)+ };
            match result {
                Ok(x) => x,
                Err(e) => return Err(e).wrap_with_cost($cost),
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_sums_every_counter() {
        let a = OperationCost {
            digest_calls: 10,
            node_hash_calls: 9,
            sign_calls: 1,
            signature_checks: 0,
        };
        let b = OperationCost::with_signature_checks(2) + OperationCost::with_digest_calls(1);
        assert_eq!(
            a + b,
            OperationCost {
                digest_calls: 11,
                node_hash_calls: 9,
                sign_calls: 1,
                signature_checks: 2,
            }
        );
    }

    #[test]
    fn test_total_hash_calls() {
        let cost = OperationCost {
            digest_calls: 3,
            node_hash_calls: 2,
            ..Default::default()
        };
        assert_eq!(cost.total_hash_calls(), 5);
        assert!(!cost.is_nothing());
        assert!(OperationCost::default().is_nothing());
    }

    #[test]
    fn test_map_keeps_cost() {
        let initial = CostContext {
            value: 75,
            cost: OperationCost::with_sign_calls(1),
        };

        let mapped = initial.map(|x| x + 25);
        assert_eq!(
            mapped,
            CostContext {
                value: 100,
                cost: OperationCost::with_sign_calls(1),
            }
        );
    }

    #[test]
    fn test_map_ok_err() {
        let initial: CostResult<usize, ()> = CostContext {
            value: Err(()),
            cost: OperationCost::with_node_hash_calls(3),
        };

        let mapped = initial.map_ok(|x| x + 25);
        assert!(mapped.is_err());
        assert_eq!(mapped.cost, OperationCost::with_node_hash_calls(3));
    }

    #[test]
    fn test_cost_return_on_error_keeps_accumulated_cost() {
        fn step(fail: bool) -> CostResult<u32, &'static str> {
            let value = if fail { Err("boom") } else { Ok(1) };
            value.wrap_with_cost(OperationCost::with_digest_calls(1))
        }

        fn run(fail_second: bool) -> CostResult<u32, &'static str> {
            let mut cost = OperationCost::default();
            let a = cost_return_on_error!(&mut cost, step(false));
            let b = cost_return_on_error!(&mut cost, step(fail_second));
            Ok(a + b).wrap_with_cost(cost)
        }

        let ok = run(false);
        assert_eq!(ok.value, Ok(2));
        assert_eq!(ok.cost.digest_calls, 2);

        let err = run(true);
        assert_eq!(err.value, Err("boom"));
        assert_eq!(err.cost.digest_calls, 2);
    }

    #[test]
    fn test_cost_return_on_error_no_add() {
        fn run(input: Result<u32, &'static str>) -> CostResult<u32, &'static str> {
            let cost = OperationCost::with_sign_calls(1);
            let v = cost_return_on_error_no_add!(&cost, input);
            Ok(v).wrap_with_cost(cost)
        }

        assert_eq!(run(Ok(4)).value, Ok(4));
        let err = run(Err("nope"));
        assert_eq!(err.value, Err("nope"));
        assert_eq!(err.cost.sign_calls, 1);
    }
}
