//! Aggregation of the answers returned by multiple upstream endpoints for a
//! single call.
//!
//! A [`MultiResults`] holds exactly one slot per queried endpoint, each
//! either a decoded value or an error. The `reduce_with_*` methods consume
//! the slots and either produce the single authoritative answer or a
//! [`RpcErrors`] list carrying every upstream failure.

use crate::json::Quantity;
use crate::rpc_client::RpcError;
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::{Display, Formatter};

#[cfg(test)]
mod tests;

/// Aggregates responses from multiple upstream endpoints to the same
/// request. Useful to verify that the responses are consistent between each
/// other and avoid a single point of failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiResults<K, V> {
    ok_results: BTreeMap<K, V>,
    errors: BTreeMap<K, RpcError>,
}

impl<K, V> Default for MultiResults<K, V> {
    fn default() -> Self {
        Self {
            ok_results: BTreeMap::new(),
            errors: BTreeMap::new(),
        }
    }
}

impl<K, V> MultiResults<K, V> {
    pub fn len(&self) -> usize {
        self.ok_results.len() + self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ok_results.is_empty() && self.errors.is_empty()
    }

    pub fn into_inner(self) -> (BTreeMap<K, V>, BTreeMap<K, RpcError>) {
        (self.ok_results, self.errors)
    }
}

impl<K: Ord, V> MultiResults<K, V> {
    pub fn from_non_empty_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = (K, Result<V, RpcError>)>,
    {
        let mut results = MultiResults::default();
        for (key, result) in iter {
            results.insert_once(key, result);
        }
        assert!(!results.is_empty(), "ERROR: MultiResults cannot be empty");
        results
    }

    pub fn insert_once(&mut self, key: K, result: Result<V, RpcError>) {
        match result {
            Ok(value) => {
                assert!(!self.errors.contains_key(&key));
                assert!(self.ok_results.insert(key, value).is_none());
            }
            Err(error) => {
                assert!(!self.ok_results.contains_key(&key));
                assert!(self.errors.insert(key, error).is_none());
            }
        }
    }
}

impl<K: Ord, V: PartialEq> MultiResults<K, V> {
    /// Returns the response that occurred at least `min_required` times,
    /// provided no other response class ties with it.
    ///
    /// Occurrence counting compares every value against every class
    /// representative with `PartialEq`: equality on these types follows
    /// canonicalized content (big integers, nested shapes), which a byte
    /// hash would not preserve.
    pub fn reduce_with_most_common(self, min_required: usize) -> Result<V, RpcErrors> {
        let (values, errors) = self.into_inner();
        let mut accumulated = RpcErrors::from_iter(errors.into_values());

        let mut classes: Vec<(V, usize)> = Vec::new();
        for value in values.into_values() {
            match classes
                .iter_mut()
                .find(|(representative, _)| representative == &value)
            {
                Some((_, count)) => *count += 1,
                None => classes.push((value, 1)),
            }
        }

        let max_occurrences = classes.iter().map(|(_, count)| *count).max().unwrap_or(0);
        if max_occurrences < min_required {
            accumulated.push_front(RpcError::NotEnoughMatchingResponses);
            return Err(accumulated);
        }
        let mut winners = classes
            .into_iter()
            .filter(|(_, count)| *count == max_occurrences);
        let (value, _) = winners
            .next()
            .expect("BUG: at least one class reaches the maximum");
        if winners.next().is_some() {
            accumulated.push_front(RpcError::InconsistentResponses);
            return Err(accumulated);
        }
        Ok(value)
    }
}

impl<K: Ord> MultiResults<K, Quantity> {
    /// Returns the median of the numeric responses. There must be at least
    /// `min_required` of them.
    pub fn reduce_with_median(self, min_required: usize) -> Result<Quantity, RpcErrors> {
        let numbers = self.sorted_numbers(min_required)?;
        Ok(median_of(&numbers))
    }

    /// Like [`Self::reduce_with_median`], but returns the largest response
    /// within `distance` *below* the median if there is one. Biasing the
    /// result slightly behind the median keeps it at a height that all but
    /// one endpoint has already reached.
    pub fn reduce_with_median_floor(
        self,
        min_required: usize,
        distance: u64,
    ) -> Result<Quantity, RpcErrors> {
        let numbers = self.sorted_numbers(min_required)?;
        let median = median_of(&numbers);
        let floor = median.saturating_sub(distance);
        let best_below = numbers
            .iter()
            .filter(|n| **n >= floor && **n < median)
            .max()
            .cloned();
        Ok(best_below.unwrap_or(median))
    }

    fn sorted_numbers(self, min_required: usize) -> Result<Vec<Quantity>, RpcErrors> {
        let (values, errors) = self.into_inner();
        let mut accumulated = RpcErrors::from_iter(errors.into_values());
        let mut numbers: Vec<Quantity> = values.into_values().collect();
        if numbers.len() < min_required {
            accumulated.push_front(RpcError::NotEnoughResponses);
            return Err(accumulated);
        }
        numbers.sort_unstable();
        Ok(numbers)
    }
}

/// Median of a non-empty ascending slice. For an even count this is the
/// integer mean of the two middle elements; the midpoint index is derived
/// from the numeric count alone, never from the number of queried
/// endpoints.
fn median_of(sorted: &[Quantity]) -> Quantity {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Quantity::midpoint(&sorted[mid - 1], &sorted[mid])
    } else {
        sorted[mid].clone()
    }
}

/// An ordered list of errors that occurred during one fan-out.
///
/// Errors deduplicate on their rendered message: users see each distinct
/// upstream failure once, no matter how many endpoints reported it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RpcErrors(Vec<RpcError>);

impl RpcErrors {
    pub fn push(&mut self, error: RpcError) {
        if !self.contains_message(&error.to_string()) {
            self.0.push(error);
        }
    }

    pub fn push_front(&mut self, error: RpcError) {
        if !self.contains_message(&error.to_string()) {
            self.0.insert(0, error);
        }
    }

    pub fn as_slice(&self) -> &[RpcError] {
        &self.0
    }

    fn contains_message(&self, message: &str) -> bool {
        self.0.iter().any(|e| e.to_string() == message)
    }
}

impl FromIterator<RpcError> for RpcErrors {
    fn from_iter<I: IntoIterator<Item = RpcError>>(errors: I) -> Self {
        let mut accumulated = Self::default();
        for error in errors {
            accumulated.push(error);
        }
        accumulated
    }
}

impl From<RpcError> for RpcErrors {
    fn from(error: RpcError) -> Self {
        Self(vec![error])
    }
}

impl Display for RpcErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [] => write!(f, "unknown error"),
            [single] => write!(f, "{single}"),
            errors => {
                write!(f, "the following errors occurred: [")?;
                for (n, error) in errors.iter().enumerate() {
                    if n > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{error}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl std::error::Error for RpcErrors {}
