// ============================================================
// Layer 4 - Record-Count Validator
// ============================================================
// All feature streams and the label stream must describe the
// same records. Two passes:
//
//   1. settle the authoritative count:
//        labels present → label count
//        otherwise      → first tensor met (depth-first)
//   2. every tensor, recursing through lists, must match it
//
// Nothing is ever truncated to make counts agree.

use crate::data::coercion::Coerced;
use crate::domain::bundle::HostTensor;
use crate::domain::error::DataError;

/// Returns the record count shared by `inputs` and `labels`.
/// With no tensors and no labels at all, the count is 0.
pub fn count_records(inputs: &[&Coerced], labels: Option<&HostTensor>) -> Result<usize, DataError> {
    let expected = match labels {
        Some(labels) => Some(labels.num_records()),
        None => inputs
            .iter()
            .find_map(|c| c.first_tensor())
            .map(HostTensor::num_records),
    };

    let Some(expected) = expected else {
        return Ok(0);
    };

    for input in inputs {
        check(input, expected)?;
    }
    Ok(expected)
}

fn check(input: &Coerced, expected: usize) -> Result<(), DataError> {
    match input {
        Coerced::Tensor(t) if t.num_records() != expected => Err(DataError::RecordCountMismatch {
            expected,
            found: t.num_records(),
        }),
        Coerced::Tensor(_) => Ok(()),
        Coerced::List(items) => items.iter().try_for_each(|item| check(item, expected)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: usize, width: usize) -> Coerced {
        Coerced::Tensor(HostTensor::new(vec![0; n * width], vec![n, width]).unwrap())
    }

    #[test]
    fn test_matching_counts() {
        let (a, b, c) = (rows(100, 8), rows(100, 8), rows(100, 8));
        let labels = HostTensor::vector(vec![0; 100]);
        assert_eq!(count_records(&[&a, &b, &c], Some(&labels)).unwrap(), 100);
    }

    #[test]
    fn test_label_count_mismatch() {
        let features = rows(100, 8);
        let labels   = HostTensor::vector(vec![1; 99]);
        let err = count_records(&[&features], Some(&labels)).unwrap_err();
        assert_eq!(err, DataError::RecordCountMismatch { expected: 99, found: 100 });
    }

    #[test]
    fn test_feature_streams_must_agree_without_labels() {
        let (a, b) = (rows(10, 4), rows(9, 4));
        let err = count_records(&[&a, &b], None).unwrap_err();
        assert_eq!(err, DataError::RecordCountMismatch { expected: 10, found: 9 });
    }

    #[test]
    fn test_lists_are_walked() {
        let nested = Coerced::List(vec![rows(5, 2), Coerced::List(vec![rows(4, 2)])]);
        let labels = HostTensor::vector(vec![0; 5]);
        assert!(count_records(&[&nested], Some(&labels)).is_err());

        let nested = Coerced::List(vec![rows(5, 2), Coerced::List(vec![rows(5, 3)])]);
        assert_eq!(count_records(&[&nested], None).unwrap(), 5);
    }

    #[test]
    fn test_no_inputs_counts_zero() {
        assert_eq!(count_records(&[], None).unwrap(), 0);
    }
}
