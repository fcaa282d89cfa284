use crate::errors::ForestError;

// Validation
pub fn validate_float_parameter(value: f64, min: f64, max: f64, parameter: &str) -> Result<(), ForestError> {
    if value.is_nan() || value < min || max < value {
        let ex_msg = format!("real value within range {} and {}", min, max);
        Err(ForestError::InvalidParameter(
            parameter.to_string(),
            ex_msg,
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Check `min < value < max`, both ends excluded.
pub fn validate_open_float_parameter(value: f64, min: f64, max: f64, parameter: &str) -> Result<(), ForestError> {
    if value.is_nan() || value <= min || max <= value {
        let ex_msg = format!("real value strictly between {} and {}", min, max);
        Err(ForestError::InvalidParameter(
            parameter.to_string(),
            ex_msg,
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}

pub fn validate_positive_usize_parameter(value: usize, parameter: &str) -> Result<(), ForestError> {
    if value == 0 {
        Err(ForestError::InvalidParameter(
            parameter.to_string(),
            "a positive integer".to_string(),
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Partition the half-open range `[start, end)` into at most `num_parts`
/// contiguous parts and return their boundaries.
///
/// The result holds one more element than there are parts: part `i` covers
/// `result[i]..result[i + 1]`. Longer parts come first, part lengths differ by
/// at most one, and the parts cover the range exactly. An empty range has no
/// parts, and `num_parts` is capped at the range length.
pub fn split_sequence(start: usize, end: usize, num_parts: usize) -> Vec<usize> {
    let length = end.saturating_sub(start);
    if length == 0 {
        return vec![start];
    }
    let num_parts = num_parts.clamp(1, length);
    let part_length_short = length / num_parts;
    let cut_pos = length % num_parts;

    let mut result = Vec::with_capacity(num_parts + 1);
    let mut position = start;
    result.push(position);
    for part in 0..num_parts {
        position += part_length_short + usize::from(part < cut_pos);
        result.push(position);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sequence_long_parts_first() {
        assert_eq!(split_sequence(0, 5, 2), vec![0, 3, 5]);
        assert_eq!(split_sequence(0, 10, 3), vec![0, 4, 7, 10]);
        assert_eq!(split_sequence(2, 6, 1), vec![2, 6]);
    }

    #[test]
    fn test_split_sequence_more_parts_than_elements() {
        assert_eq!(split_sequence(0, 3, 8), vec![0, 1, 2, 3]);
        assert_eq!(split_sequence(0, 4, 0), vec![0, 4]);
    }

    #[test]
    fn test_split_sequence_empty_range() {
        assert_eq!(split_sequence(0, 0, 4), vec![0]);
        assert_eq!(split_sequence(5, 3, 2), vec![5]);
    }

    #[test]
    fn test_split_sequence_covers_range() {
        for length in 0..40 {
            for parts in 1..12 {
                let bounds = split_sequence(0, length, parts);
                let covered: usize = bounds.windows(2).map(|w| w[1] - w[0]).sum();
                assert_eq!(covered, length);
                assert!(bounds.len() - 1 <= parts);
                assert!(bounds.windows(2).all(|w| w[1] > w[0]));
            }
        }
    }

    #[test]
    fn test_validate_float_parameter() {
        assert!(validate_float_parameter(0.5, 0.0, 1.0, "sample_fraction").is_ok());
        assert!(validate_float_parameter(1.0, 0.0, 1.0, "sample_fraction").is_ok());
        assert!(validate_float_parameter(f64::NAN, 0.0, 1.0, "sample_fraction").is_err());
        assert!(validate_open_float_parameter(1.0, 0.0, 1.0, "honesty_fraction").is_err());
        assert!(validate_open_float_parameter(0.0, 0.0, 1.0, "honesty_fraction").is_err());
        assert!(validate_positive_usize_parameter(0, "ci_group_size").is_err());
    }
}
