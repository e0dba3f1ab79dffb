use crate::errors::TreeError;
use nalgebra::{DMatrix, DVector};

/// Sum of a distribution.
pub fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

/// Arithmetic mean of a distribution.
pub fn mean(values: &[f64]) -> f64 {
    sum(values) / values.len() as f64
}

/// Population variance of a distribution. Not bias corrected.
/// The variance of an empty distribution is NaN, not an error.
pub fn variance(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = mean(values);
    let mut sum1 = 0.0;
    let mut sum2 = 0.0;
    for value in values {
        let deviation = value - mean;
        sum1 += deviation * deviation;
        sum2 += deviation;
    }
    (sum1 - (sum2 * sum2 / n)) / n
}

/// View a vector as a single-column matrix.
pub fn column(vector: &[f64]) -> Vec<Vec<f64>> {
    vector.iter().map(|v| vec![*v]).collect()
}

/// Dense matrix product. Any operand with a zero dimension yields an
/// empty result; non-conformant inner dimensions are an error.
pub fn multiply(a: &[Vec<f64>], b: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, TreeError> {
    let n = a.len();
    let m = b.len();
    if n == 0 || m == 0 {
        return Ok(Vec::new());
    }

    let p = b[0].len();
    if m != a[0].len() {
        return Err(TreeError::ShapeMismatch(format!(
            "non-conformant matrix dimensions: [{} x {}] * [{} x {}]",
            n, a[0].len(), m, p,
        )));
    }

    if p == 0 {
        return Ok(Vec::new());
    }

    let mut product = vec![vec![0.0; p]; n];
    let mut b_col = vec![0.0; m];
    for j in 0..p {
        for (k, value) in b_col.iter_mut().enumerate() {
            *value = b[k][j];
        }
        for (row, out) in a.iter().zip(product.iter_mut()) {
            out[j] = row.iter().zip(&b_col).map(|(x, y)| x * y).sum();
        }
    }
    Ok(product)
}

/// Solve `X w = y` in the least-squares sense.
///
/// The decomposition is left entirely to the SVD: a rank-deficient
/// system produces the minimum-norm solution rather than an error.
/// Empty systems cannot be factored and are refused.
pub fn least_squares(x: &[Vec<f64>], y: &[f64]) -> Result<Vec<f64>, TreeError> {
    let rows = x.len();
    let cols = if rows > 0 { x[0].len() } else { 0 };
    if rows == 0 || cols == 0 {
        return Err(TreeError::SolverFailure(format!(
            "cannot solve an empty [{rows} x {cols}] system"
        )));
    }
    if y.len() != rows {
        return Err(TreeError::ShapeMismatch(format!(
            "{} equations against {} targets",
            rows,
            y.len(),
        )));
    }

    let a = DMatrix::from_fn(rows, cols, |i, j| x[i][j]);
    let b = DVector::from_column_slice(y);
    let weights = a
        .svd(true, true)
        .solve(&b, f64::EPSILON)
        .map_err(|e| TreeError::SolverFailure(e.to_string()))?;
    Ok(weights.iter().copied().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TreeError;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[1.0, 2.0, 3.0, 4.0]), 2.5);
    }

    #[test]
    fn test_variance() {
        assert_eq!(variance(&[1.0, 1.0, 1.0]), 0.0);
        assert!((variance(&[1.0, 2.0, 3.0]) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_variance_empty_is_nan() {
        assert!(variance(&[]).is_nan());
    }

    #[test]
    fn test_multiply_scalar() {
        let a = vec![vec![3.0]];
        let b = vec![vec![4.0]];
        assert_eq!(multiply(&a, &b).unwrap(), vec![vec![12.0]]);
    }

    #[test]
    fn test_multiply() {
        let a = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let b = vec![vec![5.0, 6.0], vec![7.0, 8.0]];
        let c = multiply(&a, &b).unwrap();
        assert_eq!(c, vec![vec![19.0, 22.0], vec![43.0, 50.0]]);
    }

    #[test]
    fn test_multiply_empty_dimension() {
        let a: Vec<Vec<f64>> = Vec::new();
        let b = vec![vec![1.0]];
        assert!(multiply(&a, &b).unwrap().is_empty());
        assert!(multiply(&b, &a).unwrap().is_empty());
    }

    #[test]
    fn test_multiply_non_conformant() {
        let a = vec![vec![1.0, 2.0, 3.0]];
        let b = vec![vec![1.0], vec![2.0]];
        let err = multiply(&a, &b).unwrap_err();
        assert!(matches!(err, TreeError::ShapeMismatch(_)));
        assert!(err.to_string().contains("[1 x 3] * [2 x 1]"));
    }

    #[test]
    fn test_column() {
        assert_eq!(column(&[1.0, 2.0]), vec![vec![1.0], vec![2.0]]);
    }

    #[test]
    fn test_least_squares_exact() {
        // y = 3 + 3x over the columns [1, x].
        let x = vec![
            vec![1.0, 1.0],
            vec![1.0, 2.0],
            vec![1.0, 3.0],
        ];
        let y = vec![6.0, 9.0, 12.0];
        let w = least_squares(&x, &y).unwrap();
        assert!((w[0] - 3.0).abs() < 1e-9);
        assert!((w[1] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_least_squares_empty() {
        let err = least_squares(&[], &[]).unwrap_err();
        assert!(matches!(err, TreeError::SolverFailure(_)));
    }
}
