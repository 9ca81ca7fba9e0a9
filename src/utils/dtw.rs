use ndarray::{Array2, ArrayView1};

/// Cumulative cost matrix and backtrace table of a DTW run.
///
/// Both tables are `(n + 1) x (m + 1)`. Row and column 0 are the border:
/// `cost[(0, 0)] = 0` and every other border cell is `+inf`, so a path can
/// only start at the origin.
#[derive(Debug, Clone)]
pub struct DtwResult {
    /// Accumulated alignment cost.
    pub cost: Array2<f64>,
    /// Predecessor coordinates of each interior cell.
    pub backtrace: Array2<(usize, usize)>,
}

impl DtwResult {
    /// Total alignment cost (bottom-right cell).
    pub fn distance(&self) -> f64 {
        let (n, m) = self.cost.dim();
        self.cost[(n - 1, m - 1)]
    }

    /// Optimal warping path as 0-based `(i, j)` frame pairs, origin first.
    ///
    /// Empty when either input was empty.
    pub fn path(&self) -> Vec<(usize, usize)> {
        let (rows, cols) = self.cost.dim();
        let (mut i, mut j) = (rows - 1, cols - 1);
        let mut path = Vec::with_capacity(i + j);
        while i > 0 && j > 0 {
            path.push((i - 1, j - 1));
            (i, j) = self.backtrace[(i, j)];
        }
        path.reverse();
        path
    }
}

fn euclidean(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Compute the full Dynamic Time Warping cost matrix and backtrace.
///
/// Local cost is the Euclidean distance between frames `x[:, i - 1]` and
/// `y[:, j - 1]`. Each cell adds the cheapest of its vertical `(i - 1, j)`,
/// horizontal `(i, j - 1)` and diagonal `(i - 1, j - 1)` predecessors; on
/// equal cost the earlier of those three wins.
///
/// # Arguments
/// * `x` - First feature matrix (n_features x n_frames_x)
/// * `y` - Second feature matrix (n_features x n_frames_y)
///
/// # Errors
/// Returns `Error::ShapeMismatch` if both inputs are non-empty and have a
/// different number of features.
///
/// # Example
/// ```
/// use reprise::utils::dtw;
/// use ndarray::Array2;
///
/// let x = Array2::from_shape_vec((1, 3), vec![1.0, 2.0, 3.0]).unwrap();
/// let y = Array2::from_shape_vec((1, 4), vec![1.0, 2.0, 2.0, 3.0]).unwrap();
/// let result = dtw(&x, &y).unwrap();
/// assert_eq!(result.distance(), 0.0);
/// assert_eq!(result.path().first(), Some(&(0, 0)));
/// assert_eq!(result.path().last(), Some(&(2, 3)));
/// ```
pub fn dtw(x: &Array2<f64>, y: &Array2<f64>) -> crate::Result<DtwResult> {
    let n = x.ncols();
    let m = y.ncols();

    if n > 0 && m > 0 && x.nrows() != y.nrows() {
        return Err(crate::Error::ShapeMismatch {
            expected: format!("{} features", x.nrows()),
            got: format!("{} features", y.nrows()),
        });
    }

    let mut cost = Array2::<f64>::from_elem((n + 1, m + 1), f64::INFINITY);
    let mut backtrace = Array2::<(usize, usize)>::from_elem((n + 1, m + 1), (0, 0));
    cost[(0, 0)] = 0.0;

    for i in 1..=n {
        let xi = x.column(i - 1);
        for j in 1..=m {
            let local = euclidean(xi, y.column(j - 1));

            let mut best = (cost[(i - 1, j)], (i - 1, j));
            if cost[(i, j - 1)] < best.0 {
                best = (cost[(i, j - 1)], (i, j - 1));
            }
            if cost[(i - 1, j - 1)] < best.0 {
                best = (cost[(i - 1, j - 1)], (i - 1, j - 1));
            }

            cost[(i, j)] = local + best.0;
            backtrace[(i, j)] = best.1;
        }
    }

    Ok(DtwResult { cost, backtrace })
}

/// DTW distance only.
///
/// `0` when both inputs are empty, `+inf` when exactly one is.
pub fn dtw_distance(x: &Array2<f64>, y: &Array2<f64>) -> crate::Result<f64> {
    Ok(dtw(x, y)?.distance())
}
