use ndarray::{Array1, ArrayView1};

use crate::errors::Error;

/// Cross-correlate two timestamp sequences over arbitrary bin edges.
///
/// ## Parameters
///
///    - bin_edges: ascending lag-bin boundaries, in the same ticks as the
///      timestamps. Negative edges are valid and correlate backwards in time.
///    - left: ascending macro timestamps of the first channel,
///    - right: ascending macro timestamps of the second channel.
///
/// ## Algorithm description
/// For every left timestamp `t` the bin between `edges[j]` and `edges[j+1]`
/// counts the right timestamps falling in `[t + edges[j], t + edges[j + 1])`.
/// Those counts are the differences of successive lower-bound positions of
/// `t + edge` in the right sequence. Because both the left timestamps and the
/// edges ascend, each edge keeps a cursor into the right sequence that only
/// ever moves forward, so the whole correlation is a single sweep.
///
/// The result is a raw coincidence histogram with one count per photon pair;
/// feed it through `norm_corr` to turn it into a correlation amplitude.
pub fn correlate_fcs(
    bin_edges: ArrayView1<i64>,
    left: ArrayView1<i64>,
    right: ArrayView1<i64>,
) -> Result<Array1<i64>, Error> {
    if bin_edges.len() < 2 {
        return Err(Error::InvalidInput(String::from(
            "bin_edges needs a minimum length of two",
        )));
    }
    let edges = bin_edges.to_vec();
    if edges.windows(2).any(|pair| pair[1] < pair[0]) {
        return Err(Error::InvalidInput(String::from(
            "bin edges must be ascending",
        )));
    }

    let mut histogram = Array1::<i64>::zeros(edges.len() - 1);
    if left.is_empty() || right.is_empty() {
        return Ok(histogram);
    }

    let right = right.to_vec();
    let mut cursors = vec![0usize; edges.len()];
    let mut prev_left = i64::MIN;

    for &t in left.iter() {
        if t < prev_left {
            return Err(Error::InvalidInput(format!(
                "left timestamp {} is out of order; timestamps must be ascending",
                t
            )));
        }
        prev_left = t;

        let target = t + edges[0];
        cursors[0] += right[cursors[0]..].partition_point(|&stamp| stamp < target);
        let mut prev_index = cursors[0];

        for j in 1..edges.len() {
            let target = t + edges[j];
            cursors[j] += right[cursors[j]..].partition_point(|&stamp| stamp < target);
            histogram[j - 1] += (cursors[j] - prev_index) as i64;
            prev_index = cursors[j];
        }
    }

    Ok(histogram)
}
