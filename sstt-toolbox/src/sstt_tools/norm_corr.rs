use ndarray::{Array1, ArrayView1};

use crate::errors::Error;

/// Normalize a raw coincidence histogram into a correlation amplitude.
///
/// ## Parameters
///
///    - histogram: raw pair counts, as produced by `correlate_fcs` or
///      `correlate_lin`,
///    - bin_edges: the lag-bin boundaries the histogram was built with,
///    - t_min, t_max: first and last macro timestamp of the acquisition,
///    - n_photons_left, n_photons_right: photon counts of the two channels.
///
/// ## Algorithm description
/// Each bin is divided by the number of pairs a pair of uncorrelated
/// channels would put there: the bin width times the acquisition span that
/// can still host a pair at that lag, scaled by the photon rates of the two
/// channels. A flat, uncorrelated pair of channels then normalizes to 1.
/// Bins whose expected count is zero are reported as 0.
pub fn norm_corr(
    histogram: ArrayView1<i64>,
    bin_edges: ArrayView1<i64>,
    t_min: i64,
    t_max: i64,
    n_photons_left: i64,
    n_photons_right: i64,
) -> Result<Array1<f64>, Error> {
    if bin_edges.len() < 2 {
        return Err(Error::InvalidInput(String::from(
            "bin_edges needs a minimum length of two",
        )));
    }
    if histogram.len() != bin_edges.len() - 1 {
        return Err(Error::InvalidInput(String::from(
            "histogram must be exactly one element shorter than bin_edges",
        )));
    }

    let span = (t_max - t_min) as f64;
    let rate_product = n_photons_left as f64 * n_photons_right as f64 / span.powi(2);

    let mut normalized = Array1::<f64>::zeros(histogram.len());
    for i in 0..histogram.len() {
        let width = (bin_edges[i + 1] - bin_edges[i]) as f64;
        let usable_span = span + 0.5 - 0.5 * (bin_edges[i] + bin_edges[i + 1]) as f64;
        let expected = width * usable_span * rate_product;
        normalized[i] = if expected == 0.0 {
            0.0
        } else {
            histogram[i] as f64 / expected
        };
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn counts_scale_by_the_expected_pair_count() {
        let histogram = array![4];
        let edges = array![0, 1];
        let normalized = norm_corr(histogram.view(), edges.view(), 0, 10, 2, 2).unwrap();
        // width 1, usable span 10, rate product 4 / 100.
        assert_eq!(normalized, array![10.0]);
    }

    #[test]
    fn zero_expected_count_normalizes_to_zero() {
        let histogram = array![4];
        let edges = array![0, 1];
        let normalized = norm_corr(histogram.view(), edges.view(), 0, 10, 0, 2).unwrap();
        assert_eq!(normalized, array![0.0]);
    }

    #[test]
    fn histogram_and_edges_must_agree_in_length() {
        let histogram = array![1, 2];
        let edges = array![0, 1];
        assert!(matches!(
            norm_corr(histogram.view(), edges.view(), 0, 10, 1, 1),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn a_single_edge_is_an_error() {
        let histogram = Array1::<i64>::zeros(0);
        let edges = array![0];
        assert!(matches!(
            norm_corr(histogram.view(), edges.view(), 0, 10, 1, 1),
            Err(Error::InvalidInput(_))
        ));
    }
}
