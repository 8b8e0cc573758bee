use ndarray::{Array1, ArrayView1};

use crate::errors::Error;

/// Cross-correlate two timestamp sequences over unit-width lag bins.
///
/// ## Parameters
///
///    - bin_edges: ascending lag-bin boundaries spaced exactly one tick
///      apart, so each lag maps straight onto a histogram index,
///    - left: ascending macro timestamps of the first channel,
///    - right: ascending macro timestamps of the second channel.
///
/// ## Algorithm description
/// With unit bins the lag `right[j] - (t + edges[0])` of a photon pair is
/// itself the histogram index, so no bin search is needed. For every left
/// timestamp the right sequence is scanned from the first photon that was
/// still behind the previous left timestamp, incrementing one bin per pair
/// until the lag runs past the last bin.
///
/// For wide or unevenly spaced bins use `correlate_fcs` instead.
pub fn correlate_lin(
    bin_edges: ArrayView1<i64>,
    left: ArrayView1<i64>,
    right: ArrayView1<i64>,
) -> Result<Array1<i64>, Error> {
    if bin_edges.len() < 2 {
        return Err(Error::InvalidInput(String::from(
            "bin_edges needs a minimum length of two",
        )));
    }
    if bin_edges[1] - bin_edges[0] != 1 {
        return Err(Error::InvalidInput(String::from(
            "bins must have unit width",
        )));
    }

    let mut histogram = Array1::<i64>::zeros(bin_edges.len() - 1);
    if left.is_empty() || right.is_empty() {
        return Ok(histogram);
    }

    let mut next_to_check = 0;
    let mut prev_left = i64::MIN;

    for &t in left.iter() {
        if t < prev_left {
            return Err(Error::InvalidInput(format!(
                "left timestamp {} is out of order; timestamps must be ascending",
                t
            )));
        }
        prev_left = t;

        for j in next_to_check..right.len() {
            let lag = right[j] - (t + bin_edges[0]);
            if lag < 0 {
                next_to_check = j;
                continue;
            }
            if lag as usize >= histogram.len() {
                break;
            }
            histogram[lag as usize] += 1;
        }
    }

    Ok(histogram)
}
