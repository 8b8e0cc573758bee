use ndarray::{Array1, ArrayView1};

use crate::errors::Error;

/// Merge groups of `new_bin_size` consecutive histogram bins into one.
///
/// Counts of each group are summed; trailing bins that do not fill a whole
/// group are discarded.
pub fn rebin(histogram: ArrayView1<i64>, new_bin_size: usize) -> Result<Array1<i64>, Error> {
    if new_bin_size == 0 || new_bin_size > histogram.len() {
        return Err(Error::InvalidInput(format!(
            "new bin size must be between 1 and the number of bins, found {}",
            new_bin_size
        )));
    }

    let mut rebinned = Array1::<i64>::zeros(histogram.len() / new_bin_size);
    let mut acc = 0;
    let mut bin = 0;
    for (i, &count) in histogram.iter().enumerate() {
        acc += count;
        if (i + 1) % new_bin_size == 0 {
            rebinned[bin] = acc;
            acc = 0;
            bin += 1;
        }
    }

    Ok(rebinned)
}

/// Bin edges matching a histogram rebinned with [`rebin`]: every
/// `new_bin_size`-th edge survives, the rest are dropped.
pub fn rebin_bin_edges(
    bin_edges: ArrayView1<i64>,
    new_bin_size: usize,
) -> Result<Array1<i64>, Error> {
    if bin_edges.len() < 2 {
        return Err(Error::InvalidInput(String::from(
            "bin_edges needs a minimum length of two",
        )));
    }
    if new_bin_size == 0 || new_bin_size > bin_edges.len() - 1 {
        return Err(Error::InvalidInput(format!(
            "new bin size must be between 1 and the number of bins, found {}",
            new_bin_size
        )));
    }

    Ok(bin_edges.iter().step_by(new_bin_size).copied().collect())
}
