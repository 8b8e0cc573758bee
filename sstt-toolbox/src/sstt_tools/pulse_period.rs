use ndarray::{s, ArrayView1};

/// Estimate the interval between successive reference edges, corrected by
/// the sync divider applied during acquisition.
///
/// The estimate is the mean of the consecutive macro-timestamp differences,
/// divided by `total_sync_divider` and rounded to the nearest tick. A channel
/// with fewer than two events has no measurable interval and yields 0.
pub fn pulse_period(macro_times: ArrayView1<i64>, total_sync_divider: i64) -> i64 {
    if macro_times.len() < 2 || total_sync_divider < 1 {
        return 0;
    }

    let diffs = &macro_times.slice(s![1..]) - &macro_times.slice(s![..-1]);
    let mean = diffs.sum() as f64 / diffs.len() as f64;

    (mean / total_sync_divider as f64).round() as i64
}
