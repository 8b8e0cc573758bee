pub mod correlate_fcs;
pub mod correlate_lin;
pub mod microtimes;
pub mod norm_corr;
pub mod pulse_period;
pub mod rebin;
