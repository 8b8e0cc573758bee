pub mod errors;
pub mod headers;
pub mod parsers;
pub mod sstt_tools;

use std::path::Path;

use ndarray::Array1;

use crate::errors::Error;

/// Event records decoded from a single per-channel data file.
///
/// Only legacy (v1) data files carry microtimes explicitly; for everything
/// else `micro_times` is `None` and microtimes are reconstructed during
/// import from the corresponding pulses channel.
#[derive(Debug, Clone)]
pub struct ChannelRecords {
    pub macro_times: Array1<i64>,
    pub micro_times: Option<Array1<i64>>,
    pub num_overflows: u64,
}

/// Seam to the binary per-channel event decoder.
///
/// The importer hands the reader one resource path per channel, derived from
/// the header path by appending `.c<ID>`. Decoding the proprietary event
/// layout is the reader's business; the importer only requires macro
/// timestamps to come back in ascending order.
pub trait ChannelDataReader {
    fn read_channel(&self, resource: &Path) -> Result<ChannelRecords, Error>;
}
