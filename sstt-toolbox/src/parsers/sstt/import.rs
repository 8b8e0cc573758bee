use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::debug;
use ndarray::Array1;

use crate::errors::Error;
use crate::headers::File;
use crate::parsers::sstt::{ChannelHeader, ExperimentHeader};
use crate::sstt_tools::microtimes::gen_microtimes;
use crate::sstt_tools::pulse_period::pulse_period;
use crate::ChannelDataReader;

/// Per-channel timestamp sequences of an imported dataset.
///
/// When `micro_times` is present it is index-aligned with `macro_times`.
#[derive(Debug, Clone)]
pub struct ChannelTimeSeries {
    pub macro_times: Array1<i64>,
    pub micro_times: Option<Array1<i64>>,
}

/// A fully imported SSTT dataset. The channel headers reflect the values
/// after the derivation pass.
pub struct Dataset {
    pub experiment: ExperimentHeader,
    pub channels: BTreeMap<i32, ChannelHeader>,
    pub data: BTreeMap<i32, ChannelTimeSeries>,
}

/// Import an SSTT dataset: load every channel's event data through `reader`,
/// then derive missing photon counts, microtimes and pulse periods.
///
/// Every channel is loaded before any derivation runs, so a pulses channel is
/// always complete by the time another channel generates microtimes from it.
pub fn import_dataset<R: ChannelDataReader>(f: &File, reader: &R) -> Result<Dataset, Error> {
    let File::Sstt(file) = f;
    let experiment = file.experiment.clone();
    let mut channels = file.channels.clone();

    let mut data = BTreeMap::new();
    for &id in channels.keys() {
        let resource = channel_resource(&file.path, id);
        debug!("reading channel {} from {}", id, resource.display());
        let records = reader.read_channel(&resource)?;
        data.insert(
            id,
            ChannelTimeSeries {
                macro_times: records.macro_times,
                micro_times: records.micro_times,
            },
        );
    }

    run_derivation(&mut channels, &mut data)?;

    Ok(Dataset {
        experiment,
        channels,
        data,
    })
}

/// Data files live next to the header file, named `<header>.c<ID>`.
fn channel_resource(header_path: &Path, channel: i32) -> PathBuf {
    let mut resource = header_path.as_os_str().to_os_string();
    resource.push(format!(".c{}", channel));
    PathBuf::from(resource)
}

fn run_derivation(
    channels: &mut BTreeMap<i32, ChannelHeader>,
    data: &mut BTreeMap<i32, ChannelTimeSeries>,
) -> Result<(), Error> {
    // Lazy photon recount. Declared nonzero counts are trusted as-is.
    for (id, channel) in channels.iter_mut() {
        if channel.num_photons == 0 {
            if let Some(series) = data.get(id) {
                channel.num_photons = series.macro_times.len() as i64;
            }
        }
    }

    let mut generated: Vec<(i32, Array1<i64>)> = Vec::new();
    for (&id, channel) in channels.iter() {
        if !(channel.has_pulses_channel && !channel.has_microtimes && channel.num_photons > 0) {
            continue;
        }
        // References were validated at the end of parsing; a miss here means
        // the headers were assembled by hand.
        let reference =
            channel
                .corresponding_pulses_channel
                .ok_or(Error::BadPulsesReference {
                    channel: id,
                    reference: None,
                })?;
        let divider = channels
            .get(&reference)
            .map(|r| r.total_sync_divider)
            .ok_or(Error::BadPulsesReference {
                channel: id,
                reference: Some(reference),
            })?;
        let pulses = data.get(&reference).ok_or(Error::BadPulsesReference {
            channel: id,
            reference: Some(reference),
        })?;
        let events = match data.get(&id) {
            Some(series) => series,
            None => continue,
        };
        debug!("generating microtimes for channel {} against channel {}", id, reference);
        let micro = gen_microtimes(
            pulses.macro_times.view(),
            events.macro_times.view(),
            divider,
        )?;
        generated.push((id, micro));
    }
    for (id, micro) in generated {
        if let Some(series) = data.get_mut(&id) {
            series.micro_times = Some(micro);
        }
    }

    for (id, channel) in channels.iter_mut() {
        channel.pulse_period = if channel.is_pulses_channel {
            data.get(id)
                .map(|series| pulse_period(series.macro_times.view(), channel.total_sync_divider))
                .unwrap_or(0)
        } else {
            0
        };
    }

    Ok(())
}
