pub mod header;
pub mod import;

use std::collections::{BTreeMap, HashMap};
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::errors::Error;

pub type Fields = HashMap<String, FieldValue>;

/// Typed value of a header field. Every known field of either header section
/// is bound to exactly one of these variants; unknown field names bypass the
/// schema and land in the string-valued `extra` table of their section.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Timestamp(DateTime<Utc>),
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            FieldValue::Int(x) => write!(f, "{}", x),
            FieldValue::Float(x) => write!(f, "{}", x),
            FieldValue::Bool(x) => write!(f, "{}", x),
            FieldValue::Str(x) => write!(f, "{}", x),
            FieldValue::Timestamp(x) => write!(f, "{}", x),
        }
    }
}

// First line of an SSTT header file.
const MAGIC_INFO: &str = "Simple Small Time Tagged (V2)";

const EXPERIMENT_HEADER_MARKER: &str = "EXPERIMENT_HEADER";
const CHANNEL_HEADER_MARKER: &str = "CHANNEL_HEADER";

pub const FIELD_TIME_UNIT: &str = "Time_unit_seconds";
pub const FIELD_DEVICE_TYPE: &str = "device_type";
pub const FIELD_START_TIMESTAMP: &str = "experiment_start_timestamp_UTC";

const COL_CHANNEL_ID: &str = "ChannelID";
const COL_FILENAME: &str = "Filename";
const COL_NUM_PHOTONS: &str = "NumPhotons";
const COL_NUM_OVERFLOWS: &str = "NumOverflows";
const COL_FILESIZE: &str = "Filesize";
const COL_HW_SYNC_DIVIDER: &str = "HardwareSyncDivider";
const COL_ADD_SYNC_DIVIDER: &str = "AdditionalSyncDivider";
const COL_TOTAL_SYNC_DIVIDER: &str = "TotalSyncDivider";
const COL_IS_PULSES: &str = "IsPulsesChannel";
const COL_HAS_PULSES: &str = "HasPulsesChannel";
const COL_HAS_MICROTIMES: &str = "HasMicrotimes";
const COL_CORR_PULSES: &str = "CorrespondingPulsesChannel";
const COL_MICRO_DELAY: &str = "MicroDelayTime";

/// Experiment-wide metadata parsed from the `EXPERIMENT_HEADER` section.
///
/// Known fields live in `fields` under their declared type; anything the
/// schema does not know about is kept verbatim in `extra`.
#[derive(Debug, Clone)]
pub struct ExperimentHeader {
    pub fields: Fields,
    pub extra: HashMap<String, String>,
}

impl Default for ExperimentHeader {
    fn default() -> Self {
        let mut fields = Fields::new();
        fields.insert(FIELD_TIME_UNIT.to_string(), FieldValue::Float(81e-12));
        fields.insert(
            FIELD_DEVICE_TYPE.to_string(),
            FieldValue::Str(String::from("qutau")),
        );
        ExperimentHeader {
            fields,
            extra: HashMap::new(),
        }
    }
}

use sstt_toolbox_proc_macros::read_sstt_field;

impl ExperimentHeader {
    /// Duration of one raw clock tick, in seconds.
    pub fn time_unit_seconds(&self) -> Result<f64, Error> {
        let fields = &self.fields;
        Ok(read_sstt_field!(fields[FIELD_TIME_UNIT] as Float))
    }

    pub fn device_type(&self) -> Result<String, Error> {
        let fields = &self.fields;
        Ok(read_sstt_field!(fields[FIELD_DEVICE_TYPE] as Str))
    }

    /// Start of the acquisition, if the header declared one.
    pub fn start_timestamp_utc(&self) -> Option<DateTime<Utc>> {
        match self.fields.get(FIELD_START_TIMESTAMP) {
            Some(FieldValue::Timestamp(t)) => Some(*t),
            _ => None,
        }
    }
}

/// Per-channel metadata parsed from one row of the `CHANNEL_HEADER` section.
///
/// `num_photons` and `pulse_period` are further updated by the derivation
/// pass during import; everything else is fixed once the row is consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelHeader {
    pub filename: String,
    pub num_photons: i64,
    pub num_overflows: i64,
    pub filesize: i64,
    pub hardware_sync_divider: i64,
    pub additional_sync_divider: i64,
    pub total_sync_divider: i64,
    pub is_pulses_channel: bool,
    pub has_pulses_channel: bool,
    pub has_microtimes: bool,
    pub corresponding_pulses_channel: Option<i32>,
    pub micro_delay_time: i64,
    pub pulse_period: i64,
    pub extra: HashMap<String, String>,
}

impl Default for ChannelHeader {
    fn default() -> Self {
        ChannelHeader {
            filename: String::from("None"),
            num_photons: 0,
            num_overflows: 0,
            filesize: 0,
            hardware_sync_divider: 1,
            additional_sync_divider: 1,
            total_sync_divider: 1,
            is_pulses_channel: false,
            has_pulses_channel: false,
            has_microtimes: false,
            corresponding_pulses_channel: None,
            micro_delay_time: 0,
            pulse_period: 0,
            extra: HashMap::new(),
        }
    }
}

/// Header of an SSTT dataset.
pub struct SSTTFile {
    pub path: PathBuf,
    pub experiment: ExperimentHeader,
    pub channels: BTreeMap<i32, ChannelHeader>,
}

impl SSTTFile {
    /// Create an SSTTFile from the path of its header file.
    ///
    /// If the file does not exist a FileNotAvailable error will be returned.
    pub fn new(filename: PathBuf) -> Result<Self, Error> {
        if filename.exists() {
            let (experiment, channels) = self::header::read_sstt_header(&filename)?;
            Ok(Self {
                path: filename,
                experiment,
                channels,
            })
        } else {
            let filename_string = filename.display().to_string();
            Err(Error::FileNotAvailable(filename_string))
        }
    }
}

impl std::fmt::Display for SSTTFile {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut string = String::from("");
        for (key, value) in &self.experiment.fields {
            string.push_str(&format!("{:<35}: {}\n", key, value));
        }
        for (key, value) in &self.experiment.extra {
            string.push_str(&format!("{:<35}: {}\n", key, value));
        }
        for (id, channel) in &self.channels {
            string.push_str(&format!(
                "channel {:<4} {:<24} photons: {:<12} pulses: {:<5} has pulses: {}\n",
                id,
                channel.filename,
                channel.num_photons,
                channel.is_pulses_channel,
                channel.has_pulses_channel,
            ));
        }
        write!(f, "{}", string)
    }
}

/// Check whether the file at `filename` starts with the SSTT header magic.
pub fn is_sstt_header_file(filename: &PathBuf) -> bool {
    let file = match std::fs::File::open(filename) {
        Ok(f) => f,
        Err(_) => return false,
    };
    let mut first_line = String::new();
    if BufReader::new(file).read_line(&mut first_line).is_err() {
        return false;
    }
    first_line.trim_end() == MAGIC_INFO
}
