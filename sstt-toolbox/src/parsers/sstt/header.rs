use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use log::debug;

use crate::errors::{Error, Section};
use crate::parsers::sstt::{
    ChannelHeader, ExperimentHeader, FieldValue, CHANNEL_HEADER_MARKER, COL_ADD_SYNC_DIVIDER,
    COL_CHANNEL_ID, COL_CORR_PULSES, COL_FILENAME, COL_FILESIZE, COL_HAS_MICROTIMES,
    COL_HAS_PULSES, COL_HW_SYNC_DIVIDER, COL_IS_PULSES, COL_MICRO_DELAY, COL_NUM_OVERFLOWS,
    COL_NUM_PHOTONS, COL_TOTAL_SYNC_DIVIDER, EXPERIMENT_HEADER_MARKER, FIELD_DEVICE_TYPE,
    FIELD_START_TIMESTAMP, FIELD_TIME_UNIT,
};

/// Parser state. The column lists recognized so far travel with the state so
/// that value rows can be checked against them.
enum State {
    Scanning,
    AwaitExpColumns,
    AwaitExpRow { columns: Vec<String> },
    AwaitChanColumns,
    ChanRows { columns: Vec<String>, id_index: usize },
}

/// Read and parse an SSTT header file.
pub fn read_sstt_header(
    filename: &PathBuf,
) -> Result<(ExperimentHeader, BTreeMap<i32, ChannelHeader>), Error> {
    let text = std::fs::read_to_string(filename)?;
    parse_header_lines(text.lines())
}

/// Parse an SSTT header from its line sequence.
///
/// Both sections are optional; an input without markers yields a header made
/// of defaults and an empty channel mapping. Any structural mismatch aborts
/// the whole parse, there is no row-level recovery.
pub fn parse_header_lines<'a, I>(
    lines: I,
) -> Result<(ExperimentHeader, BTreeMap<i32, ChannelHeader>), Error>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut experiment = ExperimentHeader::default();
    let mut channels: BTreeMap<i32, ChannelHeader> = BTreeMap::new();
    let mut state = State::Scanning;

    for (idx, raw) in lines.into_iter().enumerate() {
        let lineno = idx + 1;
        let line = raw.trim_end_matches('\r');

        if line == EXPERIMENT_HEADER_MARKER && matches!(state, State::Scanning) {
            state = State::AwaitExpColumns;
            continue;
        }
        if line == CHANNEL_HEADER_MARKER {
            state = State::AwaitChanColumns;
            continue;
        }

        state = match state {
            State::Scanning => State::Scanning,
            State::AwaitExpColumns => State::AwaitExpRow {
                columns: line.split('\t').map(str::to_string).collect(),
            },
            State::AwaitExpRow { columns } => {
                let values: Vec<&str> = line.split('\t').collect();
                if values.len() != columns.len() {
                    return Err(Error::Format {
                        section: Section::Experiment,
                        line: lineno,
                        reason: format!(
                            "column mismatch: {} columns but {} values",
                            columns.len(),
                            values.len()
                        ),
                    });
                }
                for (name, value) in columns.iter().zip(values) {
                    assign_experiment_field(&mut experiment, name, value, lineno)?;
                }
                State::Scanning
            }
            State::AwaitChanColumns => {
                let columns: Vec<String> = line.split('\t').map(str::to_string).collect();
                let id_index = columns
                    .iter()
                    .position(|name| name == COL_CHANNEL_ID)
                    .ok_or(Error::MissingChannelIdColumn { line: lineno })?;
                State::ChanRows { columns, id_index }
            }
            State::ChanRows { columns, id_index } => {
                if line.is_empty() {
                    State::Scanning
                } else {
                    let mut tokens: Vec<&str> = line.split('\t').collect();
                    // Trailing delimiters leave empty tokens behind.
                    while tokens.last() == Some(&"") {
                        tokens.pop();
                    }
                    if tokens.len() != columns.len() {
                        return Err(Error::Format {
                            section: Section::Channel,
                            line: lineno,
                            reason: format!(
                                "column mismatch: {} columns but {} values",
                                columns.len(),
                                tokens.len()
                            ),
                        });
                    }
                    let id: i32 =
                        parse_num(tokens[id_index], COL_CHANNEL_ID, Section::Channel, lineno)?;
                    let channel = channels.entry(id).or_insert_with(ChannelHeader::default);
                    for (name, token) in columns.iter().zip(&tokens) {
                        assign_channel_field(channel, name, token, lineno)?;
                    }
                    State::ChanRows { columns, id_index }
                }
            }
        };
    }

    validate_pulses_references(&channels)?;
    debug!("parsed header with {} channels", channels.len());

    Ok((experiment, channels))
}

fn parse_num<T: FromStr>(
    token: &str,
    name: &str,
    section: Section,
    line: usize,
) -> Result<T, Error> {
    token.parse().map_err(|_| Error::Format {
        section,
        line,
        reason: format!("could not parse {:?} as {}", token, name),
    })
}

/// Booleans are stored as the narrow integers "0" and "1"; anything else is a
/// format error.
fn parse_flag(token: &str, name: &str, line: usize) -> Result<bool, Error> {
    match token {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(Error::Format {
            section: Section::Channel,
            line,
            reason: format!("boolean field {} accepts only \"0\" or \"1\", found {:?}", name, token),
        }),
    }
}

fn parse_timestamp(value: &str, line: usize) -> Result<DateTime<Utc>, Error> {
    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Ok(t.with_timezone(&Utc));
    }
    for fmt in &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(Utc.from_utc_datetime(&t));
        }
    }
    Err(Error::Format {
        section: Section::Experiment,
        line,
        reason: format!("could not parse {:?} as a timestamp", value),
    })
}

fn assign_experiment_field(
    experiment: &mut ExperimentHeader,
    name: &str,
    value: &str,
    line: usize,
) -> Result<(), Error> {
    match name {
        FIELD_TIME_UNIT => {
            let unit: f64 = parse_num(value, name, Section::Experiment, line)?;
            experiment
                .fields
                .insert(name.to_string(), FieldValue::Float(unit));
        }
        FIELD_DEVICE_TYPE => {
            experiment
                .fields
                .insert(name.to_string(), FieldValue::Str(value.to_string()));
        }
        FIELD_START_TIMESTAMP => {
            let stamp = parse_timestamp(value, line)?;
            experiment
                .fields
                .insert(name.to_string(), FieldValue::Timestamp(stamp));
        }
        _ => {
            experiment.extra.insert(name.to_string(), value.to_string());
        }
    }
    Ok(())
}

fn assign_channel_field(
    channel: &mut ChannelHeader,
    name: &str,
    token: &str,
    line: usize,
) -> Result<(), Error> {
    let section = Section::Channel;
    match name {
        // Already consumed as the mapping key.
        COL_CHANNEL_ID => {}
        COL_FILENAME => channel.filename = token.trim_matches('"').to_string(),
        COL_NUM_PHOTONS => channel.num_photons = parse_num(token, name, section, line)?,
        COL_NUM_OVERFLOWS => channel.num_overflows = parse_num(token, name, section, line)?,
        COL_FILESIZE => channel.filesize = parse_num(token, name, section, line)?,
        COL_HW_SYNC_DIVIDER => {
            channel.hardware_sync_divider = parse_num(token, name, section, line)?
        }
        COL_ADD_SYNC_DIVIDER => {
            channel.additional_sync_divider = parse_num(token, name, section, line)?
        }
        COL_TOTAL_SYNC_DIVIDER => {
            channel.total_sync_divider = parse_num(token, name, section, line)?
        }
        COL_IS_PULSES => channel.is_pulses_channel = parse_flag(token, name, line)?,
        COL_HAS_PULSES => channel.has_pulses_channel = parse_flag(token, name, line)?,
        COL_HAS_MICROTIMES => channel.has_microtimes = parse_flag(token, name, line)?,
        COL_CORR_PULSES => {
            channel.corresponding_pulses_channel =
                Some(parse_num(token, name, section, line)?)
        }
        COL_MICRO_DELAY => channel.micro_delay_time = parse_num(token, name, section, line)?,
        _ => {
            channel.extra.insert(name.to_string(), token.to_string());
        }
    }
    Ok(())
}

/// Every channel that expects microtimes from a pulses channel must point at
/// an existing channel other than itself.
fn validate_pulses_references(channels: &BTreeMap<i32, ChannelHeader>) -> Result<(), Error> {
    for (&id, channel) in channels {
        if !channel.has_pulses_channel {
            continue;
        }
        match channel.corresponding_pulses_channel {
            Some(reference) if reference != id && channels.contains_key(&reference) => {}
            reference => {
                return Err(Error::BadPulsesReference {
                    channel: id,
                    reference,
                })
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    const FULL_HEADER: &str = "Simple Small Time Tagged (V2)\n\
        EXPERIMENT_HEADER\n\
        Time_unit_seconds\tdevice_type\texperiment_start_timestamp_UTC\tOperator\n\
        1e-12\tqutag\t2020-05-12T13:01:02+00:00\tSH\n\
        CHANNEL_HEADER\n\
        ChannelID\tFilename\tNumPhotons\tTotalSyncDivider\tIsPulsesChannel\tHasPulsesChannel\tCorrespondingPulsesChannel\n\
        1\t\"exp.sstt.c1\"\t4\t8\t1\t0\t0\n\
        2\t\"exp.sstt.c2\"\t0\t1\t0\t1\t1\n\
        \n";

    fn parse(text: &str) -> Result<(ExperimentHeader, BTreeMap<i32, ChannelHeader>), Error> {
        parse_header_lines(text.lines())
    }

    #[test]
    fn full_header_round_trip() {
        let (experiment, channels) = parse(FULL_HEADER).unwrap();

        assert_eq!(experiment.time_unit_seconds().unwrap(), 1e-12);
        assert_eq!(experiment.device_type().unwrap(), "qutag");
        let stamp = experiment.start_timestamp_utc().unwrap();
        assert_eq!((stamp.year(), stamp.month(), stamp.day()), (2020, 5, 12));
        assert_eq!(experiment.extra.get("Operator").map(String::as_str), Some("SH"));

        assert_eq!(channels.len(), 2);
        let pulses = &channels[&1];
        assert_eq!(pulses.filename, "exp.sstt.c1");
        assert_eq!(pulses.num_photons, 4);
        assert_eq!(pulses.total_sync_divider, 8);
        assert!(pulses.is_pulses_channel);
        assert!(!pulses.has_pulses_channel);

        let photons = &channels[&2];
        assert_eq!(photons.num_photons, 0);
        assert!(photons.has_pulses_channel);
        assert_eq!(photons.corresponding_pulses_channel, Some(1));
        // Fields absent from the column list keep their defaults.
        assert_eq!(photons.hardware_sync_divider, 1);
        assert_eq!(photons.micro_delay_time, 0);
        assert!(!photons.has_microtimes);
    }

    #[test]
    fn empty_input_yields_defaults() {
        let (experiment, channels) = parse("").unwrap();
        assert_eq!(experiment.time_unit_seconds().unwrap(), 81e-12);
        assert_eq!(experiment.device_type().unwrap(), "qutau");
        assert!(experiment.start_timestamp_utc().is_none());
        assert!(channels.is_empty());
    }

    #[test]
    fn missing_channel_id_column() {
        let text = "CHANNEL_HEADER\nFilename\tNumPhotons\n\"a\"\t3\n";
        match parse(text) {
            Err(Error::MissingChannelIdColumn { line }) => assert_eq!(line, 2),
            other => panic!("expected MissingChannelIdColumn, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn experiment_row_column_mismatch() {
        let text = "EXPERIMENT_HEADER\nTime_unit_seconds\tdevice_type\n1e-12\n";
        match parse(text) {
            Err(Error::Format { section, line, .. }) => {
                assert_eq!(section, Section::Experiment);
                assert_eq!(line, 3);
            }
            other => panic!("expected Format error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn channel_row_column_mismatch() {
        let text = "CHANNEL_HEADER\nChannelID\tNumPhotons\n1\t2\t3\n";
        match parse(text) {
            Err(Error::Format { section, .. }) => assert_eq!(section, Section::Channel),
            other => panic!("expected Format error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn boolean_fields_accept_only_narrow_literals() {
        let text = "CHANNEL_HEADER\nChannelID\tIsPulsesChannel\n1\ttrue\n";
        assert!(matches!(
            parse(text),
            Err(Error::Format { section: Section::Channel, .. })
        ));

        let text = "CHANNEL_HEADER\nChannelID\tIsPulsesChannel\n1\t1\n";
        let (_, channels) = parse(text).unwrap();
        assert!(channels[&1].is_pulses_channel);

        let text = "CHANNEL_HEADER\nChannelID\tIsPulsesChannel\n1\t0\n";
        let (_, channels) = parse(text).unwrap();
        assert!(!channels[&1].is_pulses_channel);
    }

    #[test]
    fn trailing_tabs_are_tolerated_in_channel_rows() {
        let text = "CHANNEL_HEADER\nChannelID\tNumPhotons\n7\t42\t\t\n";
        let (_, channels) = parse(text).unwrap();
        assert_eq!(channels[&7].num_photons, 42);
    }

    #[test]
    fn blank_line_terminates_channel_rows() {
        let text = "CHANNEL_HEADER\nChannelID\n1\n\nnot a channel row\n";
        let (_, channels) = parse(text).unwrap();
        assert_eq!(channels.len(), 1);
    }

    #[test]
    fn unknown_channel_columns_go_to_extra() {
        let text = "CHANNEL_HEADER\nChannelID\tComment\n1\thello\n";
        let (_, channels) = parse(text).unwrap();
        assert_eq!(channels[&1].extra.get("Comment").map(String::as_str), Some("hello"));
    }

    #[test]
    fn unparseable_numeric_field_is_a_format_error() {
        let text = "CHANNEL_HEADER\nChannelID\tNumPhotons\n1\tmany\n";
        assert!(matches!(
            parse(text),
            Err(Error::Format { section: Section::Channel, .. })
        ));
    }

    #[test]
    fn dangling_pulses_reference_fails_the_parse() {
        let text = "CHANNEL_HEADER\n\
            ChannelID\tHasPulsesChannel\tCorrespondingPulsesChannel\n\
            2\t1\t9\n";
        match parse(text) {
            Err(Error::BadPulsesReference { channel, reference }) => {
                assert_eq!(channel, 2);
                assert_eq!(reference, Some(9));
            }
            other => panic!("expected BadPulsesReference, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn self_referential_pulses_channel_fails_the_parse() {
        let text = "CHANNEL_HEADER\n\
            ChannelID\tHasPulsesChannel\tCorrespondingPulsesChannel\n\
            2\t1\t2\n";
        assert!(matches!(
            parse(text),
            Err(Error::BadPulsesReference { channel: 2, reference: Some(2) })
        ));
    }

    #[test]
    fn space_separated_timestamp_is_accepted() {
        let text = "EXPERIMENT_HEADER\n\
            experiment_start_timestamp_UTC\n\
            2021-11-03 09:30:00.250\n";
        let (experiment, _) = parse(text).unwrap();
        assert!(experiment.start_timestamp_utc().is_some());
    }

    #[test]
    fn read_header_from_disk() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL_HEADER.as_bytes()).unwrap();
        let path = file.path().to_path_buf();

        let (experiment, channels) = read_sstt_header(&path).unwrap();
        assert_eq!(experiment.device_type().unwrap(), "qutag");
        assert_eq!(channels.len(), 2);
        assert!(crate::parsers::sstt::is_sstt_header_file(&path));
    }
}
