use ndarray::{Array1, ArrayView1};

use crate::errors::Error;

/// Reconstruct microtimes for a channel against a periodic reference.
///
/// ## Parameters
///
///    - pulses: ascending macro timestamps of the reference (pulses) channel,
///    - events: ascending macro timestamps of the channel of interest,
///    - total_sync_divider: the sync divider applied to the reference channel
///      during acquisition. The recorded edges then mark only every
///      divider-th pulse, so each event is folded into the divider-corrected
///      sub-period of the reference signal.
///
/// ## Algorithm description
/// The microtime of an event is its offset from the most recent reference
/// edge at or before it, folded by `mean_period / divider` where mean_period
/// is the average spacing of the recorded edges. Events may fall before the
/// first recorded edge or after the last one; the edge train is extended with
/// synthetic edges extrapolated at the rounded mean period so that every
/// event of an ascending sequence has a preceding edge.
pub fn gen_microtimes(
    pulses: ArrayView1<i64>,
    events: ArrayView1<i64>,
    total_sync_divider: i64,
) -> Result<Array1<i64>, Error> {
    if pulses.len() < 2 {
        return Err(Error::InvalidInput(String::from(
            "microtime generation needs at least two reference edges",
        )));
    }
    if events.is_empty() {
        return Err(Error::InvalidInput(String::from(
            "microtime generation needs at least one event",
        )));
    }
    if total_sync_divider < 1 {
        return Err(Error::InvalidInput(format!(
            "total sync divider must be positive, found {}",
            total_sync_divider
        )));
    }

    let first = pulses[0];
    let last = pulses[pulses.len() - 1];
    let mean_period = (last - first) as f64 / (pulses.len() - 1) as f64;
    let period = mean_period.round() as i64;
    if period <= 0 {
        return Err(Error::InvalidInput(String::from(
            "reference edges must be ascending",
        )));
    }

    let mut edges: Vec<i64> = pulses.iter().copied().collect();
    let mut synthetic = first;
    while synthetic > events[0] {
        synthetic -= period;
        edges.push(synthetic);
    }
    let last_event = events[events.len() - 1];
    let mut synthetic = last;
    while synthetic <= last_event {
        synthetic += period;
        edges.push(synthetic);
    }
    edges.sort_unstable();

    let sub_period = mean_period / total_sync_divider as f64;
    let mut microtimes = Array1::<i64>::zeros(events.len());
    let mut cursor = 0;

    for (i, &event) in events.iter().enumerate() {
        // Most recent edge at or before the event. Events are ascending, so
        // the search never has to look at edges behind the previous hit.
        let offset = edges[cursor..].partition_point(|&edge| edge <= event);
        if offset == 0 {
            return Err(Error::InvalidInput(format!(
                "event {} has no preceding reference edge; timestamps must be ascending",
                event
            )));
        }
        cursor += offset - 1;

        let dt = (event - edges[cursor]) as f64;
        microtimes[i] = (dt % sub_period) as i64;
    }

    Ok(microtimes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn offset_from_the_most_recent_edge() {
        let pulses = array![0, 50, 100];
        let events = array![120];
        let micro = gen_microtimes(pulses.view(), events.view(), 1).unwrap();
        assert_eq!(micro, array![20]);
    }

    #[test]
    fn event_on_an_edge_has_microtime_zero() {
        let pulses = array![0, 50, 100];
        let events = array![50];
        let micro = gen_microtimes(pulses.view(), events.view(), 1).unwrap();
        assert_eq!(micro, array![0]);
    }

    #[test]
    fn events_before_the_first_edge_use_extrapolated_edges() {
        let pulses = array![100, 150];
        let events = array![10, 120];
        let micro = gen_microtimes(pulses.view(), events.view(), 1).unwrap();
        // Synthetic edges at 50 and 0 precede the first recorded one.
        assert_eq!(micro, array![10, 20]);
    }

    #[test]
    fn events_after_the_last_edge_use_extrapolated_edges() {
        let pulses = array![0, 50, 100];
        let events = array![160];
        let micro = gen_microtimes(pulses.view(), events.view(), 1).unwrap();
        assert_eq!(micro, array![10]);
    }

    #[test]
    fn divider_folds_into_the_sub_period() {
        let pulses = array![0, 100];
        let events = array![130, 170];
        let micro = gen_microtimes(pulses.view(), events.view(), 2).unwrap();
        assert_eq!(micro, array![30, 20]);
    }

    #[test]
    fn out_of_order_events_are_rejected() {
        let pulses = array![0, 50, 100];
        let events = array![120, 10];
        assert!(matches!(
            gen_microtimes(pulses.view(), events.view(), 1),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn too_few_reference_edges_is_an_error() {
        let pulses = array![100];
        let events = array![10];
        assert!(matches!(
            gen_microtimes(pulses.view(), events.view(), 1),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn empty_event_sequence_is_an_error() {
        let pulses = array![0, 100];
        let events = Array1::<i64>::zeros(0);
        assert!(matches!(
            gen_microtimes(pulses.view(), events.view(), 1),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn non_positive_divider_is_an_error() {
        let pulses = array![0, 100];
        let events = array![10];
        assert!(matches!(
            gen_microtimes(pulses.view(), events.view(), 0),
            Err(Error::InvalidInput(_))
        ));
    }
}
