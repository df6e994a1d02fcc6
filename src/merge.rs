//! Shot merger: every requested channel of a shot onto one shared grid.
//!
//! ```text
//! ShotRecord ──window policy──► ResampleWindow ──GridSpec──► Grid (built once)
//!      │                                                         │
//!      └─ channel ─► resample(window, grid, mode) ─► column ─────┴─► inner join
//! ```
//!
//! Channels are resampled against the same [`Grid`] instance, so the exact
//! time join keeps every grid row. An absent channel, or one with no
//! samples inside the window, is handled by [`MissingChannelPolicy`] and
//! logged; any other failure excludes the whole shot.
use tracing::{debug, warn};

use crate::config::{MissingChannelPolicy, PipelineConfig, WindowPolicy};
use crate::error::{PrepError, Result};
use crate::resample::{resample, Grid, ResampleMode, ResampleWindow};
use crate::shot::{Channel, ShotRecord};
use crate::table::ShotTable;

/// Resample window of `record` under `policy`.
///
/// # Errors
///
/// * [`PrepError::InvalidDisruptionTime`] – disruption policy and the
///   disruption time is absent, not finite, or before `ramp_up.end`.
/// * [`PrepError::MissingMetadata`] – discharge policy and a ramp interval
///   is absent.
/// * [`PrepError::InvalidWindow`] – the derived window is empty.
pub fn shot_window(record: &ShotRecord, policy: WindowPolicy) -> Result<ResampleWindow> {
    match policy {
        WindowPolicy::Disruption { before, after } => {
            let t_d = match record.disruption_time {
                None => return Err(PrepError::InvalidDisruptionTime("missing".into())),
                Some(t) if !t.is_finite() => {
                    return Err(PrepError::InvalidDisruptionTime(format!("{t}")))
                }
                Some(t) => t,
            };
            if let Some(ru) = record.ramp_up {
                if t_d < ru.end {
                    return Err(PrepError::InvalidDisruptionTime(format!(
                        "{t_d} precedes the end of ramp-up at {}",
                        ru.end
                    )));
                }
            }
            ResampleWindow::new(t_d - before, t_d + after)
        }
        WindowPolicy::Discharge => {
            let ru = record.ramp_up.ok_or(PrepError::MissingMetadata("ramp_up"))?;
            let rd = record.ramp_down.ok_or(PrepError::MissingMetadata("ramp_down"))?;
            ResampleWindow::new(ru.start, rd.end)
        }
    }
}

/// Resample one channel onto `grid`.
///
/// Fails with [`PrepError::MissingChannel`] if the shot lacks it and
/// [`PrepError::EmptySignal`] if none of its samples fall in `window`.
pub fn resample_channel(
    record: &ShotRecord,
    ch: Channel,
    window: &ResampleWindow,
    grid: &Grid,
    mode: ResampleMode,
) -> Result<Vec<f64>> {
    let series = record.channel(ch).ok_or(PrepError::MissingChannel(ch))?;
    let out = resample(window, &series.time, &series.signal, grid, mode)?;
    if out.in_window == 0 {
        return Err(PrepError::EmptySignal(ch));
    }
    debug!(shot = %record.shot, channel = %ch, samples = out.in_window, "resampled");
    Ok(out.signal)
}

/// Merge `channels` of `record` into one table on the shared grid.
///
/// The table always has one row per grid point. Its column set is the
/// requested channels minus those dropped by [`MissingChannelPolicy::Skip`].
///
/// Fails with [`PrepError::NoUsableChannel`] when that set ends up empty.
pub fn merge_shot(record: &ShotRecord, channels: &[Channel], cfg: &PipelineConfig) -> Result<ShotTable> {
    let window = shot_window(record, cfg.window)?;
    let grid = Grid::build(&window, cfg.grid)?;
    let mut table = ShotTable::new(grid.time().to_vec());

    for &ch in channels {
        match resample_channel(record, ch, &window, &grid, cfg.mode) {
            Ok(signal) => {
                let column = ShotTable::from_column(grid.time().to_vec(), ch, signal)?;
                table = table.inner_join(&column);
            }
            Err(e) if e.is_channel_scoped() => match cfg.missing_channels {
                MissingChannelPolicy::Skip => {
                    warn!(shot = %record.shot, channel = %ch, reason = %e, "channel omitted");
                }
                MissingChannelPolicy::ZeroFill => {
                    warn!(shot = %record.shot, channel = %ch, reason = %e, "channel zero-filled");
                    table.push_column(ch, vec![0.0; grid.len()])?;
                }
            },
            Err(e) => return Err(e),
        }
    }

    if table.n_columns() == 0 {
        return Err(PrepError::NoUsableChannel(record.shot));
    }
    debug!(
        shot = %record.shot,
        rows = table.n_rows(),
        columns = table.n_columns(),
        begin = window.begin(),
        end = window.end(),
        "merged shot"
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resample::GridSpec;
    use crate::shot::{ChannelSeries, Interval, ShotId};

    fn record() -> ShotRecord {
        let mut r = ShotRecord::new(ShotId(42));
        r.disruption_time = Some(10.0);
        r.ramp_up = Some(Interval::new(0.0, 2.0));
        r.ramp_down = Some(Interval::new(9.0, 12.0));
        let t: Vec<f64> = (0..2000).map(|i| i as f64 * 0.01).collect();
        let y: Vec<f64> = t.iter().map(|&x| 2.0 * x).collect();
        r.insert_channel(Channel::IPLA, ChannelSeries::new(t.clone(), y).unwrap());
        // Only covers the start of the shot.
        r.insert_channel(Channel::RNT, ChannelSeries::new(vec![0.0, 1.0], vec![1.0, 1.0]).unwrap());
        r
    }

    fn cfg() -> PipelineConfig {
        PipelineConfig {
            grid: GridSpec::Step(0.01),
            mode: ResampleMode::Interpolate { smoothing: None },
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn disruption_window() {
        let w = shot_window(&record(), WindowPolicy::default()).unwrap();
        assert_eq!((w.begin(), w.end()), (9.0, 15.0));
    }

    #[test]
    fn discharge_window() {
        let w = shot_window(&record(), WindowPolicy::Discharge).unwrap();
        assert_eq!((w.begin(), w.end()), (0.0, 12.0));

        let mut r = record();
        r.ramp_down = None;
        assert!(matches!(
            shot_window(&r, WindowPolicy::Discharge),
            Err(PrepError::MissingMetadata("ramp_down"))
        ));
    }

    #[test]
    fn bad_disruption_times() {
        let mut r = record();
        for t in [None, Some(f64::NAN), Some(f64::INFINITY), Some(1.5), Some(1.999)] {
            r.disruption_time = t;
            assert!(matches!(
                merge_shot(&r, &Channel::ALL, &cfg()),
                Err(PrepError::InvalidDisruptionTime(_))
            ));
        }
    }

    #[test]
    fn disruption_at_ramp_up_end_is_accepted() {
        let mut r = record();
        r.disruption_time = Some(2.0);
        let w = shot_window(&r, WindowPolicy::default()).unwrap();
        assert_eq!((w.begin(), w.end()), (1.0, 7.0));
    }

    #[test]
    fn no_usable_channel_fails_the_shot() {
        // RNT only covers 0..1 s, WMHD is absent; the window is 9..15 s.
        let err = merge_shot(&record(), &[Channel::RNT, Channel::WMHD], &cfg()).unwrap_err();
        assert!(matches!(err, PrepError::NoUsableChannel(ShotId(42))));

        let zero = PipelineConfig { missing_channels: MissingChannelPolicy::ZeroFill, ..cfg() };
        assert_eq!(merge_shot(&record(), &[Channel::RNT, Channel::WMHD], &zero).unwrap().n_columns(), 2);
    }

    #[test]
    fn skip_policy_omits_missing_and_empty() {
        let t = merge_shot(&record(), &[Channel::IPLA, Channel::RNT, Channel::WMHD], &cfg()).unwrap();
        assert_eq!(t.n_rows(), 600);
        assert_eq!(t.channels().collect::<Vec<_>>(), vec![Channel::IPLA]);
        approx::assert_abs_diff_eq!(t.column(Channel::IPLA).unwrap()[100], 20.0, epsilon = 1e-9);
    }

    #[test]
    fn zero_fill_policy_keeps_requested_columns() {
        let cfg = PipelineConfig { missing_channels: MissingChannelPolicy::ZeroFill, ..cfg() };
        let t = merge_shot(&record(), &[Channel::IPLA, Channel::RNT, Channel::WMHD], &cfg).unwrap();
        assert_eq!(t.n_columns(), 3);
        assert!(t.column(Channel::WMHD).unwrap().iter().all(|&v| v == 0.0));
        assert!(t.column(Channel::RNT).unwrap().iter().all(|&v| v == 0.0));
    }
}
