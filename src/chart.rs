use super::{min_and_max, BerPlotError, BerTable, Marker, DEFAULT_TITLE};
use crate::backend::HeadlessBackend;
use log::info;
use plotters::coord::ranged1d::{AsRangedCoord, Ranged, ValueFormatter};
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use std::ops::Range;
use std::panic;
use std::path::Path;

pub const DPI: u32 = 150;

/// fraction of the data span added on each side of a linear axis
const LINEAR_MARGIN: f64 = 0.05;
/// factor applied below and above the data on a log axis
const LOG_MARGIN: f64 = 2.0;
const LOG_FALLBACK: Range<f64> = 1e-6..1.0;
/// largest magnitude an axis bound may take
const AXIS_LIMIT: f64 = f64::MAX / 4.0;
/// smallest linear margin relative to the bound magnitude
const MIN_RELATIVE_PAD: f64 = 1e-6;

const MAJOR_TICKS: usize = 10;
const MINOR_TICKS: usize = 50;
const GRID_ALPHA: f64 = 0.3;
const MARKER_SIZE: i32 = 4;

/// Display options for the BER chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartOptions {
    pub title: String,
    pub log_y: bool,
    pub width_in: f64,
    pub height_in: f64,
    pub dpi: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        ChartOptions {
            title: DEFAULT_TITLE.to_string(),
            log_y: false,
            width_in: 6.4,
            height_in: 4.8,
            dpi: DPI,
        }
    }
}

impl ChartOptions {
    /// bitmap size in pixels
    pub fn pixel_size(&self) -> (u32, u32) {
        let px = |inches: f64| (inches * self.dpi as f64).round() as u32;
        (px(self.width_in), px(self.height_in))
    }
}

impl BerTable {
    /// Plots every drawn BER series against SNR and writes a png,
    /// overwriting `fout` if it exists.
    pub fn plot_png(&self, fout: &Path, options: &ChartOptions) -> Result<(), BerPlotError> {
        let render = || -> Result<(), Box<dyn std::error::Error>> {
            let backend = HeadlessBackend::new(BitMapBackend::new(fout, options.pixel_size()));
            let root = backend.into_drawing_area();
            let x = x_range(&self.snr);
            if options.log_y {
                draw_chart(&root, self, options, x, log_y_range(self).log_scale())
            } else {
                draw_chart(&root, self, options, x, linear_y_range(self))
            }
        };
        let message = match panic::catch_unwind(panic::AssertUnwindSafe(render)) {
            Ok(Ok(())) => {
                info!(
                    "plotted {} series over {} points to {}",
                    self.drawn_series().count(),
                    self.len(),
                    fout.display()
                );
                return Ok(());
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => "plotting backend panicked".to_string(),
        };
        Err(BerPlotError::Render {
            path: fout.to_path_buf(),
            message,
        })
    }
}

type BerChart<'a, DB, Y> = ChartContext<'a, DB, Cartesian2d<RangedCoordf64, Y>>;

fn draw_chart<DB, Y>(
    root: &DrawingArea<DB, Shift>,
    table: &BerTable,
    options: &ChartOptions,
    x_range: Range<f64>,
    y_range: Y,
) -> Result<(), Box<dyn std::error::Error>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
    Y: AsRangedCoord<Value = f64>,
    Y::CoordDescType: ValueFormatter<f64>,
{
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(root)
        .caption(&options.title, ("sans-serif", 20))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range, y_range)?;
    draw_axes(&mut chart, options.log_y)?;
    draw_grid(&mut chart)?;
    if draw_ber_series(&mut chart, table)? > 0 {
        draw_legend(&mut chart)?;
    }
    root.present()?;
    Ok(())
}

fn draw_axes<DB, Y>(
    chart: &mut BerChart<'_, DB, Y>,
    log_y: bool,
) -> Result<(), Box<dyn std::error::Error>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
    Y: Ranged<ValueType = f64> + ValueFormatter<f64>,
{
    let mut mesh = chart.configure_mesh();
    mesh.disable_mesh()
        .x_desc("SNR (dB)")
        .y_desc("BER")
        .label_style(("sans-serif", 14));
    if log_y {
        mesh.y_label_formatter(&scientific_label);
    }
    mesh.draw()?;
    Ok(())
}

/// Dashed grid at major and minor ticks; the mesh lines cannot be dashed.
fn draw_grid<DB, Y>(
    chart: &mut BerChart<'_, DB, Y>,
) -> Result<(), Box<dyn std::error::Error>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
    Y: Ranged<ValueType = f64>,
{
    let xb = chart.x_range();
    let yb = chart.y_range();
    let (x_ticks, y_ticks) = {
        let coord = chart.as_coord_spec();
        let (xs, ys) = (coord.x_spec(), coord.y_spec());
        (
            grid_ticks(&xs.key_points(MAJOR_TICKS), &xs.key_points(MINOR_TICKS)),
            grid_ticks(&ys.key_points(MAJOR_TICKS), &ys.key_points(MINOR_TICKS)),
        )
    };
    let grid = BLACK.mix(GRID_ALPHA).stroke_width(1);
    let vertical = x_ticks.into_iter().map(|x| vec![(x, yb.start), (x, yb.end)]);
    let horizontal = y_ticks.into_iter().map(|y| vec![(xb.start, y), (xb.end, y)]);
    for segment in vertical.chain(horizontal) {
        chart.draw_series(DashedLineSeries::new(segment, 4, 3, grid))?;
    }
    Ok(())
}

/// Draws a line with markers per drawn series, returns how many were drawn.
fn draw_ber_series<DB, Y>(
    chart: &mut BerChart<'_, DB, Y>,
    table: &BerTable,
) -> Result<usize, Box<dyn std::error::Error>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
    Y: Ranged<ValueType = f64>,
{
    let mut drawn = 0;
    for (series, values) in table.drawn_series() {
        let color = series.color();
        let line = color.stroke_width(2);
        let points: Vec<(f64, f64)> = table
            .snr
            .iter()
            .copied()
            .zip(values.iter().copied())
            .collect();
        chart
            .draw_series(LineSeries::new(points.clone(), line))?
            .label(series.label())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], line));
        let m = MARKER_SIZE;
        match series.marker() {
            Marker::Circle => {
                chart.draw_series(points.iter().map(|&p| Circle::new(p, m, color.filled())))?;
            }
            Marker::Square => {
                chart.draw_series(points.iter().map(|&p| {
                    EmptyElement::at(p) + Rectangle::new([(-m, -m), (m, m)], color.filled())
                }))?;
            }
        }
        drawn += 1;
    }
    Ok(drawn)
}

fn draw_legend<'a, DB, Y>(
    chart: &mut BerChart<'a, DB, Y>,
) -> Result<(), Box<dyn std::error::Error>>
where
    DB: DrawingBackend + 'a,
    DB::ErrorType: 'static,
    Y: Ranged<ValueType = f64>,
{
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK.mix(0.3))
        .label_font(("sans-serif", 14))
        .draw()?;
    Ok(())
}

fn scientific_label(v: &f64) -> String {
    format!("{:.0e}", v)
}

/// Major ticks followed by the minor ticks that do not sit on a major one.
pub fn grid_ticks(major: &[f64], minor: &[f64]) -> Vec<f64> {
    let on_major = |v: f64| {
        major
            .iter()
            .any(|&m| (m - v).abs() <= 1e-9 * m.abs().max(v.abs()))
    };
    let mut ticks = major.to_vec();
    ticks.extend(minor.iter().copied().filter(|&v| !on_major(v)));
    ticks
}

fn clamp_axis(v: f64) -> f64 {
    v.max(-AXIS_LIMIT).min(AXIS_LIMIT)
}

/// Pads a linear axis. Bounds are clamped so the span and every tick step
/// stay finite, and the padding never drops below the float resolution
/// of the bounds, otherwise tick generation in plotters does not terminate.
fn pad_linear(lo: f64, hi: f64) -> Range<f64> {
    let (lo, hi) = (clamp_axis(lo), clamp_axis(hi));
    let magnitude = lo.abs().max(hi.abs());
    let margin = if hi > lo {
        ((hi - lo) * LINEAR_MARGIN).max(magnitude * MIN_RELATIVE_PAD)
    } else {
        (magnitude * LINEAR_MARGIN).max(0.5)
    };
    (lo - margin)..(hi + margin)
}

fn finite_bounds<'a, I: Iterator<Item = &'a f64>>(values: I) -> Option<(f64, f64)> {
    let finite: Vec<f64> = values.copied().filter(|v| v.is_finite()).collect();
    min_and_max(&finite)
}

/// X axis range over the SNR values.
pub fn x_range(snr: &[f64]) -> Range<f64> {
    match finite_bounds(snr.iter()) {
        Some((lo, hi)) => pad_linear(lo, hi),
        None => 0.0..1.0,
    }
}

/// Linear Y axis range over the values of every drawn series.
pub fn linear_y_range(table: &BerTable) -> Range<f64> {
    match finite_bounds(table.drawn_series().flat_map(|(_, v)| v.iter())) {
        Some((lo, hi)) => pad_linear(lo, hi),
        None => 0.0..1.0,
    }
}

/// Log Y axis range over the strictly positive values of every drawn series.
/// Zero or negative values stay in the data, they only do not shape the axis.
pub fn log_y_range(table: &BerTable) -> Range<f64> {
    let positive = table
        .drawn_series()
        .flat_map(|(_, v)| v.iter())
        .filter(|v| **v > 0.0);
    match finite_bounds(positive) {
        Some((lo, hi)) => {
            let lo = (lo / LOG_MARGIN)
                .max(f64::MIN_POSITIVE)
                .min(AXIS_LIMIT / (LOG_MARGIN * LOG_MARGIN));
            let hi = (hi * LOG_MARGIN)
                .min(AXIS_LIMIT)
                .max(lo * LOG_MARGIN * LOG_MARGIN);
            lo..hi
        }
        None => LOG_FALLBACK,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Series, SeriesSet};

    fn table(text: &str) -> BerTable {
        BerTable::from_reader(text.as_bytes()).unwrap()
    }

    fn is_png(path: &Path) -> bool {
        let bytes = std::fs::read(path).unwrap();
        bytes.starts_with(&[0x89, b'P', b'N', b'G'])
    }

    #[test]
    fn default_options() {
        let opts = ChartOptions::default();
        assert_eq!(opts.title, "BER vs SNR (BPSK AWGN)");
        assert!(!opts.log_y);
        assert_eq!(opts.pixel_size(), (960, 720));
    }

    #[test]
    fn x_range_pads_span() {
        let r = x_range(&[0., 5., -2., 10.]);
        assert!((r.start - -2.6).abs() < 1e-12);
        assert!((r.end - 10.6).abs() < 1e-12);
        assert_eq!(x_range(&[]), 0.0..1.0);
        assert_eq!(x_range(&[3.]), 2.5..3.5);
    }

    #[test]
    fn linear_range_covers_drawn_series_only() {
        let mut t = table("snr_db,ber,ber_coded\n0,0.5,0.1\n1,0.25,0.0\n");
        let r = linear_y_range(&t);
        assert!(r.start < 0.0 && r.end > 0.5);
        t.series = SeriesSet::none().with(Series::BerCoded);
        let r = linear_y_range(&t);
        assert!(r.end < 0.5);
    }

    #[test]
    fn log_range_ignores_non_positive_values() {
        let t = table("snr_db,ber\n0,0.1\n2,0.001\n4,0\n6,-1\n");
        assert_eq!(log_y_range(&t), 0.0005..0.2);
        let t = table("snr_db,ber\n0,0\n");
        assert_eq!(log_y_range(&t), 1e-6..1.0);
    }

    #[test]
    fn grid_ticks_skip_duplicates() {
        let ticks = grid_ticks(&[0., 5., 10.], &[0., 2.5, 5., 7.5, 10.]);
        assert_eq!(ticks, vec![0., 5., 10., 2.5, 7.5]);
    }

    fn assert_usable(r: &Range<f64>) {
        assert!(r.start.is_finite() && r.end.is_finite(), "{:?}", r);
        assert!(r.start < r.end, "{:?}", r);
    }

    #[test]
    fn extreme_snr_keeps_x_range_finite() {
        assert_usable(&x_range(&[-1.7e308, 1.7e308]));
        assert_usable(&x_range(&[f64::MAX]));
        assert_usable(&x_range(&[f64::MIN, 0.0]));
        let r = x_range(&[1e17, 1e17 + 16.0]);
        assert_usable(&r);
        assert!(r.end - r.start >= 2e11);
    }

    #[test]
    fn extreme_ber_keeps_y_ranges_finite() {
        let t = table("snr_db,ber\n-1.7e308,-1.7e308\n1.7e308,1.7e308\n");
        assert_usable(&linear_y_range(&t));
        let t = table("snr_db,ber\n0,0.1\n1,1e308\n");
        assert_usable(&log_y_range(&t));
        let t = table("snr_db,ber\n0,1.7976931348623157e308\n");
        assert_usable(&log_y_range(&t));
        let t = table("snr_db,ber\n0,5e-324\n");
        let r = log_y_range(&t);
        assert_usable(&r);
        assert!(r.start > 0.0);
    }

    #[test]
    fn renders_extreme_values() {
        let dir = tempfile::tempdir().unwrap();
        let fout = dir.path().join("huge_log.png");
        let log = ChartOptions {
            log_y: true,
            ..ChartOptions::default()
        };
        table("snr_db,ber\n0,0.1\n1,1e308\n")
            .plot_png(&fout, &log)
            .unwrap();
        assert!(is_png(&fout));
        let fout = dir.path().join("huge_snr.png");
        table("snr_db,ber\n-8e307,0.1\n8e307,0.2\n")
            .plot_png(&fout, &ChartOptions::default())
            .unwrap();
        assert!(is_png(&fout));
    }

    #[test]
    fn writes_png_with_all_series() {
        let dir = tempfile::tempdir().unwrap();
        let fout = dir.path().join("all.png");
        let t = table(
            "snr_db,ber,ber_uncoded,ber_coded\n0,0.08,0.08,0.1\n2,0.04,0.04,0.03\n4,0.01,0.01,0.002\n",
        );
        t.plot_png(&fout, &ChartOptions::default()).unwrap();
        assert!(is_png(&fout));
    }

    #[test]
    fn writes_log_png_with_zero_ber() {
        let dir = tempfile::tempdir().unwrap();
        let fout = dir.path().join("log.png");
        let t = table("snr_db,ber\n0,0.08\n4,0.01\n8,0.0002\n10,0\n");
        let opts = ChartOptions {
            log_y: true,
            ..ChartOptions::default()
        };
        t.plot_png(&fout, &opts).unwrap();
        assert!(is_png(&fout));
    }

    #[test]
    fn writes_png_without_series() {
        let dir = tempfile::tempdir().unwrap();
        let fout = dir.path().join("empty.png");
        let t = table("snr_db\n0\n1\n2\n");
        assert_eq!(t.drawn_series().count(), 0);
        t.plot_png(&fout, &ChartOptions::default()).unwrap();
        assert!(is_png(&fout));
    }

    #[test]
    fn overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let fout = dir.path().join("old.png");
        std::fs::write(&fout, b"not an image").unwrap();
        table("snr_db,ber\n0,0.1\n")
            .plot_png(&fout, &ChartOptions::default())
            .unwrap();
        assert!(is_png(&fout));
    }
}
