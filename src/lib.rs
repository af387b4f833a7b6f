use log::debug;
use plotters::style::RGBColor;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
pub mod backend;
pub mod chart;
pub mod error;
pub mod plot;

pub use error::BerPlotError;

pub const VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

pub const SNR_COLUMN: &str = "snr_db";
pub const DEFAULT_TITLE: &str = "BER vs SNR (BPSK AWGN)";
pub const OUTPUT_SUFFIX: &str = "_plot.png";

/// Point marker drawn on top of a BER line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Circle,
    Square,
}

/// The optional BER columns a measurement table may carry,
/// declared in the order they are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Series {
    Ber,
    BerUncoded,
    BerCoded,
}

impl Series {
    pub const ALL: [Series; 3] = [Series::Ber, Series::BerUncoded, Series::BerCoded];

    /// header name of the column holding this series
    pub fn column(self) -> &'static str {
        match self {
            Series::Ber => "ber",
            Series::BerUncoded => "ber_uncoded",
            Series::BerCoded => "ber_coded",
        }
    }

    /// legend label
    pub fn label(self) -> &'static str {
        match self {
            Series::Ber => "BER",
            Series::BerUncoded => "BER uncoded",
            Series::BerCoded => "BER coded",
        }
    }

    pub fn marker(self) -> Marker {
        match self {
            Series::Ber | Series::BerUncoded => Marker::Circle,
            Series::BerCoded => Marker::Square,
        }
    }

    pub fn color(self) -> RGBColor {
        match self {
            Series::Ber => RGBColor(31, 119, 180),
            Series::BerUncoded => RGBColor(255, 127, 14),
            Series::BerCoded => RGBColor(44, 160, 44),
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Which of the three BER series are enabled.
/// Computed once from the CSV header and then handed, unchanged,
/// to both the row parser and the chart renderer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeriesSet {
    enabled: [bool; 3],
}

impl SeriesSet {
    pub fn none() -> SeriesSet {
        SeriesSet::default()
    }

    /// Enables a series for every header name that matches its column exactly.
    pub fn from_headers<'a, I>(headers: I) -> SeriesSet
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut set = SeriesSet::none();
        for h in headers {
            if let Some(s) = Series::ALL.iter().find(|s| s.column() == h) {
                set = set.with(*s);
            }
        }
        set
    }

    pub fn with(mut self, series: Series) -> SeriesSet {
        self.enabled[series.index()] = true;
        self
    }

    pub fn contains(&self, series: Series) -> bool {
        self.enabled[series.index()]
    }

    pub fn is_empty(&self) -> bool {
        !self.enabled.iter().any(|&e| e)
    }

    /// enabled series, in drawing order
    pub fn iter(&self) -> impl Iterator<Item = Series> {
        let enabled = self.enabled;
        (0..Series::ALL.len())
            .map(|i| Series::ALL[i])
            .filter(move |s| enabled[s.index()])
    }
}

/// The measurement table: SNR values and up to three BER series,
/// kept as parallel vectors in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BerTable {
    pub snr: Vec<f64>,
    pub ber: Vec<f64>,
    pub ber_uncoded: Vec<f64>,
    pub ber_coded: Vec<f64>,
    pub series: SeriesSet,
}

impl BerTable {
    pub fn new(series: SeriesSet, capacity: usize) -> BerTable {
        let with_capacity = |s: Series| {
            if series.contains(s) {
                Vec::with_capacity(capacity)
            } else {
                Vec::new()
            }
        };
        BerTable {
            snr: Vec::with_capacity(capacity),
            ber: with_capacity(Series::Ber),
            ber_uncoded: with_capacity(Series::BerUncoded),
            ber_coded: with_capacity(Series::BerCoded),
            series,
        }
    }

    /// Init a BerTable from a csv file with a header row.
    /// The file is closed before returning, also on errors.
    pub fn from_csv(fin: &Path) -> Result<BerTable, BerPlotError> {
        let file = File::open(fin).map_err(|source| BerPlotError::Open {
            path: fin.to_path_buf(),
            source,
        })?;
        let table = BerTable::from_reader(BufReader::new(file))?;
        debug!(
            "loaded {} rows from {}, series: {:?}",
            table.len(),
            fin.display(),
            table.series.iter().map(Series::column).collect::<Vec<_>>()
        );
        Ok(table)
    }

    /// Parses csv text: `snr_db` is required on every data row,
    /// each BER column is parsed only when its name is in the header.
    /// Blank lines are skipped, unknown columns are ignored.
    pub fn from_reader<R: Read>(rdr: R) -> Result<BerTable, BerPlotError> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(rdr);
        let headers = reader.headers()?.clone();
        let series = SeriesSet::from_headers(headers.iter());
        let snr_idx = headers.iter().position(|h| h == SNR_COLUMN);
        let columns: Vec<(Series, usize)> = series
            .iter()
            .filter_map(|s| headers.iter().position(|h| h == s.column()).map(|i| (s, i)))
            .collect();

        let mut table = BerTable::new(series, 64);
        let mut record = csv::StringRecord::new();
        while reader.read_record(&mut record)? {
            let line = record.position().map_or(0, |p| p.line());
            let snr_idx = snr_idx.ok_or(BerPlotError::MissingColumn(SNR_COLUMN))?;
            table.snr.push(parse_field(&record, snr_idx, SNR_COLUMN, line)?);
            for &(s, idx) in columns.iter() {
                let v = parse_field(&record, idx, s.column(), line)?;
                table.values_mut(s).push(v);
            }
        }
        Ok(table)
    }

    pub fn values(&self, series: Series) -> &[f64] {
        match series {
            Series::Ber => &self.ber,
            Series::BerUncoded => &self.ber_uncoded,
            Series::BerCoded => &self.ber_coded,
        }
    }

    fn values_mut(&mut self, series: Series) -> &mut Vec<f64> {
        match series {
            Series::Ber => &mut self.ber,
            Series::BerUncoded => &mut self.ber_uncoded,
            Series::BerCoded => &mut self.ber_coded,
        }
    }

    /// Series that end up as lines on the chart: enabled and non-empty.
    pub fn drawn_series(&self) -> impl Iterator<Item = (Series, &[f64])> + '_ {
        self.series
            .iter()
            .map(move |s| (s, self.values(s)))
            .filter(|(_, v)| !v.is_empty())
    }

    pub fn len(&self) -> usize {
        self.snr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snr.is_empty()
    }
}

fn parse_field(
    record: &csv::StringRecord,
    idx: usize,
    column: &'static str,
    line: u64,
) -> Result<f64, BerPlotError> {
    let raw = record
        .get(idx)
        .ok_or(BerPlotError::MissingField { line, column })?;
    raw.trim()
        .parse::<f64>()
        .map_err(|source| BerPlotError::InvalidNumber {
            line,
            column,
            value: raw.to_string(),
            source,
        })
}

impl std::fmt::Display for BerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", SNR_COLUMN)?;
        for s in self.series.iter() {
            write!(f, ",{}", s.column())?;
        }
        writeln!(f)?;
        for (i, snr) in self.snr.iter().enumerate() {
            write!(f, "{}", snr)?;
            for s in self.series.iter() {
                match self.values(s).get(i) {
                    Some(v) => write!(f, ",{}", v)?,
                    None => write!(f, ",")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Smallest and largest element, None for an empty slice.
pub fn min_and_max<T: std::cmp::PartialOrd + Copy>(s: &[T]) -> Option<(T, T)> {
    let mut s_iter = s.iter();
    let (mut min, mut max) = match s_iter.next() {
        Some(v) => (*v, *v),
        None => return None,
    };
    for es in s_iter {
        if *es > max {
            max = *es
        }
        if *es < min {
            min = *es
        }
    }
    Some((min, max))
}
