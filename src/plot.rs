use super::chart::ChartOptions;
use super::{BerPlotError, BerTable, DEFAULT_TITLE, OUTPUT_SUFFIX, VERSION};
use clap::{App, Arg, ArgMatches};
use log::info;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// CLI arguments for one plotting run.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotArgs {
    pub csvin: PathBuf,
    pub pngout: Option<PathBuf>,
    pub log_y: bool,
    pub title: String,
    pub verbose: bool,
}

impl PlotArgs {
    pub fn chart_options(&self) -> ChartOptions {
        ChartOptions {
            title: self.title.clone(),
            log_y: self.log_y,
            ..ChartOptions::default()
        }
    }
}

fn cli_app<'a, 'b>() -> App<'a, 'b> {
    let arg_csvin = Arg::with_name("csv_path")
        .help("path to the csv file written by the BPSK/AWGN simulator")
        .required(true)
        .index(1);
    let arg_pngout = Arg::with_name("out")
        .help("output image path (default: <csv_name>_plot.png next to the csv)")
        .long("out")
        .takes_value(true);
    let arg_log_y = Arg::with_name("log_y")
        .help("use a logarithmic scale on the Y axis")
        .long("log-y")
        .takes_value(false);
    let arg_title = Arg::with_name("title")
        .help("plot title")
        .long("title")
        .takes_value(true)
        .default_value(DEFAULT_TITLE);
    let arg_verbose = Arg::with_name("verbose")
        .help("print verbose information")
        .short("v")
        .long("verbose")
        .takes_value(false);
    App::new("ber_plot")
        .version(VERSION.unwrap_or("unknown"))
        .about("cli app to plot BER vs SNR (dB) from the csv of a BPSK/AWGN simulation")
        .arg(arg_csvin)
        .arg(arg_pngout)
        .arg(arg_log_y)
        .arg(arg_title)
        .arg(arg_verbose)
}

fn plot_args(cli_args: &ArgMatches) -> PlotArgs {
    PlotArgs {
        csvin: PathBuf::from(cli_args.value_of_os("csv_path").unwrap_or_default()),
        pngout: cli_args.value_of_os("out").map(PathBuf::from),
        log_y: cli_args.is_present("log_y"),
        title: String::from(cli_args.value_of("title").unwrap_or(DEFAULT_TITLE)),
        verbose: cli_args.is_present("verbose"),
    }
}

/// Takes the CLI arguments that control the plotting of the BER curves.
pub fn parse_cli() -> PlotArgs {
    plot_args(&cli_app().get_matches())
}

/// Same as `parse_cli`, from an explicit argument list (first item is the program name).
pub fn parse_cli_from<I, T>(args: I) -> Result<PlotArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli_args = cli_app().get_matches_from_safe(args)?;
    Ok(plot_args(&cli_args))
}

/// The explicit output path when given, otherwise `<dir>/<stem>_plot.png`
/// next to the input. Pure path arithmetic, the filesystem is never touched.
pub fn resolve_output(explicit: Option<&Path>, csvin: &Path) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let mut name = csvin
        .file_stem()
        .unwrap_or_else(|| OsStr::new(""))
        .to_os_string();
    name.push(OUTPUT_SUFFIX);
    csvin.with_file_name(name)
}

/// Loads the csv, plots it and returns the path of the written image.
/// Nothing is written when the input is missing or cannot be parsed.
pub fn run(args: &PlotArgs) -> Result<PathBuf, BerPlotError> {
    if !args.csvin.exists() {
        return Err(BerPlotError::InputNotFound(args.csvin.clone()));
    }
    let pngout = resolve_output(args.pngout.as_deref(), &args.csvin);
    info!(
        "read data from {} and plot to {}",
        args.csvin.display(),
        pngout.display()
    );
    let table = BerTable::from_csv(&args.csvin)?;
    table.plot_png(&pngout, &args.chart_options())?;
    Ok(pngout)
}
