use ber_plot::plot::{parse_cli, run};
use env_logger::Env;

fn main() -> anyhow::Result<()> {
    let args = parse_cli();
    let level = if args.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    let pngout = run(&args)?;
    println!("{}", pngout.display());
    Ok(())
}
