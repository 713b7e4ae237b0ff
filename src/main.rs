use std::process;

use pixveil::cli;

fn main()
{
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .init();

    if let Err(err) = cli::run()
    {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}
