use postsource::adapters::ReqwestHttpClient;
use postsource::cli::{handle_version_command, parse_args, CliCommand, ScrapeJob, ENV_ENDPOINT, USAGE};
use postsource::config::ClientConfig;
use postsource::logging::init_logging;

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use tracing::{debug, warn};

fn main() -> Result<()> {
    // Handle flags that need no runtime first
    let args = match parse_args(std::env::args(), std::env::var(ENV_ENDPOINT).ok()) {
        CliCommand::Version => handle_version_command(),
        CliCommand::Help => {
            println!("{}", USAGE);
            return Ok(());
        }
        CliCommand::Invalid(message) => {
            eprintln!("error: {}\n\n{}", message, USAGE);
            std::process::exit(2);
        }
        CliCommand::Run(args) => args,
    };

    color_eyre::install()?;
    init_logging(args.verbosity);

    let runtime = tokio::runtime::Runtime::new()?;
    let config = ClientConfig::from_env();
    debug!("Client config: {:?}", config);

    let status = runtime.block_on(async {
        let http = ReqwestHttpClient::from_config(&config)
            .wrap_err("failed to build HTTP client")?;
        let job = ScrapeJob::start(http, &args, std::io::stdout())?;

        // Ctrl-C closes the stream; the job then finishes as cancelled
        let closer = job.closer();
        if let Err(e) = ctrlc::set_handler(move || closer.close()) {
            warn!("Failed to install Ctrl-C handler: {}", e);
        }

        Ok::<_, color_eyre::Report>(job.finish().await)
    })?;

    debug!("Job finished: {:?}", status);
    std::process::exit(status.exit_code());
}
