use clap::Parser;
use redirector::{logging, parse_target, run_server, App, Config};
use redirector_runtime::{Context, RedirectOptions, Request, Status};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "redirector")]
#[command(version = "0.1.0")]
#[command(about = "Resolve redirect targets into HTTP redirect responses", long_about = None)]
struct Cli {
    /// URL, path, or `:back`
    #[arg(value_name = "TARGET")]
    target: Option<String>,

    /// Listen address; without a value the config's `server.addr` is used
    #[arg(
        short = 'S',
        long = "server",
        value_name = "ADDR:PORT",
        num_args = 0..=1,
        default_missing_value = ""
    )]
    server: Option<String>,

    #[arg(short = 'c', long = "config-dir", value_name = "DIR", default_value = ".")]
    config_dir: PathBuf,

    #[arg(long = "host", value_name = "HOST[:PORT]")]
    host: Option<String>,

    #[arg(long = "https")]
    https: bool,

    #[arg(long = "referer", value_name = "URL")]
    referer: Option<String>,

    #[arg(short = 's', long = "status", value_name = "STATUS")]
    status: Option<String>,

    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.quiet);

    let config = match Config::load(&cli.config_dir) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let app = Arc::new(App::new(config));

    if let Some(addr) = &cli.server {
        let addr = if addr.is_empty() {
            app.config().server.addr.clone()
        } else {
            addr.clone()
        };

        let runtime = match tokio::runtime::Runtime::new() {
            Ok(runtime) => runtime,
            Err(e) => {
                eprintln!("Error: failed to create tokio runtime: {}", e);
                std::process::exit(1);
            }
        };
        if let Err(e) = runtime.block_on(run_server(app, &addr)) {
            eprintln!("Server error: {}", e);
            std::process::exit(1);
        }
    } else if let Some(target) = &cli.target {
        resolve_target(&app, &cli, target);
    } else {
        print_usage();
    }
}

fn resolve_target(app: &App, cli: &Cli, target: &str) {
    let server = &app.config().server;
    let scheme = if cli.https { "https" } else { server.protocol.as_str() };
    let host = cli.host.as_deref().unwrap_or(&server.host);

    let mut request = Request::new().with_scheme(scheme).with_host(host);
    if let Some(referer) = &cli.referer {
        request = request.with_header("Referer", referer);
    }

    let mut ctx = Context::new(request);
    let options = RedirectOptions {
        status: cli.status.clone().map(Status::from),
        back_message: None,
    };

    match app
        .redirector()
        .redirect(&mut ctx, parse_target(target), options)
    {
        Ok(()) => {
            println!("Status: {}", ctx.response.status);
            if let Some(location) = ctx.response.location() {
                println!("Location: {}", location);
            }
            println!();
            println!("{}", ctx.response.body);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!(
        r#"redirector - resolve redirect targets

Usage:
  redirector <target> [options]      Resolve one target and print the response
  redirector -S [addr:port]          Serve the redirect rules from redirector.toml

Options:
  -S, --server [ADDR:PORT]           Start the redirect server
  -c, --config-dir <DIR>             Directory holding redirector.toml (default: .)
      --host <HOST[:PORT]>           Host of the simulated request
      --https                        Simulate an https request
      --referer <URL>                Referer of the simulated request
  -s, --status <STATUS>              Status code or name (default: found)
  -q, --quiet                        Only log warnings

Targets:
  https://example.com/               Absolute URL, used as-is
  /images/screenshot.jpg             Path, joined onto the request's protocol and host
  :back                              The request's Referer

Examples:
  redirector /login --host example.com:8080
  redirector https://www.rust-lang.org -s moved_permanently
  redirector :back --referer http://example.com/form
  redirector -S 0.0.0.0:8080 -c ./conf
"#
    );
}
