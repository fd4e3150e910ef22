//! Command-line Modbus RTU client
//!
//! Options select the serial line; everything after them is a Modbus
//! command handed unchanged to the `rtulink` command adapter.

use std::io::Write;
use std::time::Duration;

use clap::Parser;
use tokio::io::AsyncBufReadExt;

use rtulink::*;

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("unable to open {0}")]
    Connect(String),
    #[error("no Modbus slave answered on any serial port")]
    NoSlave,
    #[error("the device refused the write")]
    Refused,
    #[error("no command given, pass one, --scan or --interactive")]
    NoCommand,
}

#[derive(Parser)]
#[command(name = "rtulink-shell")]
#[command(about = "A command line program for reading and writing Modbus RTU devices")]
#[command(version)]
#[command(after_help = HELP)]
struct Cli {
    #[arg(short = 'v', long, help = "Log at INFO level and decode every request")]
    verbose: bool,

    #[arg(short = 'p', long, help = "Serial device, overrides MODBUS_PORT")]
    port: Option<String>,

    #[arg(short = 'b', long, help = "Baud rate, overrides MODBUS_BAUDRATE")]
    baud: Option<u32>,

    #[arg(short = 't', long, value_parser = parse_timeout, help = "Response timeout in seconds, overrides MODBUS_TIMEOUT")]
    timeout: Option<Duration>,

    #[arg(short = 'u', long, value_parser = clap::value_parser!(u8).range(1..=247), help = "Default unit id")]
    unit: Option<u8>,

    #[arg(long, help = "Scan /dev/ttyACM* and /dev/ttyUSB* for a responding slave")]
    scan: bool,

    #[arg(short = 'i', long, help = "Read commands from standard input")]
    interactive: bool,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true, help = "Command tokens, e.g. rc 0 8 1")]
    command: Vec<String>,
}

fn parse_timeout(value: &str) -> Result<Duration, String> {
    let seconds: f64 = value.parse().map_err(|_| format!("not a number: {value}"))?;
    if seconds <= 0.0 {
        return Err("timeout must be positive".to_string());
    }
    Duration::try_from_secs_f64(seconds).map_err(|err| err.to_string())
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = Cli::parse();

    dotenv::dotenv().ok();

    let level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    if let Err(err) = run(cli).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Error> {
    if !cli.interactive && !cli.scan && cli.command.is_empty() {
        return Err(Error::NoCommand);
    }

    let mut config = ClientConfig::from_env()?;
    if let Some(baud) = cli.baud {
        config.endpoint.baud_rate = baud;
    }
    if let Some(timeout) = cli.timeout {
        config.endpoint.timeout = timeout;
    }
    if let Some(unit) = cli.unit {
        config.unit = UnitId::new(unit);
    }

    let decode = if cli.verbose {
        DecodeLevel::from(AppDecodeLevel::DataValues)
    } else {
        DecodeLevel::nothing()
    };

    let session = open(&cli, config, decode).await?;
    println!("connected to {}", session.endpoint());

    let result = if cli.interactive {
        interactive(&session).await
    } else if cli.command.is_empty() {
        Ok(())
    } else {
        execute(&session, &cli.command).await
    };

    session.disconnect().await;
    result
}

/// Connect to the configured port, falling back to discovery unless the port was given explicitly
async fn open(cli: &Cli, mut config: ClientConfig, decode: DecodeLevel) -> Result<ModbusSession, Error> {
    if let Some(port) = &cli.port {
        config.endpoint.path = port.clone();
    }

    if !cli.scan {
        let session = ModbusSession::new(config.clone()).with_decode_level(decode);
        if session.connect().await {
            return Ok(session);
        }
        if cli.port.is_some() {
            return Err(Error::Connect(config.endpoint.path));
        }
        tracing::warn!("unable to open {}, scanning for a slave", config.endpoint.path);
    }

    let ladder: Vec<u32> = cli.baud.into_iter().collect();
    let probe = SlaveProbe::new().with_preferred_unit(config.unit);
    let endpoint = PortDiscovery::new()
        .with_probe(probe)
        .with_template(config.endpoint.clone())
        .with_decode_level(decode)
        .discover(&ladder)
        .await
        .ok_or(Error::NoSlave)?;

    println!("found a slave on {} at {} baud", endpoint.path, endpoint.baud_rate);

    let path = endpoint.path.clone();
    let session = ModbusSession::new(ClientConfig::new(endpoint, config.unit)).with_decode_level(decode);
    if session.connect().await {
        Ok(session)
    } else {
        Err(Error::Connect(path))
    }
}

async fn execute(session: &ModbusSession, tokens: &[String]) -> Result<(), Error> {
    let output = CommandAdapter::new(session).execute(tokens).await?;
    println!("{output}");
    match output {
        CommandOutput::Written(false) => Err(Error::Refused),
        _ => Ok(()),
    }
}

async fn interactive(session: &ModbusSession) -> Result<(), Error> {
    let adapter = CommandAdapter::new(session);
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    println!("{HELP}\nhelp                            show this text\nquit                            exit");

    loop {
        print!("modbus> ");
        std::io::stdout().flush()?;

        let line = match lines.next_line().await? {
            Some(line) => line,
            None => break,
        };
        let line = line.trim();

        match line.to_ascii_lowercase().as_str() {
            "" => continue,
            "quit" | "exit" => break,
            "help" => {
                println!("{HELP}");
                continue;
            }
            _ => {}
        }

        match adapter.execute_line(line).await {
            Ok(output) => println!("{output}"),
            Err(err) => println!("error: {err}"),
        }

        if session.state().await == SessionState::Error {
            println!("the device failed, leaving");
            break;
        }
    }

    Ok(())
}
