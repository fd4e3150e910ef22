use crate::client::session::ModbusSession;
use crate::error::RequestError;
use crate::types::RegisterSpace;

mod command;
mod output;

pub use command::{Command, HELP};
pub use output::CommandOutput;

/// Why a command produced no output
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum CommandError {
    /// The first token names no known command
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    /// Missing, extra or unparsable arguments
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    /// The session failed to carry out the command
    #[error(transparent)]
    Request(#[from] RequestError),
}

/// Result type of [`CommandAdapter::execute`]
pub type CommandResult = Result<CommandOutput, CommandError>;

/// Executes textual Modbus commands against a borrowed session
///
/// Front-ends hand their tokens over unchanged, see [`HELP`] for the grammar.
/// Commands that fail to parse never reach the session.
#[derive(Clone, Copy, Debug)]
pub struct CommandAdapter<'a> {
    session: &'a ModbusSession,
}

impl<'a> CommandAdapter<'a> {
    /// Create an adapter over `session`
    pub fn new(session: &'a ModbusSession) -> Self {
        Self { session }
    }

    /// Parse and run a command given as tokens, e.g. `["rc", "0", "8", "1"]`
    pub async fn execute<S>(&self, tokens: &[S]) -> CommandResult
    where
        S: AsRef<str>,
    {
        let command = Command::parse(tokens)?;
        self.run(command).await
    }

    /// Split a line on whitespace and run it
    pub async fn execute_line(&self, line: &str) -> CommandResult {
        let command: Command = line.parse()?;
        self.run(command).await
    }

    /// Run an already parsed command
    pub async fn run(&self, command: Command) -> CommandResult {
        tracing::debug!("executing {:?}", command);

        let session = self.session;
        let output = match command {
            Command::Read {
                space,
                address,
                count,
                unit,
            } => match space {
                RegisterSpace::Coil => CommandOutput::Bits(
                    session.read_coils_indexed(address, count, unit).await?,
                ),
                RegisterSpace::DiscreteInput => CommandOutput::Bits(
                    session
                        .read_discrete_inputs_indexed(address, count, unit)
                        .await?,
                ),
                RegisterSpace::HoldingRegister => CommandOutput::Registers(
                    session
                        .read_holding_registers_indexed(address, count, unit)
                        .await?,
                ),
                RegisterSpace::InputRegister => CommandOutput::Registers(
                    session
                        .read_input_registers_indexed(address, count, unit)
                        .await?,
                ),
            },
            Command::WriteCoil {
                address,
                value,
                unit,
            } => CommandOutput::Written(session.write_coil(address, value, unit).await?),
            Command::WriteRegister {
                address,
                value,
                unit,
            } => CommandOutput::Written(session.write_register(address, value, unit).await?),
            Command::WriteCoils {
                address,
                values,
                unit,
            } => CommandOutput::Written(session.write_coils(address, &values, unit).await?),
            Command::WriteRegisters {
                address,
                values,
                unit,
            } => CommandOutput::Written(session.write_registers(address, &values, unit).await?),
            Command::ToggleCoil { address, unit } => {
                match session.toggle_coil(address, unit).await? {
                    Some(toggled) => CommandOutput::Toggled {
                        previous: toggled.previous,
                        current: toggled.current,
                    },
                    None => CommandOutput::Written(false),
                }
            }
        };

        Ok(output)
    }
}
