use std::str::FromStr;

use crate::adapter::CommandError;
use crate::types::{RegisterSpace, UnitId};

/// Commands understood by [`CommandAdapter`](crate::CommandAdapter)
pub const HELP: &str = "\
rc <addr> <count> [unit]        read coils
rd <addr> <count> [unit]        read discrete inputs
rh <addr> <count> [unit]        read holding registers
ri <addr> <count> [unit]        read input registers
wc <addr> <0|1> [unit]          write a coil (also true/false, on/off)
wr <addr> <value> [unit]        write a holding register (alias: wh)
wcs <addr> <v1,v2,...> [unit]   write consecutive coils
wrs <addr> <v1,v2,...> [unit]   write consecutive holding registers
tc <addr> [unit]                toggle a coil";

/// A parsed Modbus command
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Read `count` values of `space` starting at `address`
    Read {
        /// table to read
        space: RegisterSpace,
        /// first address
        address: u16,
        /// number of values
        count: u16,
        /// unit override
        unit: Option<UnitId>,
    },
    /// Write a single coil
    WriteCoil {
        /// coil address
        address: u16,
        /// new state
        value: bool,
        /// unit override
        unit: Option<UnitId>,
    },
    /// Write a single holding register
    WriteRegister {
        /// register address
        address: u16,
        /// new value
        value: u16,
        /// unit override
        unit: Option<UnitId>,
    },
    /// Write consecutive coils
    WriteCoils {
        /// first address
        address: u16,
        /// new states
        values: Vec<bool>,
        /// unit override
        unit: Option<UnitId>,
    },
    /// Write consecutive holding registers
    WriteRegisters {
        /// first address
        address: u16,
        /// new values
        values: Vec<u16>,
        /// unit override
        unit: Option<UnitId>,
    },
    /// Invert a coil
    ToggleCoil {
        /// coil address
        address: u16,
        /// unit override
        unit: Option<UnitId>,
    },
}

impl Command {
    /// Parse a command from its tokens, the first one naming the command
    ///
    /// The name is case-insensitive. A trailing token beyond the required
    /// arguments is the unit.
    pub fn parse<S>(tokens: &[S]) -> Result<Self, CommandError>
    where
        S: AsRef<str>,
    {
        let (name, rest) = tokens
            .split_first()
            .ok_or_else(|| CommandError::InvalidArguments("empty command".to_string()))?;
        let name = name.as_ref().to_ascii_lowercase();
        let args: Vec<&str> = rest.iter().map(AsRef::as_ref).collect();

        match name.as_str() {
            "rc" => read(RegisterSpace::Coil, &name, &args),
            "rd" => read(RegisterSpace::DiscreteInput, &name, &args),
            "rh" => read(RegisterSpace::HoldingRegister, &name, &args),
            "ri" => read(RegisterSpace::InputRegister, &name, &args),
            "wc" => {
                let (args, unit) = split(&name, "<addr> <0|1> [unit]", &args, 2)?;
                Ok(Command::WriteCoil {
                    address: number("address", args[0])?,
                    value: coil(args[1])?,
                    unit,
                })
            }
            "wr" | "wh" => {
                let (args, unit) = split(&name, "<addr> <value> [unit]", &args, 2)?;
                Ok(Command::WriteRegister {
                    address: number("address", args[0])?,
                    value: number("value", args[1])?,
                    unit,
                })
            }
            "wcs" => {
                let (args, unit) = split(&name, "<addr> <v1,v2,...> [unit]", &args, 2)?;
                Ok(Command::WriteCoils {
                    address: number("address", args[0])?,
                    values: list(args[1], coil)?,
                    unit,
                })
            }
            "wrs" => {
                let (args, unit) = split(&name, "<addr> <v1,v2,...> [unit]", &args, 2)?;
                Ok(Command::WriteRegisters {
                    address: number("address", args[0])?,
                    values: list(args[1], |x| number("value", x))?,
                    unit,
                })
            }
            "tc" => {
                let (args, unit) = split(&name, "<addr> [unit]", &args, 1)?;
                Ok(Command::ToggleCoil {
                    address: number("address", args[0])?,
                    unit,
                })
            }
            _ => Err(CommandError::UnknownCommand(name)),
        }
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = s.split_whitespace().collect();
        Self::parse(&tokens)
    }
}

fn read(space: RegisterSpace, name: &str, args: &[&str]) -> Result<Command, CommandError> {
    let (args, unit) = split(name, "<addr> <count> [unit]", args, 2)?;
    Ok(Command::Read {
        space,
        address: number("address", args[0])?,
        count: number("count", args[1])?,
        unit,
    })
}

/// Separate the required arguments from the optional trailing unit
fn split<'a>(
    name: &str,
    usage: &str,
    args: &'a [&'a str],
    required: usize,
) -> Result<(&'a [&'a str], Option<UnitId>), CommandError> {
    if args.len() == required {
        return Ok((args, None));
    }
    match args.split_last() {
        Some((unit, args)) if args.len() == required => {
            Ok((args, Some(UnitId::new(number("unit", unit)?))))
        }
        _ => Err(CommandError::InvalidArguments(format!(
            "usage: {name} {usage}"
        ))),
    }
}

fn number<T: FromStr>(what: &str, token: &str) -> Result<T, CommandError> {
    token
        .parse()
        .map_err(|_| CommandError::InvalidArguments(format!("invalid {what}: {token}")))
}

fn coil(token: &str) -> Result<bool, CommandError> {
    match token.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" => Ok(true),
        "0" | "false" | "off" => Ok(false),
        _ => Err(CommandError::InvalidArguments(format!(
            "invalid coil value: {token}"
        ))),
    }
}

fn list<T>(
    token: &str,
    item: impl Fn(&str) -> Result<T, CommandError>,
) -> Result<Vec<T>, CommandError> {
    token.split(',').map(item).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Command, CommandError> {
        line.parse()
    }

    fn invalid(line: &str) -> bool {
        matches!(parse(line), Err(CommandError::InvalidArguments(_)))
    }

    #[test]
    fn parses_reads_with_and_without_unit() {
        assert_eq!(
            parse("rc 0 8"),
            Ok(Command::Read {
                space: RegisterSpace::Coil,
                address: 0,
                count: 8,
                unit: None
            })
        );
        assert_eq!(
            parse("RI 100 2 17"),
            Ok(Command::Read {
                space: RegisterSpace::InputRegister,
                address: 100,
                count: 2,
                unit: Some(UnitId::new(17))
            })
        );
        assert!(matches!(
            parse("rd 0 1"),
            Ok(Command::Read {
                space: RegisterSpace::DiscreteInput,
                ..
            })
        ));
        assert!(matches!(
            parse("Rh 0 1"),
            Ok(Command::Read {
                space: RegisterSpace::HoldingRegister,
                ..
            })
        ));
    }

    #[test]
    fn accepts_every_coil_spelling() {
        for (token, value) in [
            ("1", true),
            ("0", false),
            ("TRUE", true),
            ("false", false),
            ("On", true),
            ("off", false),
        ] {
            assert_eq!(
                parse(&format!("wc 3 {token}")),
                Ok(Command::WriteCoil {
                    address: 3,
                    value,
                    unit: None
                })
            );
        }
        assert!(invalid("wc 3 2"));
        assert!(invalid("wc 3 yes"));
    }

    #[test]
    fn write_register_has_an_alias() {
        let expected = Ok(Command::WriteRegister {
            address: 1,
            value: 1234,
            unit: Some(UnitId::new(2)),
        });
        assert_eq!(parse("wr 1 1234 2"), expected);
        assert_eq!(parse("wh 1 1234 2"), expected);
        assert!(invalid("wr 1 65536"));
    }

    #[test]
    fn parses_lists() {
        assert_eq!(
            parse("wcs 8 1,off,true"),
            Ok(Command::WriteCoils {
                address: 8,
                values: vec![true, false, true],
                unit: None
            })
        );
        assert_eq!(
            parse("wrs 10 1,2,3 4"),
            Ok(Command::WriteRegisters {
                address: 10,
                values: vec![1, 2, 3],
                unit: Some(UnitId::new(4))
            })
        );
        assert!(invalid("wrs 10 1,,3"));
        assert!(invalid("wcs 10 1,2"));
    }

    #[test]
    fn parses_toggle() {
        assert_eq!(
            parse("tc 5"),
            Ok(Command::ToggleCoil {
                address: 5,
                unit: None
            })
        );
    }

    #[test]
    fn rejects_bad_arity_and_numbers() {
        assert!(invalid(""));
        assert!(invalid("rc"));
        assert!(invalid("rc 0"));
        assert!(invalid("rc 0 1 2 3"));
        assert!(invalid("rc -1 1"));
        assert!(invalid("rh 0 x"));
        assert!(invalid("rh 0 1 256"));
        assert!(invalid("tc"));
        assert!(invalid("tc 1 2 3"));
    }

    #[test]
    fn unknown_names_are_reported() {
        assert_eq!(
            parse("READ 0 1"),
            Err(CommandError::UnknownCommand("read".to_string()))
        );
        assert_eq!(
            Command::parse(&["quit"]),
            Err(CommandError::UnknownCommand("quit".to_string()))
        );
    }

    #[test]
    fn help_lists_every_command() {
        for name in ["rc", "rd", "rh", "ri", "wc", "wr", "wh", "wcs", "wrs", "tc"] {
            assert!(HELP.contains(name), "{name} missing from help");
        }
    }
}
