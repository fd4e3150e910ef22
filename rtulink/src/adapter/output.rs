use std::fmt::{Display, Formatter};

use crate::types::Indexed;

/// Result of a successfully executed command
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum CommandOutput {
    /// Coils or discrete inputs that were read
    Bits(Vec<Indexed<bool>>),
    /// Holding or input registers that were read
    Registers(Vec<Indexed<u16>>),
    /// `true` if the slave confirmed the write, `false` if it refused it
    Written(bool),
    /// A coil that was inverted
    Toggled {
        /// value before the write
        previous: bool,
        /// value after the write
        current: bool,
    },
}

fn on_off(value: bool) -> &'static str {
    if value {
        "ON"
    } else {
        "OFF"
    }
}

fn lines<T: Display>(f: &mut Formatter<'_>, values: &[T]) -> std::fmt::Result {
    let mut first = true;
    for value in values {
        if !first {
            f.write_str("\n")?;
        }
        first = false;
        write!(f, "{value}")?;
    }
    Ok(())
}

impl Display for CommandOutput {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandOutput::Bits(values) => lines(f, values),
            CommandOutput::Registers(values) => lines(f, values),
            CommandOutput::Written(true) => f.write_str("write confirmed"),
            CommandOutput::Written(false) => f.write_str("write refused"),
            CommandOutput::Toggled { previous, current } => {
                write!(f, "{} -> {}", on_off(*previous), on_off(*current))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_print_one_per_line() {
        let output = CommandOutput::Bits(vec![Indexed::new(3, true), Indexed::new(4, false)]);
        assert_eq!(output.to_string(), "  3: ON\n  4: OFF");
    }

    #[test]
    fn registers_print_decimal_and_hex() {
        let output = CommandOutput::Registers(vec![Indexed::new(1, 1234)]);
        assert_eq!(output.to_string(), "  1: 1234 (0x04D2)");
        assert_eq!(CommandOutput::Registers(vec![]).to_string(), "");
    }

    #[test]
    fn writes_and_toggles() {
        assert_eq!(CommandOutput::Written(true).to_string(), "write confirmed");
        assert_eq!(CommandOutput::Written(false).to_string(), "write refused");
        assert_eq!(
            CommandOutput::Toggled {
                previous: false,
                current: true
            }
            .to_string(),
            "OFF -> ON"
        );
    }
}
