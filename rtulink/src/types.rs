use crate::constants::{coil, defaults, limits};
use crate::error::{AduParseError, InvalidRequest};

/// Modbus unit identifier, a type-safe wrapper around `u8`
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Ord, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct UnitId {
    /// underlying raw value
    pub value: u8,
}

impl UnitId {
    /// Create a unit id from its raw value
    pub const fn new(value: u8) -> Self {
        Self { value }
    }

    /// The broadcast address (0)
    pub const fn broadcast() -> Self {
        Self { value: 0 }
    }

    /// Values 248 to 255 are reserved on a serial line
    pub fn is_rtu_reserved(&self) -> bool {
        self.value >= 248
    }

    /// True if a request to this unit gets a response, i.e. 1 to 247
    pub fn is_addressable(&self) -> bool {
        self.value != 0 && !self.is_rtu_reserved()
    }

    pub(crate) fn check_addressable(self) -> Result<Self, InvalidRequest> {
        if self.is_addressable() {
            Ok(self)
        } else {
            Err(InvalidRequest::UnitNotAddressable(self.value))
        }
    }
}

impl Default for UnitId {
    fn default() -> Self {
        Self::new(defaults::UNIT)
    }
}

impl From<u8> for UnitId {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#04X}", self.value)
    }
}

/// The four Modbus data tables
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum RegisterSpace {
    /// Read/write bits
    Coil,
    /// Read-only bits
    DiscreteInput,
    /// Read/write 16-bit registers
    HoldingRegister,
    /// Read-only 16-bit registers
    InputRegister,
}

impl RegisterSpace {
    /// Coils and discrete inputs hold single bits
    pub fn is_bit(&self) -> bool {
        matches!(self, RegisterSpace::Coil | RegisterSpace::DiscreteInput)
    }

    /// Largest count a single read of this space may request
    pub fn max_read_count(&self) -> u16 {
        if self.is_bit() {
            limits::MAX_READ_COILS_COUNT
        } else {
            limits::MAX_READ_REGISTERS_COUNT
        }
    }
}

impl std::fmt::Display for RegisterSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RegisterSpace::Coil => "coils",
            RegisterSpace::DiscreteInput => "discrete inputs",
            RegisterSpace::HoldingRegister => "holding registers",
            RegisterSpace::InputRegister => "input registers",
        };
        f.write_str(name)
    }
}

/// Start and count tuple used when making requests
///
/// Cannot be constructed with a zero count or a range that overflows `u16`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressRange {
    /// Starting address of the range
    pub start: u16,
    /// Count of elements in the range
    pub count: u16,
}

impl AddressRange {
    /// Validate and construct a range
    pub fn try_from(start: u16, count: u16) -> Result<Self, InvalidRequest> {
        if count == 0 {
            return Err(InvalidRequest::CountOfZero);
        }

        let max_start = u16::MAX - (count - 1);
        if start > max_start {
            return Err(InvalidRequest::AddressOverflow(start, count));
        }

        Ok(Self { start, count })
    }

    /// Iterate over the addresses in the range
    pub fn addresses(&self) -> impl Iterator<Item = u16> {
        let start = self.start;
        (0..self.count).map(move |offset| start + offset)
    }

    pub(crate) fn limited(self, max: u16) -> Result<Self, InvalidRequest> {
        if self.count > max {
            return Err(InvalidRequest::CountTooBigForType(self.count, max));
        }
        Ok(self)
    }

    pub(crate) fn of_read(self, space: RegisterSpace) -> Result<Self, InvalidRequest> {
        self.limited(space.max_read_count())
    }
}

impl std::fmt::Display for AddressRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "start: {:#06X} qty: {}", self.start, self.count)
    }
}

/// Value and its address
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct Indexed<T> {
    /// Address of the value
    pub index: u16,
    /// Associated value
    pub value: T,
}

impl<T> Indexed<T> {
    /// Create a new indexed value
    pub fn new(index: u16, value: T) -> Self {
        Indexed { index, value }
    }
}

impl<T> From<(u16, T)> for Indexed<T> {
    fn from((index, value): (u16, T)) -> Self {
        Self::new(index, value)
    }
}

impl std::fmt::Display for Indexed<bool> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:>3}: {}",
            self.index,
            if self.value { "ON" } else { "OFF" }
        )
    }
}

impl std::fmt::Display for Indexed<u16> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:>3}: {} ({:#06X})", self.index, self.value, self.value)
    }
}

pub(crate) fn coil_from_u16(value: u16) -> Result<bool, AduParseError> {
    match value {
        coil::ON => Ok(true),
        coil::OFF => Ok(false),
        _ => Err(AduParseError::UnknownCoilState(value)),
    }
}

pub(crate) fn coil_to_u16(value: bool) -> u16 {
    if value {
        coil::ON
    } else {
        coil::OFF
    }
}

pub(crate) fn num_bytes_for_bits(count: u16) -> usize {
    (usize::from(count) + 7) / 8
}

/// Bit `n` of the range lives in byte `n / 8` at bit position `n % 8`
pub(crate) fn unpack_bits(range: AddressRange, bytes: &[u8]) -> Vec<Indexed<bool>> {
    range
        .addresses()
        .enumerate()
        .filter_map(|(pos, address)| {
            bytes
                .get(pos / 8)
                .map(|byte| Indexed::new(address, byte & (1 << (pos % 8)) != 0))
        })
        .collect()
}

pub(crate) fn pack_bits(values: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0u8; (values.len() + 7) / 8];
    for (pos, _) in values.iter().enumerate().filter(|(_, value)| **value) {
        if let Some(byte) = bytes.get_mut(pos / 8) {
            *byte |= 1 << (pos % 8);
        }
    }
    bytes
}
