use std::fmt::{Display, Formatter};

use crate::common::cursor::ReadCursor;
use crate::common::function::FunctionCode;
use crate::decode::AppDecodeLevel;
use crate::error::RequestError;

pub(crate) mod read_bits;
pub(crate) mod read_registers;
pub(crate) mod write_multiple;
pub(crate) mod write_single;

/// A request that can be serialized into a frame body and matched against its response
pub(crate) trait RequestDetails {
    type Response: std::fmt::Debug;

    fn function(&self) -> FunctionCode;

    fn serialize(&self, payload: &mut Vec<u8>);

    fn parse(&self, cursor: ReadCursor<'_>) -> Result<Self::Response, RequestError>;

    /// Describe the request for the application decode level
    fn describe(&self, f: &mut Formatter<'_>, level: AppDecodeLevel) -> std::fmt::Result;
}

pub(crate) struct RequestDisplay<'a, R> {
    request: &'a R,
    level: AppDecodeLevel,
}

impl<'a, R> RequestDisplay<'a, R>
where
    R: RequestDetails,
{
    pub(crate) fn new(level: AppDecodeLevel, request: &'a R) -> Self {
        Self { request, level }
    }
}

impl<R> Display for RequestDisplay<'_, R>
where
    R: RequestDetails,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.request.function())?;
        if self.level.data_headers() {
            f.write_str(" ")?;
            self.request.describe(f, self.level)?;
        }
        Ok(())
    }
}
