pub(crate) mod buffer;
pub(crate) mod cursor;
pub(crate) mod function;
pub(crate) mod phys;
