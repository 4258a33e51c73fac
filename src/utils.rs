use std::io::Write;

use rmp::encode::{write_map_len, write_str, ValueWriteError};
use rmp::Marker;
use rmp_serde::encode::VariantWriter;

/// Forces `rmp-serde` to encode Rust structs as MsgPack maps (field name ->
/// value) instead of its default bare-array encoding, so struct fields
/// round-trip the same way a WAMP peer expects a `Dict` to.
pub struct StructMapWriter;

impl VariantWriter for StructMapWriter {
    fn write_struct_len<W>(&self, wr: &mut W, len: u32) -> Result<Marker, ValueWriteError>
    where
        W: Write,
    {
        write_map_len(wr, len)
    }

    fn write_field_name<W>(&self, wr: &mut W, key: &str) -> Result<(), ValueWriteError>
    where
        W: Write,
    {
        write_str(wr, key)
    }
}
