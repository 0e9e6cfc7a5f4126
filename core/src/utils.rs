use std::fmt;
use num_enum::TryFromPrimitive;

/// Render a raw id as its enum variant name, or as hex when unknown.
pub fn enum_name_or_hex<T>(raw: T::Primitive) -> String
where
    T: TryFromPrimitive + fmt::Debug,
    T::Primitive: fmt::LowerHex,
{
    match T::try_from_primitive(raw) {
        Ok(variant) => format!("{:?}", variant),
        Err(_) => format!("0x{:x}", raw),
    }
}

#[cfg(test)]
mod tests {
    use super::enum_name_or_hex;
    use crate::compression::CompressionCodec;

    #[test]
    fn known_ids_render_as_names() {
        assert_eq!(enum_name_or_hex::<CompressionCodec>(2), "Snappy");
    }

    #[test]
    fn unknown_ids_render_as_hex() {
        assert_eq!(enum_name_or_hex::<CompressionCodec>(0x2a), "0x2a");
    }
}
