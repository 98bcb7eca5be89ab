pub mod serde {
    use alloy_core::primitives::Address;
    use serde::Serializer;

    /// Serialize an address in its EIP-55 checksummed form
    pub fn checksummed_address<S>(address: &Address, ser: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        ser.serialize_str(&address.to_checksum(None))
    }
}
