/// HDF5 superblock signature padded to 14 bytes: the smallest Keras file accepted.
pub fn hdf5_model() -> Vec<u8> {
    let mut data = vec![0x89, 0x48, 0x44, 0x46, 0x0D, 0x0A, 0x1A, 0x0A];
    data.extend_from_slice(&[0u8; 6]);
    data
}

/// Protocol 4 pickle of a small dict with plain string keys.
pub fn clean_pickle() -> Vec<u8> {
    let mut data = vec![0x80, 0x04, 0x95];
    data.extend_from_slice(&[0x20, 0, 0, 0, 0, 0, 0, 0]);
    data.extend_from_slice(b"}\x94(\x8c\x07weights\x94]\x94(K\x01K\x02e\x8c\x04bias\x94K\x00u.");
    data
}

/// ONNX-looking protobuf: field 1 (ir_version) varint followed by filler.
pub fn onnx_model() -> Vec<u8> {
    let mut data = vec![0x08, 0x07, 0x12, 0x07];
    data.extend_from_slice(b"pytorch");
    data.extend_from_slice(&[0u8; 128]);
    data
}

/// `MZ` header with zero padding.
pub fn pe_executable() -> Vec<u8> {
    let mut data = b"MZ\x90\x00\x03\x00\x00\x00".to_vec();
    data.extend_from_slice(&[0u8; 120]);
    data
}
