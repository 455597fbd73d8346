use morph_common::types::FileDescriptor;

/// Descriptor for a single uploaded file.
///
/// Only the final path component of `file_name` is kept. Bytes are decoded
/// as UTF-8, replacing invalid sequences.
pub fn discover_upload(file_name: &str, bytes: &[u8]) -> Vec<FileDescriptor> {
    let name = file_name
        .rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or(file_name);

    vec![FileDescriptor::with_content(
        name,
        String::from_utf8_lossy(bytes).into_owned(),
    )]
}
