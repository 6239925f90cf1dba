use crate::bloom::BloomFilter;
use std::io::{Read, Seek, SeekFrom, Write};

pub(super) fn write_filter_block(filter: &mut BloomFilter, writer: &mut (impl Write + Seek)) {
    debug_assert!(filter.len() >= 8);
    writer.write_all(&filter.0).unwrap();
    writer.flush().unwrap();
}

pub(super) fn load_filter_block(
    offset: u64,
    length: usize,
    reader: &mut (impl Read + Seek),
) -> BloomFilter {
    debug_assert!(length >= 8);
    reader.seek(SeekFrom::Start(offset)).unwrap();
    let mut arr: Vec<u8> = vec![0; length];
    reader.read_exact(&mut arr).unwrap();
    BloomFilter(arr)
}
