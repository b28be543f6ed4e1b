//! Compression for cached bytes, grounded in the teacher's
//! `geocoders::cache::compression::CacheCompressor`. The teacher ships only
//! an identity "none" compressor behind this interface (real compression
//! was left as future work there too); we keep the same shape so a real
//! codec can be dropped in later without touching call sites.

use metrics::{counter, describe_counter, Unit};

pub struct CacheCompressor {}

impl CacheCompressor {
    pub fn new() -> CacheCompressor {
        describe_counter!("nextvision.compressor_input.bytes_total", Unit::Bytes, "Bytes input to compressor");
        describe_counter!("nextvision.compressor_output.bytes_total", Unit::Bytes, "Bytes output by compressor");
        describe_counter!("nextvision.decompressor_input.bytes_total", Unit::Bytes, "Bytes input to decompressor");
        describe_counter!("nextvision.decompressor_output.bytes_total", Unit::Bytes, "Bytes output by decompressor");
        CacheCompressor {}
    }

    /// Identifier of this compression format, stored as the first byte of
    /// every cache entry so future codecs can be introduced without
    /// breaking old entries.
    pub fn id(&self) -> u8 {
        b'N'
    }

    pub fn compress(&self, input: &[u8], output: &mut Vec<u8>) -> crate::Result<()> {
        counter!("nextvision.compressor_input.bytes_total", input.len() as u64);
        output.extend_from_slice(input);
        counter!("nextvision.compressor_output.bytes_total", output.len() as u64);
        Ok(())
    }

    pub fn decompress(&self, input: &[u8], output: &mut Vec<u8>) -> crate::Result<()> {
        counter!("nextvision.decompressor_input.bytes_total", input.len() as u64);
        output.extend_from_slice(input);
        counter!("nextvision.decompressor_output.bytes_total", output.len() as u64);
        Ok(())
    }
}

impl Default for CacheCompressor {
    fn default() -> Self {
        Self::new()
    }
}
