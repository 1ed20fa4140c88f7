//! PNG codec for slices
//!
//! Slices are written as 8-bit RGBA with no gamma or sRGB chunk, and read back
//! without any transformation, so densities survive bit for bit.

use cloudnoise_synth::Slice;

use crate::DecodeError;

/// Encode a slice as a lossless RGBA8 PNG
pub fn encode_slice(slice: &Slice) -> Result<Vec<u8>, png::EncodingError> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, slice.width, slice.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(png::Compression::Default);

        let mut writer = encoder.write_header()?;
        writer.write_image_data(&slice.pixels)?;
        writer.finish()?;
    }
    Ok(out)
}

/// Decode an RGBA8 PNG into a slice. Any other pixel format is rejected.
pub fn decode_slice(bytes: &[u8]) -> Result<Slice, DecodeError> {
    let mut decoder = png::Decoder::new(bytes);
    decoder.set_transformations(png::Transformations::IDENTITY);
    let mut reader = decoder.read_info()?;

    let mut pixels = vec![0u8; reader.output_buffer_size()];
    let info = reader.next_frame(&mut pixels)?;

    if info.color_type != png::ColorType::Rgba || info.bit_depth != png::BitDepth::Eight {
        return Err(DecodeError::Format {
            color_type: info.color_type,
            bit_depth: info.bit_depth,
        });
    }
    pixels.truncate(info.buffer_size());

    Ok(Slice {
        width: info.width,
        height: info.height,
        pixels,
    })
}
