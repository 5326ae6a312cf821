use image::{imageops, DynamicImage};

/// 64-bit difference hash.
///
/// The image is reduced to a 9x8 grayscale thumbnail and each bit records
/// whether a pixel is brighter than its right neighbor. Two images with the
/// same pixel content hash identically regardless of container format, and
/// visually similar images land within a small Hamming distance.
pub fn dhash64(img: &DynamicImage) -> u64 {
    let gray = img.to_luma8();
    let small = imageops::resize(&gray, 9, 8, imageops::FilterType::Triangle);

    let mut bits: u64 = 0;
    for y in 0..8u32 {
        for x in 0..8u32 {
            if small.get_pixel(x, y)[0] > small.get_pixel(x + 1, y)[0] {
                bits |= 1 << (y * 8 + x);
            }
        }
    }
    bits
}

/// Hex rendering used for storage and API responses.
pub fn dhash_hex(img: &DynamicImage) -> String {
    format!("{:016x}", dhash64(img))
}

/// Number of differing bits between two hashes (0 = identical).
pub fn hamming_distance(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}
