use image::{GrayImage, ImageBuffer, Luma, imageops};

/// Pixels darker than this count as ink.
const INK_THRESHOLD: u8 = 128;

/// Bounding box `(x, y, width, height)` of all ink pixels, or None if blank.
pub fn ink_bounds(img: &GrayImage) -> Option<(u32, u32, u32, u32)> {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;
    let mut found = false;

    for (x, y, pixel) in img.enumerate_pixels() {
        if pixel[0] < INK_THRESHOLD {
            found = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    found.then(|| (min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
}

/// Crops the glyph to its ink and pads it with a white border.
///
/// Tesseract's single-character mode reads a tight, centered glyph far more
/// reliably than a small letter in a corner of the canvas.
pub fn crop_to_ink(img: &GrayImage, margin: u32) -> Option<GrayImage> {
    let (x, y, w, h) = ink_bounds(img)?;
    let glyph = imageops::crop_imm(img, x, y, w, h).to_image();

    let mut output: GrayImage =
        ImageBuffer::from_pixel(w + 2 * margin, h + 2 * margin, Luma([255]));
    imageops::replace(&mut output, &glyph, margin as i64, margin as i64);
    Some(output)
}
