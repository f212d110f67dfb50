//! Export part of the framebuffer as an image

use std::path::Path;

use image::RgbaImage;

use crate::error::RenderError;
use crate::rasterizer::{Framebuffer, Viewport};

/// Copy `rect` (clamped to the framebuffer) into an image, row 0 at the top
pub fn capture_region(fb: &Framebuffer, rect: Viewport) -> Result<RgbaImage, RenderError> {
    let r = rect
        .intersection(&fb.bounds())
        .ok_or_else(|| RenderError::Capture(format!("region {:?} is outside the framebuffer", rect)))?;
    let mut rgba = Vec::with_capacity(r.width as usize * r.height as usize * 4);
    for y in r.y..r.bottom() {
        let start = (y as usize * fb.width + r.x as usize) * 4;
        rgba.extend_from_slice(&fb.pixels[start..start + r.width as usize * 4]);
    }
    RgbaImage::from_raw(r.width as u32, r.height as u32, rgba)
        .ok_or_else(|| RenderError::Capture("pixel buffer does not match the region size".into()))
}

/// Save `rect` of the framebuffer as a PNG file
pub fn save_png(fb: &Framebuffer, rect: Viewport, path: &Path) -> Result<(), RenderError> {
    let img = capture_region(fb, rect)?;
    img.save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| RenderError::Capture(format!("failed to write {}: {}", path.display(), e)))?;
    log::debug!("saved {}x{} capture to {}", img.width(), img.height(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::Rgba;

    #[test]
    fn test_capture_is_clamped_and_top_down() {
        let mut fb = Framebuffer::new(8, 6);
        fb.clear(Rgba::BLACK);
        fb.set_pixel(5, 4, Rgba::RED);

        let img = capture_region(&fb, Viewport::new(4, 3, 10, 10)).unwrap();
        assert_eq!(img.dimensions(), (4, 3));
        assert_eq!(img.get_pixel(1, 1).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0, 255]);

        assert!(matches!(capture_region(&fb, Viewport::new(20, 0, 4, 4)), Err(RenderError::Capture(_))));
    }

    #[test]
    fn test_save_png_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("region.png");
        let mut fb = Framebuffer::new(4, 4);
        fb.clear(Rgba::BLUE);
        save_png(&fb, Viewport::new(0, 0, 2, 3), &path).unwrap();

        let loaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(loaded.dimensions(), (2, 3));
        assert_eq!(loaded.get_pixel(1, 2).0, [0, 0, 255, 255]);
    }
}
