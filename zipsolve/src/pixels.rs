use anyhow::bail;
use image::{DynamicImage, Rgba, RgbaImage};

/// Row-major RGBA pixels, four bytes per pixel
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self, anyhow::Error> {
        let Some(expected) = width.checked_mul(height).and_then(|n| n.checked_mul(4)) else {
            bail!("pixel buffer of {}x{} overflows", width, height);
        };

        if data.len() != expected {
            bail!(
                "pixel buffer size mismatch: expected {} bytes, got {}",
                expected,
                data.len()
            );
        }

        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Convert any decoded image to RGBA8
    pub fn from_image(img: &DynamicImage) -> Self {
        img.to_rgba8().into()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgba<u8>> {
        if x >= self.width || y >= self.height {
            return None;
        }

        let i = (y * self.width + x) * 4;
        Some(Rgba([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]))
    }
}

impl From<RgbaImage> for PixelBuffer {
    fn from(img: RgbaImage) -> Self {
        Self {
            width: img.width() as usize,
            height: img.height() as usize,
            data: img.into_raw(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_size_checked() {
        assert!(PixelBuffer::new(2, 2, vec![0; 15]).is_err());
        assert!(PixelBuffer::new(usize::MAX, 2, vec![]).is_err());

        let empty = PixelBuffer::new(0, 0, vec![]).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_pixel_lookup() {
        let mut img = RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255]));
        img.put_pixel(2, 1, Rgba([9, 8, 7, 6]));
        let pixels = PixelBuffer::from_image(&DynamicImage::ImageRgba8(img));

        assert_eq!(pixels.width(), 3);
        assert_eq!(pixels.height(), 2);
        assert_eq!(pixels.data().len(), 24);
        assert_eq!(pixels.pixel(0, 0), Some(Rgba([1, 2, 3, 255])));
        assert_eq!(pixels.pixel(2, 1), Some(Rgba([9, 8, 7, 6])));
        assert_eq!(pixels.pixel(3, 0), None);
    }
}
