//! 画像コーデックアダプタ
//!
//! 圧縮（縮小＋JPEG再エンコード）・回転・中央正方形切り抜き。
//! いずれも入力バイト列を変更せず、新しいJPEGバイト列を返す。

mod orientation;

use crate::error::{CropDoctorError, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, ImageReader, Rgba, RgbaImage};
use std::io::Cursor;

pub use orientation::{apply_orientation, read_orientation};

/// 回転・切り抜き後のJPEG品質
pub const EDIT_JPEG_QUALITY: u8 = 90;

/// 画像処理の差し替え口
///
/// 本番は [`RasterCodec`]。パイプラインのテストでは遅延や失敗を注入した実装を使う。
pub trait ImageCodec: Send + Sync {
    fn compress(&self, bytes: &[u8], max_dimension: u32, quality: u8) -> Result<Vec<u8>>;
    fn rotate(&self, bytes: &[u8], degrees: f64) -> Result<Vec<u8>>;
    fn crop_center_square(&self, bytes: &[u8]) -> Result<Vec<u8>>;
}

/// `image` クレートによる実装
#[derive(Debug, Default, Clone, Copy)]
pub struct RasterCodec;

impl ImageCodec for RasterCodec {
    fn compress(&self, bytes: &[u8], max_dimension: u32, quality: u8) -> Result<Vec<u8>> {
        compress(bytes, max_dimension, quality)
    }

    fn rotate(&self, bytes: &[u8], degrees: f64) -> Result<Vec<u8>> {
        rotate(bytes, degrees)
    }

    fn crop_center_square(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        crop_center_square(bytes)
    }
}

/// デコードしてEXIFの向きを反映
pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    let image = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CropDoctorError::Decode(format!("形式判定に失敗: {}", e)))?
        .decode()
        .map_err(|e| CropDoctorError::Decode(e.to_string()))?;

    Ok(apply_orientation(image, read_orientation(bytes)))
}

/// 縮小後のサイズ: scale = min(1, max_dimension / max(w, h))
///
/// `max_dimension` が 0 のときは (0, 0)。描画先を作れないため圧縮側で `Encode` になる。
pub fn scaled_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if max_dimension == 0 {
        return (0, 0);
    }
    let longest = width.max(height).max(1) as f64;
    let scale = (max_dimension as f64 / longest).min(1.0);
    // 極端な縦横比でも短辺は1px残す
    (
        ((width as f64 * scale).round() as u32).max(1),
        ((height as f64 * scale).round() as u32).max(1),
    )
}

/// 回転後の外接矩形
pub fn rotated_bounds(width: u32, height: u32, degrees: f64) -> (u32, u32) {
    let radians = degrees.to_radians();
    let sin = radians.sin().abs();
    let cos = radians.cos().abs();
    let (w, h) = (width as f64, height as f64);
    ((w * cos + h * sin).round() as u32, (w * sin + h * cos).round() as u32)
}

pub fn compress(bytes: &[u8], max_dimension: u32, quality: u8) -> Result<Vec<u8>> {
    let image = decode(bytes)?;
    let (width, height) = scaled_dimensions(image.width(), image.height(), max_dimension);

    let resized = if (width, height) == (image.width(), image.height()) {
        image
    } else {
        ensure_surface(width, height)?;
        image.resize_exact(width, height, FilterType::Triangle)
    };

    encode_jpeg(&resized, quality)
}

pub fn rotate(bytes: &[u8], degrees: f64) -> Result<Vec<u8>> {
    let image = decode(bytes)?;

    let normalized = degrees.rem_euclid(360.0);
    let rotated = if normalized == 0.0 {
        image
    } else if normalized == 90.0 {
        image.rotate90()
    } else if normalized == 180.0 {
        image.rotate180()
    } else if normalized == 270.0 {
        image.rotate270()
    } else {
        rotate_arbitrary(&image, degrees)?
    };

    encode_jpeg(&rotated, EDIT_JPEG_QUALITY)
}

pub fn crop_center_square(bytes: &[u8]) -> Result<Vec<u8>> {
    let image = decode(bytes)?;
    let size = image.width().min(image.height());
    let x = (image.width() - size) / 2;
    let y = (image.height() - size) / 2;

    let cropped = image.crop_imm(x, y, size, size);
    encode_jpeg(&cropped, EDIT_JPEG_QUALITY)
}

/// 直角以外の回転（最近傍の逆写像、はみ出し部分は黒）
fn rotate_arbitrary(image: &DynamicImage, degrees: f64) -> Result<DynamicImage> {
    let source = image.to_rgba8();
    let (width, height) = source.dimensions();
    let (new_width, new_height) = rotated_bounds(width, height, degrees);
    ensure_surface(new_width, new_height)?;

    let (sin, cos) = degrees.to_radians().sin_cos();
    let (cx, cy) = (width as f64 / 2.0, height as f64 / 2.0);
    let (ncx, ncy) = (new_width as f64 / 2.0, new_height as f64 / 2.0);

    let mut out = RgbaImage::from_pixel(new_width, new_height, Rgba([0, 0, 0, 255]));
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let dx = x as f64 + 0.5 - ncx;
        let dy = y as f64 + 0.5 - ncy;
        let sx = dx * cos + dy * sin + cx;
        let sy = -dx * sin + dy * cos + cy;
        if sx >= 0.0 && sy >= 0.0 && (sx as u32) < width && (sy as u32) < height {
            *pixel = *source.get_pixel(sx as u32, sy as u32);
        }
    }

    Ok(DynamicImage::ImageRgba8(out))
}

fn ensure_surface(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(CropDoctorError::Encode(format!(
            "出力サイズが不正です: {}x{}",
            width, height
        )));
    }
    Ok(())
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    ensure_surface(image.width(), image.height())?;

    let rgb = image.to_rgb8();
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    encoder
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| CropDoctorError::Encode(e.to_string()))?;

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn dimensions_of(bytes: &[u8]) -> (u32, u32) {
        let img = decode(bytes).unwrap();
        (img.width(), img.height())
    }

    #[test]
    fn test_scaled_dimensions() {
        assert_eq!(scaled_dimensions(2400, 1200, 1200), (1200, 600));
        assert_eq!(scaled_dimensions(1200, 3000, 1200), (480, 1200));
        // 拡大はしない
        assert_eq!(scaled_dimensions(640, 480, 1200), (640, 480));
        // 短辺が0に丸められない
        assert_eq!(scaled_dimensions(5000, 2, 1200), (1200, 1));
        assert_eq!(scaled_dimensions(2, 5000, 1200), (1, 1200));
    }

    #[test]
    fn test_compress_extreme_aspect_ratio() {
        let output = compress(&png_bytes(600, 2), 100, 75).unwrap();
        assert_eq!(dimensions_of(&output), (100, 1));
    }

    #[test]
    fn test_rotated_bounds() {
        assert_eq!(rotated_bounds(400, 200, 90.0), (200, 400));
        assert_eq!(rotated_bounds(400, 200, 180.0), (400, 200));
        assert_eq!(rotated_bounds(100, 100, 45.0), (141, 141));
    }

    #[test]
    fn test_compress_downscales_to_jpeg() {
        let input = png_bytes(400, 200);
        let snapshot = input.clone();

        let output = compress(&input, 100, 75).unwrap();

        assert_eq!(dimensions_of(&output), (100, 50));
        assert_eq!(image::guess_format(&output).unwrap(), ImageFormat::Jpeg);
        assert_eq!(input, snapshot, "入力が変更された");
    }

    #[test]
    fn test_compress_keeps_small_image_size() {
        let output = compress(&png_bytes(64, 48), 1200, 75).unwrap();
        assert_eq!(dimensions_of(&output), (64, 48));
    }

    #[test]
    fn test_compress_decode_error() {
        let result = compress(b"definitely not an image", 1200, 75);
        assert!(matches!(result, Err(CropDoctorError::Decode(_))));
    }

    #[test]
    fn test_compress_zero_dimension_is_encode_error() {
        let result = compress(&png_bytes(40, 20), 0, 75);
        assert!(matches!(result, Err(CropDoctorError::Encode(_))));
    }

    #[test]
    fn test_rotate_right_angles() {
        let input = png_bytes(40, 20);
        assert_eq!(dimensions_of(&rotate(&input, 90.0).unwrap()), (20, 40));
        assert_eq!(dimensions_of(&rotate(&input, 180.0).unwrap()), (40, 20));
        assert_eq!(dimensions_of(&rotate(&input, -90.0).unwrap()), (20, 40));
        assert_eq!(dimensions_of(&rotate(&input, 360.0).unwrap()), (40, 20));
    }

    #[test]
    fn test_rotate_arbitrary_expands_bounds() {
        let output = rotate(&png_bytes(100, 100), 45.0).unwrap();
        assert_eq!(dimensions_of(&output), (141, 141));
    }

    #[test]
    fn test_crop_center_square() {
        assert_eq!(dimensions_of(&crop_center_square(&png_bytes(40, 20)).unwrap()), (20, 20));
        assert_eq!(dimensions_of(&crop_center_square(&png_bytes(15, 33)).unwrap()), (15, 15));
    }

    #[test]
    fn test_crop_decode_error() {
        assert!(matches!(crop_center_square(&[]), Err(CropDoctorError::Decode(_))));
    }

    #[test]
    fn test_raster_codec_delegates() {
        let codec = RasterCodec;
        let output = codec.compress(&png_bytes(300, 150), 150, 80).unwrap();
        assert_eq!(dimensions_of(&output), (150, 75));
    }
}
