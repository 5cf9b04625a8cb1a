use std::ffi::{CStr, CString};

use ffmpeg_next::ffi;
use ffmpeg_next::format::Pixel;
use ffmpeg_next::Rational;

/// Looks up a pixel format by its ffmpeg name (`gray16le`, `bgra`, `yuv420p`, ...).
pub fn pixel_format_from_name(name: &str) -> Option<Pixel> {
    let c_name = CString::new(name.trim()).ok()?;
    let format = Pixel::from(unsafe { ffi::av_get_pix_fmt(c_name.as_ptr()) });
    if format == Pixel::None {
        None
    } else {
        Some(format)
    }
}

/// Returns the ffmpeg name of a pixel format.
pub fn pixel_format_name(format: Pixel) -> Option<&'static str> {
    if format == Pixel::None {
        return None;
    }
    let ptr = unsafe { ffi::av_get_pix_fmt_name(format.into()) };
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

/// Parses a frame rate given as `"30"`, `"30000/1001"` or `"29.97"`.
pub fn parse_frame_rate(text: &str) -> Result<Rational, String> {
    let text = text.trim();
    let rate = if let Some((num, den)) = text.split_once('/') {
        let num: i32 = num
            .trim()
            .parse()
            .map_err(|_| format!("invalid frame rate numerator in '{text}'"))?;
        let den: i32 = den
            .trim()
            .parse()
            .map_err(|_| format!("invalid frame rate denominator in '{text}'"))?;
        Rational(num, den)
    } else if let Ok(whole) = text.parse::<i32>() {
        Rational(whole, 1)
    } else {
        let value: f64 = text
            .parse()
            .map_err(|_| format!("invalid frame rate '{text}'"))?;
        if !value.is_finite() {
            return Err(format!("invalid frame rate '{text}'"));
        }
        Rational::from(value)
    };

    if rate.numerator() <= 0 || rate.denominator() <= 0 {
        return Err(format!("frame rate must be positive, got '{text}'"));
    }
    Ok(rate)
}
