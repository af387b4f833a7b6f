//! Drawing backend wrapper for hosts without usable system fonts.
//!
//! Font lookup in plotters can fail (or panic inside the font layer) on
//! minimal batch machines. Text is then skipped instead of aborting the
//! whole chart, and text extents are estimated from the font size so the
//! layout still works.

use log::warn;
use plotters_backend::{
    BackendColor, BackendCoord, BackendStyle, BackendTextStyle, DrawingBackend, DrawingErrorKind,
};
use std::cell::Cell;
use std::panic;

/// average glyph width as a fraction of the font size
const GLYPH_WIDTH_RATIO: f64 = 0.6;

pub struct HeadlessBackend<DB> {
    inner: DB,
    font_failed: Cell<bool>,
}

impl<DB> HeadlessBackend<DB> {
    pub fn new(inner: DB) -> Self {
        HeadlessBackend {
            inner,
            font_failed: Cell::new(false),
        }
    }

    fn report_font_failure(&self, text: &str) {
        if !self.font_failed.replace(true) {
            warn!(
                "no usable font, chart text such as '{}' is left out",
                text
            );
        }
    }
}

/// Text extent guessed from the font size alone.
pub fn estimate_text_extent(text: &str, font_size: f64) -> (u32, u32) {
    let chars = text.chars().count() as f64;
    let width = (chars * font_size * GLYPH_WIDTH_RATIO).ceil();
    (width.max(0.0) as u32, font_size.ceil().max(1.0) as u32)
}

impl<DB: DrawingBackend> DrawingBackend for HeadlessBackend<DB> {
    type ErrorType = DB::ErrorType;

    fn get_size(&self) -> (u32, u32) {
        self.inner.get_size()
    }

    fn ensure_prepared(&mut self) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.ensure_prepared()
    }

    fn present(&mut self) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.present()
    }

    fn draw_pixel(
        &mut self,
        point: BackendCoord,
        color: BackendColor,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_pixel(point, color)
    }

    fn draw_line<S: BackendStyle>(
        &mut self,
        from: BackendCoord,
        to: BackendCoord,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_line(from, to, style)
    }

    fn draw_rect<S: BackendStyle>(
        &mut self,
        upper_left: BackendCoord,
        bottom_right: BackendCoord,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_rect(upper_left, bottom_right, style, fill)
    }

    fn draw_path<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        path: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_path(path, style)
    }

    fn draw_circle<S: BackendStyle>(
        &mut self,
        center: BackendCoord,
        radius: u32,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_circle(center, radius, style, fill)
    }

    fn fill_polygon<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        vert: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.fill_polygon(vert, style)
    }

    fn blit_bitmap(
        &mut self,
        pos: BackendCoord,
        (iw, ih): (u32, u32),
        src: &[u8],
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.blit_bitmap(pos, (iw, ih), src)
    }

    fn draw_text<TStyle: BackendTextStyle>(
        &mut self,
        text: &str,
        style: &TStyle,
        pos: BackendCoord,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        if self.font_failed.get() {
            return Ok(());
        }
        let inner = &mut self.inner;
        let drawn = panic::catch_unwind(panic::AssertUnwindSafe(|| {
            inner.draw_text(text, style, pos)
        }));
        match drawn {
            Ok(Err(DrawingErrorKind::FontError(_))) | Err(_) => {
                self.report_font_failure(text);
                Ok(())
            }
            Ok(result) => result,
        }
    }

    fn estimate_text_size<TStyle: BackendTextStyle>(
        &self,
        text: &str,
        style: &TStyle,
    ) -> Result<(u32, u32), DrawingErrorKind<Self::ErrorType>> {
        if !self.font_failed.get() {
            let measured = panic::catch_unwind(panic::AssertUnwindSafe(|| {
                self.inner.estimate_text_size(text, style)
            }));
            match measured {
                Ok(Err(DrawingErrorKind::FontError(_))) | Err(_) => {
                    self.report_font_failure(text)
                }
                Ok(result) => return result,
            }
        }
        Ok(estimate_text_extent(text, style.size()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extent_scales_with_text_and_size() {
        assert_eq!(estimate_text_extent("BER", 10.0), (18, 10));
        assert_eq!(estimate_text_extent("", 12.5), (0, 13));
        let (short, _) = estimate_text_extent("SNR", 14.0);
        let (long, _) = estimate_text_extent("SNR (dB)", 14.0);
        assert!(long > short);
    }

    #[test]
    fn starts_without_font_failure() {
        let backend = HeadlessBackend::new(());
        assert!(!backend.font_failed.get());
        backend.report_font_failure("x");
        assert!(backend.font_failed.get());
    }
}
