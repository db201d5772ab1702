//! Box and label rendering for annotated responses.
//!
//! Boxes are always drawn. Label text needs a TrueType font: the configured
//! path is tried first, then a few common system locations. Without a font
//! only the boxes are rendered.

use crate::detection::Detection;
use ab_glyph::FontVec;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

const PALETTE: [[u8; 3]; 20] = [
    [0xFF, 0x38, 0x38],
    [0xFF, 0x9D, 0x97],
    [0xFF, 0x70, 0x1F],
    [0xFF, 0xB2, 0x1D],
    [0xCF, 0xD2, 0x31],
    [0x48, 0xF9, 0x0A],
    [0x92, 0xCC, 0x17],
    [0x3D, 0xDB, 0x86],
    [0x1A, 0x93, 0x34],
    [0x00, 0xD4, 0xBB],
    [0x2C, 0x99, 0xA8],
    [0x00, 0xC2, 0xFF],
    [0x34, 0x45, 0x93],
    [0x64, 0x73, 0xFF],
    [0x00, 0x18, 0xEC],
    [0x84, 0x38, 0xFF],
    [0x52, 0x00, 0x85],
    [0xCB, 0x38, 0xFF],
    [0xFF, 0x95, 0xC8],
    [0xFF, 0x37, 0xC7],
];

const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

const SYSTEM_FONT_PATHS: [&str; 4] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

pub fn class_color(class_id: u32) -> Rgb<u8> {
    Rgb(PALETTE[class_id as usize % PALETTE.len()])
}

pub struct Annotator {
    font: Option<FontVec>,
}

impl Annotator {
    /// Build an annotator, loading `font_path` or the first system font found.
    pub fn load(font_path: Option<&str>) -> Self {
        let candidates = font_path.into_iter().chain(SYSTEM_FONT_PATHS);

        for path in candidates {
            if let Ok(font_data) = std::fs::read(path)
                && let Ok(font) = FontVec::try_from_vec(font_data)
            {
                tracing::info!(path, "Loaded annotation font");
                return Self { font: Some(font) };
            }
        }

        if let Some(path) = font_path {
            tracing::warn!(path, "Annotation font could not be loaded");
        }
        tracing::debug!("No font found, annotations will not carry label text");
        Self::without_font()
    }

    pub fn without_font() -> Self {
        Self { font: None }
    }

    /// Draw `detections` onto a copy of `image`.
    pub fn draw(&self, image: &RgbImage, detections: &[Detection]) -> RgbImage {
        let mut canvas = image.clone();
        let (width, height) = canvas.dimensions();

        let line_width = (((width + height) as f32 / 2.0 * 0.003).round() as i32).max(2);
        let font_scale = (((width + height) as f32 / 2.0 * 0.035).round()).max(12.0);

        for detection in detections {
            let color = class_color(detection.class_id);
            draw_box(&mut canvas, detection, color, line_width);

            if let Some(font) = &self.font {
                let label = format!("{} {:.2}", detection.name, detection.confidence);
                draw_label(&mut canvas, detection, &label, color, font, font_scale);
            }
        }

        canvas
    }
}

fn draw_box(canvas: &mut RgbImage, detection: &Detection, color: Rgb<u8>, line_width: i32) {
    let x = detection.xmin.round() as i32;
    let y = detection.ymin.round() as i32;
    let w = detection.width().round() as i32;
    let h = detection.height().round() as i32;

    for inset in 0..line_width {
        let rect_w = w - 2 * inset;
        let rect_h = h - 2 * inset;
        if rect_w <= 0 || rect_h <= 0 {
            break;
        }
        let rect = Rect::at(x + inset, y + inset).of_size(rect_w as u32, rect_h as u32);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}

fn draw_label(
    canvas: &mut RgbImage,
    detection: &Detection,
    label: &str,
    color: Rgb<u8>,
    font: &FontVec,
    font_scale: f32,
) {
    let (text_w, text_h) = text_size(font_scale, font, label);
    if text_w == 0 || text_h == 0 {
        return;
    }

    let pad = 2i32;
    let tab_h = text_h as i32 + 2 * pad;
    let x = detection.xmin.round() as i32;
    // Above the box when there is room, otherwise just inside its top edge
    let top = detection.ymin.round() as i32;
    let y = if top >= tab_h { top - tab_h } else { top };

    let tab = Rect::at(x, y).of_size(text_w + 2 * pad as u32, tab_h as u32);
    draw_filled_rect_mut(canvas, tab, color);
    draw_text_mut(canvas, TEXT_COLOR, x + pad, y + pad, font_scale, font, label);
}
