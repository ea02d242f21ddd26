use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use printpdf::image_crate::{self, DynamicImage, GenericImageView};
use printpdf::{Image, ImageTransform, Mm, PdfDocument};

use crate::datetime::sanitize_label;
use crate::report::{render_html, render_text, Report};

// A4 portrait; the report image is scaled to the page width and sliced
// across as many pages as its height requires.
pub const PAGE_WIDTH_MM: f64 = 210.0;
pub const PAGE_HEIGHT_MM: f64 = 297.0;

#[derive(Debug)]
pub enum ExportError {
    Clipboard(String),
    Rasterization(String),
    Pdf(String),
    Io(std::io::Error),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::Clipboard(msg) => write!(f, "clipboard error: {msg}"),
            ExportError::Rasterization(msg) => write!(f, "rasterization error: {msg}"),
            ExportError::Pdf(msg) => write!(f, "pdf error: {msg}"),
            ExportError::Io(err) => write!(f, "io error: {err}"),
        }
    }
}

impl std::error::Error for ExportError {}

impl From<std::io::Error> for ExportError {
    fn from(value: std::io::Error) -> Self {
        ExportError::Io(value)
    }
}

/// The two alternate representations handed to the clipboard as one write.
#[derive(Debug, Clone)]
pub struct ClipboardPayload {
    pub html: String,
    pub text: String,
}

pub fn clipboard_payload(report: &Report) -> ClipboardPayload {
    ClipboardPayload {
        html: render_html(report),
        text: render_text(report),
    }
}

/// Output file name: the group's date key when it exists, otherwise the
/// sanitized formatted label.
pub fn pdf_file_name(key: Option<&str>, label: &str) -> String {
    let stem = match key {
        Some(key) if !key.is_empty() => key.to_string(),
        _ => sanitize_label(label),
    };
    format!("KEPH-Report-{stem}.pdf")
}

/// Image rows consumed by one PDF page when the image is scaled to fit the
/// page width.
pub fn rows_per_page(image_width: u32) -> u32 {
    let px_per_mm = image_width as f64 / PAGE_WIDTH_MM;
    ((PAGE_HEIGHT_MM * px_per_mm).floor() as u32).max(1)
}

/// `(top_row, height)` of each page's slice; offsets advance by one
/// page-height until the remaining image height is exhausted.
pub fn page_slices(image_height: u32, rows: u32) -> Vec<(u32, u32)> {
    let mut slices = Vec::new();
    let mut top = 0;
    while top < image_height {
        let height = rows.min(image_height - top);
        slices.push((top, height));
        top += height;
    }
    slices
}

// html2canvas-style rasterization yields RGBA with a transparent background;
// PDFs have no alpha, so composite onto white before embedding.
fn flatten_onto_white(image: &DynamicImage) -> DynamicImage {
    let rgba = image.to_rgba8();
    let mut rgb = image_crate::RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = pixel[3] as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
        rgb.put_pixel(
            x,
            y,
            image_crate::Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]),
        );
    }
    DynamicImage::ImageRgb8(rgb)
}

/// Decodes the rasterized report image and writes it as a paginated PDF.
/// Decode failures are classified as rasterization errors; everything after
/// a successful decode is a pdf/io error.
pub fn write_report_pdf(png_bytes: &[u8], title: &str, path: &Path) -> Result<(), ExportError> {
    let image = image_crate::load_from_memory(png_bytes)
        .map_err(|err| ExportError::Rasterization(err.to_string()))?;
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(ExportError::Rasterization(
            "rasterized image is empty".to_string(),
        ));
    }
    let image = flatten_onto_white(&image);

    let px_per_mm = width as f64 / PAGE_WIDTH_MM;
    let dpi = px_per_mm * 25.4;
    let rows = rows_per_page(width);
    let slices = page_slices(height, rows);
    log::debug!(
        "report pdf: image {width}x{height}px, {rows} rows/page, {} page(s)",
        slices.len()
    );

    let (doc, first_page, first_layer) = PdfDocument::new(
        title,
        Mm(PAGE_WIDTH_MM as f32),
        Mm(PAGE_HEIGHT_MM as f32),
        "report",
    );

    for (index, (top, slice_height)) in slices.iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page, layer) = doc.add_page(Mm(PAGE_WIDTH_MM as f32), Mm(PAGE_HEIGHT_MM as f32), "report");
            doc.get_page(page).get_layer(layer)
        };

        let slice = image.crop_imm(0, *top, width, *slice_height);
        let slice_height_mm = *slice_height as f64 / px_per_mm;
        let pdf_image = Image::from_dynamic_image(&slice);
        pdf_image.add_to_layer(
            layer,
            ImageTransform {
                translate_x: Some(Mm(0.0)),
                // Top-aligned: PDF origins are bottom-left.
                translate_y: Some(Mm((PAGE_HEIGHT_MM - slice_height_mm) as f32)),
                dpi: Some(dpi as f32),
                ..Default::default()
            },
        );
    }

    let file = File::create(path)?;
    doc.save(&mut BufWriter::new(file))
        .map_err(|err| ExportError::Pdf(err.to_string()))?;
    Ok(())
}
