//! PDF pagination for a single rendered image.
//!
//! The image is scaled to page width. If it fits on one page it is centered
//! vertically; otherwise the same full image is placed on successive pages
//! at offsets of one page height each, so every page reveals the next slice.

use crate::rendering::encode::{EncodedImage, ImageMime};
use crate::{Error, Result};
use log::debug;
use lopdf::{dictionary, Document, Object, Stream};
use serde::{Deserialize, Serialize};

const MM_TO_PT: f64 = 72.0 / 25.4;

/// Residue below this (mm) does not open another page.
const PAGE_EPSILON_MM: f64 = 1e-6;

/// Physical page size in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width_mm: f64,
    pub height_mm: f64,
}

impl PageGeometry {
    pub const fn a4() -> Self {
        Self { width_mm: 210.0, height_mm: 297.0 }
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4()
    }
}

/// Where the image sits on one page, in millimetres from the top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub page_index: usize,
    pub y_mm: f64,
    /// Height of the image slice visible on this page.
    pub visible_height_mm: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PagePlan {
    pub geometry: PageGeometry,
    pub image_width_mm: f64,
    pub image_height_mm: f64,
    pub placements: Vec<Placement>,
}

impl PagePlan {
    pub fn page_count(&self) -> usize {
        self.placements.len()
    }
}

/// Lay out an image of `px_width × px_height` on pages of `geometry`.
pub fn plan_pages(px_width: u32, px_height: u32, geometry: PageGeometry) -> Result<PagePlan> {
    if px_width == 0 || px_height == 0 {
        return Err(Error::PdfAssemblyFailed(format!("image has no area ({}x{})", px_width, px_height)));
    }
    let page_h = geometry.height_mm;
    let img_w = geometry.width_mm;
    let img_h = f64::from(px_height) * img_w / f64::from(px_width);

    let mut placements = Vec::new();
    if img_h <= page_h {
        placements.push(Placement { page_index: 0, y_mm: (page_h - img_h) / 2.0, visible_height_mm: img_h });
    } else {
        let mut remaining = img_h;
        let mut page_index = 0usize;
        while remaining > PAGE_EPSILON_MM {
            placements.push(Placement {
                page_index,
                y_mm: -(page_index as f64) * page_h,
                visible_height_mm: remaining.min(page_h),
            });
            remaining -= page_h;
            page_index += 1;
        }
    }

    debug!("Planned {:.2}mm tall image over {} page(s)", img_h, placements.len());
    Ok(PagePlan { geometry, image_width_mm: img_w, image_height_mm: img_h, placements })
}

/// Read the pixel dimensions of an encoded image.
pub fn image_dimensions(image: &EncodedImage) -> Result<(u32, u32)> {
    let format = match image.mime {
        ImageMime::Png => image::ImageFormat::Png,
        ImageMime::Jpeg => image::ImageFormat::Jpeg,
    };
    image::ImageReader::with_format(std::io::Cursor::new(&image.bytes), format)
        .into_dimensions()
        .map_err(|e| Error::PdfAssemblyFailed(format!("Failed to load image for PDF: {}", e)))
}

/// Write a PDF that shows `jpeg` according to `plan`.
///
/// The JPEG is embedded once and referenced from every page.
pub fn assemble_pdf(jpeg: &EncodedImage, px_width: u32, px_height: u32, plan: &PagePlan) -> Result<Vec<u8>> {
    if jpeg.mime != ImageMime::Jpeg {
        return Err(Error::PdfAssemblyFailed("page image must be JPEG".into()));
    }

    let page_w_pt = plan.geometry.width_mm * MM_TO_PT;
    let page_h_pt = plan.geometry.height_mm * MM_TO_PT;
    let img_w_pt = plan.image_width_mm * MM_TO_PT;
    let img_h_pt = plan.image_height_mm * MM_TO_PT;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(px_width),
            "Height" => i64::from(px_height),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        jpeg.bytes.clone(),
    ));

    let mut kids: Vec<Object> = Vec::with_capacity(plan.placements.len());
    for placement in &plan.placements {
        // PDF space has its origin at the bottom-left corner.
        let y_pt = page_h_pt - (placement.y_mm * MM_TO_PT + img_h_pt);
        let content = format!("q {:.4} 0 0 {:.4} 0 {:.4} cm /Im1 Do Q\n", img_w_pt, img_h_pt, y_pt).into_bytes();
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im1" => image_id },
            },
            "MediaBox" => vec![0.into(), 0.into(), Object::Real(page_w_pt as f32), Object::Real(page_h_pt as f32)],
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => plan.placements.len() as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| Error::PdfAssemblyFailed(format!("Failed to write PDF: {}", e)))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_image_is_centered_on_one_page() {
        let plan = plan_pages(1000, 1000, PageGeometry::a4()).unwrap();
        assert_eq!(plan.page_count(), 1);
        let p = plan.placements[0];
        let top = p.y_mm;
        let bottom = plan.geometry.height_mm - (p.y_mm + plan.image_height_mm);
        assert!((top - bottom).abs() < 1e-9);
        assert!((plan.image_height_mm - 210.0).abs() < 1e-9);
    }

    #[test]
    fn exact_page_height_fits_one_page() {
        let plan = plan_pages(210, 297, PageGeometry::a4()).unwrap();
        assert_eq!(plan.page_count(), 1);
        assert!(plan.placements[0].y_mm.abs() < 1e-9);
    }

    #[test]
    fn tall_image_covers_every_slice_once() {
        let geometry = PageGeometry::a4();
        // k full pages plus a remainder r with 0 < r <= page height
        for &(k, r) in &[(1u32, 100u32), (2, 297), (4, 1), (1, 296)] {
            // 210px wide means 1px == 1mm
            let plan = plan_pages(210, k * 297 + r, geometry).unwrap();
            let expected_pages = k as usize + 1;
            let total: f64 = plan.placements.iter().map(|p| p.visible_height_mm).sum();
            assert!((total - plan.image_height_mm).abs() < 1e-6);
            assert_eq!(plan.page_count(), expected_pages, "k={} r={}", k, r);
            for (i, p) in plan.placements.iter().enumerate() {
                assert_eq!(p.page_index, i);
                assert!((p.y_mm + i as f64 * 297.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn zero_sized_image_is_rejected() {
        assert!(matches!(plan_pages(0, 10, PageGeometry::a4()), Err(Error::PdfAssemblyFailed(_))));
    }

    #[test]
    fn non_jpeg_is_rejected_by_assembler() {
        let plan = plan_pages(10, 10, PageGeometry::a4()).unwrap();
        let png = EncodedImage { mime: ImageMime::Png, bytes: vec![1, 2, 3] };
        assert!(assemble_pdf(&png, 10, 10, &plan).is_err());
    }
}
