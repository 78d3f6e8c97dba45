//! Watermarker (C8): stamps a configured image onto every page of a
//! rendered PDF at a configured vertical offset from the top, using
//! `lopdf` directly rather than shelling out to a PDF toolkit — the same
//! choice the `petty-render-lopdf` crate in this dependency stack's
//! neighborhood makes for PDF page content.

use image::GenericImageView;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::error::{LimitsError, LimitsResult};

const XOBJECT_NAME: &[u8] = b"DocgenWatermark";
/// The watermark is drawn at this fraction of the page width; its height
/// follows the source image's aspect ratio.
const WIDTH_FRACTION: f32 = 0.2;
const LEFT_MARGIN_PT: f32 = 36.0;

/// A decoded watermark image, loaded once per process and reused across
/// every job that needs it.
#[derive(Clone)]
pub struct Watermarker {
    rgb: Vec<u8>,
    width: u32,
    height: u32,
}

impl Watermarker {
    pub fn load(bytes: &[u8]) -> LimitsResult<Self> {
        let image = image::load_from_memory(bytes).map_err(|e| LimitsError::Watermark {
            detail: format!("failed to decode watermark image: {e}"),
        })?;
        let (width, height) = image.dimensions();
        Ok(Self {
            rgb: image.to_rgb8().into_raw(),
            width,
            height,
        })
    }

    /// Stamp this watermark onto every page of `pdf_bytes`, `top_offset_pt`
    /// points down from the top of each page, returning the rewritten PDF.
    pub fn stamp(&self, pdf_bytes: &[u8], top_offset_pt: f32) -> LimitsResult<Vec<u8>> {
        let mut doc = Document::load_mem(pdf_bytes).map_err(|e| LimitsError::Watermark {
            detail: format!("failed to parse rendered PDF: {e}"),
        })?;

        let image_id = doc.add_object(Object::Stream(self.image_stream()));

        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        for page_id in page_ids {
            self.stamp_page(&mut doc, page_id, image_id, top_offset_pt)?;
        }

        let mut out = Vec::new();
        doc.save_to(&mut out).map_err(|e| LimitsError::Watermark {
            detail: format!("failed to write watermarked PDF: {e}"),
        })?;
        Ok(out)
    }

    fn image_stream(&self) -> Stream {
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => self.width as i64,
            "Height" => self.height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        };
        // `Stream::new` compresses with FlateDecode by default.
        Stream::new(dict, self.rgb.clone())
    }

    fn stamp_page(
        &self,
        doc: &mut Document,
        page_id: ObjectId,
        image_id: ObjectId,
        top_offset_pt: f32,
    ) -> LimitsResult<()> {
        let page_height = self.page_height(doc, page_id)?;
        let draw_width = self.page_width(doc, page_id)? * WIDTH_FRACTION;
        let draw_height = draw_width * (self.height as f32 / self.width as f32);
        let x = LEFT_MARGIN_PT;
        let y = (page_height - top_offset_pt - draw_height).max(0.0);

        register_xobject(doc, page_id, image_id).map_err(|e| LimitsError::Watermark {
            detail: format!("failed to register watermark XObject: {e}"),
        })?;

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        draw_width.into(),
                        0.0.into(),
                        0.0.into(),
                        draw_height.into(),
                        x.into(),
                        y.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(XOBJECT_NAME.to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let encoded = content.encode().map_err(|e| LimitsError::Watermark {
            detail: format!("failed to encode watermark content stream: {e}"),
        })?;

        let mut existing = doc.get_page_content(page_id).unwrap_or_default();
        existing.extend_from_slice(&encoded);
        doc.change_page_content(page_id, existing)
            .map_err(|e| LimitsError::Watermark {
                detail: format!("failed to append watermark to page content: {e}"),
            })
    }

    fn page_height(&self, doc: &Document, page_id: ObjectId) -> LimitsResult<f32> {
        self.media_box(doc, page_id).map(|b| b[3] - b[1])
    }

    fn page_width(&self, doc: &Document, page_id: ObjectId) -> LimitsResult<f32> {
        self.media_box(doc, page_id).map(|b| b[2] - b[0])
    }

    /// US Letter, the conventional default when a page carries no
    /// explicit `/MediaBox` of its own and none is inherited.
    fn media_box(&self, doc: &Document, page_id: ObjectId) -> LimitsResult<[f32; 4]> {
        let default = [0.0, 0.0, 612.0, 792.0];
        let Ok(dict) = doc.get_dictionary(page_id) else {
            return Ok(default);
        };
        let Ok(media_box) = dict.get(b"MediaBox") else {
            return Ok(default);
        };
        let Ok(array) = media_box.as_array() else {
            return Ok(default);
        };
        let mut out = default;
        for (i, value) in array.iter().take(4).enumerate() {
            if let Ok(n) = value.as_float() {
                out[i] = n;
            } else if let Ok(n) = value.as_i64() {
                out[i] = n as f32;
            }
        }
        Ok(out)
    }
}

/// Insert `image_id` into `page_id`'s `/Resources/XObject` dictionary
/// under `DocgenWatermark`, creating either dictionary along the way if
/// missing. Resources may themselves be an indirect reference shared
/// across pages, so this resolves one level of indirection before
/// writing.
fn register_xobject(doc: &mut Document, page_id: ObjectId, image_id: ObjectId) -> Result<(), lopdf::Error> {
    let resources_id = {
        let page_dict = doc.get_dictionary(page_id)?;
        match page_dict.get(b"Resources") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        }
    };

    let resources_dict: &mut Dictionary = if let Some(id) = resources_id {
        doc.get_object_mut(id)?.as_dict_mut()?
    } else {
        let page_dict = doc.get_object_mut(page_id)?.as_dict_mut()?;
        if !page_dict.has(b"Resources") {
            page_dict.set("Resources", Dictionary::new());
        }
        page_dict.get_mut(b"Resources")?.as_dict_mut()?
    };

    if !resources_dict.has(b"XObject") {
        resources_dict.set("XObject", Dictionary::new());
    }
    let xobjects = resources_dict.get_mut(b"XObject")?.as_dict_mut()?;
    xobjects.set(XOBJECT_NAME, Object::Reference(image_id));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30]));
        let mut buf = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn loads_a_png_watermark_and_records_its_dimensions() {
        let watermark = Watermarker::load(&png_bytes(40, 20)).unwrap();
        assert_eq!(watermark.width, 40);
        assert_eq!(watermark.height, 20);
        assert_eq!(watermark.rgb.len(), 40 * 20 * 3);
    }

    #[test]
    fn rejects_undecodable_image_bytes() {
        assert!(Watermarker::load(b"not an image").is_err());
    }
}
