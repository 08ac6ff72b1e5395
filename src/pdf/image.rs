//! Decoding images into samples that can be written as image XObjects.

use std::path::Path;

use pdf_writer::{Chunk, Finish, Name, Ref};

use crate::image::ImageKind;
use crate::pdf::StreamEncoder;
use crate::settings::CanvasSettings;

#[cfg(feature = "svg")]
use crate::pdf::svg::SvgForm;

#[cfg(feature = "raster-images")]
use zune_png::zune_core::colorspace::ColorSpace;

/// An embedded image, drawn by mapping it onto the unit square.
pub(crate) enum XObject {
    Image(SampledImage),
    #[cfg(feature = "svg")]
    Svg(SvgForm),
}

impl XObject {
    /// Decode the image at `path`, whose contents are `data`.
    pub(crate) fn decode(kind: ImageKind, data: &[u8], path: &Path) -> Result<Self, String> {
        match kind {
            #[cfg(feature = "svg")]
            ImageKind::Svg => SvgForm::convert(data, path.parent()).map(XObject::Svg),
            _ => {
                let _ = path;
                SampledImage::decode(kind, data).map(XObject::Image)
            }
        }
    }

    /// The intrinsic size, in pixels for raster images and in user units for SVG.
    pub(crate) fn size(&self) -> (f32, f32) {
        match self {
            XObject::Image(image) => {
                let (width, height) = image.size();
                (width as f32, height as f32)
            }
            #[cfg(feature = "svg")]
            XObject::Svg(form) => form.size(),
        }
    }

    pub(crate) fn serialize(
        &self,
        chunk: &mut Chunk,
        root_ref: Ref,
        alloc: &mut Ref,
        settings: &CanvasSettings,
    ) {
        match self {
            XObject::Image(image) => image.serialize(chunk, root_ref, alloc, settings),
            #[cfg(feature = "svg")]
            XObject::Svg(form) => form.serialize(chunk, root_ref, alloc, settings),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum BitsPerComponent {
    Eight,
    Sixteen,
}

impl BitsPerComponent {
    fn as_u8(self) -> u8 {
        match self {
            BitsPerComponent::Eight => 8,
            BitsPerComponent::Sixteen => 16,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ImageColorspace {
    Rgb,
    Luma,
}

impl ImageColorspace {
    fn to_pdf_name(self) -> Name<'static> {
        match self {
            ImageColorspace::Rgb => Name(b"DeviceRGB"),
            ImageColorspace::Luma => Name(b"DeviceGray"),
        }
    }
}

/// A decoded image, with its alpha channel split off into a separate mask.
#[derive(Debug, Clone)]
pub(crate) struct SampledImage {
    width: u32,
    height: u32,
    color_channel: Vec<u8>,
    alpha_channel: Option<Vec<u8>>,
    bits_per_component: BitsPerComponent,
    color_space: ImageColorspace,
}

impl SampledImage {
    /// Decode an image of a known kind.
    pub(crate) fn decode(kind: ImageKind, data: &[u8]) -> Result<Self, String> {
        match kind {
            #[cfg(feature = "raster-images")]
            ImageKind::Png => decode_png(data),
            #[cfg(feature = "raster-images")]
            ImageKind::Jpeg => decode_jpeg(data),
            #[cfg(feature = "raster-images")]
            ImageKind::Gif => decode_gif(data),
            #[cfg(feature = "raster-images")]
            ImageKind::Bmp => decode_bmp(data),
            #[allow(unreachable_patterns)]
            _ => {
                let _ = data;
                Err(format!("{kind:?} images are not supported as raster images"))
            }
        }
    }

    /// Create an image from 8-bit RGBA samples.
    #[cfg(any(feature = "raster-images", test))]
    pub(crate) fn from_rgba8(data: Vec<u8>, width: u32, height: u32) -> Self {
        let mut color_channel = Vec::with_capacity(data.len() / 4 * 3);
        let mut alpha_channel = Vec::with_capacity(data.len() / 4);

        for pixel in data.chunks_exact(4) {
            color_channel.extend_from_slice(&pixel[..3]);
            alpha_channel.push(pixel[3]);
        }

        let alpha_channel = if alpha_channel.iter().all(|a| *a == u8::MAX) {
            None
        } else {
            Some(alpha_channel)
        };

        Self {
            width,
            height,
            color_channel,
            alpha_channel,
            bits_per_component: BitsPerComponent::Eight,
            color_space: ImageColorspace::Rgb,
        }
    }

    /// The size of the image in pixels.
    pub(crate) fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Write the image, and its soft mask if it has one.
    pub(crate) fn serialize(
        &self,
        chunk: &mut Chunk,
        root_ref: Ref,
        alloc: &mut Ref,
        settings: &CanvasSettings,
    ) {
        let encoder = StreamEncoder::new(settings);

        let soft_mask = self.alpha_channel.as_ref().map(|mask_data| {
            let soft_mask_ref = alloc.bump();
            let (data, filter) = encoder.binary(mask_data);
            let mut s_mask = chunk.image_xobject(soft_mask_ref, &data);
            s_mask.filter(filter);
            s_mask.width(self.width as i32);
            s_mask.height(self.height as i32);
            // Soft masks are always in DeviceGray.
            s_mask.pair(
                Name(b"ColorSpace"),
                ImageColorspace::Luma.to_pdf_name(),
            );
            s_mask.bits_per_component(self.bits_per_component.as_u8() as i32);
            s_mask.finish();
            soft_mask_ref
        });

        let (data, filter) = encoder.binary(&self.color_channel);
        let mut image_x_object = chunk.image_xobject(root_ref, &data);
        image_x_object.filter(filter);
        image_x_object.width(self.width as i32);
        image_x_object.height(self.height as i32);
        image_x_object.pair(Name(b"ColorSpace"), self.color_space.to_pdf_name());
        image_x_object.bits_per_component(self.bits_per_component.as_u8() as i32);
        if let Some(soft_mask_ref) = soft_mask {
            image_x_object.s_mask(soft_mask_ref);
        }
        image_x_object.finish();
    }
}

#[cfg(feature = "raster-images")]
fn decode_png(data: &[u8]) -> Result<SampledImage, String> {
    use zune_png::zune_core::result::DecodingResult;
    use zune_png::PngDecoder;

    let mut decoder = PngDecoder::new(data);
    decoder
        .decode_headers()
        .map_err(|e| format!("{e:?}").to_ascii_lowercase())?;

    let color_space = decoder
        .get_colorspace()
        .ok_or("failed to read image colorspace".to_string())?;
    let (width, height) = {
        let info = decoder
            .get_info()
            .ok_or("failed to read image dimensions".to_string())?;
        (info.width as u32, info.height as u32)
    };

    let decoded = decoder
        .decode()
        .map_err(|e| format!("{e:?}").to_ascii_lowercase())?;

    let (color_channel, alpha_channel, bits_per_component, image_color_space) = match decoded {
        DecodingResult::U8(data) => handle_u8_image(data, color_space)?,
        DecodingResult::U16(data) => handle_u16_image(data, color_space)?,
        _ => return Err("image has an unsupported bit-depth".to_string()),
    };

    Ok(SampledImage {
        width,
        height,
        color_channel,
        alpha_channel,
        bits_per_component,
        color_space: image_color_space,
    })
}

#[cfg(feature = "raster-images")]
fn decode_jpeg(data: &[u8]) -> Result<SampledImage, String> {
    use zune_jpeg::JpegDecoder;

    let mut decoder = JpegDecoder::new(data);
    decoder
        .decode_headers()
        .map_err(|e| format!("{e:?}").to_ascii_lowercase())?;

    let (width, height) = decoder
        .dimensions()
        .ok_or("failed to read image dimensions".to_string())?;
    let color_space = decoder
        .get_output_colorspace()
        .ok_or("failed to read image colorspace".to_string())?;

    let decoded = decoder
        .decode()
        .map_err(|e| format!("{e:?}").to_ascii_lowercase())?;
    let (color_channel, _, bits_per_component, image_color_space) =
        handle_u8_image(decoded, color_space)?;

    Ok(SampledImage {
        width: width as u32,
        height: height as u32,
        color_channel,
        alpha_channel: None,
        bits_per_component,
        color_space: image_color_space,
    })
}

#[cfg(feature = "raster-images")]
fn decode_gif(data: &[u8]) -> Result<SampledImage, String> {
    let mut decoder = gif::DecodeOptions::new();
    decoder.set_color_output(gif::ColorOutput::RGBA);
    let mut decoder = decoder
        .read_info(data)
        .map_err(|e| e.to_string().to_ascii_lowercase())?;
    let first_frame = decoder
        .read_next_frame()
        .map_err(|e| e.to_string().to_ascii_lowercase())?
        .ok_or("gif image seems to be empty".to_string())?;

    Ok(SampledImage::from_rgba8(
        first_frame.buffer.to_vec(),
        first_frame.width as u32,
        first_frame.height as u32,
    ))
}

#[cfg(feature = "raster-images")]
fn decode_bmp(data: &[u8]) -> Result<SampledImage, String> {
    let image = image::load_from_memory_with_format(data, image::ImageFormat::Bmp)
        .map_err(|e| e.to_string().to_ascii_lowercase())?;
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();

    Ok(SampledImage::from_rgba8(rgba.into_raw(), width, height))
}

#[cfg(feature = "raster-images")]
type Channels = (
    Vec<u8>,
    Option<Vec<u8>>,
    BitsPerComponent,
    ImageColorspace,
);

#[cfg(feature = "raster-images")]
fn layout(cs: ColorSpace) -> Result<(usize, bool, ImageColorspace), String> {
    match cs {
        ColorSpace::RGB => Ok((3, false, ImageColorspace::Rgb)),
        ColorSpace::RGBA => Ok((4, true, ImageColorspace::Rgb)),
        ColorSpace::Luma => Ok((1, false, ImageColorspace::Luma)),
        ColorSpace::LumaA => Ok((2, true, ImageColorspace::Luma)),
        _ => Err("image has an unsupported color space".to_string()),
    }
}

#[cfg(feature = "raster-images")]
fn handle_u8_image(data: Vec<u8>, cs: ColorSpace) -> Result<Channels, String> {
    let (channels, has_alpha, color_space) = layout(cs)?;

    if !has_alpha {
        return Ok((data, None, BitsPerComponent::Eight, color_space));
    }

    let mut alphas = Vec::with_capacity(data.len() / channels);
    let encoded_image = data
        .iter()
        .enumerate()
        .filter_map(|(index, val)| {
            if index % channels == channels - 1 {
                alphas.push(*val);
                None
            } else {
                Some(*val)
            }
        })
        .collect::<Vec<_>>();

    Ok((
        encoded_image,
        Some(alphas),
        BitsPerComponent::Eight,
        color_space,
    ))
}

#[cfg(feature = "raster-images")]
fn handle_u16_image(data: Vec<u16>, cs: ColorSpace) -> Result<Channels, String> {
    let (channels, has_alpha, color_space) = layout(cs)?;

    if !has_alpha {
        let encoded_image = data.iter().flat_map(|b| b.to_be_bytes()).collect();
        return Ok((encoded_image, None, BitsPerComponent::Sixteen, color_space));
    }

    let mut alphas = Vec::with_capacity(data.len() / channels * 2);
    let encoded_image = data
        .iter()
        .enumerate()
        .filter_map(|(index, val)| {
            if index % channels == channels - 1 {
                alphas.extend(val.to_be_bytes());
                None
            } else {
                Some(*val)
            }
        })
        .flat_map(|n| n.to_be_bytes())
        .collect::<Vec<_>>();

    Ok((
        encoded_image,
        Some(alphas),
        BitsPerComponent::Sixteen,
        color_space,
    ))
}
