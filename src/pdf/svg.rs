//! Converting SVG images into form XObjects.
//!
//! The SVG is parsed into a `usvg` tree, which already resolves styles, units,
//! `use` elements and text layout. The nodes of the tree are then written as
//! vector path, clip and paint operators into the content stream of a form
//! XObject. Groups with filters have no vector counterpart and are rasterized
//! with `resvg` instead.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use pdf_writer::types::{ColorSpaceOperand, FunctionShadingType, LineCapStyle, LineJoinStyle};
use pdf_writer::{Chunk, Content, Finish, Name, Rect, Ref};
use tiny_skia_path::{PathSegment, Point, Transform};
use usvg::{Node, PaintOrder};

use crate::backend::ImageId;
use crate::color::BlendMode;
use crate::image::ImageKind;
use crate::pdf::image::SampledImage;
use crate::pdf::{write_ext_g_state, ExtGState, PdfBackend, StreamEncoder};
use crate::settings::CanvasSettings;

/// The resolution, relative to user space units, at which filtered groups are
/// rasterized.
const FILTER_RASTER_SCALE: f32 = 2.0;

static FONT_DB: LazyLock<Arc<usvg::fontdb::Database>> = LazyLock::new(|| {
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();
    Arc::new(db)
});

/// An SVG image converted into the content stream of a form XObject, together
/// with the resources that stream refers to.
pub(crate) struct SvgForm {
    width: f32,
    height: f32,
    content: Vec<u8>,
    ext_g_states: Vec<ExtGState>,
    gradients: Vec<Gradient>,
    images: Vec<SampledImage>,
}

impl SvgForm {
    /// Parse an SVG document and convert it.
    ///
    /// Relative references to other files are resolved against `resources_dir`.
    pub(crate) fn convert(data: &[u8], resources_dir: Option<&Path>) -> Result<Self, String> {
        let mut options = usvg::Options {
            resources_dir: resources_dir.map(Path::to_path_buf),
            ..usvg::Options::default()
        };
        options.fontdb = FONT_DB.clone();

        let tree = usvg::Tree::from_data(data, &options)
            .map_err(|e| e.to_string().to_ascii_lowercase())?;
        let size = tree.size();

        let mut converter = Converter::new();
        converter.group(tree.root(), State::default());

        log::debug!(
            "converted svg of size {}x{} with {} gradients and {} images",
            size.width(),
            size.height(),
            converter.gradients.len(),
            converter.images.len()
        );

        Ok(Self {
            width: size.width(),
            height: size.height(),
            content: converter.content.finish(),
            ext_g_states: converter.ext_g_states,
            gradients: converter.gradients,
            images: converter.images,
        })
    }

    /// The size of the SVG viewport.
    pub(crate) fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    pub(crate) fn serialize(
        &self,
        chunk: &mut Chunk,
        root_ref: Ref,
        alloc: &mut Ref,
        settings: &CanvasSettings,
    ) {
        let image_refs = self.images.iter().map(|_| alloc.bump()).collect::<Vec<_>>();
        let gs_refs = self
            .ext_g_states
            .iter()
            .map(|_| alloc.bump())
            .collect::<Vec<_>>();
        let pattern_refs = self
            .gradients
            .iter()
            .map(|_| alloc.bump())
            .collect::<Vec<_>>();

        let (data, filter) = StreamEncoder::new(settings).content(&self.content);
        let mut form = chunk.form_xobject(root_ref, &data);
        if let Some(filter) = filter {
            form.filter(filter);
        }
        form.bbox(Rect::new(0.0, 0.0, self.width, self.height));
        // Maps the y-down viewport onto the unit square, the same way as an image.
        form.matrix([1.0 / self.width, 0.0, 0.0, -1.0 / self.height, 0.0, 1.0]);
        form.group().transparency();

        let mut resources = form.resources();
        if !image_refs.is_empty() {
            let mut x_objects = resources.x_objects();
            for (i, image_ref) in image_refs.iter().enumerate() {
                let name = PdfBackend::image_name(ImageId(i));
                x_objects.pair(Name(name.as_bytes()), *image_ref);
            }
            x_objects.finish();
        }
        if !pattern_refs.is_empty() {
            let mut patterns = resources.patterns();
            for (i, pattern_ref) in pattern_refs.iter().enumerate() {
                patterns.pair(Name(pattern_name(i).as_bytes()), *pattern_ref);
            }
            patterns.finish();
        }
        if !gs_refs.is_empty() {
            let mut ext_g_states = resources.ext_g_states();
            for (i, gs_ref) in gs_refs.iter().enumerate() {
                let name = PdfBackend::ext_g_state_name(i);
                ext_g_states.pair(Name(name.as_bytes()), *gs_ref);
            }
            ext_g_states.finish();
        }
        resources.finish();
        form.finish();

        for (image, image_ref) in self.images.iter().zip(&image_refs) {
            image.serialize(chunk, *image_ref, alloc, settings);
        }

        for (gs, gs_ref) in self.ext_g_states.iter().zip(&gs_refs) {
            write_ext_g_state(chunk, *gs_ref, gs);
        }

        for (gradient, pattern_ref) in self.gradients.iter().zip(&pattern_refs) {
            gradient.serialize(chunk, *pattern_ref, alloc);
        }
    }
}

fn pattern_name(index: usize) -> String {
    format!("P{}", index + 1)
}

/// The state inherited from the ancestors of a node.
#[derive(Debug, Copy, Clone)]
struct State {
    /// Maps the user space of the node into the space of the form.
    transform: Transform,
    opacity: f32,
    blend_mode: BlendMode,
}

impl Default for State {
    fn default() -> Self {
        Self {
            transform: Transform::identity(),
            opacity: 1.0,
            blend_mode: BlendMode::Normal,
        }
    }
}

struct Converter {
    content: Content,
    ext_g_states: Vec<ExtGState>,
    ext_g_state_names: HashMap<ExtGState, usize>,
    gradients: Vec<Gradient>,
    images: Vec<SampledImage>,
}

impl Converter {
    fn new() -> Self {
        Self {
            content: Content::new(),
            ext_g_states: vec![],
            ext_g_state_names: HashMap::new(),
            gradients: vec![],
            images: vec![],
        }
    }

    fn node(&mut self, node: &Node, state: State) {
        match node {
            Node::Group(group) => self.group(group, state),
            Node::Path(path) => self.path(path, state),
            Node::Image(image) => self.image(image, state),
            Node::Text(text) => self.group(text.flattened(), state),
        }
    }

    fn group(&mut self, group: &usvg::Group, state: State) {
        if !group.filters().is_empty() {
            if self.filtered_group(group, state).is_none() {
                log::warn!("failed to rasterize filtered svg group {:?}", group.id());
            }
            return;
        }

        if group.mask().is_some() {
            log::warn!("svg masks are not supported, drawing {:?} unmasked", group.id());
        }

        let transform = group.transform();
        let state = State {
            transform: state.transform.pre_concat(transform),
            opacity: state.opacity * group.opacity().get(),
            blend_mode: match convert_blend_mode(group.blend_mode()) {
                BlendMode::Normal => state.blend_mode,
                mode => mode,
            },
        };

        self.content.save_state();
        if !transform.is_identity() {
            self.content.transform(to_pdf_transform(transform));
        }

        if let Some(clip_path) = group.clip_path() {
            self.clip_path(clip_path);
        }

        for child in group.children() {
            self.node(child, state);
        }

        self.content.restore_state();
    }

    /// Rasterize a group together with its filters and draw the result as an
    /// image.
    fn filtered_group(&mut self, group: &usvg::Group, state: State) -> Option<()> {
        let layer_bbox = group.layer_bounding_box().transform(group.transform())?;

        let width = (layer_bbox.width() * FILTER_RASTER_SCALE).round().max(1.0) as u32;
        let height = (layer_bbox.height() * FILTER_RASTER_SCALE).round().max(1.0) as u32;
        let mut pixmap = tiny_skia::Pixmap::new(width, height)?;

        // `render_node` moves the absolute layer bounding box to the origin, which
        // is undone here because ancestor transforms are already part of the
        // content stream.
        let abs_bbox = group.abs_layer_bounding_box();
        let transform = Transform::from_scale(FILTER_RASTER_SCALE, FILTER_RASTER_SCALE)
            .pre_concat(Transform::from_translate(-layer_bbox.x(), -layer_bbox.y()))
            .pre_concat(Transform::from_translate(abs_bbox.x(), abs_bbox.y()));

        resvg::render_node(
            &Node::Group(Box::new(group.clone())),
            transform,
            &mut pixmap.as_mut(),
        )?;

        let image = pixmap_to_image(&pixmap);
        self.draw_image(
            image,
            layer_bbox.x(),
            layer_bbox.y(),
            layer_bbox.width(),
            layer_bbox.height(),
            state,
        );

        Some(())
    }

    fn clip_path(&mut self, clip_path: &usvg::ClipPath) {
        if let Some(clip_path) = clip_path.clip_path() {
            self.clip_path(clip_path);
        }

        if !is_simple_clip_path(clip_path.root()) {
            log::warn!(
                "clip path {:?} has clipped children, clipping with their outlines",
                clip_path.id()
            );
        }

        let rule = collect_clip_rules(clip_path.root())
            .first()
            .copied()
            .unwrap_or(usvg::FillRule::NonZero);

        // A clip path without visible children hides everything.
        self.content.move_to(0.0, 0.0);
        clip_segments(clip_path.root(), clip_path.transform(), &mut self.content);

        match rule {
            usvg::FillRule::NonZero => self.content.clip_nonzero(),
            usvg::FillRule::EvenOdd => self.content.clip_even_odd(),
        };
        self.content.end_path();
    }

    fn path(&mut self, path: &usvg::Path, state: State) {
        if !path.is_visible() {
            return;
        }

        match path.paint_order() {
            PaintOrder::FillAndStroke => {
                self.fill_path(path, state);
                self.stroke_path(path, state);
            }
            PaintOrder::StrokeAndFill => {
                self.stroke_path(path, state);
                self.fill_path(path, state);
            }
        }
    }

    fn fill_path(&mut self, path: &usvg::Path, state: State) {
        let Some(fill) = path.fill() else {
            return;
        };

        self.content.save_state();
        self.set_transparency(
            state.blend_mode,
            None,
            Some(fill.opacity().get() * state.opacity),
        );

        if self.set_paint(fill.paint(), state.transform, false) {
            draw_path(path.data(), Transform::identity(), &mut self.content);
            match fill.rule() {
                usvg::FillRule::NonZero => self.content.fill_nonzero(),
                usvg::FillRule::EvenOdd => self.content.fill_even_odd(),
            };
        }

        self.content.restore_state();
    }

    fn stroke_path(&mut self, path: &usvg::Path, state: State) {
        let Some(stroke) = path.stroke() else {
            return;
        };

        self.content.save_state();
        self.set_transparency(
            state.blend_mode,
            Some(stroke.opacity().get() * state.opacity),
            None,
        );

        if self.set_paint(stroke.paint(), state.transform, true) {
            self.content
                .set_line_width(stroke.width().get())
                .set_miter_limit(stroke.miterlimit().get())
                .set_line_cap(convert_line_cap(stroke.linecap()))
                .set_line_join(convert_line_join(stroke.linejoin()));
            if let Some(dash_array) = stroke.dasharray() {
                self.content
                    .set_dash_pattern(dash_array.iter().copied(), stroke.dashoffset());
            }

            draw_path(path.data(), Transform::identity(), &mut self.content);
            self.content.stroke();
        }

        self.content.restore_state();
    }

    fn image(&mut self, image: &usvg::Image, state: State) {
        if !image.is_visible() {
            return;
        }

        let size = image.size();
        let (kind, data) = match image.kind() {
            usvg::ImageKind::SVG(tree) => {
                self.content.save_state();
                self.content
                    .rect(0.0, 0.0, tree.size().width(), tree.size().height())
                    .clip_nonzero()
                    .end_path();
                self.group(tree.root(), state);
                self.content.restore_state();
                return;
            }
            usvg::ImageKind::PNG(data) => (ImageKind::Png, data),
            usvg::ImageKind::JPEG(data) => (ImageKind::Jpeg, data),
            usvg::ImageKind::GIF(data) => (ImageKind::Gif, data),
            usvg::ImageKind::WEBP(_) => {
                log::warn!("skipping webp image {:?} inside svg", image.id());
                return;
            }
        };

        match SampledImage::decode(kind, data) {
            Ok(decoded) => {
                self.draw_image(decoded, 0.0, 0.0, size.width(), size.height(), state)
            }
            Err(e) => log::warn!("skipping image {:?} inside svg: {e}", image.id()),
        }
    }

    fn draw_image(
        &mut self,
        image: SampledImage,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        state: State,
    ) {
        self.images.push(image);
        let name = PdfBackend::image_name(ImageId(self.images.len() - 1));

        self.content.save_state();
        self.set_transparency(state.blend_mode, None, Some(state.opacity));
        // Image space has its first row at the top, user space grows downwards.
        self.content
            .transform([width, 0.0, 0.0, -height, x, y + height])
            .x_object(Name(name.as_bytes()));
        self.content.restore_state();
    }

    /// Select a paint, returning whether there is anything to draw with.
    fn set_paint(&mut self, paint: &usvg::Paint, transform: Transform, stroke: bool) -> bool {
        let gradient = match paint {
            usvg::Paint::Color(color) => {
                self.set_color(convert_color(*color), stroke);
                return true;
            }
            usvg::Paint::LinearGradient(lg) => Gradient::new(
                FunctionShadingType::Axial,
                vec![lg.x1(), lg.y1(), lg.x2(), lg.y2()],
                lg,
                transform,
            ),
            usvg::Paint::RadialGradient(rg) => Gradient::new(
                FunctionShadingType::Radial,
                vec![rg.fx(), rg.fy(), 0.0, rg.cx(), rg.cy(), rg.r().get()],
                rg,
                transform,
            ),
            usvg::Paint::Pattern(pattern) => {
                log::warn!("svg patterns are not supported, skipping {:?}", pattern.id());
                return false;
            }
        };

        let gradient = match gradient {
            GradientPaint::Solid(color) => {
                self.set_color(color, stroke);
                return true;
            }
            GradientPaint::Empty => return false,
            GradientPaint::Shading(gradient) => gradient,
        };

        self.gradients.push(gradient);
        let name = pattern_name(self.gradients.len() - 1);
        if stroke {
            self.content
                .set_stroke_color_space(ColorSpaceOperand::Pattern)
                .set_stroke_pattern(std::iter::empty(), Name(name.as_bytes()));
        } else {
            self.content
                .set_fill_color_space(ColorSpaceOperand::Pattern)
                .set_fill_pattern(std::iter::empty(), Name(name.as_bytes()));
        }

        true
    }

    fn set_color(&mut self, [r, g, b]: [f32; 3], stroke: bool) {
        if stroke {
            self.content.set_stroke_rgb(r, g, b);
        } else {
            self.content.set_fill_rgb(r, g, b);
        }
    }

    fn set_transparency(
        &mut self,
        blend_mode: BlendMode,
        stroking_alpha: Option<f32>,
        non_stroking_alpha: Option<f32>,
    ) {
        let opaque = |alpha: Option<f32>| alpha.map_or(true, |a| a >= 1.0);
        if blend_mode == BlendMode::Normal && opaque(stroking_alpha) && opaque(non_stroking_alpha)
        {
            return;
        }

        let gs = ExtGState::new(blend_mode, stroking_alpha, non_stroking_alpha);
        let index = match self.ext_g_state_names.get(&gs) {
            Some(index) => *index,
            None => {
                self.ext_g_states.push(gs);
                let index = self.ext_g_states.len() - 1;
                self.ext_g_state_names.insert(gs, index);
                index
            }
        };

        let name = PdfBackend::ext_g_state_name(index);
        self.content.set_parameters(Name(name.as_bytes()));
    }
}

/// A linear or radial gradient, written as a shading pattern.
#[derive(Debug, Clone)]
struct Gradient {
    shading_type: FunctionShadingType,
    coords: Vec<f32>,
    stops: Vec<(f32, [f32; 3])>,
    /// Maps the gradient space into the space of the form.
    matrix: [f32; 6],
}

enum GradientPaint {
    Empty,
    Solid([f32; 3]),
    Shading(Gradient),
}

impl Gradient {
    fn new(
        shading_type: FunctionShadingType,
        coords: Vec<f32>,
        base: &usvg::BaseGradient,
        transform: Transform,
    ) -> GradientPaint {
        if base.spread_method() != usvg::SpreadMethod::Pad {
            log::debug!("gradient {:?} is drawn with pad spreading", base.id());
        }
        if base.stops().iter().any(|stop| stop.opacity().get() < 1.0) {
            log::debug!("ignoring stop opacities of gradient {:?}", base.id());
        }

        let stops = base
            .stops()
            .iter()
            .map(|stop| (stop.offset().get(), convert_color(stop.color())))
            .collect::<Vec<_>>();

        match stops.as_slice() {
            [] => GradientPaint::Empty,
            [(_, color)] => GradientPaint::Solid(*color),
            _ => GradientPaint::Shading(Self {
                shading_type,
                coords,
                stops,
                matrix: to_pdf_transform(transform.pre_concat(base.transform())),
            }),
        }
    }

    fn serialize(&self, chunk: &mut Chunk, root_ref: Ref, alloc: &mut Ref) {
        let function_ref = write_function(chunk, alloc, &self.stops);

        let mut pattern = chunk.shading_pattern(root_ref);
        pattern.matrix(self.matrix);

        let mut shading = pattern.function_shading();
        shading.shading_type(self.shading_type);
        shading.color_space().device_rgb();
        shading.function(function_ref);
        shading.coords(self.coords.iter().copied());
        shading.extend([true, true]);
        shading.finish();

        pattern.finish();
    }
}

/// Write the function that interpolates between the stops of a gradient.
fn write_function(chunk: &mut Chunk, alloc: &mut Ref, stops: &[(f32, [f32; 3])]) -> Ref {
    let mut stops = stops.to_vec();

    if let Some(&(offset, color)) = stops.first() {
        if offset != 0.0 {
            stops.insert(0, (0.0, color));
        }
    }

    if let Some(&(offset, color)) = stops.last() {
        if offset != 1.0 {
            stops.push((1.0, color));
        }
    }

    if let [(_, c0), (_, c1)] = stops.as_slice() {
        return write_exponential(chunk, alloc, *c0, *c1);
    }

    let functions = stops
        .windows(2)
        .map(|w| write_exponential(chunk, alloc, w[0].1, w[1].1))
        .collect::<Vec<_>>();
    let bounds = stops[1..stops.len() - 1]
        .iter()
        .map(|(offset, _)| *offset)
        .collect::<Vec<_>>();

    let root_ref = alloc.bump();
    let mut stitching = chunk.stitching_function(root_ref);
    stitching.domain([0.0, 1.0]);
    stitching.range([0.0, 1.0].repeat(3));
    stitching.functions(functions.iter().copied());
    stitching.bounds(bounds);
    stitching.encode([0.0, 1.0].repeat(functions.len()));
    stitching.finish();

    root_ref
}

fn write_exponential(chunk: &mut Chunk, alloc: &mut Ref, c0: [f32; 3], c1: [f32; 3]) -> Ref {
    let root_ref = alloc.bump();

    let mut exp = chunk.exponential_function(root_ref);
    exp.range([0.0, 1.0].repeat(3));
    exp.c0(c0);
    exp.c1(c1);
    exp.domain([0.0, 1.0]);
    exp.n(1.0);
    exp.finish();

    root_ref
}

/// Write the outlines of all paths in a group, for use as a clip path.
fn clip_segments(group: &usvg::Group, transform: Transform, content: &mut Content) {
    for child in group.children() {
        match child {
            Node::Path(path) => {
                if path.is_visible() {
                    draw_path(path.data(), transform, content);
                }
            }
            Node::Group(group) => {
                clip_segments(group, transform.pre_concat(group.transform()), content);
            }
            Node::Text(text) => clip_segments(text.flattened(), transform, content),
            // Images don't contribute to clip paths.
            Node::Image(_) => {}
        }
    }
}

/// Whether a clip path can be written as a single PDF clip. Clip paths on
/// children would need a soft mask instead.
fn is_simple_clip_path(group: &usvg::Group) -> bool {
    group.children().iter().all(|node| match node {
        Node::Group(group) => group.clip_path().is_none() && is_simple_clip_path(group),
        _ => true,
    })
}

fn collect_clip_rules(group: &usvg::Group) -> Vec<usvg::FillRule> {
    let mut clip_rules = vec![];

    for node in group.children() {
        match node {
            Node::Path(path) => {
                if let Some(fill) = path.fill() {
                    clip_rules.push(fill.rule());
                }
            }
            Node::Text(text) => clip_rules.extend(collect_clip_rules(text.flattened())),
            Node::Group(group) => clip_rules.extend(collect_clip_rules(group)),
            Node::Image(_) => {}
        }
    }

    clip_rules
}

/// Write the segments of a path, mapped through a transform.
fn draw_path(path: &tiny_skia_path::Path, transform: Transform, content: &mut Content) {
    let map = |mut p: Point| {
        transform.map_point(&mut p);
        p
    };

    let mut start = Point::zero();
    let mut last = Point::zero();

    for segment in path.segments() {
        match segment {
            PathSegment::MoveTo(p) => {
                let p = map(p);
                content.move_to(p.x, p.y);
                start = p;
                last = p;
            }
            PathSegment::LineTo(p) => {
                let p = map(p);
                content.line_to(p.x, p.y);
                last = p;
            }
            PathSegment::QuadTo(p1, p2) => {
                let (p1, p2) = (map(p1), map(p2));
                // Degree elevation of the quadratic curve.
                let c1 = Point::from_xy(
                    last.x + 2.0 / 3.0 * (p1.x - last.x),
                    last.y + 2.0 / 3.0 * (p1.y - last.y),
                );
                let c2 = Point::from_xy(
                    p2.x + 2.0 / 3.0 * (p1.x - p2.x),
                    p2.y + 2.0 / 3.0 * (p1.y - p2.y),
                );
                content.cubic_to(c1.x, c1.y, c2.x, c2.y, p2.x, p2.y);
                last = p2;
            }
            PathSegment::CubicTo(p1, p2, p3) => {
                let (p1, p2, p3) = (map(p1), map(p2), map(p3));
                content.cubic_to(p1.x, p1.y, p2.x, p2.y, p3.x, p3.y);
                last = p3;
            }
            PathSegment::Close => {
                content.close_path();
                last = start;
            }
        }
    }
}

fn pixmap_to_image(pixmap: &tiny_skia::Pixmap) -> SampledImage {
    let demultiplied = pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect::<Vec<_>>();

    SampledImage::from_rgba8(demultiplied, pixmap.width(), pixmap.height())
}

fn to_pdf_transform(ts: Transform) -> [f32; 6] {
    [ts.sx, ts.ky, ts.kx, ts.sy, ts.tx, ts.ty]
}

fn convert_color(color: usvg::Color) -> [f32; 3] {
    [
        color.red as f32 / 255.0,
        color.green as f32 / 255.0,
        color.blue as f32 / 255.0,
    ]
}

fn convert_line_cap(line_cap: usvg::LineCap) -> LineCapStyle {
    match line_cap {
        usvg::LineCap::Butt => LineCapStyle::ButtCap,
        usvg::LineCap::Round => LineCapStyle::RoundCap,
        usvg::LineCap::Square => LineCapStyle::ProjectingSquareCap,
    }
}

fn convert_line_join(line_join: usvg::LineJoin) -> LineJoinStyle {
    match line_join {
        usvg::LineJoin::Miter | usvg::LineJoin::MiterClip => LineJoinStyle::MiterJoin,
        usvg::LineJoin::Round => LineJoinStyle::RoundJoin,
        usvg::LineJoin::Bevel => LineJoinStyle::BevelJoin,
    }
}

fn convert_blend_mode(blend_mode: usvg::BlendMode) -> BlendMode {
    match blend_mode {
        usvg::BlendMode::Normal => BlendMode::Normal,
        usvg::BlendMode::Multiply => BlendMode::Multiply,
        usvg::BlendMode::Screen => BlendMode::Screen,
        usvg::BlendMode::Overlay => BlendMode::Overlay,
        usvg::BlendMode::Darken => BlendMode::Darken,
        usvg::BlendMode::Lighten => BlendMode::Lighten,
        usvg::BlendMode::ColorDodge => BlendMode::ColorDodge,
        usvg::BlendMode::ColorBurn => BlendMode::ColorBurn,
        usvg::BlendMode::HardLight => BlendMode::HardLight,
        usvg::BlendMode::SoftLight => BlendMode::SoftLight,
        usvg::BlendMode::Difference => BlendMode::Difference,
        usvg::BlendMode::Exclusion => BlendMode::Exclusion,
        other => {
            log::debug!("blend mode {other:?} is drawn as normal");
            BlendMode::Normal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(svg: &str) -> SvgForm {
        SvgForm::convert(svg.as_bytes(), None).unwrap()
    }

    fn content(form: &SvgForm) -> String {
        String::from_utf8_lossy(&form.content).into_owned()
    }

    fn serialized(form: &SvgForm) -> String {
        let mut chunk = Chunk::new();
        let mut alloc = Ref::new(2);
        form.serialize(&mut chunk, Ref::new(1), &mut alloc, &CanvasSettings::debug());
        String::from_utf8_lossy(chunk.as_bytes()).into_owned()
    }

    #[test]
    fn paths_stay_vector() {
        let form = convert(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="10">
                <rect width="20" height="10" fill="#ff0000"/>
            </svg>"##,
        );

        assert_eq!(form.size(), (20.0, 10.0));
        assert!(form.images.is_empty());

        let content = content(&form);
        assert!(content.contains("1 0 0 rg"));
        assert!(content.contains("0 0 m"));
        assert!(content.contains("20 10 l"));
        assert!(content.contains("\nf\n"));
    }

    #[test]
    fn form_maps_viewport_to_unit_square() {
        let form = convert(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="10"/>"#,
        );

        let text = serialized(&form);
        assert!(text.contains("/Subtype /Form"));
        assert!(text.contains("/BBox [0 0 20 10]"));
        assert!(text.contains("/Matrix [0.05 0 0 -0.1 0 1]"));
        assert!(text.contains("/S /Transparency"));
    }

    #[test]
    fn strokes_and_opacity() {
        let form = convert(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="20">
                <g opacity="0.5">
                    <line x1="0" y1="0" x2="20" y2="20" fill="none" stroke="#0000ff"
                          stroke-width="2" stroke-linecap="round" stroke-dasharray="4 2"/>
                </g>
            </svg>"##,
        );

        let content = content(&form);
        assert!(content.contains("0 0 1 RG"));
        assert!(content.contains("2 w"));
        assert!(content.contains("1 J"));
        assert!(content.contains("[4 2] 0 d"));
        assert!(content.contains("/GS1 gs"));
        assert!(content.contains("\nS\n"));

        assert_eq!(form.ext_g_states.len(), 1);
        assert_eq!(form.ext_g_states[0].stroking_alpha, Some(500));
    }

    #[test]
    fn group_transforms_and_clip_paths() {
        let form = convert(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="20">
                <clipPath id="c"><rect width="5" height="5"/></clipPath>
                <g transform="translate(3 4)" clip-path="url(#c)">
                    <rect width="10" height="10" fill="#000000"/>
                </g>
            </svg>"##,
        );

        let content = content(&form);
        assert!(content.contains("1 0 0 1 3 4 cm"));
        let clip = content.find("W\nn\n").unwrap();
        let fill = content.find("0 0 0 rg").unwrap();
        assert!(clip < fill);
    }

    #[test]
    fn gradients_become_shading_patterns() {
        let form = convert(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="10">
                <linearGradient id="g" gradientUnits="userSpaceOnUse" x1="0" y1="0" x2="20" y2="0">
                    <stop offset="0" stop-color="#ff0000"/>
                    <stop offset="0.5" stop-color="#00ff00"/>
                    <stop offset="1" stop-color="#0000ff"/>
                </linearGradient>
                <rect width="20" height="10" fill="url(#g)"/>
            </svg>"##,
        );

        assert!(content(&form).contains("/Pattern cs\n/P1 scn"));
        assert_eq!(form.gradients.len(), 1);
        assert_eq!(form.gradients[0].coords, vec![0.0, 0.0, 20.0, 0.0]);

        let text = serialized(&form);
        assert!(text.contains("/PatternType 2"));
        assert!(text.contains("/ShadingType 2"));
        assert!(text.contains("/FunctionType 3"));
        assert!(text.contains("/Bounds [0.5]"));
        assert!(text.contains("/P1"));
    }

    #[test]
    fn stops_are_padded() {
        let mut chunk = Chunk::new();
        let mut alloc = Ref::new(1);
        write_function(
            &mut chunk,
            &mut alloc,
            &[(0.25, [1.0, 0.0, 0.0]), (0.75, [0.0, 0.0, 1.0])],
        );

        let text = String::from_utf8_lossy(chunk.as_bytes()).into_owned();
        assert!(text.contains("/Bounds [0.25 0.75]"));
        assert_eq!(text.matches("/FunctionType 2").count(), 3);
    }

    #[test]
    fn quadratic_curves_are_elevated() {
        let mut builder = tiny_skia_path::PathBuilder::new();
        builder.move_to(0.0, 0.0);
        builder.quad_to(3.0, 3.0, 6.0, 0.0);
        let path = builder.finish().unwrap();

        let mut content = Content::new();
        draw_path(&path, Transform::identity(), &mut content);

        let text = String::from_utf8_lossy(&content.finish()).into_owned();
        assert!(text.contains("2 2 4 2 6 0 c"));
    }

    #[test]
    fn invalid_svg_is_an_error() {
        assert!(SvgForm::convert(b"<svg", None).is_err());
    }
}
