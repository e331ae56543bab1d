use std::sync::Arc;

use crate::{
    assets::image::PreparedImage,
    foundation::{
        core::FrameRgba,
        error::{ReelError, ReelResult},
    },
    scene::model::{CompositorConfig, Scene},
    text::{
        shape::{CaptionShaper, ShapedLine},
        wrap::wrap_caption,
    },
};

/// Caption drawn inside the placeholder rectangle when a scene has no image.
pub const PLACEHOLDER_TEXT: &str = "No image generated";

/// A decoded image converted into a raster-backend paint.
#[derive(Clone)]
pub struct ImagePaint {
    paint: vello_cpu::Image,
    width: u32,
    height: u32,
}

impl ImagePaint {
    /// Wrap a [`PreparedImage`] as a paint source for the render context.
    pub fn from_prepared(img: &PreparedImage) -> ReelResult<Self> {
        let pixmap = pixmap_from_premul_bytes(&img.rgba8_premul, img.width, img.height)?;
        Ok(Self {
            paint: vello_cpu::Image {
                image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
                sampler: vello_cpu::peniko::ImageSampler::default(),
            },
            width: img.width,
            height: img.height,
        })
    }

    /// Source image dimensions in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl std::fmt::Debug for ImagePaint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePaint")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Paints scene frames onto an owned fixed-size surface.
///
/// Every frame starts with a full opaque background fill, so no pixels
/// survive from one frame to the next. The renderer holds no per-frame
/// state beyond the reused context and readback target.
pub struct FrameRenderer {
    width: u16,
    height: u16,
    cfg: CompositorConfig,
    shaper: Box<dyn CaptionShaper>,
    ctx: Option<vello_cpu::RenderContext>,
    target: vello_cpu::Pixmap,
}

impl FrameRenderer {
    /// Build a renderer for `cfg`'s surface using the given shaper.
    pub fn new(cfg: CompositorConfig, shaper: Box<dyn CaptionShaper>) -> ReelResult<Self> {
        cfg.validate()?;
        let width: u16 = cfg
            .canvas
            .width
            .try_into()
            .map_err(|_| ReelError::validation("surface width exceeds u16"))?;
        let height: u16 = cfg
            .canvas
            .height
            .try_into()
            .map_err(|_| ReelError::validation("surface height exceeds u16"))?;

        Ok(Self {
            width,
            height,
            cfg,
            shaper,
            ctx: None,
            target: vello_cpu::Pixmap::new(width, height),
        })
    }

    /// Render one frame of `scene` by itself.
    pub fn render_scene(
        &mut self,
        scene: &Scene,
        image: Option<&ImagePaint>,
    ) -> ReelResult<FrameRgba> {
        self.with_ctx(|this, ctx| this.paint_scene(ctx, scene, image))
    }

    /// Render one cross-dissolve frame between two scenes.
    ///
    /// The outgoing scene is painted at full opacity, then the incoming scene
    /// inside an opacity layer at `progress`. Popping the layer restores the
    /// paint state, so the dissolve never leaks into later draws.
    pub fn render_transition(
        &mut self,
        from: &Scene,
        from_image: Option<&ImagePaint>,
        to: &Scene,
        to_image: Option<&ImagePaint>,
        progress: f32,
    ) -> ReelResult<FrameRgba> {
        if !(0.0..=1.0).contains(&progress) {
            return Err(ReelError::render(format!(
                "transition progress {progress} out of [0,1]"
            )));
        }
        self.with_ctx(|this, ctx| {
            this.paint_scene(ctx, from, from_image)?;
            ctx.push_opacity_layer(progress);
            this.paint_scene(ctx, to, to_image)?;
            ctx.pop_layer();
            Ok(())
        })
    }

    fn with_ctx(
        &mut self,
        f: impl FnOnce(&mut Self, &mut vello_cpu::RenderContext) -> ReelResult<()>,
    ) -> ReelResult<FrameRgba> {
        let mut ctx = match self.ctx.take() {
            Some(ctx) => ctx,
            None => vello_cpu::RenderContext::new(self.width, self.height),
        };
        ctx.reset();

        let out = f(self, &mut ctx);
        let frame = match out {
            Ok(()) => {
                ctx.flush();
                ctx.render_to_pixmap(&mut self.target);
                Ok(FrameRgba {
                    width: u32::from(self.width),
                    height: u32::from(self.height),
                    data: self.target.data_as_u8_slice().to_vec(),
                    premultiplied: true,
                })
            }
            Err(e) => Err(e),
        };
        self.ctx = Some(ctx);
        frame
    }

    fn paint_scene(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        scene: &Scene,
        image: Option<&ImagePaint>,
    ) -> ReelResult<()> {
        let (w, h) = (f64::from(self.width), f64::from(self.height));

        // Background fill covers the whole surface; the alpha is forced
        // opaque so the artifact never depends on stale pixels.
        let [bg_r, bg_g, bg_b, _] = self.cfg.background_rgba;
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(bg_r, bg_g, bg_b, 255));
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, w, h));

        match image {
            Some(img) => self.paint_image(ctx, img),
            None => self.paint_placeholder(ctx)?,
        }

        self.paint_caption(ctx, &scene.text)?;
        Ok(())
    }

    fn paint_image(&self, ctx: &mut vello_cpu::RenderContext, img: &ImagePaint) {
        let (w, h) = (f64::from(self.width), f64::from(self.height));
        let (iw, ih) = (f64::from(img.width), f64::from(img.height));

        // Fit inside without cropping, centered on both axes.
        let scale = (w / iw).min(h / ih);
        let dx = (w - iw * scale) / 2.0;
        let dy = (h - ih * scale) / 2.0;

        let tr = kurbo::Affine::translate((dx, dy)) * kurbo::Affine::scale(scale);
        ctx.set_transform(affine_to_cpu(tr));
        ctx.set_paint(img.paint.clone());
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, iw, ih));
    }

    fn paint_placeholder(&mut self, ctx: &mut vello_cpu::RenderContext) -> ReelResult<()> {
        let (w, h) = (f64::from(self.width), f64::from(self.height));
        let [r, g, b, a] = self.cfg.placeholder_rgba;

        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            w / 4.0,
            h / 4.0,
            w * 3.0 / 4.0,
            h * 3.0 / 4.0,
        ));

        let shaped = self
            .shaper
            .shape(PLACEHOLDER_TEXT, self.cfg.font_size, true)?;
        let x = (w - f64::from(shaped.width)) / 2.0;
        let y = (h - f64::from(shaped.height)) / 2.0;
        let [cr, cg, cb, ca] = self.cfg.caption_rgba;
        draw_shaped_line(ctx, &shaped, x, y, [cr, cg, cb, ca]);
        Ok(())
    }

    fn paint_caption(&mut self, ctx: &mut vello_cpu::RenderContext, text: &str) -> ReelResult<()> {
        if text.trim().is_empty() {
            return Ok(());
        }

        let size = self.cfg.font_size;
        let shaper = &mut self.shaper;
        let lines = wrap_caption(text, self.cfg.wrap_width(), &mut |candidate| {
            shaper.measure(candidate, size)
        })?;
        if lines.is_empty() {
            return Ok(());
        }

        let mut shaped: Vec<ShapedLine> = Vec::with_capacity(lines.len());
        for line in &lines {
            shaped.push(self.shaper.shape(line, size, false)?);
        }

        let w = f64::from(self.width);
        let line_h = f64::from(self.cfg.line_height());
        let padding = f64::from(self.cfg.padding);
        let block_bottom = f64::from(self.height) - f64::from(self.cfg.margin_bottom);
        let n = shaped.len();
        let line_top = |i: usize| block_bottom - (n - i) as f64 * line_h;

        // All backing boxes first so no box ever covers caption text.
        let [br, bg, bb, ba] = self.cfg.caption_box_rgba;
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(br, bg, bb, ba));
        for (i, line) in shaped.iter().enumerate() {
            if lines[i].is_empty() {
                continue;
            }
            let lw = f64::from(line.width);
            let x0 = (w - lw) / 2.0 - padding;
            let y0 = line_top(i) - padding / 2.0;
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                x0,
                y0,
                x0 + lw + 2.0 * padding,
                y0 + line_h + padding,
            ));
        }

        let [cr, cg, cb, ca] = self.cfg.caption_rgba;
        for (i, line) in shaped.iter().enumerate() {
            let x = (w - f64::from(line.width)) / 2.0;
            let y = line_top(i) + (line_h - f64::from(line.height)) / 2.0;
            draw_shaped_line(ctx, line, x, y, [cr, cg, cb, ca]);
        }
        Ok(())
    }
}

fn draw_shaped_line(
    ctx: &mut vello_cpu::RenderContext,
    line: &ShapedLine,
    x: f64,
    y: f64,
    rgba: [u8; 4],
) {
    ctx.set_transform(affine_to_cpu(kurbo::Affine::translate((x, y))));
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
        rgba[0], rgba[1], rgba[2], rgba[3],
    ));
    for run in &line.runs {
        let glyphs = run.glyphs.iter().map(|g| vello_cpu::Glyph {
            id: g.id,
            x: g.x,
            y: g.y,
        });
        ctx.glyph_run(&run.font)
            .font_size(run.font_size)
            .fill_glyphs(glyphs);
    }
}

fn affine_to_cpu(a: kurbo::Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> ReelResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| ReelError::render("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| ReelError::render("image height exceeds u16"))?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(ReelError::render("image byte len mismatch"));
    }

    // Pixmap stores PremulRgba8; our bytes are already premultiplied.
    let mut pixels = Vec::<vello_cpu::peniko::color::PremulRgba8>::with_capacity(
        (width as usize) * (height as usize),
    );
    for px in bytes.chunks_exact(4) {
        pixels.push(vello_cpu::peniko::color::PremulRgba8::from_u8_array([
            px[0], px[1], px[2], px[3],
        ]));
    }
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels, w, h, true,
    ))
}
