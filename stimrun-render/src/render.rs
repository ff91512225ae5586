use ab_glyph::{Font, FontRef, Glyph, PxScale, ScaleFont, point};
use anyhow::{Context, Result, anyhow};
use bytemuck::{cast_slice, cast_slice_mut};
use stimrun_core::{INSTRUCTION_TEXT, STATIC_SLOTS, Schedule, StimulusView};
use tiny_skia::{Color, Paint, Pixmap, PremultipliedColorU8, Rect, Transform};

const FONT_BYTES: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

const INSTRUCTION_PX: f32 = 42.0;
const LABEL_PX: f32 = 64.0;
const CROSS_EXTENT: u32 = 40;
const CROSS_THICKNESS: f32 = 3.0;

/// CPU renderer for the presentation window.
///
/// Every stimulus the run can show is rasterized once up front — the
/// instruction line, the fixation cross, and one text tile per schedule row —
/// and blitted centered onto an opaque canvas each frame. Tiles live at the
/// slot returned by `StimulusView::cache_slot`.
pub struct SkiaRenderer {
    width: u32,
    height: u32,
    center: (f32, f32),
    canvas: Pixmap,
    tiles: Vec<Pixmap>,
}

impl SkiaRenderer {
    pub fn new(width: u32, height: u32, schedule: &Schedule) -> Result<Self> {
        let font = FontRef::try_from_slice(FONT_BYTES).context("bundled font is unreadable")?;

        let mut tiles = Vec::with_capacity(STATIC_SLOTS + schedule.len());
        tiles.push(render_text_pixmap(
            INSTRUCTION_TEXT,
            INSTRUCTION_PX,
            &font,
            Color::WHITE,
        ));
        tiles.push(fixation_cross());
        for trial in &schedule.trials {
            tiles.push(render_text_pixmap(&trial.label, LABEL_PX, &font, Color::WHITE));
        }

        let canvas = opaque_canvas(width, height)?;

        Ok(Self {
            width,
            height,
            center: (width as f32 / 2.0, height as f32 / 2.0),
            canvas,
            tiles,
        })
    }

    /// Draws one frame into `frame_buffer` (RGBA, row-major, same size as the
    /// canvas). A `None` view is a blank black frame; a buffer of another
    /// size is left untouched.
    pub fn render_frame(
        &mut self,
        view: Option<StimulusView>,
        frame_buffer: &mut [u8],
    ) -> Result<()> {
        self.canvas.fill(Color::BLACK);
        if let Some(view) = view {
            self.blit_centered(view.cache_slot());
        }
        if frame_buffer.len() == self.canvas.data().len() {
            frame_buffer.copy_from_slice(self.canvas.data());
        }
        Ok(())
    }

    /// Premultiplied-alpha over blit of a cached tile, centered on the
    /// canvas and clipped to it.
    fn blit_centered(&mut self, slot: usize) {
        let Some(tile) = self.tiles.get(slot) else {
            return;
        };
        let (tw, th) = (tile.width() as i32, tile.height() as i32);
        let (cw, ch) = (self.width as i32, self.height as i32);

        let x0 = (self.center.0 - tw as f32 * 0.5).floor() as i32;
        let y0 = (self.center.1 - th as f32 * 0.5).floor() as i32;

        let dst_x = x0.max(0);
        let dst_y = y0.max(0);
        let src_x = (-x0).max(0);
        let src_y = (-y0).max(0);
        let copy_w = (tw - src_x).min(cw - dst_x);
        let copy_h = (th - src_y).min(ch - dst_y);
        if copy_w <= 0 || copy_h <= 0 {
            return;
        }

        let tile_stride = tile.width() as usize;
        let canvas_stride = self.width as usize;
        let src: &[u32] = cast_slice(tile.data());
        let dst: &mut [u32] = cast_slice_mut(self.canvas.data_mut());

        for row in 0..copy_h as usize {
            let src_row = (src_y as usize + row) * tile_stride + src_x as usize;
            let dst_row = (dst_y as usize + row) * canvas_stride + dst_x as usize;
            for i in 0..copy_w as usize {
                let s = src[src_row + i];
                let sa = (s >> 24) & 0xFF;
                if sa == 0 {
                    continue;
                }
                if sa == 255 {
                    dst[dst_row + i] = s;
                    continue;
                }
                let d = dst[dst_row + i];
                let inv = 255 - sa;

                let sr = s & 0xFF;
                let sg = (s >> 8) & 0xFF;
                let sb = (s >> 16) & 0xFF;

                let dr = d & 0xFF;
                let dg = (d >> 8) & 0xFF;
                let db = (d >> 16) & 0xFF;
                let da = (d >> 24) & 0xFF;

                let r = sr + (dr * inv + 127) / 255;
                let g = sg + (dg * inv + 127) / 255;
                let b = sb + (db * inv + 127) / 255;
                let a = sa + (da * inv + 127) / 255;

                dst[dst_row + i] = (a << 24) | (b << 16) | (g << 8) | r;
            }
        }
    }
}

fn opaque_canvas(width: u32, height: u32) -> Result<Pixmap> {
    let mut canvas = Pixmap::new(width, height)
        .ok_or_else(|| anyhow!("cannot allocate {width}x{height} canvas"))?;
    canvas.fill(Color::BLACK);
    Ok(canvas)
}

/// Rasterizes one line of text into a tight transparent pixmap,
/// premultiplied, baseline at the font ascent.
pub fn render_text_pixmap(text: &str, font_px: f32, font: &FontRef<'_>, color: Color) -> Pixmap {
    let scale = PxScale::from(font_px);
    let sf = font.as_scaled(scale);

    let mut pen_x = 0.0f32;
    let mut glyphs = Vec::<Glyph>::new();
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = glyphs.last() {
            pen_x += sf.kern(prev.id, id);
        }
        glyphs.push(Glyph {
            id,
            scale,
            position: point(pen_x, sf.ascent()),
        });
        pen_x += sf.h_advance(id);
    }

    let outlined: Vec<_> = glyphs
        .iter()
        .filter_map(|g| font.outline_glyph(g.clone()))
        .collect();

    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for out in &outlined {
        let b = out.px_bounds();
        min_x = min_x.min(b.min.x);
        min_y = min_y.min(b.min.y);
        max_x = max_x.max(b.max.x);
        max_y = max_y.max(b.max.y);
    }

    // whitespace-only text has no outlines
    if min_x == f32::INFINITY {
        return Pixmap::new(1, 1).expect("1x1 pixmap");
    }

    let w = (max_x.ceil() - min_x.floor()).max(1.0) as u32;
    let h = (max_y.ceil() - min_y.floor()).max(1.0) as u32;
    let mut pm = Pixmap::new(w, h).expect("text pixmap");

    let (cr, cg, cb, ca) = (
        color.red() * 255.0,
        color.green() * 255.0,
        color.blue() * 255.0,
        color.alpha(),
    );
    let stride = w as usize;
    let pixels = pm.pixels_mut();

    for out in &outlined {
        let b = out.px_bounds();
        out.draw(|x, y, cov| {
            let ix = (x as f32 + b.min.x - min_x) as i32;
            let iy = (y as f32 + b.min.y - min_y) as i32;
            if ix < 0 || iy < 0 || ix >= w as i32 || iy >= h as i32 {
                return;
            }
            let a = (cov * ca).clamp(0.0, 1.0);
            let px = PremultipliedColorU8::from_rgba(
                (cr * a) as u8,
                (cg * a) as u8,
                (cb * a) as u8,
                (a * 255.0) as u8,
            )
            .expect("premultiplied components");

            // glyph boxes can overlap after kerning; keep the denser cover
            let i = iy as usize * stride + ix as usize;
            if px.alpha() > pixels[i].alpha() {
                pixels[i] = px;
            }
        });
    }

    pm
}

/// A plus-shaped fixation marker: two filled bars on a transparent tile.
fn fixation_cross() -> Pixmap {
    let size = CROSS_EXTENT;
    let mut pm = Pixmap::new(size, size).expect("cross pixmap");

    let mut paint = Paint::default();
    paint.anti_alias = false;
    paint.set_color(Color::WHITE);

    let mid = (size as f32 - CROSS_THICKNESS) * 0.5;
    let horizontal = Rect::from_xywh(0.0, mid, size as f32, CROSS_THICKNESS).expect("bar rect");
    pm.fill_rect(horizontal, &paint, Transform::identity(), None);
    let vertical = Rect::from_xywh(mid, 0.0, CROSS_THICKNESS, size as f32).expect("bar rect");
    pm.fill_rect(vertical, &paint, Transform::identity(), None);

    pm
}

#[cfg(test)]
mod tests {
    use super::*;
    use stimrun_core::Trial;

    fn schedule() -> Schedule {
        Schedule::new(
            1,
            vec![
                Trial::new("Sam", 4.0),
                Trial::new("Kirsten", 8.0),
                Trial::new("Ari", 10.0),
            ],
        )
    }

    fn lit_pixels(frame: &[u8]) -> usize {
        frame.chunks_exact(4).filter(|px| px[0] > 0).count()
    }

    #[test]
    fn text_pixmap_is_tight_and_nonempty() {
        let font = FontRef::try_from_slice(FONT_BYTES).unwrap();
        let pm = render_text_pixmap("Sam", 64.0, &font, Color::WHITE);
        assert!(pm.width() > 1 && pm.height() > 1);
        assert!(pm.pixels().iter().any(|p| p.alpha() == 255));
    }

    #[test]
    fn whitespace_text_renders_to_a_stub_tile() {
        let font = FontRef::try_from_slice(FONT_BYTES).unwrap();
        let pm = render_text_pixmap("   ", 64.0, &font, Color::WHITE);
        assert_eq!((pm.width(), pm.height()), (1, 1));
    }

    #[test]
    fn fixation_cross_covers_the_tile_center() {
        let pm = fixation_cross();
        let center = ((CROSS_EXTENT / 2) * CROSS_EXTENT + CROSS_EXTENT / 2) as usize;
        assert_eq!(pm.pixels()[center].alpha(), 255);
    }

    #[test]
    fn blank_view_renders_black() {
        let mut r = SkiaRenderer::new(320, 200, &schedule()).unwrap();
        let mut frame = vec![0u8; 320 * 200 * 4];
        r.render_frame(None, &mut frame).unwrap();
        assert_eq!(lit_pixels(&frame), 0);
    }

    #[test]
    fn each_view_lights_distinct_center_content() {
        let mut r = SkiaRenderer::new(320, 200, &schedule()).unwrap();
        let mut frame = vec![0u8; 320 * 200 * 4];

        r.render_frame(Some(StimulusView::Fixation), &mut frame).unwrap();
        let cross = lit_pixels(&frame);
        assert!(cross > 0);

        r.render_frame(Some(StimulusView::Label { index: 1 }), &mut frame)
            .unwrap();
        let label = lit_pixels(&frame);
        assert!(label > cross, "a name covers more pixels than the cross");
    }

    #[test]
    fn mismatched_buffer_is_left_untouched() {
        let mut r = SkiaRenderer::new(320, 200, &schedule()).unwrap();
        let mut frame = vec![7u8; 16];
        r.render_frame(Some(StimulusView::Fixation), &mut frame).unwrap();
        assert!(frame.iter().all(|&b| b == 7));
    }

    #[test]
    fn tile_larger_than_canvas_is_clipped_not_dropped() {
        let mut r = SkiaRenderer::new(20, 12, &schedule()).unwrap();
        let mut frame = vec![0u8; 20 * 12 * 4];
        r.render_frame(Some(StimulusView::Label { index: 0 }), &mut frame)
            .unwrap();
        assert!(lit_pixels(&frame) > 0);
    }
}
