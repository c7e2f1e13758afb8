//! Text measurement, wrapping and placement.

use anyhow::Result;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontFamily, FontTransform};

use super::backend_err;
use crate::layout::{HAlign, VAlign};

/// Heuristic: estimate pixel width of one line (plotters has no text
/// measuring without a loaded font).
pub fn estimate_text_width_px(text: &str, font_px: u32) -> u32 {
    ((text.chars().count() as f32) * (font_px as f32) * 0.60).ceil() as u32
}

/// Width of the widest line and height of a multi-line block.
pub fn block_size_px(text: &str, font_px: u32) -> (u32, u32) {
    let lines = text.lines().count().max(1) as u32;
    let width = text
        .lines()
        .map(|l| estimate_text_width_px(l, font_px))
        .max()
        .unwrap_or(0);
    (width, lines * line_height_px(font_px))
}

pub fn line_height_px(font_px: u32) -> u32 {
    font_px + font_px / 4 + 1
}

/// Wrap on word boundaries to fit `max_px`; a single word wider than the
/// limit is split by characters.
pub fn wrap_text_to_width(text: &str, font_px: u32, max_px: u32) -> Vec<String> {
    let max_chars = ((max_px as f32) / (font_px as f32 * 0.60)).floor().max(1.0) as usize;
    let mut lines: Vec<String> = Vec::new();
    let mut cur = String::new();
    for word in text.split_whitespace() {
        let needed = if cur.is_empty() {
            word.chars().count()
        } else {
            cur.chars().count() + 1 + word.chars().count()
        };
        if needed <= max_chars {
            if !cur.is_empty() {
                cur.push(' ');
            }
            cur.push_str(word);
            continue;
        }
        if !cur.is_empty() {
            lines.push(std::mem::take(&mut cur));
        }
        let chars: Vec<char> = word.chars().collect();
        let mut chunks = chars.chunks(max_chars).peekable();
        while let Some(chunk) = chunks.next() {
            let piece: String = chunk.iter().collect();
            if chunks.peek().is_some() {
                lines.push(piece);
            } else {
                cur = piece;
            }
        }
    }
    if !cur.is_empty() {
        lines.push(cur);
    }
    lines
}

pub fn hpos(ha: HAlign) -> HPos {
    match ha {
        HAlign::Left => HPos::Left,
        HAlign::Center => HPos::Center,
        HAlign::Right => HPos::Right,
    }
}

/// How a block of text is laid out around its anchor point.
#[derive(Debug, Clone, Copy)]
pub struct TextBlock {
    pub font_px: u32,
    pub color: RGBAColor,
    pub ha: HAlign,
    pub va: VAlign,
    /// Rotated a quarter turn counter-clockwise.
    pub vertical: bool,
    pub background: Option<RGBAColor>,
}

impl TextBlock {
    pub fn new(font_px: u32) -> Self {
        Self {
            font_px,
            color: BLACK.to_rgba(),
            ha: HAlign::Left,
            va: VAlign::Bottom,
            vertical: false,
            background: None,
        }
    }

    pub fn aligned(mut self, ha: HAlign, va: VAlign) -> Self {
        self.ha = ha;
        self.va = va;
        self
    }

    pub fn colored(mut self, color: RGBAColor) -> Self {
        self.color = color;
        self
    }

    /// Draw `text` (possibly multi-line) with its anchor at `at`, in pixels
    /// of `area`.
    pub fn draw<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        text: &str,
        at: (i32, i32),
    ) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        if self.vertical {
            return self.draw_vertical(area, text, at);
        }
        let line_h = line_height_px(self.font_px) as i32;
        let (w, h) = block_size_px(text, self.font_px);
        let (w, h) = (w as i32, h as i32);
        let top = match self.va {
            VAlign::Top => at.1,
            VAlign::Center => at.1 - h / 2,
            VAlign::Bottom => at.1 - h,
        };
        if let Some(bg) = self.background {
            let left = match self.ha {
                HAlign::Left => at.0,
                HAlign::Center => at.0 - w / 2,
                HAlign::Right => at.0 - w,
            };
            area.draw(&Rectangle::new(
                [(left - 3, top - 2), (left + w + 3, top + h + 2)],
                bg.filled(),
            ))
            .map_err(backend_err)?;
        }
        let style = TextStyle::from((FontFamily::SansSerif, self.font_px))
            .color(&self.color)
            .pos(Pos::new(hpos(self.ha), VPos::Center));
        for (i, line) in text.lines().enumerate() {
            let y = top + i as i32 * line_h + line_h / 2;
            area.draw(&Text::new(line, (at.0, y), style.clone()))
                .map_err(backend_err)?;
        }
        Ok(())
    }

    /// Lines run bottom to top; successive lines stack to the right.
    fn draw_vertical<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        text: &str,
        at: (i32, i32),
    ) -> Result<()> {
        let line_h = line_height_px(self.font_px) as i32;
        let n = text.lines().count().max(1) as i32;
        // along the rotated baseline, "left" is the bottom of the screen
        let along = match self.va {
            VAlign::Top => HPos::Right,
            VAlign::Center => HPos::Center,
            VAlign::Bottom => HPos::Left,
        };
        let left = match self.ha {
            HAlign::Left => at.0,
            HAlign::Center => at.0 - n * line_h / 2,
            HAlign::Right => at.0 - n * line_h,
        };
        let style = TextStyle::from((FontFamily::SansSerif, self.font_px))
            .color(&self.color)
            .transform(FontTransform::Rotate270)
            .pos(Pos::new(along, VPos::Center));
        for (i, line) in text.lines().enumerate() {
            let x = left + i as i32 * line_h + line_h / 2;
            area.draw(&Text::new(line, (x, at.1), style.clone()))
                .map_err(backend_err)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_on_words() {
        let lines = wrap_text_to_width("Mean daily temperature anomaly", 10, 100);
        assert_eq!(lines, vec!["Mean daily", "temperature", "anomaly"]);
    }

    #[test]
    fn long_words_are_split() {
        let lines = wrap_text_to_width("abcdefghij", 10, 30);
        assert_eq!(lines, vec!["abcde", "fghij"]);
    }

    #[test]
    fn blocks_measure_widest_line() {
        let (w, h) = block_size_px("ab\nabcd", 10);
        assert_eq!(w, 24);
        assert_eq!(h, 2 * line_height_px(10));
    }
}
