use crate::error::SheetError;

/// Glyph used for transparent cells in sheet files.
pub(crate) const TRANSPARENT: char = '.';

/// A text sprite sheet: a `WxH` header followed by a grid of frames.
/// Columns are animation frames, rows are facing directions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SpriteSheet {
    frame_w: usize,
    frame_h: usize,
    cols: usize,
    rows: usize,
    grid: Vec<Vec<char>>,
}

impl SpriteSheet {
    pub(crate) fn parse(src: &str) -> Result<Self, SheetError> {
        let mut lines = src.lines().map(|l| l.trim_end_matches('\r'));
        let header = lines.next().ok_or(SheetError::MissingHeader)?.trim();
        if header.is_empty() {
            return Err(SheetError::MissingHeader);
        }
        let (frame_w, frame_h) = parse_header(header)?;

        let mut grid: Vec<Vec<char>> = lines.map(|l| l.chars().collect()).collect();
        while grid.last().is_some_and(|l| l.is_empty()) {
            grid.pop();
        }
        if grid.is_empty() {
            return Err(SheetError::NoFrames);
        }
        if grid.len() % frame_h != 0 {
            return Err(SheetError::UnevenRows {
                lines: grid.len(),
                frame_h,
            });
        }

        let width = grid[0].len();
        if width == 0 || width % frame_w != 0 {
            return Err(SheetError::UnevenWidth {
                line: 1,
                width,
                expected: frame_w * (width / frame_w).max(1),
            });
        }
        for (i, line) in grid.iter().enumerate() {
            if line.len() != width {
                return Err(SheetError::UnevenWidth {
                    line: i + 1,
                    width: line.len(),
                    expected: width,
                });
            }
        }

        Ok(Self {
            frame_w,
            frame_h,
            cols: width / frame_w,
            rows: grid.len() / frame_h,
            grid,
        })
    }

    pub(crate) fn frame_size(&self) -> (usize, usize) {
        (self.frame_w, self.frame_h)
    }

    pub(crate) fn cols(&self) -> usize {
        self.cols
    }

    pub(crate) fn rows(&self) -> usize {
        self.rows
    }

    /// Slice out one frame. Out-of-range indices wrap so an animation counter
    /// can never point past the sheet.
    pub(crate) fn frame(&self, col: usize, row: usize) -> Frame<'_> {
        Frame {
            sheet: self,
            x0: (col % self.cols) * self.frame_w,
            y0: (row % self.rows) * self.frame_h,
        }
    }
}

fn parse_header(header: &str) -> Result<(usize, usize), SheetError> {
    let bad = || SheetError::BadHeader(header.to_string());
    let (w, h) = header.split_once(['x', 'X']).ok_or_else(bad)?;
    let w: usize = w.trim().parse().map_err(|_| bad())?;
    let h: usize = h.trim().parse().map_err(|_| bad())?;
    if w == 0 || h == 0 {
        return Err(bad());
    }
    Ok((w, h))
}

#[derive(Clone, Copy)]
pub(crate) struct Frame<'a> {
    sheet: &'a SpriteSheet,
    x0: usize,
    y0: usize,
}

impl Frame<'_> {
    pub(crate) fn width(&self) -> usize {
        self.sheet.frame_w
    }

    pub(crate) fn height(&self) -> usize {
        self.sheet.frame_h
    }

    /// Opaque glyph at (dx, dy), or `None` for transparent cells.
    pub(crate) fn glyph(&self, dx: usize, dy: usize) -> Option<char> {
        if dx >= self.width() || dy >= self.height() {
            return None;
        }
        let ch = self.sheet.grid[self.y0 + dy][self.x0 + dx];
        (ch != TRANSPARENT).then_some(ch)
    }

    pub(crate) fn lines(&self) -> Vec<String> {
        (0..self.height())
            .map(|dy| {
                (0..self.width())
                    .map(|dx| self.glyph(dx, dy).unwrap_or(' '))
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SHEET: &str = "2x2\nab..\ncd.e\nABCD\nEFGH\n";

    #[test]
    fn slices_frames_by_column_and_row() {
        let s = SpriteSheet::parse(SHEET).unwrap();
        assert_eq!(s.frame_size(), (2, 2));
        assert_eq!((s.cols(), s.rows()), (2, 2));
        assert_eq!(s.frame(0, 0).lines(), vec!["ab", "cd"]);
        assert_eq!(s.frame(1, 0).lines(), vec!["  ", " e"]);
        assert_eq!(s.frame(1, 1).lines(), vec!["CD", "GH"]);
    }

    #[test]
    fn transparent_cells_have_no_glyph() {
        let s = SpriteSheet::parse(SHEET).unwrap();
        let f = s.frame(1, 0);
        assert_eq!(f.glyph(0, 0), None);
        assert_eq!(f.glyph(1, 1), Some('e'));
        assert_eq!(f.glyph(5, 5), None);
    }

    #[test]
    fn frame_indices_wrap() {
        let s = SpriteSheet::parse(SHEET).unwrap();
        assert_eq!(s.frame(2, 3).lines(), s.frame(0, 1).lines());
    }

    #[test]
    fn rejects_bad_sheets() {
        assert_eq!(SpriteSheet::parse(""), Err(SheetError::MissingHeader));
        assert_eq!(
            SpriteSheet::parse("2by2\nab"),
            Err(SheetError::BadHeader("2by2".to_string()))
        );
        assert_eq!(
            SpriteSheet::parse("0x2\nab"),
            Err(SheetError::BadHeader("0x2".to_string()))
        );
        assert_eq!(SpriteSheet::parse("2x2\n\n"), Err(SheetError::NoFrames));
        assert_eq!(
            SpriteSheet::parse("2x2\nab\ncd\nef"),
            Err(SheetError::UnevenRows {
                lines: 3,
                frame_h: 2
            })
        );
        assert_eq!(
            SpriteSheet::parse("2x1\nabcd\nabc"),
            Err(SheetError::UnevenWidth {
                line: 2,
                width: 3,
                expected: 4
            })
        );
    }

    #[test]
    fn bundled_sheets_have_four_directions_of_four_frames() {
        for src in [
            crate::assets::PLAYER_SHEET,
            crate::assets::CHICKEN_WALK_SHEET,
            crate::assets::CHICKEN_EAT_SHEET,
        ] {
            let s = SpriteSheet::parse(src).unwrap();
            assert_eq!((s.cols(), s.rows()), (4, 4));
        }
    }
}
