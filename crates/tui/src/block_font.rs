use std::collections::HashMap;

use once_cell::sync::Lazy;

const FONT_HEIGHT: usize = 7;
const FONT_WIDTH: usize = 5;
const SHADOW_OFFSET: usize = 2;
const FILL_CHAR: char = '█';
const OUTLINE_CHAR: char = '░';

type Glyph = [&'static str; FONT_HEIGHT];

// Cyrillic capitals used by the banners, plus a little punctuation.
static GLYPHS: Lazy<HashMap<char, Glyph>> = Lazy::new(|| {
    HashMap::from([
        (
            'А',
            [
                " 111 ", "1   1", "1   1", "11111", "1   1", "1   1", "1   1",
            ],
        ),
        (
            'Б',
            [
                "11111", "1    ", "1    ", "1111 ", "1   1", "1   1", "1111 ",
            ],
        ),
        (
            'В',
            [
                "1111 ", "1   1", "1   1", "1111 ", "1   1", "1   1", "1111 ",
            ],
        ),
        (
            'Г',
            [
                "11111", "1    ", "1    ", "1    ", "1    ", "1    ", "1    ",
            ],
        ),
        (
            'Д',
            [
                "  11 ", " 1 1 ", " 1 1 ", " 1 1 ", " 1 1 ", "11111", "1   1",
            ],
        ),
        (
            'Е',
            [
                "11111", "1    ", "1    ", "1111 ", "1    ", "1    ", "11111",
            ],
        ),
        (
            'И',
            [
                "1   1", "1   1", "1  11", "1 1 1", "11  1", "1   1", "1   1",
            ],
        ),
        (
            'Л',
            [
                "  111", " 1  1", " 1  1", " 1  1", " 1  1", " 1  1", "1   1",
            ],
        ),
        (
            'О',
            [
                " 111 ", "1   1", "1   1", "1   1", "1   1", "1   1", " 111 ",
            ],
        ),
        (
            'П',
            [
                "11111", "1   1", "1   1", "1   1", "1   1", "1   1", "1   1",
            ],
        ),
        (
            'Р',
            [
                "1111 ", "1   1", "1   1", "1111 ", "1    ", "1    ", "1    ",
            ],
        ),
        (
            '!',
            [
                "  1  ", "  1  ", "  1  ", "  1  ", "  1  ", "     ", "  1  ",
            ],
        ),
        (
            ' ',
            [
                "     ", "     ", "     ", "     ", "     ", "     ", "     ",
            ],
        ),
        (
            '?',
            [
                " 111 ", "1   1", "    1", "   1 ", "  1  ", "     ", "  1  ",
            ],
        ),
    ])
});

/// Every lit glyph cell covers two columns; the shadow sits this far down
/// and to the right.
const CELL_WIDTH: usize = 2;
const GLYPH_GAP: usize = 2;
const SHADOW: (usize, usize) = (SHADOW_OFFSET, SHADOW_OFFSET * CELL_WIDTH);

struct Canvas {
    rows: Vec<Vec<char>>,
}

impl Canvas {
    fn for_glyphs(count: usize) -> Self {
        let advance = FONT_WIDTH * CELL_WIDTH + GLYPH_GAP;
        let width = count * advance + SHADOW.1;
        Self {
            rows: vec![vec![' '; width]; FONT_HEIGHT + SHADOW.0],
        }
    }

    /// Light one glyph cell: a solid block with its shadow behind it.
    fn stamp(&mut self, row: usize, column: usize) {
        for dy in 0..SHADOW.0 {
            for dx in 0..CELL_WIDTH {
                self.put(row + SHADOW.0 - dy, column + SHADOW.1 + dx, OUTLINE_CHAR);
            }
        }
        for dx in 0..CELL_WIDTH {
            self.put(row, column + dx, FILL_CHAR);
        }
    }

    // fill wins over shadow, nothing overwrites fill
    fn put(&mut self, row: usize, column: usize, ch: char) {
        let Some(cell) = self.rows.get_mut(row).and_then(|line| line.get_mut(column)) else {
            return;
        };
        match (*cell, ch) {
            (' ', _) | (OUTLINE_CHAR, FILL_CHAR) => *cell = ch,
            _ => {}
        }
    }

    fn into_lines(self) -> Vec<String> {
        self.rows
            .into_iter()
            .map(|row| row.into_iter().collect::<String>().trim_end().to_string())
            .collect()
    }
}

/// Render `text` in the block font. Lowercase input is uppercased and
/// characters without a glyph show as `?`.
pub fn render(text: &str) -> Vec<String> {
    let glyphs: Vec<&Glyph> = text
        .chars()
        .flat_map(char::to_uppercase)
        .filter_map(|ch| GLYPHS.get(&ch).or_else(|| GLYPHS.get(&'?')))
        .collect();
    let mut canvas = Canvas::for_glyphs(glyphs.len());
    let advance = FONT_WIDTH * CELL_WIDTH + GLYPH_GAP;

    for (index, glyph) in glyphs.into_iter().enumerate() {
        let lit = glyph.iter().enumerate().flat_map(|(row, pattern)| {
            pattern
                .chars()
                .enumerate()
                .filter(|(_, symbol)| *symbol == '1')
                .map(move |(column, _)| (row, column))
        });
        for (row, column) in lit {
            canvas.stamp(row, index * advance + column * CELL_WIDTH);
        }
    }

    canvas.into_lines()
}
