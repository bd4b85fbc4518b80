//! Box-drawn text tables.
//!
//! A table is an ordered list of elements (titles, rows, dividers, an end cap) rendered
//! against one shared set of column widths.

use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarStyle {
    Single,
    Double,
}

impl BarStyle {
    fn vert(self) -> char { if self == BarStyle::Double { '║' } else { '│' } }
    fn horiz(self) -> char { if self == BarStyle::Double { '═' } else { '─' } }
    fn top(self) -> (char, char) { if self == BarStyle::Double { ('╔', '╗') } else { ('┌', '┐') } }
    fn bottom(self) -> [char; 3] { if self == BarStyle::Double { ['╚', '╩', '╝'] } else { ['└', '┴', '┘'] } }
    fn mid(self) -> [char; 3] { if self == BarStyle::Double { ['╠', '╬', '╣'] } else { ['├', '┼', '┤'] } }
    /// Joints for a thin rule inside a frame of this style.
    fn thin(self) -> [char; 3] { if self == BarStyle::Double { ['╟', '╫', '╢'] } else { ['├', '┼', '┤'] } }
}

#[derive(Debug, Clone)]
enum Element {
    Title(String),
    Row(Vec<String>),
    HeaderDivider,
    Divider,
    EndCap,
}

#[derive(Debug, Clone)]
pub struct Table {
    /// First column left aligned, the rest right aligned. Otherwise everything is right aligned.
    left_first: bool,
    bar: BarStyle,
    elements: Vec<Element>,
}

impl Default for Table {
    fn default() -> Self { Self::new(true, BarStyle::Double) }
}

impl Table {
    pub fn new(left_first: bool, bar: BarStyle) -> Self {
        Self { left_first, bar, elements: Vec::new() }
    }

    pub fn title(mut self, text: impl Into<String>) -> Self {
        self.elements.push(Element::Title(text.into()));
        self
    }

    pub fn row<S: Into<String>>(mut self, cells: impl IntoIterator<Item = S>) -> Self {
        self.elements.push(Element::Row(cells.into_iter().map(Into::into).collect()));
        self
    }

    /// A heavy rule in the frame's own style, used under a header row.
    pub fn header_divider(mut self) -> Self {
        self.elements.push(Element::HeaderDivider);
        self
    }

    /// A thin rule between groups of rows.
    pub fn divider(mut self) -> Self {
        self.elements.push(Element::Divider);
        self
    }

    pub fn end_cap(mut self) -> Self {
        self.elements.push(Element::EndCap);
        self
    }

    pub fn render(&self) -> String {
        let mut widths = self.column_widths();
        let mut total = table_width(&widths);

        let title_width = self
            .elements
            .iter()
            .filter_map(|e| match e {
                Element::Title(t) => Some(t.trim().chars().count() + 4),
                _ => None,
            })
            .max()
            .unwrap_or(0);
        if title_width > total {
            if let Some(last) = widths.last_mut() {
                *last += title_width - total;
            }
            total = table_width(&widths);
        }

        let mut out = String::new();
        for element in &self.elements {
            match element {
                Element::Title(t) => self.render_title(&mut out, t, total),
                Element::Row(cells) => self.render_row(&mut out, cells, &widths),
                Element::HeaderDivider => self.render_rule(&mut out, &widths, self.bar.horiz(), self.bar.mid()),
                Element::Divider => self.render_rule(&mut out, &widths, BarStyle::Single.horiz(), self.bar.thin()),
                Element::EndCap => self.render_rule(&mut out, &widths, self.bar.horiz(), self.bar.bottom()),
            }
        }
        out
    }

    fn column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = Vec::new();
        for element in &self.elements {
            if let Element::Row(cells) = element {
                if cells.len() > widths.len() {
                    widths.resize(cells.len(), 0);
                }
                for (w, cell) in widths.iter_mut().zip(cells) {
                    *w = (*w).max(cell.chars().count());
                }
            }
        }
        if widths.is_empty() {
            widths.push(0);
        }
        widths.iter().map(|w| (*w).max(1)).collect()
    }

    fn render_title(&self, out: &mut String, title: &str, total: usize) {
        let text = format!(" {} ", title.trim());
        let inner = total.saturating_sub(2 + text.chars().count());
        let left = inner / 2;
        let (tl, tr) = self.bar.top();
        let fill = self.bar.horiz();
        let _ = writeln!(out, "{}{}{}{}{}", tl, repeat(fill, left), text, repeat(fill, inner - left), tr);
    }

    fn render_row(&self, out: &mut String, cells: &[String], widths: &[usize]) {
        let v = self.bar.vert();
        out.push(v);
        for (i, w) in widths.iter().enumerate() {
            let cell: String = cells.get(i).map(|c| c.chars().take(*w).collect()).unwrap_or_default();
            let pad = " ".repeat(w - cell.chars().count());
            if self.left_first && i == 0 {
                let _ = write!(out, " {}{} {}", cell, pad, v);
            } else {
                let _ = write!(out, " {}{} {}", pad, cell, v);
            }
        }
        out.push('\n');
    }

    fn render_rule(&self, out: &mut String, widths: &[usize], fill: char, [left, join, right]: [char; 3]) {
        out.push(left);
        for (i, w) in widths.iter().enumerate() {
            if i > 0 {
                out.push(join);
            }
            out.push_str(&repeat(fill, w + 2));
        }
        out.push(right);
        out.push('\n');
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

fn table_width(widths: &[usize]) -> usize {
    widths.iter().sum::<usize>() + 3 * widths.len() + 1
}

fn repeat(c: char, n: usize) -> String {
    std::iter::repeat(c).take(n).collect()
}
