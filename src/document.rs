//! PDF rendering of an invoice.
//!
//! Layout, top to bottom:
//!
//! ```text
//! ItemA                                        7
//! ItemC                                        9
//! ───────────────────────────────────────────────
//! Total Sum                                   16
//! ```
//!
//! One row per line item (name left-aligned, amount right-aligned, no
//! borders), a thin rule, then a single `Total Sum` row. Names wider than
//! the space left of the amount wrap onto further lines of the same row.
//!
//! Text is set in the standard Courier font with `WinAnsiEncoding`, so
//! Latin-1 names render as written. Characters outside that encoding are
//! dropped. Courier's fixed advance width lets cells be measured and
//! right-aligned without font metrics. Output is deterministic.

use crate::entity::ProductRecord;
use crate::error::{Error, Result};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Encoding, Object, Stream, StringFormat};

/// Label of the totals row.
pub const TOTAL_LABEL: &str = "Total Sum";

/// Courier advance width, in em.
const COURIER_ADVANCE: f32 = 0.6;

/// Resource name of the page font.
const FONT_RESOURCE: &str = "F1";

/// Vertical space taken by the separator rule.
const SEPARATOR_HEIGHT: f32 = 8.0;

/// Thickness of the separator rule.
const SEPARATOR_WIDTH: f32 = 0.5;

/// Minimum blank space between the name and amount cells, in glyphs.
const CELL_GAP: usize = 2;

/// Page geometry and type size, in PDF points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageLayout {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    pub font_size: f32,
    pub row_height: f32,
}

impl PageLayout {
    /// A4 portrait, 50pt margins, 12pt text.
    pub const A4: PageLayout = PageLayout {
        width: 595.0,
        height: 842.0,
        margin: 50.0,
        font_size: 12.0,
        row_height: 18.0,
    };

    fn advance(&self) -> f32 {
        COURIER_ADVANCE * self.font_size
    }

    /// Width of `glyphs` encoded characters.
    fn text_width(&self, glyphs: usize) -> f32 {
        glyphs as f32 * self.advance()
    }

    fn top(&self) -> f32 {
        self.height - self.margin
    }

    fn right_edge(&self) -> f32 {
        self.width - self.margin
    }

    /// How many glyphs fit left of a right cell `right_glyphs` wide.
    fn left_capacity(&self, right_glyphs: usize) -> usize {
        let free = self.right_edge() - self.margin - self.text_width(right_glyphs + CELL_GAP);
        ((free / self.advance()).floor() as usize).max(1)
    }
}

impl Default for PageLayout {
    fn default() -> Self {
        PageLayout::A4
    }
}

/// Renders line items and their total into PDF bytes.
#[derive(Clone, Debug, Default)]
pub struct PdfDocumentBuilder {
    layout: PageLayout,
}

impl PdfDocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout(layout: PageLayout) -> Self {
        PdfDocumentBuilder { layout }
    }

    pub fn layout(&self) -> &PageLayout {
        &self.layout
    }

    /// Render the invoice document.
    ///
    /// # Errors
    ///
    /// Returns `Error::Generation` if the PDF cannot be encoded.
    pub fn render(&self, entities: &[ProductRecord], total_sum: i32) -> Result<Vec<u8>> {
        let font = courier_font();
        let pages = {
            let encoding = font.get_font_encoding(&Document::new())?;
            let mut composer = PageComposer::new(self.layout, &encoding);
            for entity in entities {
                composer.row(&entity.name, &entity.amount.to_string());
            }
            composer.separator();
            composer.row(TOTAL_LABEL, &total_sum.to_string());
            composer.finish()
        };

        self.assemble(font, pages)
    }

    fn assemble(&self, font: Dictionary, pages: Vec<Vec<Operation>>) -> Result<Vec<u8>> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(font);
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                FONT_RESOURCE => font_id,
            },
        });

        let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
        for operations in pages {
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let page_count = kids.len() as i64;
        let media_box: Vec<Object> = vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::from(self.layout.width),
            Object::from(self.layout.height),
        ];
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count,
                "Resources" => resources_id,
                "MediaBox" => media_box,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| Error::Generation(e.to_string()))?;
        Ok(bytes)
    }
}

fn courier_font() -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Split encoded text into lines of at most `max` glyphs, preferring to
/// break at spaces.
fn wrap(text: &[u8], max: usize) -> Vec<&[u8]> {
    let mut lines = Vec::new();
    let mut rest = text;
    while rest.len() > max {
        let split = rest[..=max]
            .iter()
            .rposition(|&byte| byte == b' ')
            .filter(|&at| at > 0)
            .unwrap_or(max);
        lines.push(&rest[..split]);
        rest = &rest[split..];
        while let [b' ', tail @ ..] = rest {
            rest = tail;
        }
    }
    lines.push(rest);
    lines
}

/// Lays out rows top-down, starting a new page at the bottom margin.
struct PageComposer<'a> {
    layout: PageLayout,
    encoding: &'a Encoding<'a>,
    pages: Vec<Vec<Operation>>,
    current: Vec<Operation>,
    cursor: f32,
}

impl<'a> PageComposer<'a> {
    fn new(layout: PageLayout, encoding: &'a Encoding<'a>) -> Self {
        PageComposer {
            layout,
            encoding,
            pages: Vec::new(),
            current: Vec::new(),
            cursor: layout.top(),
        }
    }

    fn reserve(&mut self, height: f32) -> f32 {
        if self.cursor - height < self.layout.margin && !self.current.is_empty() {
            self.pages.push(std::mem::take(&mut self.current));
            self.cursor = self.layout.top();
        }
        self.cursor -= height;
        self.cursor
    }

    fn row(&mut self, left: &str, right: &str) {
        let left = Document::encode_text(self.encoding, left);
        let right = Document::encode_text(self.encoding, right);
        let lines = wrap(&left, self.layout.left_capacity(right.len()));

        let row_height = self.layout.row_height;
        let top = self.reserve(row_height * lines.len() as f32) + row_height * lines.len() as f32;
        let inset = (row_height - self.layout.font_size) / 2.0;

        for (index, line) in lines.iter().enumerate() {
            let baseline = top - row_height * (index + 1) as f32 + inset;
            self.text(line, self.layout.margin, baseline);
        }
        let right_x = self.layout.right_edge() - self.layout.text_width(right.len());
        self.text(&right, right_x, top - row_height + inset);
    }

    fn separator(&mut self) {
        let y = self.reserve(SEPARATOR_HEIGHT) + SEPARATOR_HEIGHT / 2.0;
        self.current.extend([
            Operation::new("q", vec![]),
            Operation::new("w", vec![SEPARATOR_WIDTH.into()]),
            Operation::new("m", vec![self.layout.margin.into(), y.into()]),
            Operation::new("l", vec![self.layout.right_edge().into(), y.into()]),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ]);
    }

    fn text(&mut self, encoded: &[u8], x: f32, y: f32) {
        self.current.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![FONT_RESOURCE.into(), self.layout.font_size.into()],
            ),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new(
                "Tj",
                vec![Object::String(encoded.to_vec(), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ]);
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        self.pages.push(self.current);
        self.pages
    }
}
