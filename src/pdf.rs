use anyhow::{Context, Result};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use time::OffsetDateTime;

use crate::dates::month_name;
use crate::model::Document;
use crate::report::{fuel_line, indexed_by_km, km_line, manu_line, EMPTY_SECTION};
use crate::stats::{liters_total, maintenance_total, spend_by_month, spend_this_month, spend_total};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 18.0;
const LAYER: &str = "Camada 1";

#[derive(Debug, Clone, PartialEq)]
pub enum PdfLine {
    Title(String),
    Header(String),
    Text(String),
    Gap,
}

impl PdfLine {
    fn size(&self) -> f32 {
        match self {
            PdfLine::Title(_) => 14.0,
            PdfLine::Header(_) => 12.0,
            PdfLine::Text(_) => 10.0,
            PdfLine::Gap => 0.0,
        }
    }

    /// Vertical space taken, in millimetres.
    fn advance(&self) -> f32 {
        match self {
            PdfLine::Title(_) => 10.0,
            PdfLine::Header(_) => 7.0,
            PdfLine::Text(_) => 5.5,
            PdfLine::Gap => 4.0,
        }
    }
}

fn text(s: impl Into<String>) -> PdfLine {
    PdfLine::Text(s.into())
}

/// Lays out the full report: totals, monthly spend, then every record.
pub fn document_lines(doc: &Document, now: OffsetDateTime) -> Vec<PdfLine> {
    let mut lines = vec![
        PdfLine::Title("RELATÓRIO COMPLETO - POPzinha".to_string()),
        text(format!(
            "Gerado em: {:02}/{:02}/{} às {:02}:{:02}",
            now.day(),
            u8::from(now.month()),
            now.year(),
            now.hour(),
            now.minute()
        )),
        PdfLine::Gap,
        PdfLine::Header("GASTO TOTAL COMBUSTÍVEL".to_string()),
        text(format!("Total: R$ {:.2}", spend_total(doc))),
        text(format!("Litros: {:.2} L", liters_total(doc))),
        PdfLine::Gap,
        PdfLine::Header("GASTO TOTAL MANUTENÇÃO".to_string()),
        text(format!("Total: R$ {:.2}", maintenance_total(doc))),
        PdfLine::Gap,
        PdfLine::Header("GASTO MENSAL COMBUSTÍVEL".to_string()),
        text(format!("Período: ({})", month_name(u8::from(now.month())))),
        text(format!("Total: R$ {:.2}", spend_this_month(doc, now))),
        PdfLine::Gap,
    ];

    let by_month = spend_by_month(doc, now.year());
    if by_month.iter().any(|total| *total > 0.0) {
        lines.push(PdfLine::Header(format!("COMBUSTÍVEL POR MÊS ({})", now.year())));
        for (month, total) in (1u8..).zip(by_month) {
            if total > 0.0 {
                lines.push(text(format!("{}: R$ {:.2}", month_name(month), total)));
            }
        }
        lines.push(PdfLine::Gap);
    }

    lines.push(PdfLine::Header("Abastecimentos:".to_string()));
    if doc.fuel.is_empty() {
        lines.push(text(EMPTY_SECTION));
    }
    for (i, purchase) in doc.fuel.iter().enumerate() {
        lines.push(text(fuel_line(i + 1, purchase)));
    }
    lines.push(PdfLine::Gap);

    lines.push(PdfLine::Header("Manutenções:".to_string()));
    if doc.manu.is_empty() {
        lines.push(text(EMPTY_SECTION));
    }
    for (index, event) in indexed_by_km(&doc.manu, |e| e.km) {
        lines.push(text(manu_line(index, event)));
    }
    lines.push(PdfLine::Gap);

    lines.push(PdfLine::Header("KM:".to_string()));
    if doc.km.is_empty() {
        lines.push(text(EMPTY_SECTION));
    }
    for (index, reading) in indexed_by_km(&doc.km, |r| r.km) {
        lines.push(text(km_line(index, reading)));
    }

    lines
}

/// Builtin fonts only cover Latin-1; anything else becomes `?`.
fn printable(raw: &str) -> String {
    raw.chars()
        .map(|c| if (c as u32) < 0x100 && !c.is_control() { c } else { '?' })
        .collect()
}

struct Cursor {
    layer: PdfLayerReference,
    y: f32,
}

impl Cursor {
    fn new_page(doc: &PdfDocumentReference) -> Self {
        let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
        Self {
            layer: doc.get_page(page).get_layer(layer),
            y: PAGE_HEIGHT - MARGIN,
        }
    }
}

/// Renders `lines` onto as many A4 pages as needed.
pub fn render(lines: &[PdfLine]) -> Result<Vec<u8>> {
    let (doc, page, layer) = PdfDocument::new("Relatório POPzinha", Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
    let regular: IndirectFontRef = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .context("failed to load Helvetica")?;
    let bold: IndirectFontRef = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .context("failed to load Helvetica-Bold")?;

    let mut cursor = Cursor {
        layer: doc.get_page(page).get_layer(layer),
        y: PAGE_HEIGHT - MARGIN,
    };

    for line in lines {
        if cursor.y - line.advance() < MARGIN {
            cursor = Cursor::new_page(&doc);
        }
        cursor.y -= line.advance();
        let (content, font) = match line {
            PdfLine::Title(s) | PdfLine::Header(s) => (s, &bold),
            PdfLine::Text(s) => (s, &regular),
            PdfLine::Gap => continue,
        };
        cursor
            .layer
            .use_text(printable(content), line.size(), Mm(MARGIN), Mm(cursor.y), font);
    }

    doc.save_to_bytes().context("failed to serialize pdf")
}

pub fn file_name(now: OffsetDateTime) -> String {
    format!(
        "relatorio_moto_{}{:02}{:02}_{:02}{:02}.pdf",
        now.year(),
        u8::from(now.month()),
        now.day(),
        now.hour(),
        now.minute()
    )
}
