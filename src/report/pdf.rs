// Multi-page PDF report with holdings tables and value charts.
//
// Output is a plain PDF 1.4 file using the two standard Helvetica fonts, so
// no font embedding is needed. Charts are drawn as vector paths.

use std::fmt::Write as _;

use super::chart::Bounds;
use crate::error::Result;
use crate::simulation::SimulationRun;
use crate::types::{Portfolio, PortfolioValueSeries};

pub const REPORT_TITLE: &str = "Portfolio Analysis Report";

const PAGE_WIDTH: f64 = 612.0;
const PAGE_HEIGHT: f64 = 792.0;
const FIRST_PAGE_TOP: f64 = 700.0;
const PAGE_TOP: f64 = 750.0;
const BOTTOM_MARGIN: f64 = 100.0;
const CHART_X: f64 = 50.0;
const CHART_WIDTH: f64 = 500.0;
const CHART_HEIGHT: f64 = 250.0;
const CHART_DROP: f64 = 300.0;
const CHART_MIN_BOTTOM: f64 = 40.0;

#[derive(Debug, Clone, Copy)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

/// Escape a string for use inside a PDF literal `( ... )`.
fn escape_pdf_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

/// Page content streams plus the vertical cursor on the current page.
struct Layout {
    pages: Vec<String>,
    current: String,
    y: f64,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: String::new(),
            y: FIRST_PAGE_TOP,
        }
    }

    fn new_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.current));
        self.y = PAGE_TOP;
    }

    fn ensure_room(&mut self, needed: f64) {
        if self.y - needed < BOTTOM_MARGIN {
            self.new_page();
        }
    }

    fn text(&mut self, font: Font, size: f64, x: f64, y: f64, text: &str) {
        let _ = writeln!(
            self.current,
            "BT /{} {} Tf {:.2} {:.2} Td ({}) Tj ET",
            font.resource(),
            size,
            x,
            y,
            escape_pdf_text(text)
        );
    }

    /// Text rotated a quarter turn counter-clockwise, baseline starting at `(x, y)`.
    fn vertical_text(&mut self, size: f64, x: f64, y: f64, text: &str) {
        let _ = writeln!(
            self.current,
            "BT /{} {} Tf 0 1 -1 0 {:.2} {:.2} Tm ({}) Tj ET",
            Font::Regular.resource(),
            size,
            x,
            y,
            escape_pdf_text(text)
        );
    }

    fn finish(mut self) -> Vec<String> {
        self.pages.push(self.current);
        self.pages
    }

    fn line_chart(&mut self, title: &str, series: &PortfolioValueSeries, bottom: f64) {
        let left = CHART_X;
        let top = bottom + CHART_HEIGHT;

        self.text(Font::Bold, 11.0, left, top + 10.0, title);
        let _ = writeln!(
            self.current,
            "0.6 G 0.5 w {:.2} {:.2} {:.2} {:.2} re S",
            left, bottom, CHART_WIDTH, CHART_HEIGHT
        );

        if let Some(bounds) = Bounds::of([series]) {
            let mut path = String::new();
            for (idx, (date, value)) in series.iter().enumerate() {
                let (fx, fy) = bounds.fraction(date, value);
                let op = if idx == 0 { "m" } else { "l" };
                let _ = write!(
                    path,
                    "{:.2} {:.2} {} ",
                    left + CHART_WIDTH * fx,
                    bottom + CHART_HEIGHT * fy,
                    op
                );
            }
            let _ = writeln!(self.current, "0.12 0.35 0.75 RG 1.2 w {}S", path);
            let _ = writeln!(self.current, "0 G");

            self.text(Font::Regular, 8.0, left, bottom - 12.0, &bounds.first.to_string());
            self.text(
                Font::Regular,
                8.0,
                left + CHART_WIDTH - 45.0,
                bottom - 12.0,
                &bounds.last.to_string(),
            );
            self.text(Font::Regular, 8.0, left + 4.0, top - 10.0, &format!("{:.2}", bounds.max));
            self.text(Font::Regular, 8.0, left + 4.0, bottom + 4.0, &format!("{:.2}", bounds.min));
        }

        self.text(
            Font::Regular,
            10.0,
            left + CHART_WIDTH / 2.0 - 10.0,
            bottom - 24.0,
            "Date",
        );
        self.vertical_text(10.0, left - 8.0, bottom + CHART_HEIGHT / 2.0 - 35.0, "Portfolio Value");
    }

    fn portfolio_block(&mut self, portfolio: &Portfolio) -> Result<()> {
        self.ensure_room(60.0);
        self.text(Font::Bold, 14.0, 30.0, self.y, portfolio.name());
        self.y -= 25.0;

        self.text(Font::Regular, 12.0, 50.0, self.y, "Holdings Summary:");
        self.y -= 20.0;
        self.text(
            Font::Regular,
            12.0,
            50.0,
            self.y,
            "Ticker   |   Weight   |   Latest Price",
        );
        self.y -= 15.0;

        for holding in portfolio.holdings()? {
            self.ensure_room(0.0);
            let row = format!(
                "{}   |   {:.2}%   |   {:.2}",
                holding.ticker,
                holding.weight * 100.0,
                holding.latest_price
            );
            self.text(Font::Regular, 12.0, 50.0, self.y, &row);
            self.y -= 15.0;
        }

        self.y -= 20.0;
        if self.y - CHART_DROP < CHART_MIN_BOTTOM {
            self.new_page();
        }
        let title = format!("{} - Value Over Time", portfolio.name());
        self.line_chart(&title, &portfolio.value_series()?, self.y - CHART_DROP);
        self.y -= 320.0;

        if self.y < BOTTOM_MARGIN {
            self.new_page();
        } else {
            self.y -= 20.0;
        }
        Ok(())
    }
}

/// Lay out the report and serialize it as PDF bytes.
pub fn render_pdf_report(run: &SimulationRun) -> Result<Vec<u8>> {
    let mut layout = Layout::new();
    layout.text(Font::Bold, 16.0, 30.0, 750.0, REPORT_TITLE);
    layout.text(
        Font::Regular,
        12.0,
        30.0,
        730.0,
        &format!("Date Range: {}", run.range),
    );

    for portfolio in &run.portfolios {
        layout.portfolio_block(portfolio)?;
    }

    let mut pages = layout.finish();
    // a block ending exactly at the margin leaves a blank trailing page
    if pages.len() > 1 && pages.last().is_some_and(|p| p.is_empty()) {
        pages.pop();
    }
    Ok(assemble(&pages))
}

/// Write catalog, page tree, fonts, pages and the cross-reference table.
fn assemble(pages: &[String]) -> Vec<u8> {
    // 1 catalog, 2 page tree, 3-4 fonts, then a page and a content stream per page
    let page_id = |idx: usize| 5 + idx * 2;
    let kids: Vec<String> = (0..pages.len())
        .map(|idx| format!("{} 0 R", page_id(idx)))
        .collect();

    let mut objects: Vec<String> = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            pages.len()
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>"
            .to_string(),
    ];
    for (idx, content) in pages.iter().enumerate() {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
            PAGE_WIDTH,
            PAGE_HEIGHT,
            page_id(idx) + 1
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}endstream",
            content.len(),
            content
        ));
    }

    let mut out = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (idx, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        let _ = write!(out, "{} 0 obj\n{}\nendobj\n", idx + 1, body);
    }

    let xref = out.len();
    let _ = write!(out, "xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        let _ = writeln!(out, "{:010} 00000 n ", offset);
    }
    let _ = write!(
        out,
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref
    );
    out.into_bytes()
}
